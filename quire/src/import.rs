//! # Importing documents
//!
//! Decoders turn raw bytes into text plus an optional outline. The outline's
//! position hints come in whatever unit the source format uses, so they are
//! reconciled against the text before splitting.
//!
//! [`import_document`] is the pipeline boundary: it always returns at least one
//! typable chapter, even if a stage panics.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::string::FromUtf8Error;

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
    ChapterNode, ChapterSplitter, DEFAULT_FULL_TEXT_LABEL, DEFAULT_NO_CONTENT_LABEL,
    ReconcileConfig, extract_table_of_contents, reconcile_outline,
    validate_and_fix_chapter_positions,
};

/// Where a decoder thinks an outline entry starts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PositionHint {
    #[default]
    None,
    /// Character offset into the decoded text
    Offset(usize),
    /// Page number, play order or similar; never a text offset
    Ordinal(i64),
}

/// Outline entry as supplied by a decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutlineNode {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub level: usize,
    #[serde(default)]
    pub hint: PositionHint,
    #[serde(default)]
    pub children: Vec<RawOutlineNode>,
}

impl RawOutlineNode {
    pub fn new(title: impl Into<String>, level: usize) -> Self {
        Self {
            id: None,
            title: title.into(),
            level,
            hint: PositionHint::None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub const fn with_hint(mut self, hint: PositionHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }
}

/// Output of a [`TextDecoder`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Structure found in the source format, if any
    pub outline: Option<Vec<RawOutlineNode>>,
}

impl DecodedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outline: None,
        }
    }
}

#[derive(Debug, From, Error)]
pub enum DecodeError {
    #[error("Input is not valid UTF-8: {0}")]
    Utf8(FromUtf8Error),
    #[from(skip)]
    #[error("Unsupported document format: {0}")]
    Unsupported(String),
    #[from(skip)]
    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Turns raw file contents into text.
pub trait TextDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedText, DecodeError>;
}

/// Settings for [`import_document`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub fallback_title: String,
    pub placeholder: String,
    pub reconcile: ReconcileConfig,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            fallback_title: DEFAULT_FULL_TEXT_LABEL.to_string(),
            placeholder: DEFAULT_NO_CONTENT_LABEL.to_string(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl ImportOptions {
    fn splitter(&self) -> ChapterSplitter {
        ChapterSplitter::new(self.fallback_title.as_str()).with_placeholder(self.placeholder.as_str())
    }
}

/// A decoded document split into chapters.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub chapters: Vec<ChapterNode>,
}

/// Positions and splits decoded text into chapters.
///
/// A supplied outline is reconciled against the text; otherwise headings are
/// detected in the text itself. If any stage panics, the whole text becomes a
/// single fallback chapter.
pub fn import_document(decoded: DecodedText, options: &ImportOptions) -> Document {
    let splitter = options.splitter();
    let DecodedText { text, outline } = decoded;

    let chapters = structure_or_fallback(&splitter, &text, || {
        let toc = match outline.as_deref() {
            Some(outline) if !outline.is_empty() => {
                debug!(entries = outline.len(), "reconciling supplied outline");
                reconcile_outline(outline, &text, &options.reconcile)
            }
            _ => {
                let toc = extract_table_of_contents(&text);
                validate_and_fix_chapter_positions(&toc, &text)
            }
        };
        splitter.split(&text, &toc)
    });

    Document { text, chapters }
}

/// Runs `structure`, or returns the single fallback chapter if it panics.
fn structure_or_fallback(
    splitter: &ChapterSplitter,
    text: &str,
    structure: impl FnOnce() -> Vec<ChapterNode>,
) -> Vec<ChapterNode> {
    catch_unwind(AssertUnwindSafe(structure)).unwrap_or_else(|_| {
        error!("structuring the document failed, falling back to a single chapter");
        vec![splitter.fallback_chapter(text)]
    })
}

/// Decodes `bytes` and imports the result.
pub fn decode_and_import(
    decoder: &impl TextDecoder,
    bytes: &[u8],
    options: &ImportOptions,
) -> Result<Document, DecodeError> {
    let decoded = decoder.decode(bytes)?;
    Ok(import_document(decoded, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PositionConfidence, count_chapters};

    struct Utf8Decoder;

    impl TextDecoder for Utf8Decoder {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedText, DecodeError> {
            Ok(DecodedText::plain(String::from_utf8(bytes.to_vec())?))
        }
    }

    #[test]
    fn detects_headings_without_outline() {
        let document = import_document(
            DecodedText::plain("# One\nbody\n# Two\nmore"),
            &ImportOptions::default(),
        );
        assert_eq!(document.chapters.len(), 2);
        assert_eq!(document.chapters[1].content.as_deref(), Some("# Two\nmore"));
    }

    #[test]
    fn prefers_the_supplied_outline() {
        let decoded = DecodedText {
            text: "# Not this\nStart here\nbody".to_string(),
            outline: Some(vec![RawOutlineNode::new("Start here", 1)]),
        };
        let document = import_document(decoded, &ImportOptions::default());

        assert_eq!(count_chapters(&document.chapters), 1);
        assert_eq!(document.chapters[0].position, 11);
        assert_eq!(document.chapters[0].confidence, PositionConfidence::Exact);
        // Preamble belongs to the first chapter
        assert_eq!(document.chapters[0].start_line, Some(0));
    }

    #[test]
    fn unstructured_text_becomes_one_chapter() {
        let options = ImportOptions {
            fallback_title: "Whole".to_string(),
            ..ImportOptions::default()
        };
        let document = import_document(DecodedText::plain("just words."), &options);
        assert_eq!(document.chapters.len(), 1);
        assert_eq!(document.chapters[0].title, "Whole");
    }

    #[test]
    fn panicking_stage_falls_back_to_one_chapter() {
        let splitter = ImportOptions::default().splitter();
        let chapters = structure_or_fallback(&splitter, "# One\nbody", || panic!("stage failed"));

        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, DEFAULT_FULL_TEXT_LABEL);
        assert_eq!(chapters[0].content.as_deref(), Some("# One\nbody"));
        assert_eq!(chapters[0].end_line, Some(1));
    }

    #[test]
    fn decoder_errors_propagate() {
        let result = decode_and_import(&Utf8Decoder, &[0xff, 0xfe], &ImportOptions::default());
        assert!(matches!(result, Err(DecodeError::Utf8(_))));

        let document = decode_and_import(&Utf8Decoder, b"# Hi\nthere", &ImportOptions::default())
            .expect("valid utf-8");
        assert_eq!(document.chapters[0].title, "Hi");
    }

    #[test]
    fn hints_deserialize_tagged() {
        let node: RawOutlineNode =
            serde_json::from_str(r#"{"title":"A","level":1,"hint":{"kind":"ordinal","value":4}}"#)
                .expect("valid outline json");
        assert_eq!(node.hint, PositionHint::Ordinal(4));
        assert!(node.children.is_empty());
    }
}
