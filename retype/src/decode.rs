//! Decoders for the file formats the command line accepts.
//!
//! Plain text and markdown are passed through; headings are detected later.
//! HTML is flattened to text, and its `<h1>`-`<h6>` elements become an
//! outline whose hints are the headings' ordinal numbers.

use std::iter::Peekable;
use std::path::Path;
use std::sync::LazyLock;

use clap::ValueEnum;
use quire::{DecodeError, DecodedText, PositionHint, RawOutlineNode, TextDecoder};
use regex::{Captures, Regex};
use strum::{Display, EnumString};

static HIDDEN_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>|<!--.*?-->")
        .expect("valid hidden element regex")
});

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").expect("valid heading regex")
});

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</?(?:p|div|h[1-6]|li|ul|ol|tr|table|blockquote|section|article|header|footer|pre|title)\b[^>]*>")
        .expect("valid line break regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid entity regex")
});

/// Input formats, chosen by file extension unless given explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DocumentKind {
    #[strum(to_string = "text", serialize = "txt")]
    Text,
    #[strum(to_string = "markdown", serialize = "md")]
    Markdown,
    #[strum(to_string = "html", serialize = "htm", serialize = "xhtml")]
    Html,
}

impl DocumentKind {
    /// Guesses the format from the extension; files without one are text.
    pub fn from_path(path: &Path) -> Result<Self, DecodeError> {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return Ok(Self::Text);
        };
        extension
            .parse()
            .map_err(|_| DecodeError::Unsupported(extension.to_string()))
    }
}

impl TextDecoder for DocumentKind {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedText, DecodeError> {
        match self {
            Self::Text | Self::Markdown => PlainTextDecoder.decode(bytes),
            Self::Html => HtmlDecoder.decode(bytes),
        }
    }
}

/// UTF-8 text, with a leading byte order mark and `\r\n` line endings removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextDecoder;

impl TextDecoder for PlainTextDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedText, DecodeError> {
        let text = String::from_utf8(bytes.to_vec())?;
        Ok(DecodedText::plain(normalize_newlines(&text)))
    }
}

fn normalize_newlines(text: &str) -> String {
    text.strip_prefix('\u{feff}')
        .unwrap_or(text)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Regex-based HTML flattening. Good enough for exported e-books and saved
/// articles; it does not try to be a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDecoder;

impl TextDecoder for HtmlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedText, DecodeError> {
        let html = normalize_newlines(&String::from_utf8(bytes.to_vec())?);
        let html = HIDDEN_ELEMENTS.replace_all(&html, "");

        let headings: Vec<RawOutlineNode> = HEADING
            .captures_iter(&html)
            .filter_map(|captures| {
                let level = captures[1].parse().ok()?;
                let title = inline_text(&captures[2]);
                (!title.is_empty()).then(|| RawOutlineNode::new(title, level))
            })
            .enumerate()
            .map(|(ordinal, node)| node.with_hint(PositionHint::Ordinal(ordinal as i64 + 1)))
            .collect();

        let text = flatten(&html);
        if text.is_empty() && !html.trim().is_empty() && headings.is_empty() {
            return Err(DecodeError::Malformed("no text content".to_string()));
        }

        let outline = (!headings.is_empty()).then(|| nest(&mut headings.into_iter().peekable(), 0));
        Ok(DecodedText { text, outline })
    }
}

/// Text of an inline fragment on a single line.
fn inline_text(fragment: &str) -> String {
    let text = decode_entities(&TAG.replace_all(fragment, " "));
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Block elements become line breaks, every other tag disappears. Lines are
/// trimmed and runs of blank lines collapse into one.
fn flatten(html: &str) -> String {
    let text = LINE_BREAK.replace_all(html, "\n");
    let text = decode_entities(&TAG.replace_all(&text, ""));

    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().is_none_or(String::is_empty) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    lines.join("\n")
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |captures: &Captures| {
            let entity = &captures[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(decimal) = entity.strip_prefix('#') {
                decimal.parse().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded.map_or_else(|| captures[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        _ => return None,
    })
}

/// Nests a flat heading list: deeper headings become children of the
/// preceding shallower one.
fn nest(
    headings: &mut Peekable<impl Iterator<Item = RawOutlineNode>>,
    parent_level: usize,
) -> Vec<RawOutlineNode> {
    let mut nodes = Vec::new();
    while let Some(mut node) = headings.next_if(|node| node.level > parent_level) {
        node.children = nest(headings, node.level);
        nodes.push(node);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Ignored</title><style>body { height: 100% }</style></head>
<body>
<h1 id="one">Part&nbsp;One</h1>
<p>It was a <em>dark</em> &amp; stormy night.</p>
<h2>The <b>Storm</b></h2>
<p>Rain fell.<br>Thunder&#33;</p>
<script>let x = 1;</script>
<h1>Part Two</h1>
<p>Morning came.</p>
</body>
</html>"#;

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a.txt")).unwrap(), DocumentKind::Text);
        assert_eq!(DocumentKind::from_path(Path::new("a.MD")).unwrap(), DocumentKind::Markdown);
        assert_eq!(DocumentKind::from_path(Path::new("a.htm")).unwrap(), DocumentKind::Html);
        assert_eq!(DocumentKind::from_path(Path::new("README")).unwrap(), DocumentKind::Text);
        assert!(matches!(
            DocumentKind::from_path(Path::new("book.epub")),
            Err(DecodeError::Unsupported(ext)) if ext == "epub"
        ));
    }

    #[test]
    fn plain_text_normalizes_newlines() {
        let decoded = PlainTextDecoder.decode(b"\xEF\xBB\xBFone\r\ntwo\rthree").unwrap();
        assert_eq!(decoded.text, "one\ntwo\nthree");
        assert!(decoded.outline.is_none());
    }

    #[test]
    fn invalid_utf8() {
        assert!(matches!(
            PlainTextDecoder.decode(&[0xff, 0xfe, 0x00]),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn html_text() {
        let decoded = HtmlDecoder.decode(PAGE.as_bytes()).unwrap();
        assert_eq!(
            decoded.text,
            "Part One\n\nIt was a dark & stormy night.\n\nThe Storm\n\nRain fell.\nThunder!\n\nPart Two\n\nMorning came."
        );
    }

    #[test]
    fn html_outline_is_nested() {
        let outline = HtmlDecoder.decode(PAGE.as_bytes()).unwrap().outline.unwrap();

        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "Part One");
        assert_eq!(outline[0].hint, PositionHint::Ordinal(1));
        assert_eq!(outline[0].children.len(), 1);
        assert_eq!(outline[0].children[0].title, "The Storm");
        assert_eq!(outline[0].children[0].level, 2);
        assert_eq!(outline[1].title, "Part Two");
        assert_eq!(outline[1].hint, PositionHint::Ordinal(3));
    }

    #[test]
    fn html_without_headings_has_no_outline() {
        let decoded = HtmlDecoder.decode(b"<p>just text</p>").unwrap();
        assert_eq!(decoded.text, "just text");
        assert!(decoded.outline.is_none());
    }

    #[test]
    fn markup_without_text() {
        assert!(matches!(
            HtmlDecoder.decode(b"<div><img src=\"cover.png\"></div>"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_entities_are_kept() {
        assert_eq!(decode_entities("a &bogus; b &#x41;"), "a &bogus; b A");
    }
}
