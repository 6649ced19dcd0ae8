//! # quire
//!
//! Building blocks for typing practice over long-form text: recover a table of
//! contents from raw text (or reconcile one supplied by a structured source),
//! split the text into chapters, and drive a line-by-line typing session
//! against the result.
//!
//! ## Pipeline
//!
#![doc = simple_mermaid::mermaid!("../diagrams/pipeline_flow.mmd")]
//!
//! ```rust
//! use quire::{extract_table_of_contents, split_text_by_chapters, validate_and_fix_chapter_positions};
//!
//! let text = "# One\nfirst body\n# Two\nsecond body";
//! let toc = extract_table_of_contents(text);
//! let toc = validate_and_fix_chapter_positions(&toc, text);
//! let chapters = split_text_by_chapters(text, &toc, "Full Text");
//!
//! assert_eq!(chapters.len(), 2);
//! assert_eq!(chapters[1].content.as_deref(), Some("# Two\nsecond body"));
//! ```

mod chapter;
pub mod engine;
mod heading;
mod import;
mod layout;
mod lines;
mod navigation;
mod reconcile;
mod session;
mod split;
mod toc;

pub use chapter::*;
pub use engine::{EngineConfig, Outcome, TypingEngine, TypingStats};
pub use heading::*;
pub use import::*;
pub use layout::*;
pub use lines::*;
pub use navigation::*;
pub use reconcile::*;
pub use session::*;
pub use split::*;
pub use toc::*;

/// Label used for the synthesized single chapter when no structure is found.
pub const DEFAULT_FULL_TEXT_LABEL: &str = "Full Text";

/// Content given to a chapter whose text range turned out empty.
pub const DEFAULT_NO_CONTENT_LABEL: &str = "No content.";
