//! Implementations of the subcommands.
//!
//! Every command writes to the given output so it can be driven from tests.

use std::io::{BufRead, Write};
use std::path::Path;

use clap::ValueEnum;
use quire::engine::{Outcome, TypingEngine};
use quire::{
    ChapterId, ChapterNode, ColumnLayout, Document, LineLayout, PracticeSession, SessionStore,
    TextDecoder, TypingStats, decode_and_import, find_next_chapter, flatten_chapters,
    format_text_with_headings, needs_review, session_key,
};
use strum::Display;
use tracing::info;

use crate::config::{Config, ConfigError, Settings};
use crate::decode::DocumentKind;
use crate::error::AppError;
use crate::store::JsonFileStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|error| AppError::ReadInput {
        path: path.to_path_buf(),
        error,
    })
}

fn resolve_kind(path: &Path, kind: Option<DocumentKind>) -> Result<DocumentKind, AppError> {
    match kind {
        Some(kind) => Ok(kind),
        None => Ok(DocumentKind::from_path(path)?),
    }
}

/// Reads, decodes and splits the document at `path`.
pub fn load_document(
    path: &Path,
    kind: Option<DocumentKind>,
    settings: &Settings,
) -> Result<Document, AppError> {
    let kind = resolve_kind(path, kind)?;
    let bytes = read_bytes(path)?;
    let document = decode_and_import(&kind, &bytes, &settings.import_options())?;
    info!(
        path = %path.display(),
        %kind,
        chapters = flatten_chapters(&document.chapters).len(),
        "imported document"
    );
    Ok(document)
}

/// Title used for the practice record: the file name without extension.
fn document_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn toc(
    config: &Config,
    path: &Path,
    kind: Option<DocumentKind>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let document = load_document(path, kind, &config.settings)?;

    match format {
        OutputFormat::Json => {
            let outline: Vec<ChapterNode> = quire::map_chapters(&document.chapters, |_, mut chapter| {
                chapter.content = None;
                chapter
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&outline)?)?;
        }
        OutputFormat::Text => {
            for chapter in flatten_chapters(&document.chapters) {
                let indent = "  ".repeat(chapter.level.saturating_sub(1));
                let line = chapter.start_line.map_or(0, |line| line + 1);
                write!(out, "{indent}{}  (line {line})", chapter.title)?;
                if chapter.confidence.is_approximate() {
                    write!(out, " [{}]", chapter.confidence)?;
                }
                writeln!(out)?;
            }
            if needs_review(&document.chapters) {
                writeln!(
                    out,
                    "\nSome positions are approximate, check them before practicing."
                )?;
            }
        }
    }

    Ok(())
}

pub fn split(
    config: &Config,
    path: &Path,
    kind: Option<DocumentKind>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let document = load_document(path, kind, &config.settings)?;

    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&document.chapters)?)?;
        }
        OutputFormat::Text => {
            for chapter in flatten_chapters(&document.chapters) {
                writeln!(out, "== {} ==", chapter.title)?;
                writeln!(out, "{}\n", chapter.content.as_deref().unwrap_or_default())?;
            }
        }
    }

    Ok(())
}

/// Prints the decoded text with blank lines around detected headings.
pub fn format(path: &Path, kind: Option<DocumentKind>, out: &mut impl Write) -> Result<(), AppError> {
    let kind = resolve_kind(path, kind)?;
    let decoded = kind.decode(&read_bytes(path)?)?;
    writeln!(out, "{}", format_text_with_headings(&decoded.text))?;
    Ok(())
}

pub fn show_config(config: &Config, out: &mut impl Write) -> Result<(), AppError> {
    let settings = toml::to_string_pretty(&config.settings).map_err(ConfigError::Serialize)?;
    writeln!(out, "# {}\n{settings}", config.directory.display())?;
    Ok(())
}

/// Chapter by 1-based position in reading order, or by title.
fn select(chapters: &[ChapterNode], selector: &str) -> Option<ChapterId> {
    let flat = flatten_chapters(chapters);

    if let Ok(number) = selector.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| flat.get(index))
            .map(|chapter| chapter.id.clone());
    }

    let wanted = selector.to_lowercase();
    flat.iter()
        .find(|chapter| chapter.title.to_lowercase() == wanted)
        .or_else(|| {
            flat.iter()
                .find(|chapter| chapter.title.to_lowercase().contains(&wanted))
        })
        .map(|chapter| chapter.id.clone())
}

/// Saved progress for `title`, unless the document's structure changed since.
fn restore(
    store: &JsonFileStore,
    key: &str,
    title: &str,
    document: &Document,
) -> Result<PracticeSession, AppError> {
    let same_structure = |session: &PracticeSession| {
        let saved = flatten_chapters(&session.chapters);
        let current = flatten_chapters(&document.chapters);
        saved.len() == current.len()
            && saved
                .iter()
                .zip(&current)
                .all(|(saved, current)| saved.title == current.title && saved.content == current.content)
    };

    Ok(store
        .load(key)?
        .filter(same_structure)
        .unwrap_or_else(|| PracticeSession::new(title, document.chapters.clone())))
}

/// Every chapter with something to type has been completed.
fn is_fully_practiced(session: &PracticeSession) -> bool {
    let typable: Vec<_> = flatten_chapters(&session.chapters)
        .into_iter()
        .filter(|chapter| chapter.has_content())
        .collect();
    !typable.is_empty() && typable.iter().all(|chapter| chapter.completed)
}

/// How typing a chapter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Finished,
    /// Stopped at the given line
    Stopped(usize),
}

/// Line-mode practice: every entered line is fed to the engine one
/// character at a time, Enter confirms.
///
/// `:skip`, `:back` and `:quit` control the session. Progress is saved after
/// every chapter and on quit.
pub fn practice(
    config: &Config,
    path: &Path,
    kind: Option<DocumentKind>,
    chapter: Option<&str>,
    restart: bool,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let document = load_document(path, kind, &config.settings)?;
    let title = document_title(path);
    let key = session_key(&title);
    let store = JsonFileStore::new(config.sessions_dir())?;

    let mut session = if restart {
        PracticeSession::new(title.as_str(), document.chapters.clone())
    } else {
        restore(&store, &key, &title, &document)?
    };

    if chapter.is_none() && is_fully_practiced(&session) {
        writeln!(
            out,
            "\"{}\" is already finished. Use --chapter or --restart to practice it again.",
            session.title
        )?;
        return Ok(());
    }

    if let Some(selector) = chapter {
        let id = select(&session.chapters, selector)
            .ok_or_else(|| AppError::UnknownChapter(selector.to_string()))?;
        session.select_chapter(&id);
    } else if !session.current_chapter().is_some_and(ChapterNode::has_content) {
        let first = flatten_chapters(&session.chapters)
            .into_iter()
            .find(|chapter| chapter.has_content())
            .map(|chapter| chapter.id.clone());
        if let Some(id) = first {
            session.select_chapter(&id);
        }
    }

    while let Some(chapter) = session.current_chapter().cloned() {
        let ending = type_chapter(
            &chapter,
            session.last_position,
            &config.settings,
            &mut input,
            out,
        )?;

        match ending {
            Ending::Stopped(line) => {
                session.last_position = line;
                break;
            }
            Ending::Finished => {
                session.complete_chapter(&chapter.id);
                session.last_position = 0;
                writeln!(out, "Overall progress: {:.0}%", session.overall_progress)?;

                let next = find_next_chapter(&session.chapters, &chapter.id).map(|next| next.id.clone());
                match next {
                    Some(id) => {
                        session.select_chapter(&id);
                        store.save(&key, &session)?;
                    }
                    None => {
                        writeln!(out, "Finished \"{}\".", session.title)?;
                        break;
                    }
                }
            }
        }
    }

    store.save(&key, &session)?;
    Ok(())
}

fn type_chapter(
    chapter: &ChapterNode,
    start_line: usize,
    settings: &Settings,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Ending, AppError> {
    let content = chapter.content.as_deref().unwrap_or_default();
    let lines = ColumnLayout::default().wrap(content, settings.layout.width);
    if lines.is_empty() {
        return Ok(Ending::Finished);
    }

    writeln!(out, "\n## {} ({} lines)", chapter.title, lines.len())?;

    let mut engine = TypingEngine::new(lines)
        .with_config(settings.typing.clone())
        .starting_at(start_line);
    let mut field = String::new();

    while let Some(expected) = engine.current_line_text() {
        writeln!(out, "{:>4} | {expected}", engine.current_line() + 1)?;
        write!(out, "     > {field}")?;
        out.flush()?;

        let mut entered = String::new();
        if input.read_line(&mut entered)? == 0 {
            return Ok(Ending::Stopped(engine.current_line()));
        }
        let entered = entered.trim_end_matches(['\n', '\r']);

        match entered.trim() {
            ":q" | ":quit" => return Ok(Ending::Stopped(engine.current_line())),
            ":s" | ":skip" => {
                if engine.skip() == Outcome::Finished {
                    break;
                }
                engine.sync(&mut field);
            }
            ":b" | ":back" => {
                engine.previous();
                engine.sync(&mut field);
            }
            _ => {
                let before = engine.current_line();
                if type_line(&mut engine, &mut field, entered) == Outcome::Finished {
                    break;
                }
                if engine.current_line() == before {
                    writeln!(out, "       (incomplete, try again)")?;
                    field.clear();
                    engine.poll(&mut field);
                }
            }
        }
    }

    write_stats(out, &engine.stats())?;
    Ok(Ending::Finished)
}

/// Feeds `entered` one character at a time; Enter confirms a complete line.
fn type_line(engine: &mut TypingEngine, field: &mut String, entered: &str) -> Outcome {
    let mut outcome = Outcome::Ignored;
    for c in entered.chars() {
        field.push(c);
        outcome = engine.poll(field);
        if outcome == Outcome::Finished {
            return outcome;
        }
    }

    if matches!(outcome, Outcome::LineComplete) || engine.is_line_complete() {
        outcome = engine.confirm();
        engine.sync(field);
    }
    outcome
}

fn write_stats(out: &mut impl Write, stats: &TypingStats) -> std::io::Result<()> {
    writeln!(
        out,
        "{} cpm, {} wpm, {}% accuracy, {} errors, {} corrections",
        stats.cpm, stats.wpm, stats.accuracy, stats.error_count, stats.correction_count
    )
}
