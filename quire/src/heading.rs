//! Heuristic heading detection for a single line of text.
//!
//! Detection order, first match wins:
//!
//! 1. Markdown ATX heading (`#` to `######` followed by whitespace)
//! 2. Lines that look like code or markup are never headings
//! 3. Indented short line: level grows with the indentation
//! 4. Numeric hierarchy (`1.2.3 Title`): level is the number of segments
//! 5. Chapter/part markers (`Chapter 3`, `Part II`, `제 2 장`, `第3章`)
//! 6. Short line starting with an uppercase letter or digit
//!
//! False positives on plain prose are expected.

use std::sync::LazyLock;

use regex::Regex;

/// Headings are shorter than this many characters
const MAX_HEADING_CHARS: usize = 50;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid markdown heading regex"));

static NUMERIC_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)*)\s+(.+)$").expect("valid numeric heading regex")
});

static CHAPTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(제\s*[0-9]+\s*[장부]|第\s*[0-9]+\s*[章部篇]|(?:chapter|part|section)(?:\s*[0-9]+|\s+([ivxlcdm]+)\b))",
    )
    .expect("valid chapter marker regex")
});

static ROMAN_NUMERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^M{0,3}(?:CM|CD|D?C{0,3})(?:XC|XL|L?X{0,3})(?:IX|IV|V?I{0,3})$")
        .expect("valid roman numeral regex")
});

static CLOSING_HASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+#+\s*$").expect("valid closing hashes regex"));

const CODE_KEYWORDS: [&str; 7] = [
    "function(",
    "function ",
    "var ",
    "let ",
    "const ",
    "import ",
    "export ",
];

/// Returns the heading level of `line`, or 0 if it is not a heading.
///
/// ```rust
/// use quire::detect_heading_level;
///
/// assert_eq!(detect_heading_level("# Title"), 1);
/// assert_eq!(detect_heading_level("1.2 Scope"), 2);
/// assert_eq!(detect_heading_level("Part 1"), 1);
/// assert_eq!(detect_heading_level("Chapter 3"), 2);
/// assert_eq!(detect_heading_level("const x = {}"), 0);
/// ```
pub fn detect_heading_level(line: &str) -> usize {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return 0;
    }

    if let Some(captures) = MARKDOWN_HEADING.captures(line) {
        return captures[1].len();
    }

    if looks_like_code(line) {
        return 0;
    }

    if let Some((indent, rest)) = split_indent(line) {
        let level = indent.div_ceil(2);
        return if rest.chars().count() < MAX_HEADING_CHARS && !rest.ends_with('.') {
            level + 1
        } else {
            0
        };
    }

    if let Some(captures) = NUMERIC_HEADING.captures(line) {
        return captures[1].matches('.').count() + 1;
    }

    if let Some(captures) = CHAPTER_MARKER.captures(line) {
        let numbered = captures
            .get(2)
            .is_none_or(|numeral| is_chapter_numeral(numeral.as_str(), &line[numeral.end()..]));
        if numbered {
            let marker = captures[1].to_lowercase();
            let is_part = marker.starts_with("part") || marker.contains(['부', '部', '篇']);
            return if is_part { 1 } else { 2 };
        }
    }

    let starts_capitalized = line
        .chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit());

    if starts_capitalized
        && line.chars().count() < MAX_HEADING_CHARS
        && !line.ends_with('.')
        && !line.contains(['=', ':', ';'])
    {
        return 1;
    }

    0
}

/// Roman chapter numbers must be well formed, and lowercase ones must stand
/// alone (`chapter iv`, `part ii.`) so words like "mid" or "civil" are not
/// taken for numbers.
fn is_chapter_numeral(numeral: &str, rest: &str) -> bool {
    if numeral.is_empty() || !ROMAN_NUMERAL.is_match(numeral) {
        return false;
    }
    let rest = rest.trim_start();
    numeral.chars().all(|c| c.is_ascii_uppercase()) || rest.is_empty() || rest.starts_with(['.', ':'])
}

/// Strips the structural marker detected for `line` and returns the title.
pub fn clean_title(line: &str, level: usize) -> String {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if level == 0 {
        return line.trim().to_string();
    }

    let title = if let Some(captures) = MARKDOWN_HEADING.captures(line) {
        CLOSING_HASHES.replace(&captures[2], "").trim().to_string()
    } else if let Some((_, rest)) = split_indent(line) {
        rest.trim().to_string()
    } else if let Some(captures) = NUMERIC_HEADING.captures(line) {
        captures[2].trim().to_string()
    } else {
        line.trim().to_string()
    };

    title.replace("**", "")
}

/// Lines containing braces, tags, programming keywords or inline stylesheet
/// fragments.
pub fn looks_like_code(line: &str) -> bool {
    (line.contains('{') && line.contains('}'))
        || (line.contains('<') && line.contains('>'))
        || CODE_KEYWORDS.iter().any(|keyword| line.contains(keyword))
        || (line.contains("html") && line.contains("body") && line.contains("height"))
}

/// Splits leading whitespace off an indented line: `(indent width, rest)`.
fn split_indent(line: &str) -> Option<(usize, &str)> {
    let rest = line.trim_start();
    if rest.len() == line.len() || rest.is_empty() {
        return None;
    }
    let indent = line[..line.len() - rest.len()].chars().count();
    Some((indent, rest))
}

/// Surrounds detected headings with blank lines.
///
/// Code-looking lines pass through untouched. Useful to make structure visible
/// in pasted text before extracting a table of contents from it.
pub fn format_text_with_headings(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut formatted: Vec<&str> = Vec::with_capacity(lines.len());
    let mut previous_was_heading = false;

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            formatted.push("");
            previous_was_heading = false;
            continue;
        }

        if looks_like_code(line) || detect_heading_level(line) == 0 {
            formatted.push(line);
            previous_was_heading = false;
            continue;
        }

        if !previous_was_heading && formatted.last().is_some_and(|last| !last.is_empty()) {
            formatted.push("");
        }
        formatted.push(line);
        if lines
            .get(index + 1)
            .is_some_and(|next| !next.trim().is_empty())
        {
            formatted.push("");
        }
        previous_was_heading = true;
    }

    formatted.join("\n")
}
