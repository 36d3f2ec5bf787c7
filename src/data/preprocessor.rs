// ============================================================
// Layer 4 — Gutenberg Text Cleaner
// ============================================================
// Strips the Project Gutenberg licence header and footer from a
// raw book and flattens the story into a single line of words.
//
// Cleaning steps (applied in order):
//   1. Normalise line endings; map BOM / zero-width space to space
//   2. Keep only the text between the START and END markers:
//        *** START OF THE PROJECT GUTENBERG EBOOK ... ***
//        *** END OF THE PROJECT GUTENBERG EBOOK ... ***
//      Markers vary between releases ("THE"/"THIS", spacing,
//      case) so the patterns are loose. Without both markers
//      we keep the middle 80% of the characters.
//   3. Remove underscores (Gutenberg's italics), collapse all
//      whitespace runs to one space, trim
//   4. Drop table-of-contents openers ("Contents I.")
//
// Paragraph breaks are not preserved: the chunker works on
// words, not lines.

use regex::Regex;
use std::sync::LazyLock;

static START_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\*\*\*\s*START\s+OF\s+(?:THE|THIS)\s+PROJECT\s+GUTENBERG\s+EBOOK.*?\*\*\*")
        .expect("Invalid start marker regex")
});

static END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\*\*\*\s*END\s+OF\s+(?:THE|THIS)\s+PROJECT\s+GUTENBERG\s+EBOOK.*?\*\*\*")
        .expect("Invalid end marker regex")
});

static UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("Invalid underscore regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

static CONTENTS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contents\s+I\.").expect("Invalid contents regex"));

/// How the story body was located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    Markers,
    MiddleFallback,
}

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw Gutenberg book down to its story text, reporting
    /// how the body was found.
    pub fn clean_with_report(&self, text: &str) -> (String, Extraction) {
        let normalised = normalise_chars(text);

        let (story, extraction) = match extract_between_markers(&normalised) {
            Some(body) => {
                tracing::debug!("Found Gutenberg markers, extracted {} characters", body.len());
                (body, Extraction::Markers)
            }
            None => {
                tracing::debug!("Could not find START/END markers, using middle 80% fallback");
                (middle_fraction(&normalised), Extraction::MiddleFallback)
            }
        };

        let story = UNDERSCORES.replace_all(story, "");
        let story = WHITESPACE.replace_all(&story, " ");
        let story = story.trim();
        let story = CONTENTS_HEADER.replace_all(story, "");

        (story.into_owned(), extraction)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn normalise_chars(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\r' => '\n',
            '\u{FEFF}' | '\u{200B}' => ' ',
            c => c,
        })
        .collect()
}

/// Trimmed text between the end of the START marker and the start of
/// the END marker. An END marker that precedes START yields "".
fn extract_between_markers(text: &str) -> Option<&str> {
    let start = START_MARKER.find(text)?;
    let end   = END_MARKER.find(text)?;
    if end.start() <= start.end() {
        return Some("");
    }
    Some(text[start.end()..end.start()].trim())
}

/// Characters in `[⌊0.1n⌋, ⌊0.9n⌋)`, counted in chars not bytes
fn middle_fraction(text: &str) -> &str {
    let n     = text.chars().count();
    let from  = n / 10;
    let to    = n * 9 / 10;
    let byte_at = |char_idx: usize| {
        text.char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(text.len())
    };
    &text[byte_at(from)..byte_at(to)]
}
