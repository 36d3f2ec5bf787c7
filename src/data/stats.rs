// ============================================================
// Layer 4 — Corpus Statistics
// ============================================================
// Readiness checks run on the cleaned corpus before training:
//   - word count statistics per chunk
//   - chunks outside the expected length range
//   - exact duplicate chunks (e.g. a preface repeated across
//     collections)
//   - snippets for eyeballing the cleaning result

use std::collections::HashMap;

use crate::domain::chunk::TextChunk;

#[derive(Debug, Clone, PartialEq)]
pub struct WordStats {
    pub total_chunks: usize,
    pub avg_words:    f64,
    pub min_words:    usize,
    pub max_words:    usize,
}

impl WordStats {
    /// `None` for an empty corpus
    pub fn compute(chunks: &[TextChunk]) -> Option<Self> {
        let counts: Vec<usize> = chunks.iter().map(TextChunk::word_count).collect();
        let min_words = *counts.iter().min()?;
        let max_words = *counts.iter().max()?;
        let total: usize = counts.iter().sum();

        Some(Self {
            total_chunks: counts.len(),
            avg_words: total as f64 / counts.len() as f64,
            min_words,
            max_words,
        })
    }
}

/// A chunk text that occurs more than once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub text:  String,
    pub count: usize,
}

/// Exact duplicates, ordered by first occurrence
pub fn find_duplicates(chunks: &[TextChunk]) -> Vec<Duplicate> {
    // text → (first index, count)
    let mut seen: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, chunk) in chunks.iter().enumerate() {
        seen.entry(chunk.text.as_str()).or_insert((i, 0)).1 += 1;
    }

    let mut dups: Vec<(usize, Duplicate)> = seen
        .into_iter()
        .filter(|(_, (_, count))| *count > 1)
        .map(|(text, (first, count))| (first, Duplicate { text: text.to_string(), count }))
        .collect();
    dups.sort_by_key(|(first, _)| *first);
    dups.into_iter().map(|(_, d)| d).collect()
}

/// Number of chunks with fewer than `min` or more than `max` words
pub fn count_out_of_range(chunks: &[TextChunk], min: usize, max: usize) -> usize {
    chunks
        .iter()
        .map(TextChunk::word_count)
        .filter(|&n| n < min || n > max)
        .count()
}

/// First `max_chars` characters with newlines flattened
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> TextChunk {
        TextChunk::new(id, text)
    }

    #[test]
    fn test_word_stats() {
        let chunks = [chunk("a_0", "one two three"), chunk("a_1", "four"), chunk("a_2", "five six")];
        let stats  = WordStats::compute(&chunks).unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.min_words, 1);
        assert_eq!(stats.max_words, 3);
        assert!((stats.avg_words - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_corpus_has_no_stats() {
        assert!(WordStats::compute(&[]).is_none());
    }

    #[test]
    fn test_duplicates_in_first_occurrence_order() {
        let chunks = [
            chunk("a_0", "unique"),
            chunk("a_1", "preface"),
            chunk("b_0", "colophon"),
            chunk("b_1", "colophon"),
            chunk("c_0", "preface"),
            chunk("c_1", "colophon"),
        ];
        let dups = find_duplicates(&chunks);
        assert_eq!(
            dups,
            [
                Duplicate { text: "preface".into(),  count: 2 },
                Duplicate { text: "colophon".into(), count: 3 },
            ]
        );
    }

    #[test]
    fn test_out_of_range() {
        let chunks = [chunk("a_0", "a b"), chunk("a_1", "a b c"), chunk("a_2", "a b c d e")];
        assert_eq!(count_out_of_range(&chunks, 3, 4), 2);
    }

    #[test]
    fn test_snippet_truncates_by_chars_and_flattens_newlines() {
        assert_eq!(snippet("Baker\nStreet", 100), "Baker Street");
        assert_eq!(snippet("ééééé", 3), "ééé");
    }
}
