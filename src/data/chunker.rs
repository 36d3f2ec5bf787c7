// ============================================================
// Layer 4 — Text Chunker
// ============================================================
// Splits a cleaned book into overlapping windows of words.
//
// Sliding window with overlap:
//   - Each window holds up to `max_words` words
//   - The next window starts `max_words - overlap` words later,
//     so adjacent windows share `overlap` words of context
//   - Windows shorter than `min_words` are dropped; in practice
//     only the tail of a book can be that short
//
// Example with max_words=5, overlap=2, min_words=2:
//   Document: "A B C D E F G H I J"
//   Chunk 1:  "A B C D E"          (words 0-4)
//   Chunk 2:  "D E F G H"          (words 3-7)
//   Chunk 3:  "G H I J"            (words 6-9)
//   Window 4 would be "J" — 1 word < min_words, dropped
//
// The stride (step between chunks) = max_words - overlap

pub struct Chunker {
    /// Upper bound on words per chunk
    max_words: usize,
    /// Number of words shared between adjacent chunks
    overlap: usize,
    /// Chunks with fewer words than this are discarded
    min_words: usize,
}

impl Chunker {
    /// Create a new Chunker.
    ///
    /// # Panics
    /// Panics if overlap >= max_words, because the window would
    /// never advance.
    pub fn new(max_words: usize, overlap: usize, min_words: usize) -> Self {
        assert!(
            overlap < max_words,
            "overlap ({}) must be less than max_words ({})",
            overlap,
            max_words
        );
        Self { max_words, overlap, min_words }
    }

    /// Split text into overlapping word-level chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let stride = self.max_words - self.overlap;

        let mut chunks = Vec::new();
        let mut start  = 0usize;

        while start < words.len() {
            let end = (start + self.max_words).min(words.len());
            if end - start >= self.min_words {
                chunks.push(words[start..end].join(" "));
            }
            start += stride;
        }

        chunks
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_basic_chunking() {
        let c      = Chunker::new(5, 2, 2);
        let chunks = c.chunk("A B C D E F G H I J");
        assert_eq!(chunks, ["A B C D E", "D E F G H", "G H I J"]);
    }

    #[test]
    fn test_overlap_is_correct() {
        let c      = Chunker::new(4, 2, 1);
        let chunks = c.chunk("a b c d e f");
        // stride 2: a b c d | c d e f | e f
        assert_eq!(chunks[0], "a b c d");
        assert_eq!(chunks[1], "c d e f");
        assert_eq!(chunks[2], "e f");
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_default_book_sized_text() {
        // 250 words: windows at 0 and 180; the second has 70 words
        let chunks = Chunker::new(200, 20, 30).chunk(&words(250));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 200);
        assert_eq!(chunks[1].split_whitespace().count(), 70);
        assert!(chunks[1].starts_with("w180 "));
    }

    #[test]
    fn test_short_tail_is_dropped() {
        // 200 words: second window starts at 180 and holds only 20 words
        let chunks = Chunker::new(200, 20, 30).chunk(&words(200));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_text_below_min_words_gives_no_chunks() {
        let chunks = Chunker::new(200, 20, 30).chunk("just a few words");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_empty_text_gives_no_chunks() {
        let c = Chunker::new(5, 2, 1);
        assert!(c.chunk("").is_empty());
    }

    #[test]
    #[should_panic]
    fn test_overlap_must_be_less_than_max_words() {
        let _ = Chunker::new(5, 5, 1);
    }
}
