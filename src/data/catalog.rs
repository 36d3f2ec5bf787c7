// ============================================================
// Layer 4 — Book Catalogue
// ============================================================
// The Sherlock Holmes canon on Project Gutenberg: four novels
// and five short-story collections. The name doubles as the
// raw file stem (`data/raw/<name>.txt`) and chunk id prefix.

/// A downloadable book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    pub name:        &'static str,
    pub gutenberg_id: u32,
}

impl Book {
    /// Plain-text UTF-8 URL on the Gutenberg cache mirror
    pub fn url(&self) -> String {
        format!(
            "https://www.gutenberg.org/cache/epub/{id}/pg{id}.txt",
            id = self.gutenberg_id
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.name)
    }
}

pub const SHERLOCK_HOLMES: &[Book] = &[
    Book { name: "study_in_scarlet",   gutenberg_id: 244 },
    Book { name: "sign_of_four",       gutenberg_id: 2097 },
    Book { name: "hound_baskervilles", gutenberg_id: 2852 },
    Book { name: "valley_of_fear",     gutenberg_id: 3289 },
    Book { name: "adventures",         gutenberg_id: 1661 },
    Book { name: "memoirs",            gutenberg_id: 834 },
    Book { name: "return",             gutenberg_id: 221 },
    Book { name: "his_last_bow",       gutenberg_id: 2350 },
    Book { name: "casebook",           gutenberg_id: 69700 },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_url_format() {
        let book = SHERLOCK_HOLMES[0];
        assert_eq!(book.url(), "https://www.gutenberg.org/cache/epub/244/pg244.txt");
        assert_eq!(book.file_name(), "study_in_scarlet.txt");
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = SHERLOCK_HOLMES.iter().map(|b| b.name).collect();
        assert_eq!(names.len(), SHERLOCK_HOLMES.len());
    }
}
