//! Tagged description corpus.
//!
//! The corpus is a plain-text file with one book per line: a quoted ISBN-13
//! followed by the free-text description, e.g.
//! `"9780747532699" A young wizard discovers his destiny.`
//! Each non-empty line is one atomic document for the embedding index.

use std::path::Path;

/// One corpus line, content kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicDocument {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus at {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// In-memory copy of the corpus text. Documents are produced lazily from it,
/// so iteration is restartable without re-reading the file.
pub struct TaggedCorpus {
    text: String,
}

impl TaggedCorpus {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        Ok(TaggedCorpus { text })
    }

    #[cfg(test)]
    pub fn from_text(text: &str) -> Self {
        TaggedCorpus {
            text: text.to_string(),
        }
    }

    /// Iterate over documents, one per non-empty line, in file order.
    pub fn documents(&self) -> impl Iterator<Item = AtomicDocument> + '_ {
        self.text
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| AtomicDocument {
                content: line.to_string(),
            })
    }
}

/// Why a document was excluded from identifier recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No token at all (blank or whitespace-only content).
    MissingToken,
    /// The leading token did not parse as an integer.
    NonNumericToken,
}

/// Outcome of recovering the ISBN tag from a document.
///
/// Skips are expected for malformed corpus rows and are never errors; the
/// caller drops the document from the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagParse {
    Isbn(i64),
    Skip(SkipReason),
}

/// Recover the leading ISBN-13 from a document's content.
///
/// Strips a single leading and trailing quote if present (the corpus stores
/// each line as one CSV-quoted field), then parses the first
/// whitespace-separated token as an integer.
pub fn recover_isbn(content: &str) -> TagParse {
    let unquoted = content.strip_prefix('"').unwrap_or(content);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);

    let Some(token) = unquoted.split_whitespace().next() else {
        return TagParse::Skip(SkipReason::MissingToken);
    };

    match token.parse::<i64>() {
        Ok(isbn) => TagParse::Isbn(isbn),
        Err(_) => TagParse::Skip(SkipReason::NonNumericToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_documents_skip_empty_lines() {
        let corpus = TaggedCorpus::from_text(
            "\"9780000000001\" first book\n\n\"9780000000002\" second book\n",
        );

        let docs: Vec<_> = corpus.documents().collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "\"9780000000001\" first book");
        assert_eq!(docs[1].content, "\"9780000000002\" second book");
    }

    #[test]
    fn test_documents_preserve_content_verbatim() {
        let corpus = TaggedCorpus::from_text("  padded   line with   spaces  \n");
        let docs: Vec<_> = corpus.documents().collect();
        assert_eq!(docs[0].content, "  padded   line with   spaces  ");
    }

    #[test]
    fn test_documents_restartable() {
        let corpus = TaggedCorpus::from_text("\"1\" a\n\"2\" b\n");
        let first: Vec<_> = corpus.documents().collect();
        let second: Vec<_> = corpus.documents().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_missing_file() {
        let result = TaggedCorpus::load("/nonexistent/tagged_descriptions.txt");
        assert!(matches!(result, Err(CorpusError::Unreadable { .. })));
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"9780747532699\" A young wizard discovers his destiny.").unwrap();
        file.flush().unwrap();

        let corpus = TaggedCorpus::load(file.path()).unwrap();
        assert_eq!(corpus.documents().count(), 1);
    }

    #[test]
    fn test_recover_isbn_quoted_line() {
        let parsed = recover_isbn("\"9780747532699\" A young wizard discovers his destiny.\"");
        assert_eq!(parsed, TagParse::Isbn(9780747532699));
    }

    #[test]
    fn test_recover_isbn_csv_quoted_field() {
        // pandas-style quoting wraps the entire line in one pair of quotes
        let parsed = recover_isbn("\"9780747532699 A young wizard discovers his destiny.\"");
        assert_eq!(parsed, TagParse::Isbn(9780747532699));
    }

    #[test]
    fn test_recover_isbn_unquoted() {
        let parsed = recover_isbn("9780000000001 plain tagged line");
        assert_eq!(parsed, TagParse::Isbn(9780000000001));
    }

    #[test]
    fn test_recover_isbn_non_numeric() {
        let parsed = recover_isbn("notanisbn some description");
        assert_eq!(parsed, TagParse::Skip(SkipReason::NonNumericToken));
    }

    #[test]
    fn test_recover_isbn_whitespace_only() {
        let parsed = recover_isbn("   ");
        assert_eq!(parsed, TagParse::Skip(SkipReason::MissingToken));
    }

    #[test]
    fn test_recover_isbn_empty() {
        let parsed = recover_isbn("");
        assert_eq!(parsed, TagParse::Skip(SkipReason::MissingToken));
    }
}
