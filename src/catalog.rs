//! Book metadata table.
//!
//! Loaded once at startup from the cleaned catalog CSV and treated as
//! read-only afterwards. Emotion scores and simple categories are precomputed
//! columns of the source table, not derived here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Query suffix turning a Google Books thumbnail into its large variant.
pub const LARGE_THUMBNAIL_SUFFIX: &str = "&fife=w800";
/// Sentinel cover shown when a record has no thumbnail.
pub const MISSING_COVER: &str = "cover-not-found.jpg";
/// Category sentinel meaning "no filtering".
pub const CATEGORY_ALL: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub joy: f32,
    pub surprise: f32,
    pub anger: f32,
    pub fear: f32,
    pub sadness: f32,
}

/// Emotional dimension used to re-rank already-filtered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Happy,
    Surprising,
    Angry,
    Suspenseful,
    Sad,
}

impl Tone {
    /// Lenient parse; returns None for "All", empty, or unrecognized values,
    /// which all mean "no re-ranking".
    pub fn parse(value: &str) -> Option<Tone> {
        match value.trim().to_lowercase().as_str() {
            "happy" => Some(Tone::Happy),
            "surprising" => Some(Tone::Surprising),
            "angry" => Some(Tone::Angry),
            "suspenseful" => Some(Tone::Suspenseful),
            "sad" => Some(Tone::Sad),
            _ => None,
        }
    }

    /// The single emotion score this tone ranks by.
    pub fn score(&self, emotions: &EmotionScores) -> f32 {
        match self {
            Tone::Happy => emotions.joy,
            Tone::Surprising => emotions.surprise,
            Tone::Angry => emotions.anger,
            Tone::Suspenseful => emotions.fear,
            Tone::Sad => emotions.sadness,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRecord {
    pub isbn13: i64,
    pub title: String,
    pub authors: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub large_thumbnail: String,
    pub simple_category: String,
    pub emotions: EmotionScores,
}

/// One raw CSV row; extra columns in the source file are ignored.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    isbn13: i64,
    title_and_subtitle: String,
    authors: String,
    description: String,
    thumbnail: Option<String>,
    simple_categories: String,
    joy: f32,
    surprise: f32,
    anger: f32,
    fear: f32,
    sadness: f32,
}

impl From<CatalogRow> for BookRecord {
    fn from(row: CatalogRow) -> Self {
        let thumbnail = row.thumbnail.filter(|t| !t.trim().is_empty());
        let large_thumbnail = match &thumbnail {
            Some(t) => format!("{t}{LARGE_THUMBNAIL_SUFFIX}"),
            None => MISSING_COVER.to_string(),
        };

        BookRecord {
            isbn13: row.isbn13,
            title: row.title_and_subtitle,
            authors: row.authors,
            description: row.description,
            thumbnail,
            large_thumbnail,
            simple_category: row.simple_categories,
            emotions: EmotionScores {
                joy: row.joy,
                surprise: row.surprise,
                anger: row.anger,
                fear: row.fear,
                sadness: row.sadness,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// In-memory relation keyed by isbn13, in source-file order.
#[derive(Debug, Default)]
pub struct BookCatalog {
    records: Vec<BookRecord>,
    by_isbn: HashMap<i64, usize>,
}

impl BookCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let now = Instant::now();

        let mut reader =
            csv::Reader::from_path(path).map_err(|source| CatalogError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;

        let mut records: Vec<BookRecord> = vec![];
        let mut by_isbn = HashMap::new();

        for (idx, row) in reader.deserialize::<CatalogRow>().enumerate() {
            // header is line 1
            let line = idx + 2;
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    log::warn!("skipping malformed catalog row at line {line}: {err}");
                    continue;
                }
            };

            if by_isbn.contains_key(&row.isbn13) {
                log::warn!(
                    "duplicate isbn13 {} at line {line}, keeping first occurrence",
                    row.isbn13
                );
                continue;
            }

            by_isbn.insert(row.isbn13, records.len());
            records.push(row.into());
        }

        log::debug!(
            "took {}ms to read catalog",
            now.elapsed().as_micros() as f64 / 1000.0
        );
        log::info!("loaded {} book records", records.len());

        Ok(BookCatalog { records, by_isbn })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, isbn13: i64) -> Option<&BookRecord> {
        self.by_isbn.get(&isbn13).map(|&idx| &self.records[idx])
    }

    /// Look up records for the given ids, preserving the order of `isbns`.
    /// Unknown ids are dropped.
    pub fn lookup_by_isbns(&self, isbns: &[i64]) -> Vec<&BookRecord> {
        isbns.iter().filter_map(|&isbn| self.get(isbn)).collect()
    }

    /// Distinct categories in table order, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .records
            .iter()
            .map(|r| r.simple_category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Keep only records whose category equals `category` exactly.
/// The caller is responsible for skipping the call entirely for the
/// "All"/absent sentinel.
pub fn filter_by_category<'a>(
    records: Vec<&'a BookRecord>,
    category: &str,
) -> Vec<&'a BookRecord> {
    records
        .into_iter()
        .filter(|r| r.simple_category == category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "isbn13,title_and_subtitle,authors,description,thumbnail,simple_categories,joy,surprise,anger,fear,sadness";

    fn write_catalog(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_basic() {
        let file = write_catalog(&[
            "9780000000001,First Book,Author One,A story.,http://img/1,Fiction,0.1,0.2,0.3,0.4,0.5",
            "9780000000002,Second Book,Author Two,Another story.,http://img/2,Fantasy,0.9,0.1,0.0,0.2,0.3",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let book = catalog.get(9780000000001).unwrap();
        assert_eq!(book.title, "First Book");
        assert_eq!(book.simple_category, "Fiction");
        assert!((book.emotions.joy - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_large_thumbnail_suffix() {
        let file = write_catalog(&[
            "9780000000001,Book,Author,Desc,http://img/1,Fiction,0,0,0,0,0",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        let book = catalog.get(9780000000001).unwrap();
        assert_eq!(book.large_thumbnail, "http://img/1&fife=w800");
    }

    #[test]
    fn test_missing_thumbnail_sentinel() {
        let file = write_catalog(&["9780000000001,Book,Author,Desc,,Fiction,0,0,0,0,0"]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        let book = catalog.get(9780000000001).unwrap();
        assert_eq!(book.thumbnail, None);
        assert_eq!(book.large_thumbnail, MISSING_COVER);
    }

    #[test]
    fn test_malformed_row_skipped() {
        let file = write_catalog(&[
            "notanisbn,Bad Book,Author,Desc,,Fiction,0,0,0,0,0",
            "9780000000002,Good Book,Author,Desc,,Fiction,0,0,0,0,0",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(9780000000002).is_some());
    }

    #[test]
    fn test_duplicate_isbn_keeps_first() {
        let file = write_catalog(&[
            "9780000000001,First,Author,Desc,,Fiction,0,0,0,0,0",
            "9780000000001,Second,Author,Desc,,Fiction,0,0,0,0,0",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(9780000000001).unwrap().title, "First");
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let result = BookCatalog::load("/nonexistent/books_cleaned.csv");
        assert!(matches!(result, Err(CatalogError::Unreadable { .. })));
    }

    #[test]
    fn test_lookup_preserves_caller_order() {
        let file = write_catalog(&[
            "1,A,Author,Desc,,Fiction,0,0,0,0,0",
            "2,B,Author,Desc,,Fiction,0,0,0,0,0",
            "3,C,Author,Desc,,Fiction,0,0,0,0,0",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        let found = catalog.lookup_by_isbns(&[3, 1, 99, 2]);
        let titles: Vec<_> = found.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_filter_by_category() {
        let file = write_catalog(&[
            "1,A,Author,Desc,,Fiction,0,0,0,0,0",
            "2,B,Author,Desc,,Fantasy,0,0,0,0,0",
            "3,C,Author,Desc,,Fiction,0,0,0,0,0",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        let all = catalog.lookup_by_isbns(&[1, 2, 3]);
        let fiction = filter_by_category(all, "Fiction");
        assert_eq!(fiction.len(), 2);
        assert!(fiction.iter().all(|r| r.simple_category == "Fiction"));
    }

    #[test]
    fn test_categories_sorted_unique() {
        let file = write_catalog(&[
            "1,A,Author,Desc,,Fiction,0,0,0,0,0",
            "2,B,Author,Desc,,Fantasy,0,0,0,0,0",
            "3,C,Author,Desc,,Fiction,0,0,0,0,0",
        ]);

        let catalog = BookCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.categories(), vec!["Fantasy", "Fiction"]);
    }

    #[test]
    fn test_tone_parse() {
        assert_eq!(Tone::parse("Happy"), Some(Tone::Happy));
        assert_eq!(Tone::parse("suspenseful"), Some(Tone::Suspenseful));
        assert_eq!(Tone::parse(" Sad "), Some(Tone::Sad));
        assert_eq!(Tone::parse("All"), None);
        assert_eq!(Tone::parse(""), None);
        assert_eq!(Tone::parse("melancholy"), None);
    }

    #[test]
    fn test_tone_score_mapping() {
        let emotions = EmotionScores {
            joy: 0.1,
            surprise: 0.2,
            anger: 0.3,
            fear: 0.4,
            sadness: 0.5,
        };

        assert_eq!(Tone::Happy.score(&emotions), 0.1);
        assert_eq!(Tone::Surprising.score(&emotions), 0.2);
        assert_eq!(Tone::Angry.score(&emotions), 0.3);
        assert_eq!(Tone::Suspenseful.score(&emotions), 0.4);
        assert_eq!(Tone::Sad.score(&emotions), 0.5);
    }
}
