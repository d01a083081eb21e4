//! Annotation records and the per-article annotation store

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::taxonomy::{Category, Taxonomy, NO_POLARIZING_SUBCATEGORY, NO_POLARIZING_TEXT};
use crate::{Error, Result};

/// One classified span (or the "no polarizing language" sentinel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub article_title: String,
    pub text: String,
    pub category: Category,
    pub subcategory: String,
}

impl AnnotationRecord {
    /// Record for a highlighted span; the text is stored trimmed
    pub fn span(
        article_title: impl Into<String>,
        text: &str,
        category: Category,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            article_title: article_title.into(),
            text: text.trim().to_string(),
            category,
            subcategory: subcategory.into(),
        }
    }

    /// Sentinel record stating the article has no polarizing language
    pub fn no_polarizing_language(article_title: impl Into<String>) -> Self {
        Self {
            article_title: article_title.into(),
            text: NO_POLARIZING_TEXT.to_string(),
            category: Category::NoPolarizingLanguage,
            subcategory: NO_POLARIZING_SUBCATEGORY.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.category.is_sentinel()
    }

    /// Category and subcategory both present and drawn from the taxonomy
    pub fn is_complete(&self, taxonomy: &Taxonomy) -> bool {
        !self.subcategory.trim().is_empty() && taxonomy.contains(self.category, &self.subcategory)
    }
}

/// Article id → annotation records in insertion (display) order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationStore {
    by_article: BTreeMap<u32, Vec<AnnotationRecord>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to an article's list, returning its index
    pub fn append(&mut self, article_id: u32, record: AnnotationRecord) -> usize {
        let records = self.by_article.entry(article_id).or_default();
        records.push(record);
        records.len() - 1
    }

    /// Remove the record at `index`, shifting later records down
    pub fn remove(&mut self, article_id: u32, index: usize) -> Result<AnnotationRecord> {
        let len = self.count(article_id);
        match self.by_article.get_mut(&article_id) {
            Some(records) if index < records.len() => Ok(records.remove(index)),
            _ => Err(Error::IndexOutOfRange {
                article_id,
                index,
                len,
            }),
        }
    }

    /// Records for an article (empty if none)
    pub fn get(&self, article_id: u32) -> &[AnnotationRecord] {
        self.by_article
            .get(&article_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, article_id: u32) -> usize {
        self.get(article_id).len()
    }

    pub fn total(&self) -> usize {
        self.by_article.values().map(Vec::len).sum()
    }

    pub fn as_map(&self) -> &BTreeMap<u32, Vec<AnnotationRecord>> {
        &self.by_article
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> AnnotationRecord {
        AnnotationRecord::span("Title", text, Category::InflammatoryLanguage, "Hyperbole")
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut store = AnnotationStore::new();
        assert_eq!(store.append(7, record("first")), 0);
        assert_eq!(store.append(7, record("second")), 1);
        assert_eq!(store.append(9, record("other")), 0);

        let texts: Vec<&str> = store.get(7).iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(store.total(), 3);
    }

    #[test]
    fn test_remove_index_zero_shifts_remaining() {
        let mut store = AnnotationStore::new();
        store.append(1, record("a"));
        store.append(1, record("b"));

        let removed = store.remove(1, 0).unwrap();
        assert_eq!(removed.text, "a");
        assert_eq!(store.get(1), &[record("b")]);
    }

    #[test]
    fn test_remove_out_of_range_is_rejected() {
        let mut store = AnnotationStore::new();
        store.append(1, record("a"));

        let err = store.remove(1, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexOutOfRange { article_id: 1, index: 1, len: 1 }
        ));
        assert_eq!(store.count(1), 1);

        assert!(matches!(
            store.remove(2, 0),
            Err(Error::IndexOutOfRange { len: 0, .. })
        ));
    }

    #[test]
    fn test_span_text_is_trimmed() {
        assert_eq!(record("  padded span \n").text, "padded span");
    }

    #[test]
    fn test_sentinel_record_shape() {
        let sentinel = AnnotationRecord::no_polarizing_language("Headline");
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.text, "no polarizing language selected");
        assert_eq!(sentinel.subcategory, "no polarizing language");
        assert!(sentinel.is_complete(&Taxonomy::default()));
    }

    #[test]
    fn test_incomplete_records_detected() {
        let taxonomy = Taxonomy::default();
        let mut r = record("x");
        assert!(r.is_complete(&taxonomy));
        r.subcategory = String::new();
        assert!(!r.is_complete(&taxonomy));
        r.subcategory = "Slogans".to_string();
        assert!(!r.is_complete(&taxonomy));
    }

    #[test]
    fn test_serializes_as_article_keyed_map() {
        let mut store = AnnotationStore::new();
        store.append(3, AnnotationRecord::no_polarizing_language("T"));
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["3"][0]["articleTitle"], "T");
        assert_eq!(json["3"][0]["category"], "No_Polarizing_Language");
    }
}
