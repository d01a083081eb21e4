//! Text selection tracking
//!
//! Derives the trimmed text and word count of the worker's current
//! selection and checks it against the acceptable length window. Every
//! observation also updates a live word-count channel so the page can show
//! feedback before a category is chosen.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::text::count_words;
use crate::{Error, Result};

/// Default minimum words in an annotated span
pub const DEFAULT_MIN_WORDS: usize = 4;

/// Default maximum words in an annotated span
pub const DEFAULT_MAX_WORDS: usize = 25;

/// Inclusive word-count window for annotated spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionBounds {
    pub min_words: usize,
    pub max_words: usize,
}

impl SelectionBounds {
    pub fn new(min_words: usize, max_words: usize) -> Result<Self> {
        if min_words > max_words {
            return Err(Error::Config(format!(
                "min_words ({}) must not exceed max_words ({})",
                min_words, max_words
            )));
        }
        Ok(Self {
            min_words,
            max_words,
        })
    }

    pub fn is_within_bounds(&self, count: usize) -> bool {
        self.min_words <= count && count <= self.max_words
    }
}

impl Default for SelectionBounds {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

/// A non-empty, trimmed selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub text: String,
    pub word_count: usize,
}

/// Tracks the current selection and publishes its live word count
#[derive(Debug)]
pub struct SelectionTracker {
    bounds: SelectionBounds,
    current: Option<Selection>,
    live_count: watch::Sender<usize>,
}

impl SelectionTracker {
    pub fn new(bounds: SelectionBounds) -> Self {
        let (live_count, _) = watch::channel(0);
        Self {
            bounds,
            current: None,
            live_count,
        }
    }

    pub fn bounds(&self) -> SelectionBounds {
        self.bounds
    }

    /// Record a raw selection from the page
    ///
    /// An empty or whitespace-only selection counts as nothing selected.
    pub fn observe(&mut self, raw: &str) -> Option<&Selection> {
        let text = raw.trim();
        let word_count = count_words(text);
        self.live_count.send_replace(word_count);

        self.current = if text.is_empty() {
            None
        } else {
            Some(Selection {
                text: text.to_string(),
                word_count,
            })
        };
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Word count of the current selection (0 when nothing is selected)
    pub fn word_count(&self) -> usize {
        self.current.as_ref().map_or(0, |s| s.word_count)
    }

    pub fn is_within_bounds(&self, count: usize) -> bool {
        self.bounds.is_within_bounds(count)
    }

    /// Whether the current selection may be annotated
    pub fn current_is_within_bounds(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| self.bounds.is_within_bounds(s.word_count))
    }

    /// Forget the current selection and reset the live count
    pub fn clear(&mut self) {
        self.current = None;
        self.live_count.send_replace(0);
    }

    /// Subscribe to live word-count updates
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.live_count.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        let bounds = SelectionBounds::default();
        for count in 0..40 {
            assert_eq!(bounds.is_within_bounds(count), (4..=25).contains(&count), "count {count}");
        }
    }

    #[test]
    fn test_bounds_reject_inverted_window() {
        assert!(SelectionBounds::new(10, 3).is_err());
        assert!(SelectionBounds::new(3, 3).is_ok());
    }

    #[test]
    fn test_observe_trims_and_counts() {
        let mut tracker = SelectionTracker::new(SelectionBounds::default());
        let selection = tracker.observe("  the quick  brown fox \n").unwrap().clone();
        assert_eq!(selection.text, "the quick  brown fox");
        assert_eq!(selection.word_count, 4);
        assert!(tracker.current_is_within_bounds());
    }

    #[test]
    fn test_empty_selection_is_nothing_selected() {
        let mut tracker = SelectionTracker::new(SelectionBounds::default());
        tracker.observe("one two three four");
        assert!(tracker.observe("   ").is_none());
        assert_eq!(tracker.word_count(), 0);
        assert!(!tracker.current_is_within_bounds());
    }

    #[test]
    fn test_live_count_updates_on_every_observation() {
        let mut tracker = SelectionTracker::new(SelectionBounds::default());
        let rx = tracker.subscribe();

        tracker.observe("one two");
        assert_eq!(*rx.borrow(), 2);

        tracker.observe("a b c d e f g h i j k l m n o p q r s t u v w x y z");
        assert_eq!(*rx.borrow(), 26);
        assert!(!tracker.current_is_within_bounds());

        tracker.clear();
        assert_eq!(*rx.borrow(), 0);
    }
}
