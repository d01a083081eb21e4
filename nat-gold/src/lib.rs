//! # Gold-standard analysis
//!
//! Offline tools run against exported annotation sessions:
//! - Aggregate worker spans into a per-article gold standard
//! - Score model annotations against that gold standard

pub mod aggregate;
pub mod compare;
pub mod error;
pub mod spans;

pub use aggregate::{build_gold_standard, collect_spans, load_submissions, GoldSpan, GoldStandard};
pub use compare::{compare, ComparisonReport, ModelAnnotation};
pub use error::{GoldError, Result};
