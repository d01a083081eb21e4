//! Scoring model annotations against the gold standard
//!
//! Each model annotation claims at most one unused gold span. A claim needs
//! [`MIN_SHARED_TOKENS`](crate::spans::MIN_SHARED_TOKENS) shared tokens and
//! identical category and subcategory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::{read_nonempty, GoldStandard};
use crate::error::{GoldError, Result};
use crate::spans::shares_tokens;

/// Annotation produced by a language model
///
/// Labels are kept as free strings; a label outside the taxonomy simply
/// never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAnnotation {
    pub text: String,
    pub category: String,
    pub subcategory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub correct_matches: usize,
    pub total_llm: usize,
    pub total_gold: usize,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Greedy one-to-one matching in input order
pub fn compare(model: &[ModelAnnotation], gold: &GoldStandard) -> ComparisonReport {
    let gold_spans: Vec<_> = gold.values().flatten().collect();
    let mut used = vec![false; gold_spans.len()];
    let mut correct = 0;

    for annotation in model {
        let hit = gold_spans.iter().enumerate().position(|(i, g)| {
            !used[i]
                && shares_tokens(&annotation.text, &g.text)
                && annotation.category == g.category.as_str()
                && annotation.subcategory == g.subcategory
        });
        if let Some(i) = hit {
            used[i] = true;
            correct += 1;
        }
    }

    let precision = ratio(correct, model.len());
    let recall = ratio(correct, gold_spans.len());
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ComparisonReport {
        precision: round3(precision),
        recall: round3(recall),
        f1: round3(f1),
        correct_matches: correct,
        total_llm: model.len(),
        total_gold: gold_spans.len(),
    }
}

/// Load model annotations from a JSON array or a CSV with
/// `text,category,subcategory` headers (chosen by the `.csv` extension)
pub fn load_model_annotations(path: &Path) -> Result<Vec<ModelAnnotation>> {
    let content = read_nonempty(path)?;

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
        let csv_err = |source| GoldError::Csv {
            path: path.to_path_buf(),
            source,
        };
        return csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
            .deserialize()
            .collect::<std::result::Result<Vec<ModelAnnotation>, csv::Error>>()
            .map_err(csv_err);
    }

    serde_json::from_str(&content).map_err(|source| GoldError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a gold standard written by the `aggregate` command
pub fn load_gold_standard(path: &Path) -> Result<GoldStandard> {
    let content = read_nonempty(path)?;
    serde_json::from_str(&content).map_err(|source| GoldError::Json {
        path: path.to_path_buf(),
        source,
    })
}
