//! Gold-standard aggregation
//!
//! Worker spans for the same article are grouped greedily: each ungrouped
//! span opens a group and pulls in every later ungrouped span that
//! [`spans_match`] it. Each group becomes one gold span carrying the
//! majority labels and a confidence derived from its supporter count.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use nat_common::payload::SessionPayload;
use nat_common::Category;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GoldError, Result};
use crate::spans::{padded_intersection, spans_match};

/// One worker's classified span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpan {
    pub text: String,
    pub category: Category,
    pub subcategory: String,
    pub worker: String,
}

/// Consensus span for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldSpan {
    pub text: String,
    pub category: Category,
    pub subcategory: String,
    pub confidence: f64,
    pub num_supporters: usize,
    pub label_consistent: bool,
}

/// Article id → consensus spans
pub type GoldStandard = BTreeMap<u32, Vec<GoldSpan>>;

/// Confidence for a group of `supporters` agreeing spans
///
/// Three or more supporters count as full agreement.
pub fn confidence(supporters: usize, label_consistent: bool) -> f64 {
    match supporters {
        n if n >= 3 => 1.0,
        2 if label_consistent => 0.67,
        2 => 0.5,
        _ => 0.33,
    }
}

/// Most frequent item; ties go to the item seen first
fn most_common<T: PartialEq + Clone>(items: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (item, n) in counts {
        if best.as_ref().map_or(true, |(_, top)| n > *top) {
            best = Some((item, n));
        }
    }
    best.map(|(item, _)| item)
}

/// Collect classified spans per article, skipping "no polarizing language" records
///
/// Workers are identified by their MTurk worker id, falling back to the
/// session id for anonymous sessions.
pub fn collect_spans(submissions: &[SessionPayload]) -> BTreeMap<u32, Vec<WorkerSpan>> {
    let mut by_article: BTreeMap<u32, Vec<WorkerSpan>> = BTreeMap::new();

    for payload in submissions {
        let worker = payload
            .worker_id
            .clone()
            .unwrap_or_else(|| payload.session_id.to_string());

        for (article_id, records) in &payload.annotations_by_article {
            let spans = by_article.entry(*article_id).or_default();
            spans.extend(records.iter().filter(|r| !r.is_sentinel()).map(|r| WorkerSpan {
                text: r.text.clone(),
                category: r.category,
                subcategory: r.subcategory.clone(),
                worker: worker.clone(),
            }));
        }
    }

    by_article.retain(|_, spans| !spans.is_empty());
    by_article
}

fn group_spans(spans: &[WorkerSpan]) -> Vec<Vec<&WorkerSpan>> {
    let mut used = vec![false; spans.len()];
    let mut groups = Vec::new();

    for i in 0..spans.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![&spans[i]];
        for j in (i + 1)..spans.len() {
            if !used[j] && spans_match(&spans[i].text, &spans[j].text) {
                used[j] = true;
                group.push(&spans[j]);
            }
        }
        groups.push(group);
    }

    groups
}

fn gold_span(group: &[&WorkerSpan], pad: usize) -> Option<GoldSpan> {
    let (base, rest) = group.split_first()?;

    let text = rest.iter().fold(base.text.clone(), |text, other| {
        padded_intersection(&text, &other.text, pad).unwrap_or(text)
    });

    let category = most_common(group.iter().map(|s| s.category))?;
    let subcategory = most_common(group.iter().map(|s| s.subcategory.as_str()))?.to_string();
    let label_consistent = group
        .iter()
        .all(|s| s.category == base.category && s.subcategory == base.subcategory);

    Some(GoldSpan {
        text,
        category,
        subcategory,
        confidence: confidence(group.len(), label_consistent),
        num_supporters: group.len(),
        label_consistent,
    })
}

/// Build the gold standard from per-article worker spans
pub fn build_gold_standard(spans_by_article: &BTreeMap<u32, Vec<WorkerSpan>>, pad: usize) -> GoldStandard {
    spans_by_article
        .iter()
        .map(|(article_id, spans)| {
            let gold: Vec<GoldSpan> = group_spans(spans)
                .iter()
                .filter_map(|group| gold_span(group, pad))
                .collect();
            debug!(article_id, spans = spans.len(), gold = gold.len(), "Aggregated article");
            (*article_id, gold)
        })
        .collect()
}

/// Submission file shapes accepted by [`load_submissions`]
///
/// A file sink writes one payload per file; a database export holds many
/// payloads keyed by push id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubmissionFile {
    Single(Box<SessionPayload>),
    Export(BTreeMap<String, SessionPayload>),
}

pub(crate) fn read_nonempty(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|source| GoldError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(GoldError::EmptyInput(path.to_path_buf()));
    }
    Ok(content)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| GoldError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load submissions from files and directories of `*.json` files
pub fn load_submissions(inputs: &[PathBuf]) -> Result<Vec<SessionPayload>> {
    let mut submissions = Vec::new();

    for input in inputs {
        let files = if input.is_dir() {
            json_files(input)?
        } else {
            vec![input.clone()]
        };

        for file in files {
            let content = match read_nonempty(&file) {
                Err(GoldError::EmptyInput(path)) => {
                    warn!("Skipping empty submission file {}", path.display());
                    continue;
                }
                other => other?,
            };
            let parsed: SubmissionFile =
                serde_json::from_str(&content).map_err(|source| GoldError::Json {
                    path: file.clone(),
                    source,
                })?;
            match parsed {
                SubmissionFile::Single(payload) => submissions.push(*payload),
                SubmissionFile::Export(payloads) => submissions.extend(payloads.into_values()),
            }
        }
    }

    if submissions.is_empty() {
        return Err(GoldError::NoSubmissions);
    }
    info!("Loaded {} submissions", submissions.len());
    Ok(submissions)
}
