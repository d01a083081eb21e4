//! Terminal session payload and completion codes

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotations::AnnotationRecord;
use crate::articles::ArticleTitle;
use crate::survey::SurveyResponse;

/// Prefix of every completion code
pub const COMPLETION_CODE_PREFIX: &str = "MTURK-";

/// Random characters after the prefix
pub const COMPLETION_CODE_LEN: usize = 6;

const CODE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a completion code such as `MTURK-4QZ0A7`
pub fn generate_completion_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..COMPLETION_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", COMPLETION_CODE_PREFIX, suffix.to_uppercase())
}

/// Whether `code` has the completion code shape
pub fn is_completion_code(code: &str) -> bool {
    code.strip_prefix(COMPLETION_CODE_PREFIX)
        .is_some_and(|rest| {
            rest.len() == COMPLETION_CODE_LEN
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        })
}

/// Everything a finished session produced; created once, never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    pub annotations_by_article: BTreeMap<u32, Vec<AnnotationRecord>>,
    pub survey_by_article: BTreeMap<u32, SurveyResponse>,
    pub article_titles: Vec<ArticleTitle>,
    pub completion_code: String,
    /// ISO-8601 UTC with millisecond precision
    pub timestamp: String,
}

impl SessionPayload {
    /// Pretty-printed JSON for the diagnostic export
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
