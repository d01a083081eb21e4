//! Post-article survey form
//!
//! Holds the worker's answers for the current article and validates them
//! before the session may move on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::{count_characters, count_words};

/// Lowest selectable rating
pub const RATING_MIN: u8 = 1;

/// Highest selectable rating
pub const RATING_MAX: u8 = 5;

/// A 1–5 Likert answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = SurveyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (RATING_MIN..=RATING_MAX).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(SurveyError::RatingOutOfRange(value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

/// Minimum-length rule applied to the free-text rationale
///
/// A session applies exactly one rule to every article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RationaleRule {
    MinWords(usize),
    MinCharacters(usize),
}

impl RationaleRule {
    /// Measured length of `rationale` under this rule
    pub fn measure(&self, rationale: &str) -> usize {
        match self {
            RationaleRule::MinWords(_) => count_words(rationale),
            RationaleRule::MinCharacters(_) => count_characters(rationale),
        }
    }

    pub fn minimum(&self) -> usize {
        match self {
            RationaleRule::MinWords(n) | RationaleRule::MinCharacters(n) => *n,
        }
    }

    pub fn is_satisfied(&self, rationale: &str) -> bool {
        self.measure(rationale) >= self.minimum()
    }

    fn unit(&self) -> &'static str {
        match self {
            RationaleRule::MinWords(_) => "words",
            RationaleRule::MinCharacters(_) => "characters",
        }
    }
}

impl Default for RationaleRule {
    fn default() -> Self {
        RationaleRule::MinCharacters(100)
    }
}

/// Survey validation failures, each with a worker-facing message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurveyError {
    #[error("Ratings must be between 1 and 5 (got {0}).")]
    RatingOutOfRange(u8),

    #[error("Please rate how confident you are in your tagging decisions.")]
    MissingConfidence,

    #[error("Please rate how misleading or biased the article is.")]
    MissingBias,

    #[error("Please explain why you tagged this way (at least {required} {unit}, currently {actual}).")]
    RationaleTooShort {
        required: usize,
        actual: usize,
        unit: &'static str,
    },
}

/// Completed survey for one article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub article_id: u32,
    pub confidence: Rating,
    pub bias: Rating,
    pub rationale: String,
}

/// In-progress survey answers; unset ratings are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurveyForm {
    pub confidence: Option<Rating>,
    pub bias: Option<Rating>,
    pub rationale: String,
}

impl SurveyForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_confidence(&mut self, value: u8) -> Result<(), SurveyError> {
        self.confidence = Some(Rating::try_from(value)?);
        Ok(())
    }

    pub fn set_bias(&mut self, value: u8) -> Result<(), SurveyError> {
        self.bias = Some(Rating::try_from(value)?);
        Ok(())
    }

    pub fn set_rationale(&mut self, rationale: impl Into<String>) {
        self.rationale = rationale.into();
    }

    /// Check completeness: confidence, bias, then rationale length
    pub fn validate(&self, rule: RationaleRule) -> Result<(Rating, Rating), SurveyError> {
        let confidence = self.confidence.ok_or(SurveyError::MissingConfidence)?;
        let bias = self.bias.ok_or(SurveyError::MissingBias)?;
        if !rule.is_satisfied(&self.rationale) {
            return Err(SurveyError::RationaleTooShort {
                required: rule.minimum(),
                actual: rule.measure(&self.rationale),
                unit: rule.unit(),
            });
        }
        Ok((confidence, bias))
    }

    /// Validate and produce the response for `article_id`
    pub fn finalize(&self, article_id: u32, rule: RationaleRule) -> Result<SurveyResponse, SurveyError> {
        let (confidence, bias) = self.validate(rule)?;
        Ok(SurveyResponse {
            article_id,
            confidence,
            bias,
            rationale: self.rationale.trim().to_string(),
        })
    }

    /// Return every field to unset
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
