//! Propaganda technique taxonomy
//!
//! Fixed category → subcategory table used to classify annotated spans.
//! Two revisions of the table exist; the revision is a configuration
//! choice ([`TaxonomyVersion`]) rather than two hardcoded lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fixed text stored for the "no polarizing language" sentinel record
pub const NO_POLARIZING_TEXT: &str = "no polarizing language selected";

/// Only subcategory of the sentinel category
pub const NO_POLARIZING_SUBCATEGORY: &str = "no polarizing language";

const PERSUASIVE_V1: &[&str] = &[
    "Repetition",
    "Exaggeration",
    "Flag-Waving",
    "Slogans",
    "Bandwagon",
    "Causal Oversimplification",
    "Doubt",
];

const PERSUASIVE_V2: &[&str] = &[
    "Repetition",
    "Exaggeration",
    "Slogans",
    "Bandwagon",
    "Causal Oversimplification",
    "Doubt",
];

const INFLAMMATORY_V1: &[&str] = &["Demonization", "Name-Calling", "Hyperbole", "Straw Man Arguments"];

const INFLAMMATORY_V2: &[&str] = &["Demonization", "Name-Calling", "Hyperbole", "Scapegoating"];

const NO_POLARIZING: &[&str] = &[NO_POLARIZING_SUBCATEGORY];

/// Top-level annotation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Persuasive_Propaganda")]
    PersuasivePropaganda,
    #[serde(rename = "Inflammatory_Language")]
    InflammatoryLanguage,
    /// Sentinel: the worker found nothing to annotate in the article
    #[serde(rename = "No_Polarizing_Language")]
    NoPolarizingLanguage,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 3] = [
        Category::PersuasivePropaganda,
        Category::InflammatoryLanguage,
        Category::NoPolarizingLanguage,
    ];

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PersuasivePropaganda => "Persuasive_Propaganda",
            Category::InflammatoryLanguage => "Inflammatory_Language",
            Category::NoPolarizingLanguage => "No_Polarizing_Language",
        }
    }

    /// Whether this is the "no polarizing language" sentinel
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Category::NoPolarizingLanguage)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown category: {}", s)))
    }
}

/// Revision of the subcategory table
///
/// - `V1`: earlier study round, includes Flag-Waving and Straw Man Arguments
/// - `V2`: current round, drops Flag-Waving and uses Scapegoating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyVersion {
    V1,
    #[default]
    V2,
}

/// Category → allowed subcategory lookup for one taxonomy revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Taxonomy {
    version: TaxonomyVersion,
}

impl Taxonomy {
    pub fn new(version: TaxonomyVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> TaxonomyVersion {
        self.version
    }

    /// Allowed subcategories for a category, in display order
    pub fn subcategories(&self, category: Category) -> &'static [&'static str] {
        match (category, self.version) {
            (Category::PersuasivePropaganda, TaxonomyVersion::V1) => PERSUASIVE_V1,
            (Category::PersuasivePropaganda, TaxonomyVersion::V2) => PERSUASIVE_V2,
            (Category::InflammatoryLanguage, TaxonomyVersion::V1) => INFLAMMATORY_V1,
            (Category::InflammatoryLanguage, TaxonomyVersion::V2) => INFLAMMATORY_V2,
            (Category::NoPolarizingLanguage, _) => NO_POLARIZING,
        }
    }

    /// Whether `subcategory` is allowed under `category` (exact match)
    pub fn contains(&self, category: Category, subcategory: &str) -> bool {
        self.subcategories(category).contains(&subcategory)
    }

    /// Serializable form of the whole table
    pub fn entries(&self) -> Vec<TaxonomyEntry> {
        Category::ALL
            .into_iter()
            .map(|category| TaxonomyEntry {
                category,
                subcategories: self.subcategories(category).to_vec(),
            })
            .collect()
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(TaxonomyVersion::default())
    }
}

/// One row of the taxonomy table
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyEntry {
    pub category: Category,
    pub subcategories: Vec<&'static str>,
}
