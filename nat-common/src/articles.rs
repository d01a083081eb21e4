//! Article dataset loading and working-set selection
//!
//! The dataset is a CSV file with a header row containing at least the
//! `Headline` and `News body` columns. Each data row becomes one [`Article`]
//! whose id is its 1-based row position. A session works on exactly
//! [`ARTICLES_PER_SESSION`] articles drawn from the catalog.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Number of articles every session annotates
pub const ARTICLES_PER_SESSION: usize = 3;

/// Row indices (0-based) used by the fixed selection strategy by default
pub const DEFAULT_FIXED_INDICES: [usize; ARTICLES_PER_SESSION] = [24, 124, 472];

const HEADLINE_COLUMN: &str = "Headline";
const BODY_COLUMN: &str = "News body";

/// One annotatable news article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// 1-based row position in the dataset, stable for the session
    pub id: u32,
    pub title: String,
    pub content: String,
}

/// `{id, title}` pair recorded in the session payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleTitle {
    pub id: u32,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct DatasetRow {
    #[serde(rename = "Headline")]
    headline: String,
    #[serde(rename = "News body")]
    news_body: String,
}

/// How a session's working set is drawn from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Specific 0-based row indices; falls back to [`SelectionStrategy::Random`]
    /// if any index is missing or the indices do not name distinct articles
    Fixed { indices: Vec<usize> },
    /// Uniform sample without replacement
    Random,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::Fixed {
            indices: DEFAULT_FIXED_INDICES.to_vec(),
        }
    }
}

/// Every article parsed from the dataset
#[derive(Debug, Clone)]
pub struct ArticleCatalog {
    articles: Vec<Article>,
}

impl ArticleCatalog {
    /// Load the catalog from a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Dataset(format!("Cannot open dataset {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_reader(file)?;
        info!(
            "Loaded {} articles from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse the catalog from CSV text
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in [HEADLINE_COLUMN, BODY_COLUMN] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::Dataset(format!(
                    "Dataset header is missing the '{}' column",
                    column
                )));
            }
        }

        let mut articles = Vec::new();
        for (line, row) in csv_reader.deserialize::<DatasetRow>().enumerate() {
            let row = row.map_err(|e| {
                Error::Dataset(format!("Malformed dataset row {}: {}", line + 2, e))
            })?;
            if row.headline.trim().is_empty() && row.news_body.trim().is_empty() {
                debug!("Skipping blank dataset row {}", line + 2);
                continue;
            }
            articles.push(Article {
                id: (articles.len() + 1) as u32,
                title: row.headline,
                content: row.news_body,
            });
        }

        if articles.len() < ARTICLES_PER_SESSION {
            return Err(Error::Dataset(format!(
                "Dataset has {} articles, at least {} are required",
                articles.len(),
                ARTICLES_PER_SESSION
            )));
        }

        Ok(Self { articles })
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Article at a 0-based row index
    pub fn get(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Draw a session working set
    pub fn select<R: Rng + ?Sized>(
        &self,
        strategy: &SelectionStrategy,
        rng: &mut R,
    ) -> Result<ArticleSet> {
        match strategy {
            SelectionStrategy::Fixed { indices } => {
                let chosen: Option<Vec<Article>> = indices
                    .iter()
                    .map(|&index| self.articles.get(index).cloned())
                    .collect();

                match chosen.map(ArticleSet::new) {
                    Some(Ok(set)) => Ok(set),
                    _ => {
                        warn!(
                            "Fixed article indices {:?} unusable for a {}-article catalog, falling back to random selection",
                            indices,
                            self.len()
                        );
                        self.sample(rng)
                    }
                }
            }
            SelectionStrategy::Random => self.sample(rng),
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ArticleSet> {
        let mut indices: Vec<usize> = (0..self.articles.len()).collect();
        indices.shuffle(rng);

        let sampled = indices
            .into_iter()
            .take(ARTICLES_PER_SESSION)
            .map(|i| self.articles[i].clone())
            .collect();

        ArticleSet::new(sampled)
    }
}

/// The fixed, ordered working set of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSet {
    articles: Vec<Article>,
}

impl ArticleSet {
    /// Build a working set; requires exactly [`ARTICLES_PER_SESSION`] articles with distinct ids
    pub fn new(articles: Vec<Article>) -> Result<Self> {
        if articles.len() != ARTICLES_PER_SESSION {
            return Err(Error::Dataset(format!(
                "A session needs exactly {} articles, got {}",
                ARTICLES_PER_SESSION,
                articles.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = articles.iter().find(|a| !seen.insert(a.id)) {
            return Err(Error::Dataset(format!(
                "Article id {} appears more than once in the working set",
                dup.id
            )));
        }

        Ok(Self { articles })
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter()
    }

    pub fn titles(&self) -> Vec<ArticleTitle> {
        self.articles
            .iter()
            .map(|a| ArticleTitle {
                id: a.id,
                title: a.title.clone(),
            })
            .collect()
    }
}
