//! Annotation session state machine
//!
//! One worker's pass through the working article set. The session owns all
//! of its state (selection, pending annotation, annotation store, survey
//! form, recorded responses) and is only mutated through the command
//! methods below, each of which returns a [`SessionError`] and leaves the
//! state unchanged when the command is rejected. The one exception is a
//! valid subcategory choice, which stays pending when its save is refused
//! for selection length.
//!
//! # States
//!
//! ```text
//! Annotating(i) --advance--> Surveying(i)
//! Surveying(i)  --advance, invalid--> Surveying(i)
//! Surveying(i)  --advance, valid, i+1 < n--> Annotating(i+1)
//! Surveying(i)  --advance, valid, i+1 == n--> Finished
//! ```
//!
//! `Finished` is absorbing. Annotation commands are accepted while
//! annotating or surveying the current article; survey commands only while
//! surveying.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::annotations::{AnnotationRecord, AnnotationStore};
use crate::articles::{Article, ArticleSet};
use crate::payload::{generate_completion_code, SessionPayload};
use crate::selection::{SelectionBounds, SelectionTracker};
use crate::survey::{RationaleRule, SurveyError, SurveyForm, SurveyResponse};
use crate::taxonomy::{Category, Taxonomy, TaxonomyEntry};
use crate::text::{capitalize_title, segment_paragraphs};
use crate::time;

/// Validation rules shared by every session the service creates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub bounds: SelectionBounds,
    pub taxonomy: Taxonomy,
    pub rationale_rule: RationaleRule,
}

/// Position of the session in its flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Annotating { article_index: usize },
    Surveying { article_index: usize },
    Finished,
}

impl SessionState {
    /// Index of the article being worked on, if any
    pub fn article_index(&self) -> Option<usize> {
        match self {
            SessionState::Annotating { article_index } | SessionState::Surveying { article_index } => {
                Some(*article_index)
            }
            SessionState::Finished => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Finished)
    }
}

/// Rejected session commands, each with a worker-facing message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("This session is finished; no further changes are possible.")]
    SessionFinished,

    #[error("Please select between {min} and {max} words before annotating (selected {count}).")]
    SelectionOutOfBounds { count: usize, min: usize, max: usize },

    #[error("Please highlight a passage of the article first.")]
    NothingSelected,

    #[error("Please select a high-level category first.")]
    NoCategorySelected,

    #[error("Please select a subcategory.")]
    NoSubcategorySelected,

    #[error("'{subcategory}' is not a subcategory of {category}.")]
    UnknownSubcategory { category: Category, subcategory: String },

    #[error("The survey opens after you click Next Article.")]
    SurveyNotOpen,

    #[error(transparent)]
    Survey(#[from] SurveyError),

    #[error("Please annotate at least one phrase or select 'no polarizing language' before continuing.")]
    MissingAnnotations,

    #[error("Each annotation must include a category and subcategory (annotation {index} is incomplete).")]
    IncompleteAnnotation { index: usize },

    #[error("Article {0} is not the article being annotated.")]
    ArticleNotActive(u32),

    #[error("Annotation {index} does not exist for article {article_id} ({len} annotations).")]
    AnnotationNotFound {
        article_id: u32,
        index: usize,
        len: usize,
    },
}

impl SessionError {
    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::SessionFinished => "session_finished",
            SessionError::SelectionOutOfBounds { .. } => "selection_out_of_bounds",
            SessionError::NothingSelected => "nothing_selected",
            SessionError::NoCategorySelected => "no_category",
            SessionError::NoSubcategorySelected => "no_subcategory",
            SessionError::UnknownSubcategory { .. } => "unknown_subcategory",
            SessionError::SurveyNotOpen => "survey_not_open",
            SessionError::Survey(SurveyError::RatingOutOfRange(_)) => "rating_out_of_range",
            SessionError::Survey(SurveyError::MissingConfidence) => "missing_confidence",
            SessionError::Survey(SurveyError::MissingBias) => "missing_bias",
            SessionError::Survey(SurveyError::RationaleTooShort { .. }) => "rationale_too_short",
            SessionError::MissingAnnotations => "missing_annotations",
            SessionError::IncompleteAnnotation { .. } => "incomplete_annotation",
            SessionError::ArticleNotActive(_) => "article_not_active",
            SessionError::AnnotationNotFound { .. } => "annotation_not_found",
        }
    }
}

/// Result of a category or subcategory choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOutcome {
    /// A record was appended at this index of the current article's list
    Saved { index: usize },
    /// Choice recorded; waiting for the rest of the annotation
    Pending,
}

/// Result of an advance request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    SurveyOpened { article_index: usize },
    NextArticle { article_index: usize },
    /// Terminal transition; the payload must be submitted exactly once
    Finished(SessionPayload),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PendingAnnotation {
    category: Option<Category>,
    subcategory: Option<String>,
}

/// One worker's annotation session
#[derive(Debug)]
pub struct AnnotationSession {
    id: Uuid,
    worker_id: Option<String>,
    articles: ArticleSet,
    settings: SessionSettings,
    state: SessionState,
    selection: SelectionTracker,
    pending: PendingAnnotation,
    store: AnnotationStore,
    survey: SurveyForm,
    responses: BTreeMap<u32, SurveyResponse>,
    payload: Option<SessionPayload>,
}

impl AnnotationSession {
    /// Start a session at `Annotating(0)`
    pub fn new(articles: ArticleSet, settings: SessionSettings, worker_id: Option<String>) -> Self {
        let id = Uuid::new_v4();
        info!(
            session_id = %id,
            worker_id = worker_id.as_deref().unwrap_or("-"),
            articles = ?articles.iter().map(|a| a.id).collect::<Vec<_>>(),
            "Annotation session started"
        );

        Self {
            id,
            worker_id,
            articles,
            settings,
            state: SessionState::Annotating { article_index: 0 },
            selection: SelectionTracker::new(settings.bounds),
            pending: PendingAnnotation::default(),
            store: AnnotationStore::new(),
            survey: SurveyForm::new(),
            responses: BTreeMap::new(),
            payload: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn worker_id(&self) -> Option<&str> {
        self.worker_id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn articles(&self) -> &ArticleSet {
        &self.articles
    }

    /// Article being annotated or surveyed (None once finished)
    pub fn current_article(&self) -> Option<&Article> {
        self.state
            .article_index()
            .and_then(|index| self.articles.get(index))
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn survey(&self) -> &SurveyForm {
        &self.survey
    }

    pub fn responses(&self) -> &BTreeMap<u32, SurveyResponse> {
        &self.responses
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    /// Terminal payload, present once the session is finished
    pub fn payload(&self) -> Option<&SessionPayload> {
        self.payload.as_ref()
    }

    /// Live word count of the worker's selection
    pub fn subscribe_word_count(&self) -> watch::Receiver<usize> {
        self.selection.subscribe()
    }

    // ------------------------------------------------------------------
    // Annotation commands
    // ------------------------------------------------------------------

    /// Record the worker's raw text selection, returning its word count
    pub fn observe_selection(&mut self, raw: &str) -> Result<usize, SessionError> {
        self.active_article()?;
        self.selection.observe(raw);
        Ok(self.selection.word_count())
    }

    /// Choose a category for the pending selection
    ///
    /// The sentinel category commits a "no polarizing language" record
    /// immediately and ignores the selection. Substantive categories
    /// require the selection to be within the word window; if a previously
    /// chosen subcategory belongs to the new category the annotation is
    /// saved right away, otherwise the subcategory is cleared.
    pub fn select_category(&mut self, category: Category) -> Result<AnnotationOutcome, SessionError> {
        let article = self.active_article()?;

        if category.is_sentinel() {
            let (article_id, title) = (article.id, article.title.clone());
            let index = self
                .store
                .append(article_id, AnnotationRecord::no_polarizing_language(title));
            self.clear_pending();
            info!(session_id = %self.id, article_id, "No polarizing language recorded");
            return Ok(AnnotationOutcome::Saved { index });
        }

        let count = self.selection.word_count();
        if !self.selection.is_within_bounds(count) {
            let bounds = self.settings.bounds;
            warn!(
                session_id = %self.id,
                count,
                "Category rejected: selection outside {}..={} words",
                bounds.min_words,
                bounds.max_words
            );
            return Err(SessionError::SelectionOutOfBounds {
                count,
                min: bounds.min_words,
                max: bounds.max_words,
            });
        }

        let carried = self
            .pending
            .subcategory
            .clone()
            .filter(|sub| self.settings.taxonomy.contains(category, sub));

        match carried {
            Some(subcategory) => {
                let index = self.commit(category, &subcategory)?;
                Ok(AnnotationOutcome::Saved { index })
            }
            None => {
                self.pending.category = Some(category);
                self.pending.subcategory = None;
                debug!(session_id = %self.id, %category, "Category selected");
                Ok(AnnotationOutcome::Pending)
            }
        }
    }

    /// Choose a subcategory; saves the annotation as soon as it is complete
    ///
    /// A valid choice is remembered even when the save cannot happen yet:
    /// with nothing selected the outcome is `Pending`, and with a selection
    /// outside the word window the bounds error is returned. Either way a
    /// later reselection can be saved with [`confirm_annotation`](Self::confirm_annotation)
    /// or by choosing the category again.
    pub fn select_subcategory(&mut self, subcategory: &str) -> Result<AnnotationOutcome, SessionError> {
        self.active_article()?;
        let category = self.pending.category.ok_or(SessionError::NoCategorySelected)?;

        if !self.settings.taxonomy.contains(category, subcategory) {
            return Err(SessionError::UnknownSubcategory {
                category,
                subcategory: subcategory.to_string(),
            });
        }

        self.pending.subcategory = Some(subcategory.to_string());
        match self.commit(category, subcategory) {
            Ok(index) => Ok(AnnotationOutcome::Saved { index }),
            Err(SessionError::NothingSelected) => {
                debug!(session_id = %self.id, subcategory, "Subcategory held until text is selected");
                Ok(AnnotationOutcome::Pending)
            }
            Err(e) => Err(e),
        }
    }

    /// Manually save the pending annotation (same checks as auto-save)
    pub fn confirm_annotation(&mut self) -> Result<usize, SessionError> {
        self.active_article()?;
        let category = self.pending.category.ok_or(SessionError::NoCategorySelected)?;
        let subcategory = self
            .pending
            .subcategory
            .clone()
            .ok_or(SessionError::NoSubcategorySelected)?;
        self.commit(category, &subcategory)
    }

    /// Remove one of the current article's annotations
    pub fn remove_annotation(
        &mut self,
        article_id: u32,
        index: usize,
    ) -> Result<AnnotationRecord, SessionError> {
        let article = self.active_article()?;
        if article.id != article_id {
            return Err(SessionError::ArticleNotActive(article_id));
        }

        let len = self.store.count(article_id);
        let not_found = SessionError::AnnotationNotFound {
            article_id,
            index,
            len,
        };
        if index >= len {
            return Err(not_found);
        }

        let removed = self.store.remove(article_id, index).map_err(|_| not_found)?;
        debug!(session_id = %self.id, article_id, index, "Annotation removed");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Survey commands
    // ------------------------------------------------------------------

    pub fn set_confidence(&mut self, value: u8) -> Result<(), SessionError> {
        self.surveying_index()?;
        self.survey.set_confidence(value)?;
        Ok(())
    }

    pub fn set_bias(&mut self, value: u8) -> Result<(), SessionError> {
        self.surveying_index()?;
        self.survey.set_bias(value)?;
        Ok(())
    }

    pub fn set_rationale(&mut self, rationale: impl Into<String>) -> Result<(), SessionError> {
        self.surveying_index()?;
        self.survey.set_rationale(rationale);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flow control
    // ------------------------------------------------------------------

    /// Advance the session (Next Article / Submit Survey / Finish)
    pub fn request_advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        self.request_advance_with_rng(&mut rand::thread_rng())
    }

    /// [`request_advance`](Self::request_advance) with an explicit completion-code RNG
    pub fn request_advance_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<AdvanceOutcome, SessionError> {
        let article_index = match self.state {
            SessionState::Finished => return Err(SessionError::SessionFinished),
            SessionState::Annotating { article_index } => {
                self.state = SessionState::Surveying { article_index };
                debug!(session_id = %self.id, article_index, "Survey opened");
                return Ok(AdvanceOutcome::SurveyOpened { article_index });
            }
            SessionState::Surveying { article_index } => article_index,
        };

        let article_id = self
            .articles
            .get(article_index)
            .map(|a| a.id)
            .ok_or(SessionError::SessionFinished)?;

        if let Err(e) = self.check_article_complete(article_id) {
            warn!(session_id = %self.id, article_id, "Advance rejected: {}", e);
            return Err(e);
        }

        let response = self
            .survey
            .finalize(article_id, self.settings.rationale_rule)?;
        self.responses.insert(article_id, response);

        let next = article_index + 1;
        if next < self.articles.len() {
            self.state = SessionState::Annotating { article_index: next };
            self.clear_pending();
            self.survey.reset();
            info!(session_id = %self.id, article_index = next, "Advanced to next article");
            return Ok(AdvanceOutcome::NextArticle { article_index: next });
        }

        let payload = self.build_payload(rng);
        self.payload = Some(payload.clone());
        self.state = SessionState::Finished;
        self.clear_pending();
        info!(
            session_id = %self.id,
            completion_code = %payload.completion_code,
            annotations = self.store.total(),
            "Annotation session finished"
        );
        Ok(AdvanceOutcome::Finished(payload))
    }

    /// Snapshot of everything the page needs to render
    pub fn view(&self) -> SessionView {
        let article = self.state.article_index().and_then(|index| {
            self.articles.get(index).map(|a| ArticleView {
                id: a.id,
                index,
                title: capitalize_title(&a.title),
                paragraphs: segment_paragraphs(&a.content),
            })
        });

        let annotations = self
            .current_article()
            .map(|a| self.store.get(a.id).to_vec())
            .unwrap_or_default();

        let survey = matches!(self.state, SessionState::Surveying { .. }).then(|| self.survey.clone());
        let bounds = self.settings.bounds;
        let current = self.selection.current();

        SessionView {
            session_id: self.id,
            state: self.state,
            article_count: self.articles.len(),
            article,
            selection: SelectionView {
                text: current.map(|s| s.text.clone()),
                word_count: self.selection.word_count(),
                within_bounds: self.selection.current_is_within_bounds(),
                min_words: bounds.min_words,
                max_words: bounds.max_words,
            },
            pending_category: self.pending.category,
            pending_subcategory: self.pending.subcategory.clone(),
            annotations,
            survey,
            rationale_rule: self.settings.rationale_rule,
            taxonomy: self.settings.taxonomy.entries(),
            completion_code: self.payload.as_ref().map(|p| p.completion_code.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn active_article(&self) -> Result<&Article, SessionError> {
        self.current_article().ok_or(SessionError::SessionFinished)
    }

    fn surveying_index(&self) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Surveying { article_index } => Ok(article_index),
            SessionState::Annotating { .. } => Err(SessionError::SurveyNotOpen),
            SessionState::Finished => Err(SessionError::SessionFinished),
        }
    }

    /// Survey answers first, then the article's annotations
    fn check_article_complete(&self, article_id: u32) -> Result<(), SessionError> {
        self.survey.validate(self.settings.rationale_rule)?;

        let records = self.store.get(article_id);
        if records.is_empty() {
            return Err(SessionError::MissingAnnotations);
        }
        if let Some(index) = records
            .iter()
            .position(|r| !r.is_complete(&self.settings.taxonomy))
        {
            return Err(SessionError::IncompleteAnnotation { index });
        }
        Ok(())
    }

    /// Append a span record from the current selection
    fn commit(&mut self, category: Category, subcategory: &str) -> Result<usize, SessionError> {
        let article = self.active_article()?;
        let (article_id, title) = (article.id, article.title.clone());

        let selection = self
            .selection
            .current()
            .ok_or(SessionError::NothingSelected)?;
        if !self.selection.is_within_bounds(selection.word_count) {
            let bounds = self.settings.bounds;
            return Err(SessionError::SelectionOutOfBounds {
                count: selection.word_count,
                min: bounds.min_words,
                max: bounds.max_words,
            });
        }

        let record = AnnotationRecord::span(title, &selection.text, category, subcategory);
        let index = self.store.append(article_id, record);
        self.clear_pending();
        info!(
            session_id = %self.id,
            article_id,
            %category,
            subcategory,
            "Annotation saved"
        );
        Ok(index)
    }

    fn clear_pending(&mut self) {
        self.pending = PendingAnnotation::default();
        self.selection.clear();
    }

    fn build_payload<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionPayload {
        SessionPayload {
            session_id: self.id,
            worker_id: self.worker_id.clone(),
            annotations_by_article: self.store.as_map().clone(),
            survey_by_article: self.responses.clone(),
            article_titles: self.articles.titles(),
            completion_code: generate_completion_code(rng),
            timestamp: time::iso_timestamp(time::now()),
        }
    }
}

/// Render snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: SessionState,
    pub article_count: usize,
    pub article: Option<ArticleView>,
    pub selection: SelectionView,
    pub pending_category: Option<Category>,
    pub pending_subcategory: Option<String>,
    /// Records of the current article, in display order
    pub annotations: Vec<AnnotationRecord>,
    /// Survey answers, present only while surveying
    pub survey: Option<SurveyForm>,
    pub rationale_rule: RationaleRule,
    pub taxonomy: Vec<TaxonomyEntry>,
    pub completion_code: Option<String>,
}

/// Current article prepared for display
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: u32,
    pub index: usize,
    pub title: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionView {
    pub text: Option<String>,
    pub word_count: usize,
    pub within_bounds: bool,
    pub min_words: usize,
    pub max_words: usize,
}
