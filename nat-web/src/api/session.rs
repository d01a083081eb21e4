//! Annotation session endpoints
//!
//! Each command locks the session store for its synchronous duration, applies
//! one session command and answers with the updated [`SessionView`].
//! Commands refresh the session's idle clock.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use nat_common::session::{AdvanceOutcome, AnnotationOutcome, SessionView};
use nat_common::sink::spawn_submission;
use nat_common::survey::Rating;
use nat_common::{AnnotationSession, Category, SessionError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// MTurk worker id, when the page was opened from a HIT
    #[serde(default, rename = "workerId", alias = "worker_id")]
    pub worker_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct SubcategoryRequest {
    pub subcategory: String,
}

/// Partial survey update; absent fields are left as they are
#[derive(Debug, Default, Deserialize)]
pub struct SurveyRequest {
    pub confidence: Option<u8>,
    pub bias: Option<u8>,
    pub rationale: Option<String>,
}

/// View plus what the command did
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// `saved`, `pending`, `survey_opened`, `next_article`, `finished` or `removed`
    pub outcome: &'static str,
    #[serde(flatten)]
    pub view: SessionView,
}

impl CommandResponse {
    fn new(outcome: &'static str, view: SessionView) -> Json<Self> {
        Json(Self { outcome, view })
    }
}

fn annotation_outcome(outcome: AnnotationOutcome) -> &'static str {
    match outcome {
        AnnotationOutcome::Saved { .. } => "saved",
        AnnotationOutcome::Pending => "pending",
    }
}

/// Apply `command` to session `id` and snapshot the result
async fn apply<T>(
    state: &AppState,
    id: Uuid,
    command: impl FnOnce(&mut AnnotationSession) -> Result<T, SessionError>,
) -> Result<(T, SessionView), ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
    let value = command(session)?;
    Ok((value, session.view()))
}

/// POST /api/sessions
///
/// Draws a working set from the catalog and starts a session at the first
/// article.
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let worker_id = body
        .and_then(|Json(request)| request.worker_id)
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty());

    let articles = {
        let mut rng = state
            .rng
            .lock()
            .map_err(|_| ApiError::Internal("Article sampler lock poisoned".to_string()))?;
        state.catalog.select(&state.strategy, &mut *rng)?
    };

    let session = AnnotationSession::new(articles, state.settings, worker_id);
    let view = session.view();
    state.sessions.write().await.insert(session);

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(session.view()))
}

/// POST /api/sessions/:id/selection
pub async fn observe_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let (_, view) = apply(&state, id, |s| s.observe_selection(&request.text)).await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/category
pub async fn select_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let category: Category = request
        .category
        .parse()
        .map_err(|e: nat_common::Error| ApiError::InvalidInput(e.to_string()))?;

    let (outcome, view) = apply(&state, id, |s| s.select_category(category)).await?;
    debug!(session_id = %id, %category, "Category command applied");
    Ok(CommandResponse::new(annotation_outcome(outcome), view))
}

/// POST /api/sessions/:id/subcategory
pub async fn select_subcategory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubcategoryRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let (outcome, view) =
        apply(&state, id, |s| s.select_subcategory(&request.subcategory)).await?;
    Ok(CommandResponse::new(annotation_outcome(outcome), view))
}

/// POST /api/sessions/:id/confirm
pub async fn confirm_annotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let (_, view) = apply(&state, id, |s| s.confirm_annotation()).await?;
    Ok(CommandResponse::new("saved", view))
}

/// DELETE /api/sessions/:id/annotations/:article_id/:index
pub async fn remove_annotation(
    State(state): State<AppState>,
    Path((id, article_id, index)): Path<(Uuid, u32, usize)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let (_, view) = apply(&state, id, |s| s.remove_annotation(article_id, index)).await?;
    Ok(CommandResponse::new("removed", view))
}

/// POST /api/sessions/:id/survey
///
/// Ratings are range-checked before anything is applied, so a rejected
/// update leaves the form untouched.
pub async fn update_survey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SurveyRequest>,
) -> Result<Json<SessionView>, ApiError> {
    for value in [request.confidence, request.bias].into_iter().flatten() {
        Rating::try_from(value).map_err(SessionError::from)?;
    }

    let (_, view) = apply(&state, id, |s| {
        if let Some(confidence) = request.confidence {
            s.set_confidence(confidence)?;
        }
        if let Some(bias) = request.bias {
            s.set_bias(bias)?;
        }
        if let Some(rationale) = request.rationale {
            s.set_rationale(rationale)?;
        }
        Ok(())
    })
    .await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/advance
///
/// On the terminal transition the payload is submitted on a background task
/// and the completion code is returned right away. Production services drop
/// the session at that point since nothing can read it afterwards.
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let (outcome, view) = apply(&state, id, |s| s.request_advance()).await?;

    let outcome = match outcome {
        AdvanceOutcome::SurveyOpened { .. } => "survey_opened",
        AdvanceOutcome::NextArticle { .. } => "next_article",
        AdvanceOutcome::Finished(payload) => {
            info!(
                session_id = %id,
                completion_code = %payload.completion_code,
                "Session finished, submitting to {}",
                state.sink.name()
            );
            spawn_submission(state.sink.clone(), payload);
            if state.production && state.sessions.write().await.evict(&id) {
                debug!(session_id = %id, "Finished session released");
            }
            "finished"
        }
    };

    Ok(CommandResponse::new(outcome, view))
}
