//! nat-web library - annotation session service
//!
//! Hosts independent annotation sessions keyed by UUID, serves the
//! single-page annotation form and exposes the session commands as a JSON
//! API. Finished sessions are handed to the configured submission sink on a
//! background task.

use std::sync::{Arc, Mutex};

use axum::Router;
use nat_common::articles::{ArticleCatalog, SelectionStrategy};
use nat_common::config::TomlConfig;
use nat_common::session::SessionSettings;
use nat_common::sink::SubmissionSink;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;

pub mod api;
pub mod sessions;

pub use sessions::{RetentionPolicy, SessionMap, SessionStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Every article loaded at startup
    pub catalog: Arc<ArticleCatalog>,
    /// How each session's working set is drawn
    pub strategy: SelectionStrategy,
    /// Validation rules applied to new sessions
    pub settings: SessionSettings,
    pub sessions: SessionMap,
    /// Idle and finished-session timeouts applied by the reaper
    pub retention: RetentionPolicy,
    pub sink: Arc<dyn SubmissionSink>,
    /// Working-set sampler; seeded when the config names a seed
    pub rng: Arc<Mutex<StdRng>>,
    /// Production mode hides the diagnostic export
    pub production: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(
        catalog: ArticleCatalog,
        strategy: SelectionStrategy,
        settings: SessionSettings,
        sink: Arc<dyn SubmissionSink>,
        seed: Option<u64>,
        production: bool,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            catalog: Arc::new(catalog),
            strategy,
            settings,
            sessions: Arc::new(RwLock::new(SessionStore::new())),
            retention: RetentionPolicy::default(),
            sink,
            rng: Arc::new(Mutex::new(rng)),
            production,
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Create state from the loaded configuration
    pub fn from_config(
        catalog: ArticleCatalog,
        config: &TomlConfig,
        sink: Arc<dyn SubmissionSink>,
    ) -> nat_common::Result<Self> {
        Ok(Self::new(
            catalog,
            config.dataset.strategy.clone(),
            config.session_settings()?,
            sink,
            config.dataset.seed,
            config.production,
        )
        .with_retention(RetentionPolicy::from(&config.sessions)))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let sessions = Router::new()
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/:id", get(api::get_session))
        .route("/api/sessions/:id/selection", post(api::observe_selection))
        .route("/api/sessions/:id/category", post(api::select_category))
        .route("/api/sessions/:id/subcategory", post(api::select_subcategory))
        .route("/api/sessions/:id/confirm", post(api::confirm_annotation))
        .route(
            "/api/sessions/:id/annotations/:article_id/:index",
            delete(api::remove_annotation),
        )
        .route("/api/sessions/:id/survey", post(api::update_survey))
        .route("/api/sessions/:id/advance", post(api::advance))
        .route("/api/sessions/:id/word-count", get(api::word_count_stream))
        .route("/api/sessions/:id/export", get(api::export_payload));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/taxonomy", get(api::get_taxonomy))
        .merge(api::health_routes());

    Router::new()
        .merge(sessions)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
