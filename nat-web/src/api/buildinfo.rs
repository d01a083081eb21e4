//! Build identification and active study settings
//!
//! Lets whoever runs a study confirm which build and which rule set the
//! workers are seeing without reading the server config.

use axum::{extract::State, response::Json};
use nat_common::selection::SelectionBounds;
use nat_common::survey::RationaleRule;
use nat_common::TaxonomyVersion;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    pub study: StudySettings,
}

#[derive(Debug, Serialize)]
pub struct StudySettings {
    pub taxonomy: TaxonomyVersion,
    pub selection: SelectionBounds,
    pub rationale_rule: RationaleRule,
    pub sink: &'static str,
    pub production: bool,
}

/// GET /api/buildinfo
pub async fn get_build_info(State(state): State<AppState>) -> Json<BuildInfo> {
    let settings = state.settings;
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_profile: env!("BUILD_PROFILE"),
        study: StudySettings {
            taxonomy: settings.taxonomy.version(),
            selection: settings.bounds,
            rationale_rule: settings.rationale_rule,
            sink: state.sink.name(),
            production: state.production,
        },
    })
}
