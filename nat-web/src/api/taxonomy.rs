//! Taxonomy table endpoint

use axum::{extract::State, Json};
use nat_common::taxonomy::TaxonomyEntry;
use nat_common::TaxonomyVersion;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TaxonomyResponse {
    pub version: TaxonomyVersion,
    pub categories: Vec<TaxonomyEntry>,
}

/// GET /api/taxonomy
pub async fn get_taxonomy(State(state): State<AppState>) -> Json<TaxonomyResponse> {
    let taxonomy = state.settings.taxonomy;
    Json(TaxonomyResponse {
        version: taxonomy.version(),
        categories: taxonomy.entries(),
    })
}
