//! Diagnostic export of a finished session's payload
//!
//! Disabled in production mode.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use nat_common::time;
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

/// Download file name, e.g. `annotations_2025-04-09T13-05-07-042Z.json`
pub fn export_filename() -> String {
    format!("annotations_{}.json", time::file_safe_timestamp(time::now()))
}

/// GET /api/sessions/:id/export
pub async fn export_payload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if state.production {
        return Err(ApiError::Unavailable);
    }

    let json = {
        let sessions = state.sessions.read().await;
        let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
        let payload = session.payload().ok_or(ApiError::NotFinished)?;
        payload
            .to_pretty_json()
            .map_err(|e| ApiError::Internal(format!("Failed to serialize payload: {}", e)))?
    };

    let disposition = format!("attachment; filename=\"{}\"", export_filename());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        json,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filename_is_file_safe() {
        let name = export_filename();
        assert!(name.starts_with("annotations_"));
        assert!(name.ends_with("Z.json"));
        let stem = name.trim_end_matches(".json");
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
    }
}
