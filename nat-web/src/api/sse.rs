//! Server-Sent Events (SSE) for the live selection word count
//!
//! Streams the word count of the worker's current selection so the page can
//! show length feedback before a category is chosen.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
struct WordCountEvent {
    count: usize,
    within_bounds: bool,
}

/// GET /api/sessions/:id/word-count
///
/// Emits a `word_count` event with the current value on connect and after
/// every selection change.
pub async fn word_count_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (rx, bounds) = {
        let sessions = state.sessions.read().await;
        let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
        (session.subscribe_word_count(), session.settings().bounds)
    };
    debug!(session_id = %id, "Word count SSE client connected");

    let stream = WatchStream::new(rx).map(move |count| {
        let event = WordCountEvent {
            count,
            within_bounds: bounds.is_within_bounds(count),
        };
        let data = serde_json::to_string(&event).unwrap_or_else(|_| count.to_string());
        Ok(Event::default().event("word_count").data(data))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
