//! HTTP API handlers for nat-web

pub mod buildinfo;
pub mod error;
pub mod export;
pub mod health;
pub mod session;
pub mod sse;
pub mod taxonomy;
pub mod ui;

pub use buildinfo::get_build_info;
pub use error::ApiError;
pub use export::export_payload;
pub use health::health_routes;
pub use session::{
    advance, confirm_annotation, create_session, get_session, observe_selection,
    remove_annotation, select_category, select_subcategory, update_survey,
};
pub use sse::word_count_stream;
pub use taxonomy::get_taxonomy;
pub use ui::{serve_app_js, serve_index};
