//! # News Annotation Tool Common Library
//!
//! Shared code for the annotation service and the analysis tools:
//! - Text processing (paragraph segmentation, title case, counting)
//! - Propaganda technique taxonomy
//! - Article dataset loading and working-set selection
//! - Selection tracking, annotation store and survey form
//! - Annotation session state machine and terminal payload
//! - Submission sinks
//! - Configuration loading

pub mod annotations;
pub mod articles;
pub mod config;
pub mod error;
pub mod payload;
pub mod selection;
pub mod session;
pub mod sink;
pub mod survey;
pub mod taxonomy;
pub mod text;
pub mod time;

pub use error::{Error, Result};
pub use session::{AnnotationSession, SessionError, SessionState};
pub use taxonomy::{Category, Taxonomy, TaxonomyVersion};
