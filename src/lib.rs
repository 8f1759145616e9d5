//! English to Kannada translation backend.
//!
//! Serves an offline MarianMT model over a small JSON API alongside an
//! in-memory SOS alert counter.

pub mod alerts;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod translate;

pub use crate::config::Config;
pub use crate::error::ApiError;
pub use crate::routes::create_app;
pub use crate::state::AppState;
