//! Axum HTTP adapter for d3k.
//!
//! Serves head/tail/list/rotate/error queries over the unified log, a
//! server-sent-events live tail, and accepts browser telemetry for the
//! writer. All state is built by the caller and passed in through
//! [`AxumContext`].

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, bind, serve, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
