//! ideashare/crates/api-adapters/src/lib.rs
//!
//! The JSON-over-HTTP surface for IdeaShare. Error mapping, DTOs and
//! metrics compile without a web framework; the router and handlers need
//! the `web-axum` feature.

pub mod dto;
pub mod error;
pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod router;
#[cfg(feature = "web-axum")]
pub mod state;

pub use error::{ApiError, ErrorBody};
pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use router::build_router;
#[cfg(feature = "web-axum")]
pub use state::{AppState, ServiceSettings};
