//! HTTP surface for the pixelmill image tools.
//!
//! Exposed as a library so integration tests can build the exact router the
//! binary serves.

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use setup::routes::build_router;
pub use state::AppState;
