//! Tubenote API
//!
//! HTTP front door and orchestration pipeline. The binary in `main.rs` wires
//! configuration, telemetry, and the capability implementations together;
//! integration tests build the same router against mock capabilities.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod orchestrator;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
