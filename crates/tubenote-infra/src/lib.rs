//! Tubenote Infra
//!
//! Cross-request infrastructure: admission control, request-scoped log
//! capture, and signed callback delivery.

pub mod callback;
pub mod diagnostics;
pub mod rate_limit;

pub use callback::{CallbackSender, CallbackSenderConfig};
pub use diagnostics::{DiagnosticCapture, DiagnosticCaptureLayer};
pub use rate_limit::{Decision, SlidingWindowLimiter};
