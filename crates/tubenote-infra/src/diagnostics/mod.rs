mod capture;

pub use capture::{DiagnosticCapture, DiagnosticCaptureLayer};
