pub mod diagnostics;
pub mod outcome;
pub mod summary;

pub use diagnostics::{DiagnosticBundle, ErrorInfo, LogRecord, RequestMetadata};
pub use outcome::{AsyncAccepted, RequestOutcome, Stage, SummarizeRequest};
pub use summary::{StructuredSummary, ToolMention};
