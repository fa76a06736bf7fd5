mod service;
mod ssrf;

pub use service::{CallbackSender, CallbackSenderConfig};
pub use ssrf::validate_callback_url;
