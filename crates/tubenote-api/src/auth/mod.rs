pub mod middleware;

pub use middleware::{require_api_key, AuthState};
