use std::sync::Arc;

use tubenote_core::Config;
use tubenote_infra::{CallbackSender, DiagnosticCapture, SlidingWindowLimiter};
use tubenote_services::{DocumentStore, StoreConfigResolver, VideoSummarizer};

use crate::notifier::NotificationDispatcher;

/// Main application state shared by every handler.
///
/// The rate limiter and the store-config resolver are the only mutable state
/// shared across concurrent requests; both guard their internals with their
/// own locks.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub limiter: SlidingWindowLimiter,
    pub capture: DiagnosticCapture,
    pub summarizer: Arc<dyn VideoSummarizer>,
    pub store: Arc<dyn DocumentStore>,
    pub store_config: Arc<StoreConfigResolver>,
    pub notifier: NotificationDispatcher,
    pub callbacks: Arc<CallbackSender>,
}

#[allow(dead_code)]
fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<AppState>();
    assert_sync::<AppState>();
}
