mod limiter;

pub use limiter::{Decision, SlidingWindowLimiter};
