//! Delta projection (§4.7) and the per-subscription stream push loop (§4.8).

pub mod delta;
pub mod engine;

pub use delta::{is_empty, project_delta};
pub use engine::{run_subscription, StreamFrame};
