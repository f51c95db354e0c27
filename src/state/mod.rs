//! State module for tracking worker progress
//!
//! # Components
//!
//! - `WorkerState`: the lifecycle of a single crawl worker
//!   (seeding, running, flushing, done)

mod worker_state;

// Re-export main types
pub use worker_state::WorkerState;
