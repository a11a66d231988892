//! Configuration loading, pipeline orchestration and snapshots.

pub mod config;
pub mod pipeline;
pub mod secret;
pub mod snapshot;

pub use config::Config;
pub use pipeline::{CompletionStatus, Pipeline, PipelineOutput, PipelineReport};
pub use secret::Secret;
