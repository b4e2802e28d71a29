//! Multi-day trip route optimization engine.

pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod services;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use services::pipeline::{optimize_route, PipelineOptions};
