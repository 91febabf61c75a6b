//! Wiring between the PrepClass core and the completion layer.
//!
//! The binary in `main.rs` is a thin shell over [`pipeline`], which owns
//! the generate → assemble → persist flow.

pub mod pipeline;

pub use pipeline::{GenerationPipeline, PipelineError};
