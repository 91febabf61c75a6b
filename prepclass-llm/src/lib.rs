//! # prepclass-llm — Completion Layer for PrepClass
//!
//! Turns a validated [`prepclass_core::GenerationRequest`] into a prompt
//! and sends it to an OpenAI-compatible chat-completion API:
//!
//! - **Prompt builder** — three canned templates (pre-class, in-class,
//!   post-class), deterministic rendering, fixed mentor system prompt
//! - **Generation client** — one outbound HTTP call per request, typed
//!   error taxonomy, bounded transient retries (default: none), hard
//!   timeout (default: 60 s)
//!
//! Every completion call in PrepClass goes through this crate. The
//! [`CompletionService`] trait fronts the HTTP client so the pipeline
//! can be exercised against mocks.

pub mod client;
pub mod error;
pub mod prompt;

pub use client::{ClientConfig, CompletionService, GenerationClient};
pub use error::GenError;
pub use prompt::{PromptRequest, build_prompt};
