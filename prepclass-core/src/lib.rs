//! # PrepClass Core Library
//!
//! Domain layer for the PrepClass teaching-material generator.
//!
//! A mentor picks a topic and a difficulty, and PrepClass produces three
//! canned document types for it:
//!
//! - **Pre-class** — preparation material students read before the session
//! - **In-class** — a timed one-hour lesson plan for the mentor
//! - **Post-class** — quiz, practice problems and follow-up material
//!
//! This crate owns everything that is not the completion call itself:
//! validated request construction, document assembly, the SQLite session
//! store, the user directory, and PDF/Markdown export. The completion
//! client and prompt templates live in `prepclass-llm`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod store;
pub mod types;

pub use config::PrepclassConfig;
pub use error::CoreError;
pub use types::{Difficulty, DocumentType, GenerationRequest, GenerationResult, RecordId};
