//! Core type definitions for the PrepClass domain.
//!
//! All enum inputs are validated at the boundary: `FromStr` is the only
//! way to turn untrusted text into a [`Difficulty`] or [`DocumentType`],
//! and [`GenerationRequest::new`] rejects blank topics. Past that point
//! invalid values are unrepresentable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque identifier of a persisted generation record (SQLite rowid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Request enums
// ---------------------------------------------------------------------------

/// Target student level for a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// First exposure to the topic.
    Beginner,
    /// Comfortable with fundamentals.
    Intermediate,
    /// Preparing for hard interview rounds.
    Advanced,
}

impl Difficulty {
    /// All difficulty levels, in ascending order.
    #[must_use]
    pub fn all() -> &'static [Difficulty] {
        &[Self::Beginner, Self::Intermediate, Self::Advanced]
    }

    /// Lowercase marker used inside prompt text (e.g. "beginner level").
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Difficulty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(CoreError::Config(format!("unknown difficulty: '{s}'"))),
        }
    }
}

/// Which of the three canned teaching documents to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Preparation material students read before the session.
    PreClass,
    /// Timed one-hour lesson plan for the mentor.
    InClass,
    /// Quiz, practice problems and follow-up material.
    PostClass,
}

impl DocumentType {
    /// All document types, in teaching order.
    #[must_use]
    pub fn all() -> &'static [DocumentType] {
        &[Self::PreClass, Self::InClass, Self::PostClass]
    }

    /// Human-readable section title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::PreClass => "Pre-Class Document",
            Self::InClass => "In-Class Lesson Plan",
            Self::PostClass => "Post-Class Materials",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreClass => "pre_class",
            Self::InClass => "in_class",
            Self::PostClass => "post_class",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DocumentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pre_class" | "pre-class" | "preclass" => Ok(Self::PreClass),
            "in_class" | "in-class" | "inclass" => Ok(Self::InClass),
            "post_class" | "post-class" | "postclass" => Ok(Self::PostClass),
            _ => Err(CoreError::Config(format!("unknown document type: '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Result
// ---------------------------------------------------------------------------

/// A validated request for one document generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The technical topic (e.g. "Dynamic Programming", "SQL Joins").
    pub topic: String,
    /// Target student level.
    pub difficulty: Difficulty,
    /// Which document to produce.
    pub document_type: DocumentType,
}

impl GenerationRequest {
    /// Construct a request, rejecting blank topics.
    ///
    /// The enum fields are valid by construction; the topic is the only
    /// free-form input and must be non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the topic is empty or whitespace.
    pub fn new(
        topic: impl Into<String>,
        difficulty: Difficulty,
        document_type: DocumentType,
    ) -> crate::error::Result<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(CoreError::Config("topic must not be empty".into()));
        }
        Ok(Self {
            topic: topic.trim().to_string(),
            difficulty,
            document_type,
        })
    }
}

/// The persisted outcome of one successful generation call.
///
/// Assembled exactly once per successful completion and treated as
/// immutable afterwards; the session store owns it once saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The request this result answers, echoed unchanged.
    pub request: GenerationRequest,
    /// The generated document body.
    pub generated_text: String,
    /// When the result was assembled (UTC).
    pub created_at: DateTime<Utc>,
    /// Username of the mentor who requested it.
    pub owner: String,
}

impl GenerationResult {
    /// Assemble a result from a request and the service's generated text.
    ///
    /// Pure aggregation: stamps the current time and echoes the request
    /// unchanged. Validation happened upstream.
    #[must_use]
    pub fn assemble(
        request: GenerationRequest,
        generated_text: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            request,
            generated_text: generated_text.into(),
            created_at: Utc::now(),
            owner: owner.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
