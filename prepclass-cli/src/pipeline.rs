//! The generation pipeline: build prompt → call service → assemble → persist.
//!
//! One user action is one synchronous chain; the completion call is the
//! only operation that can block, and it is bounded by the client's
//! timeout. Dropping an in-flight [`GenerationPipeline::generate_one`]
//! future abandons the network call and persists nothing.

use prepclass_core::store::SessionStore;
use prepclass_core::types::{Difficulty, DocumentType, GenerationRequest, GenerationResult, RecordId};
use prepclass_core::CoreError;
use prepclass_llm::{CompletionService, GenError, build_prompt};
use thiserror::Error;
use tracing::{debug, info};

/// Failures the pipeline can surface to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The completion service failed; nothing was assembled or stored.
    #[error(transparent)]
    Generation(#[from] GenError),

    /// Request validation or persistence failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Ties a completion service to a session store.
pub struct GenerationPipeline<'a> {
    service: &'a dyn CompletionService,
    store: &'a SessionStore,
}

impl<'a> GenerationPipeline<'a> {
    /// Build a pipeline over borrowed collaborators.
    #[must_use]
    pub fn new(service: &'a dyn CompletionService, store: &'a SessionStore) -> Self {
        Self { service, store }
    }

    /// Generate, assemble and persist one document.
    ///
    /// On any completion failure the error is returned unmodified and no
    /// record is assembled or persisted.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Generation`] for completion failures,
    /// [`PipelineError::Core`] for persistence failures.
    pub async fn generate_one(
        &self,
        owner: &str,
        request: GenerationRequest,
    ) -> Result<(RecordId, GenerationResult), PipelineError> {
        let prompt = build_prompt(&request);
        debug!(
            topic = %request.topic,
            difficulty = %request.difficulty,
            doc_type = %request.document_type,
            "submitting generation request"
        );

        let text = self.service.complete(&prompt).await?;

        let result = GenerationResult::assemble(request, text, owner);
        let id = self.store.save(&result)?;

        info!(id = %id, owner, "generation stored");
        Ok((id, result))
    }

    /// The full bundle for a topic: all three document types, in
    /// teaching order, sequentially. Fails fast on the first error;
    /// documents stored before the failure remain stored.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate_one`], plus [`CoreError::Config`] for a
    /// blank topic.
    pub async fn generate_bundle(
        &self,
        owner: &str,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<(RecordId, GenerationResult)>, PipelineError> {
        let mut generated = Vec::with_capacity(DocumentType::all().len());
        for doc_type in DocumentType::all() {
            let request = GenerationRequest::new(topic, difficulty, *doc_type)
                .map_err(PipelineError::Core)?;
            generated.push(self.generate_one(owner, request).await?);
        }
        info!(owner, topic, count = generated.len(), "bundle generated");
        Ok(generated)
    }
}
