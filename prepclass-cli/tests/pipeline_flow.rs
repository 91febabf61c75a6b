//! End-to-end pipeline flows against a mocked completion service.
//!
//! No network: the mock stands in for the completion API so the
//! build-prompt → generate → assemble → persist chain can be verified,
//! including the guarantee that failures store nothing.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use prepclass_cli::{GenerationPipeline, PipelineError};
use prepclass_core::export::{ExportFormat, Exporter};
use prepclass_core::store::SessionStore;
use prepclass_core::types::{Difficulty, DocumentType, GenerationRequest};
use prepclass_llm::{CompletionService, GenError, PromptRequest};

struct MockCompletion {
    replies: Mutex<VecDeque<Result<String, GenError>>>,
    seen_prompts: Mutex<Vec<PromptRequest>>,
}

impl MockCompletion {
    fn new(replies: Vec<Result<String, GenError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen_prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, prompt: &PromptRequest) -> Result<String, GenError> {
        self.seen_prompts
            .lock()
            .expect("prompt log lock")
            .push(prompt.clone());
        self.replies
            .lock()
            .expect("reply queue lock")
            .pop_front()
            .unwrap_or_else(|| Ok("unscripted reply".to_string()))
    }
}

#[tokio::test]
async fn successful_generation_is_assembled_and_stored() {
    let store = SessionStore::open_in_memory().expect("open");
    let mock = MockCompletion::new(vec![Ok("T".to_string())]);
    let pipeline = GenerationPipeline::new(&mock, &store);

    let request = GenerationRequest::new(
        "Binary Search Trees",
        Difficulty::Beginner,
        DocumentType::PreClass,
    )
    .expect("valid request");

    let (id, result) = pipeline
        .generate_one("mentor", request.clone())
        .await
        .expect("generation succeeds");

    assert_eq!(result.generated_text, "T");
    assert_eq!(result.request, request);

    let stored = store.get_by_id(id).expect("stored");
    assert_eq!(stored.generated_text, "T");
    assert_eq!(stored.request.topic, "Binary Search Trees");

    let prompts = mock.seen_prompts.lock().expect("lock");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("Binary Search Trees"));
    assert!(prompts[0].user.contains("beginner"));
}

#[tokio::test]
async fn auth_failure_assembles_and_stores_nothing() {
    let store = SessionStore::open_in_memory().expect("open");
    let mock = MockCompletion::new(vec![Err(GenError::Auth("invalid api key".into()))]);
    let pipeline = GenerationPipeline::new(&mock, &store);

    let request = GenerationRequest::new(
        "Binary Search Trees",
        Difficulty::Beginner,
        DocumentType::PreClass,
    )
    .expect("valid request");

    let err = pipeline
        .generate_one("mentor", request)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err,
        PipelineError::Generation(GenError::Auth(_))
    ));
    assert_eq!(store.count_by_owner("mentor").expect("count"), 0);
}

#[tokio::test]
async fn bundle_generates_all_three_documents_in_order() {
    let store = SessionStore::open_in_memory().expect("open");
    let mock = MockCompletion::new(vec![
        Ok("pre body".to_string()),
        Ok("in body".to_string()),
        Ok("post body".to_string()),
    ]);
    let pipeline = GenerationPipeline::new(&mock, &store);

    let generated = pipeline
        .generate_bundle("mentor", "SQL Joins", Difficulty::Intermediate)
        .await
        .expect("bundle succeeds");

    assert_eq!(generated.len(), 3);
    let doc_types: Vec<_> = generated
        .iter()
        .map(|(_, r)| r.request.document_type)
        .collect();
    assert_eq!(
        doc_types,
        vec![
            DocumentType::PreClass,
            DocumentType::InClass,
            DocumentType::PostClass
        ]
    );
    assert_eq!(store.count_by_owner("mentor").expect("count"), 3);

    let latest = store
        .latest_for_topic("mentor", "SQL Joins")
        .expect("latest");
    assert_eq!(latest.len(), 3);
}

#[tokio::test]
async fn bundle_fails_fast_and_keeps_earlier_documents() {
    let store = SessionStore::open_in_memory().expect("open");
    let mock = MockCompletion::new(vec![
        Ok("pre body".to_string()),
        Err(GenError::RateLimit("slow down".into())),
    ]);
    let pipeline = GenerationPipeline::new(&mock, &store);

    let err = pipeline
        .generate_bundle("mentor", "SQL Joins", Difficulty::Intermediate)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err,
        PipelineError::Generation(GenError::RateLimit(_))
    ));
    // The pre-class document completed before the failure and stays stored.
    assert_eq!(store.count_by_owner("mentor").expect("count"), 1);
    assert_eq!(
        mock.seen_prompts.lock().expect("lock").len(),
        2,
        "no further calls after the failure"
    );
}

#[tokio::test]
async fn blank_topic_fails_before_any_completion_call() {
    let store = SessionStore::open_in_memory().expect("open");
    let mock = MockCompletion::new(vec![]);
    let pipeline = GenerationPipeline::new(&mock, &store);

    let err = pipeline
        .generate_bundle("mentor", "   ", Difficulty::Beginner)
        .await
        .expect_err("must fail");

    assert!(matches!(err, PipelineError::Core(_)));
    assert!(mock.seen_prompts.lock().expect("lock").is_empty());
    assert_eq!(store.count_by_owner("mentor").expect("count"), 0);
}

#[tokio::test]
async fn stored_record_exports_to_pdf_and_markdown() {
    let store = SessionStore::open_in_memory().expect("open");
    let mock = MockCompletion::new(vec![Ok(
        "# Overview\n\nJoins combine rows across tables.\n\nKey Concepts:\nInner joins keep matches only.".to_string(),
    )]);
    let pipeline = GenerationPipeline::new(&mock, &store);

    let request = GenerationRequest::new(
        "SQL Joins",
        Difficulty::Intermediate,
        DocumentType::PostClass,
    )
    .expect("valid request");
    let (id, _) = pipeline
        .generate_one("mentor", request)
        .await
        .expect("generation succeeds");

    let result = store.get_by_id(id).expect("stored");
    let exporter = Exporter::with_default_renderers();

    let pdf = exporter
        .export(&result, id, ExportFormat::Pdf)
        .expect("pdf export");
    assert!(pdf.bytes.starts_with(b"%PDF"));
    assert!(!pdf.bytes.is_empty());

    let md = exporter
        .export(&result, id, ExportFormat::Markdown)
        .expect("markdown export");
    let text = String::from_utf8(md.bytes).expect("utf8");
    assert!(text.contains("SQL Joins"));
    assert!(text.contains("Inner joins keep matches only."));
}
