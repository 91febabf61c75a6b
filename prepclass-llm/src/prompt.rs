//! Prompt templates for the three PrepClass document types.
//!
//! Every prompt is a fixed, testable artifact: same request in, same
//! rendered prompt out. Templates carry their own token ceiling and
//! temperature; the model, endpoint and timeout come from client config.

use prepclass_core::types::{DocumentType, GenerationRequest};

/// Fixed system prompt establishing the mentor persona.
pub const SYSTEM_PROMPT: &str = "You are an expert computer science mentor preparing undergraduate students for placement interviews.";

/// Pre-class preparation document template.
pub const PRE_CLASS_USER: &str = r"Create a comprehensive pre-class document for {difficulty} level undergraduate students preparing for placement interviews.
Topic: {topic}

Document should include:
1. Brief overview (1 paragraph)
2. 5 key concepts with concise explanations
3. Prerequisite knowledge required
4. Real-world applications (2-3 examples)
5. Recommended pre-reading (3-5 bullet points)
6. Common interview questions related to the topic

Format as a structured document with clear headings. Use academic but accessible language.";

/// One-hour lesson plan template.
pub const IN_CLASS_USER: &str = r"Create a detailed 1-hour lesson plan for teaching {topic} to {difficulty} level students.

Structure:
1. Learning objectives (3-5 bullet points)
2. Time-allocated session breakdown:
   - Introduction (5 minutes)
   - Core concept explanation (15 minutes)
   - Practical example walkthrough (20 minutes)
   - Student practice activity (15 minutes)
   - Q&A and summary (5 minutes)
3. Teaching tips and common pitfalls
4. Required materials/resources
5. Engagement strategies for each section
6. Whiteboard diagrams/examples to use";

/// Post-class quiz and follow-up template.
pub const POST_CLASS_USER: &str = r"Create a post-class document for {topic} at {difficulty} level including:

1. Key takeaways summary (1 paragraph)
2. 8-question quiz (4 MCQ, 2 true/false, 2 short answer) with solutions
3. Additional practice problems (3-5) with difficulty ratings
4. Recommended next steps/resources for further learning
5. Common mistakes to avoid in interviews

Format with clear section headings.";

/// A canned template plus its sampling parameters.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// User prompt template (contains `{topic}`/`{difficulty}`).
    pub user: &'static str,
}

const PRE_CLASS_TEMPLATE: PromptTemplate = PromptTemplate {
    max_tokens: 1200,
    temperature: 0.3,
    user: PRE_CLASS_USER,
};

const IN_CLASS_TEMPLATE: PromptTemplate = PromptTemplate {
    max_tokens: 1600,
    temperature: 0.3,
    user: IN_CLASS_USER,
};

const POST_CLASS_TEMPLATE: PromptTemplate = PromptTemplate {
    max_tokens: 1400,
    temperature: 0.3,
    user: POST_CLASS_USER,
};

/// The builtin template for a document type.
#[must_use]
pub fn template(doc_type: DocumentType) -> &'static PromptTemplate {
    match doc_type {
        DocumentType::PreClass => &PRE_CLASS_TEMPLATE,
        DocumentType::InClass => &IN_CLASS_TEMPLATE,
        DocumentType::PostClass => &POST_CLASS_TEMPLATE,
    }
}

/// A fully-rendered prompt, ready for the completion client.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PromptRequest {
    /// System prompt (mentor persona).
    pub system: String,
    /// Rendered user prompt.
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Simple template interpolation: replaces `{key}` with its value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Render the prompt for a validated request.
///
/// Pure and deterministic: identical requests yield identical prompts.
/// Enum inputs were validated at the boundary, so there is nothing left
/// to fail here.
#[must_use]
pub fn build_prompt(request: &GenerationRequest) -> PromptRequest {
    let tpl = template(request.document_type);
    let vars = [
        ("topic", request.topic.as_str()),
        ("difficulty", request.difficulty.marker()),
    ];

    PromptRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: render_template(tpl.user, &vars),
        max_tokens: tpl.max_tokens,
        temperature: tpl.temperature,
    }
}
