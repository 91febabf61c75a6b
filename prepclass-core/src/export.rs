//! Export of stored generation records to downloadable formats.
//!
//! Rendering is behind the [`DocumentRenderer`] trait so formats stay
//! pluggable and tests can substitute a failing renderer. The built-in
//! set covers PDF (printpdf, builtin Helvetica) and Markdown.

use std::collections::HashMap;
use std::time::Instant;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::types::{GenerationResult, RecordId};

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// A supported export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Paged PDF output.
    Pdf,
    /// Raw Markdown with a metadata heading.
    Markdown,
}

impl ExportFormat {
    /// All built-in formats.
    #[must_use]
    pub fn all() -> &'static [ExportFormat] {
        &[Self::Pdf, Self::Markdown]
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "md",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(CoreError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A rendered export, ready to hand to the caller for download.
///
/// Derived data: never persisted independently of its source record.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// The stored record this artifact was rendered from.
    pub record_id: RecordId,
    /// Output format.
    pub format: ExportFormat,
    /// Suggested download filename.
    pub filename: String,
    /// The rendered bytes.
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Turns one [`GenerationResult`] into output bytes for one format.
pub trait DocumentRenderer {
    /// Render the record body.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Render`] when output cannot be produced.
    fn render(&self, result: &GenerationResult) -> Result<Vec<u8>>;
}

/// Markdown renderer: metadata heading plus the generated text verbatim.
#[derive(Debug, Default)]
pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, result: &GenerationResult) -> Result<Vec<u8>> {
        let out = format!(
            "# {}: {}\n\n_Difficulty: {} · generated {}_\n\n{}\n",
            result.request.document_type.title(),
            result.request.topic,
            result.request.difficulty,
            result.created_at.to_rfc3339(),
            result.generated_text,
        );
        Ok(out.into_bytes())
    }
}

/// PDF renderer: A4 pages, Helvetica, bold headings, word wrap.
#[derive(Debug, Default)]
pub struct PdfRenderer;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const WRAP_COLS: usize = 90;

impl DocumentRenderer for PdfRenderer {
    fn render(&self, result: &GenerationResult) -> Result<Vec<u8>> {
        let title = format!(
            "{}: {}",
            result.request.document_type.title(),
            result.request.topic
        );

        let (doc, first_page, first_layer) =
            PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        let body_font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold_font = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        let mut layer = doc.get_page(first_page).get_layer(first_layer);
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

        let header = format!(
            "{} ({} level)",
            title,
            result.request.difficulty.marker()
        );
        layer.use_text(clean_latin1(&header), 14.0, Mm(MARGIN_MM), Mm(y), &bold_font);
        y -= LINE_HEIGHT_MM * 2.0;

        for raw_line in result.generated_text.lines() {
            let line = clean_latin1(raw_line);
            let trimmed = line.trim();

            if trimmed.is_empty() {
                y -= LINE_HEIGHT_MM * 0.5;
                continue;
            }

            let (font, size) = if is_heading(trimmed) {
                (&bold_font, 13.0)
            } else {
                (&body_font, 11.0)
            };

            for wrapped in wrap_line(trimmed, WRAP_COLS) {
                if y < MARGIN_MM {
                    let (page, page_layer) =
                        doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
                    layer = doc.get_page(page).get_layer(page_layer);
                    y = PAGE_HEIGHT_MM - MARGIN_MM;
                }
                layer.use_text(wrapped, size, Mm(MARGIN_MM), Mm(y), font);
                y -= LINE_HEIGHT_MM;
            }
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

fn pdf_error(e: printpdf::Error) -> CoreError {
    CoreError::Render {
        format: "pdf".to_string(),
        reason: e.to_string(),
    }
}

/// Section-heading heuristic: markdown `#` headers or `Label:` lines.
fn is_heading(line: &str) -> bool {
    line.starts_with('#') || line.ends_with(':')
}

/// Builtin PDF fonts are WinAnsi-encoded; replace anything outside
/// Latin-1 the same way the rest of the toolkit's exports do.
fn clean_latin1(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 256 { c } else { '?' })
        .collect()
}

/// Greedy word wrap at `max_cols` characters.
fn wrap_line(line: &str, max_cols: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let separator = usize::from(!current.is_empty());
        if !current.is_empty()
            && current.chars().count() + separator + word.chars().count() > max_cols
        {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Registry of renderers keyed by [`ExportFormat`].
pub struct Exporter {
    renderers: HashMap<ExportFormat, Box<dyn DocumentRenderer>>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("formats", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::with_default_renderers()
    }
}

impl Exporter {
    /// An exporter with no renderers registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// An exporter with the built-in PDF and Markdown renderers.
    #[must_use]
    pub fn with_default_renderers() -> Self {
        let mut exporter = Self::new();
        exporter.register(ExportFormat::Pdf, Box::new(PdfRenderer));
        exporter.register(ExportFormat::Markdown, Box::new(MarkdownRenderer));
        exporter
    }

    /// Register (or replace) the renderer for a format.
    pub fn register(&mut self, format: ExportFormat, renderer: Box<dyn DocumentRenderer>) {
        self.renderers.insert(format, renderer);
    }

    /// Render a stored record into an [`ExportArtifact`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedFormat`] when no renderer is
    /// registered for `format`, or the renderer's [`CoreError::Render`].
    pub fn export(
        &self,
        result: &GenerationResult,
        record_id: RecordId,
        format: ExportFormat,
    ) -> Result<ExportArtifact> {
        let renderer = self
            .renderers
            .get(&format)
            .ok_or_else(|| CoreError::UnsupportedFormat(format.to_string()))?;

        let start = Instant::now();
        let bytes = renderer.render(result)?;

        debug!(
            id = %record_id,
            format = %format,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "record exported"
        );

        Ok(ExportArtifact {
            record_id,
            format,
            filename: suggested_filename(result, format),
            bytes,
        })
    }
}

/// `{doc_type}_{sanitized_topic}.{ext}` — e.g. `pre_class_sql_joins.pdf`.
#[must_use]
pub fn suggested_filename(result: &GenerationResult, format: ExportFormat) -> String {
    let topic: String = result
        .request
        .topic
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}_{topic}.{}",
        result.request.document_type,
        format.extension()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, DocumentType, GenerationRequest};

    fn sample() -> GenerationResult {
        let request = GenerationRequest::new(
            "Binary Search Trees",
            Difficulty::Beginner,
            DocumentType::PreClass,
        )
        .expect("valid request");
        GenerationResult::assemble(
            request,
            "# Overview\n\nA binary search tree keeps keys ordered.\n\nKey Concepts:\nInsertion and lookup are O(log n) on balanced trees.",
            "mentor",
        )
    }

    struct FailingRenderer;

    impl DocumentRenderer for FailingRenderer {
        fn render(&self, _result: &GenerationResult) -> Result<Vec<u8>> {
            Err(CoreError::Render {
                format: "pdf".to_string(),
                reason: "forced failure".to_string(),
            })
        }
    }

    #[test]
    fn format_from_str() {
        assert_eq!("pdf".parse::<ExportFormat>().expect("parse"), ExportFormat::Pdf);
        assert_eq!("md".parse::<ExportFormat>().expect("parse"), ExportFormat::Markdown);
        let err = "docx".parse::<ExportFormat>().expect_err("must fail");
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn markdown_render_carries_metadata_and_body() {
        let result = sample();
        let bytes = MarkdownRenderer.render(&result).expect("render");
        let text = String::from_utf8(bytes).expect("utf8");

        assert!(text.contains("Binary Search Trees"));
        assert!(text.contains("Beginner"));
        assert!(text.contains("keeps keys ordered"));
    }

    #[test]
    fn pdf_render_produces_nonempty_pdf_bytes() {
        let result = sample();
        let bytes = PdfRenderer.render(&result).expect("render");

        assert!(!bytes.is_empty());
        assert!(bytes.starts_with(b"%PDF"), "should be a PDF header");
    }

    #[test]
    fn export_unregistered_format_is_unsupported() {
        let mut exporter = Exporter::new();
        exporter.register(ExportFormat::Markdown, Box::new(MarkdownRenderer));

        let err = exporter
            .export(&sample(), RecordId(1), ExportFormat::Pdf)
            .expect_err("must fail");
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn export_surfaces_renderer_failure() {
        let mut exporter = Exporter::new();
        exporter.register(ExportFormat::Pdf, Box::new(FailingRenderer));

        let err = exporter
            .export(&sample(), RecordId(1), ExportFormat::Pdf)
            .expect_err("must fail");
        assert!(matches!(err, CoreError::Render { .. }));
    }

    #[test]
    fn export_builds_artifact_with_filename() {
        let exporter = Exporter::with_default_renderers();
        let artifact = exporter
            .export(&sample(), RecordId(7), ExportFormat::Markdown)
            .expect("export");

        assert_eq!(artifact.record_id, RecordId(7));
        assert_eq!(artifact.filename, "pre_class_binary_search_trees.md");
        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn wrap_line_respects_column_limit() {
        let wrapped = wrap_line("one two three four five six seven", 12);
        assert!(wrapped.len() > 1);
        for piece in &wrapped {
            assert!(piece.chars().count() <= 12, "'{piece}' exceeds limit");
        }
    }

    #[test]
    fn heading_heuristic() {
        assert!(is_heading("# Overview"));
        assert!(is_heading("Key Concepts:"));
        assert!(!is_heading("Plain prose line."));
    }
}
