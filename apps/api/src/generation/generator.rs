//! Document Generator — orchestrates the PDF pipeline.
//!
//! Flow: select template variant → read layout file → resolve photo URL →
//!       render HTML → `PdfEngine::render_pdf` → verify PDF signature.
//!
//! One code path, configured by the templates directory, the engine behind
//! the trait, and the public base URL passed per request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::generation::engine::PdfEngine;
use crate::models::ResumeDocument;
use crate::render::{render_resume, resolve_photo_url, TemplateVariant};

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("Template '{path}' could not be read: {source}")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rendering engine failed to launch: {0}")]
    EngineLaunch(String),

    #[error("Page did not reach network idle within {0:?}")]
    NetworkIdleTimeout(Duration),

    #[error("Rendering engine failed: {0}")]
    Render(String),

    #[error("Rendering engine returned no PDF data")]
    EmptyOutput,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

pub struct DocumentGenerator {
    templates_dir: PathBuf,
    engine: Arc<dyn PdfEngine>,
}

impl DocumentGenerator {
    pub fn new(templates_dir: impl Into<PathBuf>, engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            engine,
        }
    }

    /// Reads the layout file for `variant` from disk.
    /// Read on every call so layout edits apply without a restart.
    pub async fn load_layout(&self, variant: TemplateVariant) -> Result<String, GenerationError> {
        let path = self.templates_dir.join(variant.file_name());
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| GenerationError::TemplateUnreadable { path, source })
    }

    /// Renders the document to a complete HTML page. Used for live preview
    /// and as the first half of `generate`.
    pub async fn render_html(
        &self,
        document: &ResumeDocument,
        public_base: &str,
    ) -> Result<String, GenerationError> {
        let variant = TemplateVariant::from_selector(&document.template)
            .ok_or_else(|| GenerationError::UnknownTemplate(document.template.clone()))?;
        let layout = self.load_layout(variant).await?;
        let photo = resolve_photo_url(&document.personal.photo, public_base);

        debug!(
            template = variant.as_str(),
            photo = photo.as_deref().unwrap_or("-"),
            "Rendering resume HTML"
        );

        Ok(render_resume(&layout, document, photo.as_deref()))
    }

    /// Runs the full pipeline and returns the PDF bytes.
    pub async fn generate(
        &self,
        document: &ResumeDocument,
        public_base: &str,
    ) -> Result<Vec<u8>, GenerationError> {
        let html = self.render_html(document, public_base).await?;
        let pdf = self.engine.render_pdf(&html).await?;

        if !pdf.starts_with(PDF_SIGNATURE) {
            return Err(GenerationError::EmptyOutput);
        }

        info!(
            html_bytes = html.len(),
            pdf_bytes = pdf.len(),
            "Resume PDF generated"
        );
        Ok(pdf)
    }
}

/// `Content-Disposition` filename for a resume owner.
///
/// Whitespace runs become `_`, the result is lowercased, and anything
/// outside `[a-z0-9_.-]` is dropped so the header stays a plain token.
pub fn attachment_filename(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let stem = cleaned.trim_matches(|c| c == '.' || c == '_');

    if stem.is_empty() {
        "resume.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Education, Experience, Personal};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TEMPLATES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

    /// Records the HTML it was given and answers with a minimal PDF.
    #[derive(Default)]
    struct RecordingEngine {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PdfEngine for RecordingEngine {
        async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, GenerationError> {
            self.seen.lock().unwrap().push(html.to_string());
            Ok(b"%PDF-1.7\n%%EOF\n".to_vec())
        }
    }

    struct GarbageEngine;

    #[async_trait]
    impl PdfEngine for GarbageEngine {
        async fn render_pdf(&self, _html: &str) -> Result<Vec<u8>, GenerationError> {
            Ok(Vec::new())
        }
    }

    fn one_of_each() -> ResumeDocument {
        ResumeDocument {
            personal: Personal {
                name: "Ada Lovelace".into(),
                photo: "uploads/photo-1-2.jpg".into(),
                ..Personal::default()
            },
            experience: vec![Experience {
                position: "Analyst".into(),
                ..Experience::default()
            }],
            education: vec![Education {
                degree: "Mathematics".into(),
                ..Education::default()
            }],
            ..ResumeDocument::default()
        }
    }

    #[tokio::test]
    async fn test_generate_passes_rendered_html_to_engine() {
        let engine = Arc::new(RecordingEngine::default());
        let generator = DocumentGenerator::new(TEMPLATES, engine.clone());

        let pdf = generator
            .generate(&one_of_each(), "https://api.example.com/")
            .await
            .unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("src=\"https://api.example.com/uploads/photo-1-2.jpg\""));
        assert!(seen[0].contains("Professional Experience"));
        assert!(seen[0].contains("Education"));
    }

    #[tokio::test]
    async fn test_unknown_template_is_rejected_before_rendering() {
        let engine = Arc::new(RecordingEngine::default());
        let generator = DocumentGenerator::new(TEMPLATES, engine.clone());
        let doc = ResumeDocument {
            template: "classic".into(),
            ..ResumeDocument::default()
        };

        let err = generator.generate(&doc, "http://localhost:5000").await.unwrap_err();

        assert!(matches!(err, GenerationError::UnknownTemplate(ref t) if t == "classic"));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_file_is_reported() {
        let empty = tempfile::tempdir().unwrap();
        let generator = DocumentGenerator::new(empty.path(), Arc::new(RecordingEngine::default()));

        let err = generator
            .generate(&ResumeDocument::default(), "http://localhost:5000")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::TemplateUnreadable { .. }));
        assert!(err.to_string().contains("modern.html"));
    }

    #[tokio::test]
    async fn test_non_pdf_output_is_never_returned() {
        let generator = DocumentGenerator::new(TEMPLATES, Arc::new(GarbageEngine));
        let err = generator
            .generate(&one_of_each(), "http://localhost:5000")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyOutput));
    }

    #[test]
    fn test_attachment_filename_sanitizes_name() {
        assert_eq!(attachment_filename("Ada  Lovelace"), "ada_lovelace.pdf");
        assert_eq!(attachment_filename("José \"Pepe\" Núñez"), "jos_pepe_nez.pdf");
        assert_eq!(attachment_filename("   "), "resume.pdf");
        assert_eq!(attachment_filename("../.."), "resume.pdf");
        assert_eq!(attachment_filename("a\r\nb"), "a_b.pdf");
    }
}
