//! Rendering engine — rasterizes an HTML string into PDF bytes.
//!
//! `ChromiumEngine` provisions a headless Chromium per call and tears it
//! down before returning, whatever the outcome. Nothing is pooled.
//!
//! `AppState` holds the engine behind `Arc<dyn PdfEngine>`, so tests can
//! swap in a stub without a browser on the machine.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::generation::generator::GenerationError;

/// ISO A4 in inches, the unit `Page.printToPDF` expects.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

/// True once the document has loaded and every image has settled
/// (loaded or failed).
const IDLE_PROBE: &str = "document.readyState === 'complete' \
    && Array.from(document.images).every((img) => img.complete)";
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// The probe must hold across this window before we print.
const IDLE_QUIET_WINDOW: Duration = Duration::from_millis(500);

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Returns the complete PDF for `html`. Never returns partial output.
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Browser binary. `None` lets chromiumoxide look in the usual places.
    pub executable: Option<PathBuf>,
    /// Chromium's own sandbox. Containers running as root need it off.
    pub sandbox: bool,
    pub extra_args: Vec<String>,
    pub launch_timeout: Duration,
    pub idle_timeout: Duration,
    pub margin_inches: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: None,
            sandbox: true,
            extra_args: Vec::new(),
            launch_timeout: Duration::from_secs(20),
            idle_timeout: Duration::from_secs(30),
            margin_inches: 0.4,
        }
    }
}

impl EngineConfig {
    fn browser_config(&self, profile_dir: &std::path::Path) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .launch_timeout(self.launch_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .args(self.extra_args.iter().cloned());

        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.sandbox {
            builder = builder.no_sandbox();
        }

        builder.build()
    }

    fn print_params(&self) -> PrintToPdfParams {
        PrintToPdfParams {
            print_background: Some(true),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: Some(self.margin_inches),
            margin_bottom: Some(self.margin_inches),
            margin_left: Some(self.margin_inches),
            margin_right: Some(self.margin_inches),
            prefer_css_page_size: Some(false),
            ..PrintToPdfParams::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ChromiumEngine
// ────────────────────────────────────────────────────────────────────────────

pub struct ChromiumEngine {
    config: EngineConfig,
}

impl ChromiumEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PdfEngine for ChromiumEngine {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, GenerationError> {
        let session = EngineSession::launch(&self.config).await?;
        let result = session.print(html, &self.config).await;
        session.shutdown().await;
        result
    }
}

/// One browser process with its own throwaway profile directory.
///
/// `shutdown` is the normal exit. If the session is dropped instead (panic,
/// cancelled future) the handler task is aborted, chromiumoxide kills the
/// child process, and the profile directory is removed.
struct EngineSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl EngineSession {
    async fn launch(config: &EngineConfig) -> Result<Self, GenerationError> {
        let profile = tempfile::Builder::new()
            .prefix("resume-chromium-")
            .tempdir()
            .map_err(|e| GenerationError::EngineLaunch(format!("profile directory: {e}")))?;

        let browser_config = config
            .browser_config(profile.path())
            .map_err(GenerationError::EngineLaunch)?;

        let (browser, mut events) = Browser::launch(browser_config)
            .await
            .map_err(|e| GenerationError::EngineLaunch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("Chromium event loop stopped: {e}");
                    break;
                }
            }
        });

        debug!(profile = %profile.path().display(), "Chromium launched");

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    async fn print(&self, html: &str, config: &EngineConfig) -> Result<Vec<u8>, GenerationError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| GenerationError::Render(format!("open page: {e}")))?;

        page.set_content(html)
            .await
            .map_err(|e| GenerationError::Render(format!("load content: {e}")))?;

        wait_for_network_idle(&page, config.idle_timeout).await?;

        let pdf = page
            .pdf(config.print_params())
            .await
            .map_err(|e| GenerationError::Render(format!("print to pdf: {e}")))?;

        if let Err(e) = page.close().await {
            debug!("Closing page failed: {e}");
        }

        Ok(pdf)
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Chromium close failed, killing process: {e}");
            if let Some(Err(e)) = self.browser.kill().await {
                warn!("Chromium kill failed: {e}");
            }
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Waiting for Chromium exit failed: {e}");
        }
        self.handler.abort();
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Polls the page until `IDLE_PROBE` holds on both ends of a quiet window.
async fn wait_for_network_idle(page: &Page, timeout: Duration) -> Result<(), GenerationError> {
    let wait = async {
        let mut settled_once = false;
        loop {
            let ready: bool = page
                .evaluate(IDLE_PROBE)
                .await
                .map_err(|e| GenerationError::Render(format!("idle probe: {e}")))?
                .into_value()
                .map_err(|e| GenerationError::Render(format!("idle probe result: {e}")))?;

            match (ready, settled_once) {
                (true, true) => return Ok::<(), GenerationError>(()),
                (true, false) => {
                    settled_once = true;
                    tokio::time::sleep(IDLE_QUIET_WINDOW).await;
                }
                (false, _) => {
                    settled_once = false;
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                }
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| GenerationError::NetworkIdleTimeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::generator::DocumentGenerator;
    use crate::models::{Education, Experience, Personal, ResumeDocument};
    use std::sync::Arc;

    #[test]
    fn test_print_params_are_a4_with_background() {
        let params = EngineConfig::default().print_params();
        assert_eq!(params.paper_width, Some(8.27));
        assert_eq!(params.paper_height, Some(11.69));
        assert_eq!(params.print_background, Some(true));
        assert_eq!(params.margin_top, Some(0.4));
        assert_eq!(params.margin_left, Some(0.4));
    }

    #[test]
    fn test_engine_defaults_keep_sandbox_on() {
        let config = EngineConfig::default();
        assert!(config.sandbox);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
    }

    /// Drives a real browser. Returns early on machines without one.
    #[tokio::test]
    async fn test_chromium_renders_resume_pdf() {
        let config = EngineConfig {
            executable: std::env::var_os("CHROME_PATH").map(PathBuf::from),
            sandbox: false,
            ..EngineConfig::default()
        };
        let probe_dir = tempfile::tempdir().unwrap();
        if config.browser_config(probe_dir.path()).is_err() {
            eprintln!("skipping: no Chromium executable found");
            return;
        }

        let generator = DocumentGenerator::new(
            concat!(env!("CARGO_MANIFEST_DIR"), "/templates"),
            Arc::new(ChromiumEngine::new(config)),
        );
        let document = ResumeDocument {
            personal: Personal {
                name: "Grace Hopper".into(),
                email: "grace@example.com".into(),
                ..Personal::default()
            },
            experience: vec![Experience {
                position: "Rear Admiral".into(),
                company: "US Navy".into(),
                ..Experience::default()
            }],
            education: vec![Education {
                degree: "PhD Mathematics".into(),
                institution: "Yale".into(),
                ..Education::default()
            }],
            ..ResumeDocument::default()
        };

        let pdf = match generator.generate(&document, "http://localhost:5000").await {
            Err(GenerationError::EngineLaunch(e)) => {
                eprintln!("skipping: Chromium could not start: {e}");
                return;
            }
            other => other.expect("generation should succeed"),
        };

        assert!(!pdf.is_empty());
        assert!(pdf.starts_with(b"%PDF-"));

        let text = pdf_extract::extract_text_from_mem(&pdf).unwrap_or_default();
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        assert!(compact.contains("Hopper"), "extracted text: {text}");
    }
}
