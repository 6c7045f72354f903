use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::generation::engine::EngineConfig;
use crate::render::assets::PublicUrlPolicy;

/// Layouts shipped with the crate.
const DEFAULT_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

/// Application configuration loaded from environment variables.
/// Every variable has a local-development default.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Explicit public backend URL. Wins over everything else.
    pub backend_url: Option<String>,
    /// External URL injected by the hosting platform.
    pub render_external_url: Option<String>,
    /// CORS allow-list for the browser frontend.
    pub frontend_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub chrome_no_sandbox: bool,
    pub chrome_args: Vec<String>,
    pub pdf_idle_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let idle_secs = optional_env("PDF_IDLE_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("PDF_IDLE_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(30);

        Ok(Config {
            port: optional_env("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            backend_url: optional_env("BACKEND_URL"),
            render_external_url: optional_env("RENDER_EXTERNAL_URL"),
            frontend_origins: split_list(
                &optional_env("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_string()),
                ',',
            ),
            upload_dir: optional_env("UPLOAD_DIR")
                .unwrap_or_else(|| "uploads".to_string())
                .into(),
            templates_dir: optional_env("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR)),
            chrome_path: optional_env("CHROME_PATH").map(PathBuf::from),
            chrome_no_sandbox: optional_env("CHROME_NO_SANDBOX")
                .map(|v| parse_flag(&v))
                .transpose()
                .context("CHROME_NO_SANDBOX must be true/false")?
                .unwrap_or(false),
            chrome_args: optional_env("CHROME_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            pdf_idle_timeout: Duration::from_secs(idle_secs),
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Launch options for the per-request rendering engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            executable: self.chrome_path.clone(),
            sandbox: !self.chrome_no_sandbox,
            extra_args: self.chrome_args.clone(),
            idle_timeout: self.pdf_idle_timeout,
            ..EngineConfig::default()
        }
    }

    pub fn public_url_policy(&self) -> PublicUrlPolicy {
        PublicUrlPolicy::new(
            self.backend_url.clone(),
            self.render_external_url.clone(),
            self.port,
        )
    }
}

/// Reads an env var, treating unset and blank the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised flag value '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_drops_trailing_slash() {
        let origins = split_list(" http://localhost:5173/ , https://resume.example.com,, ", ',');
        assert_eq!(
            origins,
            vec![
                "http://localhost:5173".to_string(),
                "https://resume.example.com".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_flag_accepts_common_spellings() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
