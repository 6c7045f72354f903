//! Asset resolution — turns the `personal.photo` value into a URL the
//! rendering engine can fetch, and decides which public base URL this
//! backend is reachable at.
//!
//! Base URL resolution order:
//! 1. `BACKEND_URL` (explicit configuration)
//! 2. `RENDER_EXTERNAL_URL` (platform-provided)
//! 3. the request (`X-Forwarded-Proto` / `X-Forwarded-Host` / `Host`)
//! 4. `http://localhost:<PORT>`

use axum::http::{header, HeaderMap};

/// Hosts that only make sense on a developer machine. A photo URL baked
/// with one of these is stale once the backend runs anywhere else.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

// ────────────────────────────────────────────────────────────────────────────
// Public base URL
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PublicUrlPolicy {
    configured: Option<String>,
    platform: Option<String>,
    port: u16,
}

impl PublicUrlPolicy {
    pub fn new(configured: Option<String>, platform: Option<String>, port: u16) -> Self {
        Self {
            configured: configured.map(|u| u.trim_end_matches('/').to_string()),
            platform: platform.map(|u| u.trim_end_matches('/').to_string()),
            port,
        }
    }

    /// Returns the externally visible base URL for this request, without a trailing slash.
    pub fn resolve(&self, headers: &HeaderMap) -> String {
        if let Some(url) = self.configured.as_ref().or(self.platform.as_ref()) {
            return url.clone();
        }

        let host = first_header_value(headers, "x-forwarded-host")
            .or_else(|| first_header_value(headers, header::HOST.as_str()));

        match host {
            Some(host) => {
                let scheme =
                    first_header_value(headers, "x-forwarded-proto").unwrap_or_else(|| "http".into());
                format!("{scheme}://{host}")
            }
            None => format!("http://localhost:{}", self.port),
        }
    }
}

/// First comma-separated value of a header; proxies append to forwarded headers.
fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Photo URL
// ────────────────────────────────────────────────────────────────────────────

/// Resolves a photo reference against `base`.
///
/// - blank → `None`
/// - `data:` URI → unchanged
/// - absolute http(s) URL → unchanged, unless it points at a loopback host
///   while `base` does not; then its origin is swapped for `base`
/// - anything else → `<base>/<path>` with exactly one slash between
pub fn resolve_photo_url(photo: &str, base: &str) -> Option<String> {
    let photo = photo.trim();
    if photo.is_empty() {
        return None;
    }
    if has_prefix_ignore_case(photo, "data:") {
        return Some(photo.to_string());
    }

    let base = base.trim_end_matches('/');

    if let Some((origin, rest)) = split_origin(photo) {
        let base_is_local = split_origin(base)
            .map(|(base_origin, _)| is_loopback_origin(base_origin))
            .unwrap_or(false);
        if is_loopback_origin(origin) && !base_is_local {
            return Some(format!("{base}{rest}"));
        }
        return Some(photo.to_string());
    }

    Some(format!("{base}/{}", photo.trim_start_matches('/')))
}

/// Splits an absolute http(s) URL into `(origin, path-query-fragment)`.
fn split_origin(url: &str) -> Option<(&str, &str)> {
    let scheme_len = if has_prefix_ignore_case(url, "https://") {
        "https://".len()
    } else if has_prefix_ignore_case(url, "http://") {
        "http://".len()
    } else {
        return None;
    };

    let end = url[scheme_len..]
        .find(|c| matches!(c, '/' | '?' | '#'))
        .map(|i| i + scheme_len)
        .unwrap_or(url.len());
    Some(url.split_at(end))
}

fn is_loopback_origin(origin: &str) -> bool {
    let authority = origin.split("://").nth(1).unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();
    let host = if authority.starts_with('[') {
        authority.split(']').next().map(|h| format!("{h}]"))
    } else {
        authority.split(':').next().map(str::to_string)
    };
    host.map(|h| LOOPBACK_HOSTS.contains(&h.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}
