use std::sync::Arc;

use crate::config::Config;
use crate::generation::generator::DocumentGenerator;
use crate::render::PublicUrlPolicy;
use crate::uploads::UploadStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Nothing here is mutated per request; the upload directory is the only shared resource.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the template directory and the `Arc<dyn PdfEngine>`.
    pub generator: Arc<DocumentGenerator>,
    pub uploads: Arc<UploadStore>,
    pub public_url: PublicUrlPolicy,
}
