// HTML side of the pipeline: photo URL resolution and template rendering.
// Pure functions only; file and engine I/O live in `generation`.

pub mod assets;
pub mod template;

pub use assets::{resolve_photo_url, PublicUrlPolicy};
pub use template::{render_resume, TemplateVariant};
