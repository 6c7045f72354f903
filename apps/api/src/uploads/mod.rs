// Photo uploads: local directory store + the multipart endpoint.
// Stored files are served back under /uploads by the router.

pub mod handlers;
pub mod store;

pub use store::UploadStore;
