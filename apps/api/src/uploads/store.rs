//! Upload Store — append-only directory of uploaded photos.
//!
//! Files are named `photo-<unix millis>-<random>.<ext>` and opened with
//! create-new semantics, so an existing file is never overwritten. Nothing
//! in the service deletes a finished upload.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const FILENAME_PREFIX: &str = "photo";
const RANDOM_SUFFIX_BOUND: u32 = 1_000_000_000;
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Opens the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves a fresh filename and opens it for writing.
    pub async fn begin(&self, original_name: &str) -> io::Result<PendingUpload> {
        let extension = sanitized_extension(original_name);

        loop {
            let filename = generate_filename(&extension);
            let path = self.dir.join(&filename);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    return Ok(PendingUpload {
                        file,
                        filename,
                        path,
                        size: 0,
                        finished: false,
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(filename = %filename, "Upload filename taken, drawing another");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A file being streamed into the store. Dropping it before `finish`
/// removes the partial file.
#[derive(Debug)]
pub struct PendingUpload {
    file: File,
    filename: String,
    path: PathBuf,
    size: u64,
    finished: bool,
}

impl PendingUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        self.file.write_all(&chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> io::Result<UploadedAsset> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        self.finished = true;

        Ok(UploadedAsset {
            filename: self.filename.clone(),
            path: self.path.clone(),
            size: self.size,
        })
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Drop can't await; a single unlink runs inline on the current thread.
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "Failed to remove partial upload: {e}");
        }
    }
}

fn generate_filename(extension: &str) -> String {
    let suffix = rand::thread_rng().gen_range(0..RANDOM_SUFFIX_BOUND);
    format!(
        "{FILENAME_PREFIX}-{}-{suffix}{extension}",
        Utc::now().timestamp_millis()
    )
}

/// `.ext` from the client's filename, ASCII alphanumerics only; empty when
/// nothing usable remains.
fn sanitized_extension(original_name: &str) -> String {
    let ext: String = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .collect();

    if ext.is_empty() {
        ext
    } else {
        format!(".{ext}")
    }
}
