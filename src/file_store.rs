//! Filesystem-backed blob storage
//!
//! Blobs live at `{base}/{domain}/{category}/{filename}` with no index
//! file; the directory listing is the index. Filenames are generated at
//! store time (random id plus the original extension), never taken from
//! user input. One reader-writer lock spans the whole store so no read
//! can observe a partially-written file.
//!
//! Removing a domain or category from the catalog does not touch this
//! tree; blobs stored under a removed pair stay on disk as orphans.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{GranaryError, Result};
use crate::sniff;

/// Result of storing a blob.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Generated filename (random id + original extension).
    pub filename: String,
    /// Size in bytes.
    pub size: usize,
}

/// Blob store rooted at a base directory.
pub struct FileStore {
    base_path: PathBuf,
    lock: RwLock<()>,
}

/// Weak validator for cache revalidation: first 8 bytes of the SHA-256
/// digest, hex-encoded, wrapped in quotes.
pub fn generate_etag(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash = hasher.finalize();
    format!("\"{}\"", hex::encode(&hash[..8]))
}

/// Path segments come from HTTP requests, so the store rejects anything
/// that could escape its tree instead of trusting callers to sanitize.
fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(GranaryError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

fn validate_extension(extension: &str) -> Result<()> {
    if extension.contains(['/', '\\', '\0']) {
        return Err(GranaryError::InvalidPath(extension.to_string()));
    }
    Ok(())
}

impl FileStore {
    /// Create a file store at the given directory, creating it if absent.
    pub async fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Initialized file store");

        Ok(Self {
            base_path,
            lock: RwLock::new(()),
        })
    }

    fn category_dir(&self, domain: &str, category: &str) -> PathBuf {
        self.base_path.join(domain).join(category)
    }

    /// Store a blob under `domain/category`, returning the generated
    /// filename. The caller's extension is appended verbatim (including
    /// its leading dot, if any). `content_type` travels with uploads for
    /// logging only; the served type is re-derived on read.
    pub async fn store(
        &self,
        domain: &str,
        category: &str,
        data: &[u8],
        content_type: &str,
        extension: &str,
    ) -> Result<StoredFile> {
        validate_segment(domain)?;
        validate_segment(category)?;
        validate_extension(extension)?;

        let _guard = self.lock.write().await;

        let filename = format!("{}{}", Uuid::new_v4(), extension);
        let dir = self.category_dir(domain, category);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&filename), data).await?;

        info!(
            domain = %domain,
            category = %category,
            filename = %filename,
            size = data.len(),
            content_type = %content_type,
            "Stored file"
        );

        Ok(StoredFile {
            filename,
            size: data.len(),
        })
    }

    /// Fetch a blob's bytes and content type.
    ///
    /// A missing file is `Ok(None)`, not an error, so callers can render
    /// a uniform 404 without telling "absent" apart from disk faults.
    /// Content type comes from the filename extension when known,
    /// otherwise from sniffing the leading bytes.
    pub async fn get(
        &self,
        domain: &str,
        category: &str,
        filename: &str,
    ) -> Result<Option<(Vec<u8>, String)>> {
        validate_segment(domain)?;
        validate_segment(category)?;
        validate_segment(filename)?;

        let _guard = self.lock.read().await;

        let path = self.category_dir(domain, category).join(filename);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let content_type = match mime_guess::from_path(filename).first() {
            Some(mime) => mime.to_string(),
            None => sniff::detect_content_type(&data).to_string(),
        };

        Ok(Some((data, content_type)))
    }

    /// Delete a blob. Missing files are `NotFound`.
    pub async fn delete(&self, domain: &str, category: &str, filename: &str) -> Result<()> {
        validate_segment(domain)?;
        validate_segment(category)?;
        validate_segment(filename)?;

        let _guard = self.lock.write().await;

        let path = self.category_dir(domain, category).join(filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(domain = %domain, category = %category, filename = %filename, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(GranaryError::NotFound(
                format!("file '{}/{}/{}'", domain, category, filename),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// List filenames under `domain/category`, lexicographically sorted.
    /// A missing directory is an empty listing; directories under the
    /// category are skipped.
    pub async fn list(&self, domain: &str, category: &str) -> Result<Vec<String>> {
        validate_segment(domain)?;
        validate_segment(category)?;

        let _guard = self.lock.read().await;

        let dir = self.category_dir(domain, category);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        Ok(files)
    }
}
