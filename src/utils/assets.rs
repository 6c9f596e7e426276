//! Profile image storage on local disk.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use actix_web::web;
use chrono::Utc;
use derive_more::Display;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Display)]
pub enum AssetError {
    #[display(fmt = "Unsupported image type: {}", _0)]
    UnsupportedMediaType(String),

    #[display(fmt = "Image exceeds the {} byte limit", limit)]
    TooLarge { limit: usize },

    #[display(fmt = "{}", _0)]
    Io(io::Error),
}

impl std::error::Error for AssetError {}

impl From<io::Error> for AssetError {
    fn from(e: io::Error) -> Self {
        AssetError::Io(e)
    }
}

impl From<actix_web::error::BlockingError> for AssetError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AssetError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

fn extension_for(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// `profile-<millis>-<8 hex>.<ext>`; never derived from client input.
fn asset_name(extension: &str) -> String {
    let random = Uuid::new_v4().to_simple().to_string();
    format!(
        "profile-{}-{}.{}",
        Utc::now().timestamp_millis(),
        &random[..8],
        extension
    )
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), AssetError> {
        let dir = self.dir.clone();
        web::block(move || std::fs::create_dir_all(dir)).await??;
        Ok(())
    }

    /// Checks the media type and size before anything touches the disk.
    pub fn check(&self, size: usize, mime: &str) -> Result<&'static str, AssetError> {
        let extension = extension_for(mime)
            .ok_or_else(|| AssetError::UnsupportedMediaType(mime.to_string()))?;
        if size > self.max_bytes {
            return Err(AssetError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(extension)
    }

    /// Writes a new image and returns its public reference.
    pub async fn store(&self, bytes: Vec<u8>, mime: &str) -> Result<String, AssetError> {
        let extension = self.check(bytes.len(), mime)?;
        let name = asset_name(extension);
        let path = self.dir.join(&name);

        web::block(move || -> io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)?;
            file.write_all(&bytes)?;
            file.sync_all()
        })
        .await??;

        info!(asset = %name, "Profile image stored");
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    /// Maps a reference back to a file inside `dir`. Anything that is not a
    /// bare file name under our prefix resolves to nothing.
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let name = reference
            .strip_prefix(&self.url_prefix)?
            .strip_prefix('/')?;

        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        valid.then(|| self.dir.join(name))
    }

    /// Deletes the file behind `reference`. A file that is already gone is
    /// not an error.
    pub async fn remove(&self, reference: &str) -> Result<(), AssetError> {
        let Some(path) = self.resolve(reference) else {
            warn!(reference, "Ignoring unrecognized asset reference");
            return Ok(());
        };

        let removed = web::block(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        })
        .await??;

        debug!(reference, removed, "Profile image removed");
        Ok(())
    }

    /// Best-effort removal off the request path. Failures are logged only.
    pub fn remove_in_background(&self, reference: String) {
        let assets = self.clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = assets.remove(&reference).await {
                warn!(error = %e, reference = %reference, "Failed to remove profile image");
            }
        });
    }
}
