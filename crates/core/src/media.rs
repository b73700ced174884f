//! Uploaded photos, videos and cover images on local disk.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs;

use crate::models::{MediaKind, UpdatePhoto};

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".heic"];
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov"];
pub const COVER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];
pub const COVER_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const COVERS_DIR: &str = "covers";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid media path")]
    InvalidPath,

    #[error("media not found")]
    NotFound,

    #[error("unsupported file type '{extension}', expected one of {}", allowed.join(", "))]
    UnsupportedType {
        extension: String,
        allowed: &'static [&'static str],
    },

    #[error("file is too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("empty upload")]
    Empty,

    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which configured directory a path lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRoot {
    Images,
    Videos,
}

impl From<MediaKind> for MediaRoot {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MediaRoot::Images,
            MediaKind::Video => MediaRoot::Videos,
        }
    }
}

/// A file written by [`MediaStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name relative to its pregnancy (or covers) directory.
    pub filename: String,
    pub size: i64,
}

/// Lower-cased extension including the dot, e.g. `.jpg`.
pub fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

fn checked_extension(filename: &str, allowed: &'static [&'static str]) -> Result<String, MediaError> {
    let ext = extension(filename).unwrap_or_default();
    if allowed.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(MediaError::UnsupportedType {
            extension: ext,
            allowed,
        })
    }
}

fn allowed_for(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Image => IMAGE_EXTENSIONS,
        MediaKind::Video => VIDEO_EXTENSIONS,
    }
}

/// Reject an attachment by name before anything is written.
pub fn check_upload(kind: MediaKind, filename: &str) -> Result<(), MediaError> {
    checked_extension(filename, allowed_for(kind)).map(|_| ())
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Join a request path onto `base`, refusing anything but plain components.
fn ensure_within(base: &Path, relative: &str) -> Result<PathBuf, MediaError> {
    let relative = Path::new(relative);
    let mut resolved = base.to_path_buf();
    let mut depth = 0;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(MediaError::InvalidPath);
            }
        }
    }
    if depth == 0 || !resolved.starts_with(base) {
        return Err(MediaError::InvalidPath);
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    images_dir: PathBuf,
    videos_dir: PathBuf,
}

impl MediaStore {
    pub async fn new(images_dir: PathBuf, videos_dir: PathBuf) -> Result<Self, MediaError> {
        fs::create_dir_all(&images_dir).await?;
        fs::create_dir_all(&videos_dir).await?;
        tracing::info!(
            images = %images_dir.display(),
            videos = %videos_dir.display(),
            "media store initialized"
        );
        Ok(Self { images_dir, videos_dir })
    }

    pub fn root(&self, root: MediaRoot) -> &Path {
        match root {
            MediaRoot::Images => &self.images_dir,
            MediaRoot::Videos => &self.videos_dir,
        }
    }

    /// Save an update attachment as `{update_id}_{unix}_{index}{ext}` under
    /// the pregnancy's directory.
    pub async fn save_update_file(
        &self,
        kind: MediaKind,
        pregnancy_id: i64,
        update_id: i64,
        index: usize,
        original_filename: &str,
        data: &[u8],
        now: DateTime<Utc>,
    ) -> Result<StoredFile, MediaError> {
        let ext = checked_extension(original_filename, allowed_for(kind))?;
        if data.is_empty() {
            return Err(MediaError::Empty);
        }

        let filename = format!("{update_id}_{}_{index}{ext}", now.timestamp());
        let dir = self.root(kind.into()).join(pregnancy_id.to_string());
        self.write(&dir, &filename, data).await
    }

    /// Save a cover photo as `pregnancy_{id}_cover_{unix}{ext}` under `covers/`.
    pub async fn save_cover(
        &self,
        pregnancy_id: i64,
        original_filename: &str,
        data: &[u8],
        now: DateTime<Utc>,
    ) -> Result<StoredFile, MediaError> {
        let ext = checked_extension(original_filename, COVER_EXTENSIONS)?;
        if data.is_empty() {
            return Err(MediaError::Empty);
        }
        if data.len() > COVER_MAX_BYTES {
            return Err(MediaError::TooLarge {
                size: data.len(),
                max: COVER_MAX_BYTES,
            });
        }

        let filename = format!("pregnancy_{pregnancy_id}_cover_{}{ext}", now.timestamp());
        let dir = self.images_dir.join(COVERS_DIR);
        self.write(&dir, &filename, data).await
    }

    async fn write(&self, dir: &Path, filename: &str, data: &[u8]) -> Result<StoredFile, MediaError> {
        fs::create_dir_all(dir).await?;
        fs::write(dir.join(filename), data).await?;
        tracing::debug!(dir = %dir.display(), filename, size = data.len(), "stored media file");
        Ok(StoredFile {
            filename: filename.to_string(),
            size: data.len() as i64,
        })
    }

    /// Best-effort removal of an update attachment.
    pub async fn remove_update_file(&self, pregnancy_id: i64, photo: &UpdatePhoto) {
        let relative = format!("{pregnancy_id}/{}", photo.filename);
        self.remove(photo.media_type.into(), &relative).await;
    }

    /// Best-effort removal of a cover photo.
    pub async fn remove_cover(&self, filename: &str) {
        self.remove(MediaRoot::Images, &format!("{COVERS_DIR}/{filename}")).await;
    }

    async fn remove(&self, root: MediaRoot, relative: &str) {
        let path = match ensure_within(self.root(root), relative) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(relative, error = %err, "refusing to remove media file");
                return;
            }
        };
        if let Err(err) = fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove media file");
        }
    }

    /// Read a file for serving; returns the bytes and their content type.
    pub async fn read(&self, root: MediaRoot, relative: &str) -> Result<(Vec<u8>, &'static str), MediaError> {
        let path = ensure_within(self.root(root), relative)?;
        match fs::read(&path).await {
            Ok(data) => Ok((data, content_type(&path))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(MediaError::NotFound),
            // directories and the like
            Err(err) if path.is_dir() => {
                tracing::debug!(path = %path.display(), error = %err, "media path is a directory");
                Err(MediaError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }
}
