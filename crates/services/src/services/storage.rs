//! Media uploads behind a small object-storage interface.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tracing::info;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("upload is empty")]
    Empty,
    #[error("upload exceeds {} bytes", MAX_UPLOAD_BYTES)]
    TooLarge,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `bucket/path` and return the public URL of the object.
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Objects as files under a media root, served from `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_segment(bucket)?;
        let relative = validate_object_path(path)?;
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge);
        }

        let target = self.root.join(bucket).join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        info!(bucket, path, size = bytes.len(), "Object stored");

        Ok(format!("{}/{}/{}", self.public_base_url, bucket, path))
    }
}

fn validate_segment(segment: &str) -> Result<(), StorageError> {
    let valid = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(segment.to_string()))
    }
}

/// Relative, `/`-separated path with no empty, `.` or `..` segments.
fn validate_object_path(path: &str) -> Result<PathBuf, StorageError> {
    if path.is_empty() || path.starts_with('/') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    let mut relative = PathBuf::new();
    for segment in path.split('/') {
        validate_segment(segment).map_err(|_| StorageError::InvalidPath(path.to_string()))?;
        relative.push(segment);
    }
    // Catches platform prefixes such as `C:` that survive segment checks.
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn upload_writes_under_root_and_returns_public_url() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost:3000/media/");

        let url = storage
            .upload("posts", "family-1/photo.jpg", b"jpeg bytes")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/media/posts/family-1/photo.jpg");

        let stored = std::fs::read(dir.path().join("posts/family-1/photo.jpg")).unwrap();
        assert_eq!(stored, b"jpeg bytes");
    }

    #[tokio::test]
    async fn traversal_and_empty_segments_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost/media");

        for (bucket, path) in [
            ("posts", "../escape.txt"),
            ("posts", "/etc/passwd"),
            ("posts", "a//b.txt"),
            ("posts", "a/./b.txt"),
            ("..", "x.txt"),
            ("", "x.txt"),
            ("posts", ""),
        ] {
            assert!(
                matches!(
                    storage.upload(bucket, path, b"x").await,
                    Err(StorageError::InvalidPath(_))
                ),
                "{bucket}/{path} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost/media");
        assert!(matches!(
            storage.upload("avatars", "me.png", b"").await,
            Err(StorageError::Empty)
        ));
    }
}
