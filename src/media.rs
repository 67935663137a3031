use std::collections::HashMap;
use std::path::PathBuf;

use actix_multipart::Multipart;
use futures_util::StreamExt;
use tokio::fs;
use uuid::Uuid;

use crate::error::{ApiError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    fn dir(&self) -> &'static str {
        match self {
            MediaKind::Video => "videos",
            MediaKind::Image => "images",
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoredMedia {
    pub url: String,
    pub storage_id: String,
}

/// Disk-backed media storage. Files live at `{root}/{kind}/{uuid}` and are
/// served from `{base_url}/{storage_id}` by whatever fronts the media root.
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub async fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        for kind in [MediaKind::Video, MediaKind::Image] {
            fs::create_dir_all(root.join(kind.dir())).await.map_err(|e| {
                tracing::error!("failed to create media directory: {}", e);
                ApiError::Internal
            })?;
        }
        tracing::info!("media root: {}", root.display());
        Ok(MediaStore {
            root,
            base_url: base_url.into(),
        })
    }

    pub async fn store(&self, bytes: &[u8], kind: MediaKind) -> Result<StoredMedia> {
        let storage_id = format!("{}/{}", kind.dir(), Uuid::new_v4());
        let path = self.root.join(&storage_id);
        fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!("media write failed: {}", e);
            ApiError::Internal
        })?;
        Ok(StoredMedia {
            url: format!("{}/{}", self.base_url, storage_id),
            storage_id,
        })
    }

    /// Best-effort delete; a missing file is not an error.
    pub async fn delete(&self, storage_id: &str) -> Result<()> {
        match fs::remove_file(self.root.join(storage_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::warn!("media delete failed for {}: {}", storage_id, e);
                Ok(())
            }
        }
    }
}

/// A multipart form collected into memory: text fields plus named file parts.
#[derive(Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl UploadForm {
    /// Drain a multipart payload. Parts with a filename are collected as file
    /// bytes, everything else as UTF-8 text fields.
    pub async fn read(mut payload: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(part) = payload.next().await {
            let mut field = part
                .map_err(|e| ApiError::InvalidArgument(format!("malformed multipart body: {e}")))?;
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let is_file = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .is_some();

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| ApiError::InvalidArgument(format!("upload read failed: {e}")))?;
                data.extend_from_slice(&chunk);
            }

            if is_file {
                form.files.insert(name, data);
            } else {
                let text = String::from_utf8(data).map_err(|_| {
                    ApiError::InvalidArgument(format!("field {name} is not valid UTF-8"))
                })?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|s| !s.trim().is_empty())
    }

    pub fn require_field(&self, name: &'static str) -> Result<&str> {
        self.field(name)
            .ok_or_else(|| ApiError::InvalidArgument(format!("{name} is required")))
    }

    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice).filter(|f| !f.is_empty())
    }

    pub fn require_file(&self, name: &'static str) -> Result<&[u8]> {
        self.file(name)
            .ok_or_else(|| ApiError::InvalidArgument(format!("{name} file is required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        let mut form = UploadForm::default();
        form.fields.insert("title".into(), "   ".into());
        assert!(form.field("title").is_none());
        assert!(form.require_field("title").is_err());
    }

    #[test]
    fn empty_file_counts_as_missing() {
        let mut form = UploadForm::default();
        form.files.insert("avatar".into(), vec![]);
        assert!(form.require_file("avatar").is_err());
        form.files.insert("avatar".into(), vec![1, 2, 3]);
        assert_eq!(form.require_file("avatar").unwrap(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn store_and_delete_round_trip() {
        let root = std::env::temp_dir().join(format!("vidstream-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&root, "http://localhost/media").await.unwrap();
        let stored = store.store(b"thumbnail bytes", MediaKind::Image).await.unwrap();
        assert!(stored.storage_id.starts_with("images/"));
        assert!(stored.url.ends_with(&stored.storage_id));
        assert!(root.join(&stored.storage_id).exists());

        store.delete(&stored.storage_id).await.unwrap();
        assert!(!root.join(&stored.storage_id).exists());
        // Deleting again is fine.
        store.delete(&stored.storage_id).await.unwrap();
        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn swap_leaves_only_the_replacement_on_disk() {
        let root = std::env::temp_dir().join(format!("vidstream-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&root, "http://localhost/media").await.unwrap();
        let old = store.store(b"old avatar", MediaKind::Image).await.unwrap();
        let new = store.store(b"new avatar", MediaKind::Image).await.unwrap();
        store.delete(&old.storage_id).await.unwrap();
        assert!(!root.join(&old.storage_id).exists());
        assert!(root.join(&new.storage_id).exists());
        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
