//! Post images on the local filesystem, under `<media root>/posts/`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use yatube_core::ports::{ImageStore, ImageUpload, MediaError};

const UPLOAD_DIR: &str = "posts";

pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// `name.ext` -> `name_<suffix>.ext`
fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{file_name}_{suffix}"),
    }
}

/// Attempts at finding a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Create `path` only if nothing is there yet and write `content` into it.
/// Returns `Ok(false)` when the name is already taken.
async fn write_new(path: &Path, content: &[u8]) -> std::io::Result<bool> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    let written = match file.write_all(content).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }
    Ok(true)
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, upload: &ImageUpload) -> Result<String, MediaError> {
        let dir = self.root.join(UPLOAD_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        let base = sanitize(&upload.file_name);
        let mut name = base.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let created = write_new(&dir.join(&name), &upload.content)
                .await
                .map_err(|e| MediaError::Storage(e.to_string()))?;
            if created {
                let stored = format!("{UPLOAD_DIR}/{name}");
                tracing::debug!(path = %stored, bytes = upload.content.len(), "Image stored");
                return Ok(stored);
            }
            let suffix = Uuid::new_v4().simple().to_string();
            name = with_suffix(&base, &suffix[..7]);
        }

        Err(MediaError::Storage(format!(
            "no free file name for {base} after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize("small.gif"), "small.gif");
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\temp\\my photo.png"), "my_photo.png");
        assert_eq!(sanitize(".."), "image");
    }

    #[tokio::test]
    async fn stores_under_posts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());

        let path = store
            .save(&ImageUpload::new("small.gif", b"GIF89a".to_vec()))
            .await
            .unwrap();

        assert_eq!(path, "posts/small.gif");
        let written = tokio::fs::read(dir.path().join(&path)).await.unwrap();
        assert_eq!(written, b"GIF89a");
    }

    #[tokio::test]
    async fn name_clash_gets_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let upload = ImageUpload::new("small.gif", b"GIF89a".to_vec());

        let first = store.save(&upload).await.unwrap();
        let second = store.save(&upload).await.unwrap();

        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_uploads_with_one_name_keep_their_own_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(LocalImageStore::new(dir.path()));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let content = vec![i; 64 * 1024];
                    let path = store
                        .save(&ImageUpload::new("same.gif", content.clone()))
                        .await
                        .unwrap();
                    (path, content)
                })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            let (path, content) = handle.await.unwrap();
            let written = tokio::fs::read(dir.path().join(&path)).await.unwrap();
            assert_eq!(written, content, "{path} holds another upload");
            assert!(paths.insert(path));
        }
        assert_eq!(paths.len(), 8);
    }
}
