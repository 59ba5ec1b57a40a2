//! Media storage port.

use async_trait::async_trait;

/// An uploaded image file as submitted with a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

/// Storage for post images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return its path relative to the media root,
    /// e.g. `posts/small.gif`.
    async fn save(&self, upload: &ImageUpload) -> Result<String, MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Storage failed: {0}")]
    Storage(String),
}
