use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::summary;

/// Post entity - a blog entry, optionally filed under a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Path of the attached image relative to the media root.
    pub image: Option<String>,
    pub group_id: Option<Uuid>,
    pub author_id: Uuid,
}

impl Post {
    /// Create a new post.
    pub fn new(author_id: Uuid, text: impl Into<String>, group_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            created_at: Utc::now(),
            image: None,
            group_id,
            author_id,
        }
    }

    pub fn with_image(mut self, path: impl Into<String>) -> Self {
        self.image = Some(path.into());
        self
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(summary(&self.text))
    }
}
