//! Render contexts handed to the template layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Group, Post, User};
use crate::forms::FormState;
use crate::pagination::Page;

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for AuthorRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// A post with its author and group resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub image: Option<String>,
    pub author: AuthorRef,
    pub group: Option<Group>,
}

impl PostCard {
    pub fn new(post: Post, author: AuthorRef, group: Option<Group>) -> Self {
        Self {
            id: post.id,
            text: post.text,
            created_at: post.created_at,
            image: post.image,
            author,
            group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentCard {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
}

impl CommentCard {
    pub fn new(comment: Comment, author: AuthorRef) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            created_at: comment.created_at,
            author,
        }
    }
}

/// An option of the group select on the post form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChoice {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    pub page_obj: Page<PostCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupPage {
    pub group: Group,
    pub page_obj: Page<PostCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub author: AuthorRef,
    pub posts_count: u64,
    /// Only computed for authenticated viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
    pub page_obj: Page<PostCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailPage {
    pub post: PostCard,
    pub author_posts_count: u64,
    pub comments: Vec<CommentCard>,
    pub form: FormState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostFormPage {
    pub form: FormState,
    pub is_edit: bool,
    pub post_id: Option<Uuid>,
    pub groups: Vec<GroupChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowPage {
    pub page_obj: Page<PostCard>,
}
