//! Data Transfer Objects - form bodies and query strings.

use serde::{Deserialize, Serialize};

/// `?next=` carried through the login flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Post create/edit form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostFormData {
    #[serde(default)]
    pub text: String,
    /// Group id; empty for "no group".
    #[serde(default)]
    pub group: Option<String>,
    /// Base64-encoded image file.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_name: Option<String>,
}

/// Comment form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentFormData {
    #[serde(default)]
    pub text: String,
}

/// Signup form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login form body. `next` is echoed from the login page's query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}
