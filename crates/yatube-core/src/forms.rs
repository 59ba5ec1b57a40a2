//! Validation of submitted post and comment forms.
//!
//! Forms never persist anything. A successful `clean` hands back a draft the
//! caller stamps with the acting user; a failed one returns per-field
//! messages that are rendered next to the inputs.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::Post;
use crate::error::RepoError;
use crate::ports::{GroupRepository, ImageUpload};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Field name to error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

/// What a form looks like when rendered: the values to show and the errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub is_bound: bool,
    pub data: BTreeMap<&'static str, String>,
    pub errors: FormErrors,
}

/// A post form as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Raw group id; blank means "no group".
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
}

/// A validated post form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<ImageUpload>,
}

impl PostForm {
    pub fn unbound() -> FormState {
        let mut data = BTreeMap::new();
        data.insert("text", String::new());
        data.insert("group", String::new());
        FormState {
            is_bound: false,
            data,
            errors: FormErrors::default(),
        }
    }

    /// Initial values for editing an existing post.
    pub fn initial(post: &Post) -> FormState {
        let mut data = BTreeMap::new();
        data.insert("text", post.text.clone());
        data.insert(
            "group",
            post.group_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        FormState {
            is_bound: false,
            data,
            errors: FormErrors::default(),
        }
    }

    /// The submitted values echoed back together with `errors`.
    pub fn bound(&self, errors: FormErrors) -> FormState {
        let mut data = BTreeMap::new();
        data.insert("text", self.text.clone());
        data.insert("group", self.group.clone().unwrap_or_default());
        FormState {
            is_bound: true,
            data,
            errors,
        }
    }

    /// Validate the form. The outer error is an infrastructure failure while
    /// resolving the group; the inner one carries the field errors.
    pub async fn clean(
        &self,
        groups: &dyn GroupRepository,
    ) -> Result<Result<PostDraft, FormErrors>, RepoError> {
        let mut errors = FormErrors::default();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let found = match Uuid::parse_str(raw) {
                    Ok(id) => groups.find_by_id(id).await?.map(|group| group.id),
                    Err(_) => None,
                };
                if found.is_none() {
                    errors.add("group", INVALID_CHOICE);
                }
                found
            }
        };

        if let Some(upload) = &self.image {
            if let Err(message) = validate_image(upload) {
                errors.add("image", message);
            }
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        Ok(Ok(PostDraft {
            text: text.to_string(),
            group_id,
            image: self.image.clone(),
        }))
    }
}

fn validate_image(upload: &ImageUpload) -> Result<(), &'static str> {
    if upload.content.is_empty() {
        return Err(EMPTY_FILE);
    }
    image::load_from_memory(&upload.content)
        .map(|_| ())
        .map_err(|_| INVALID_IMAGE)
}

/// A comment form as submitted.
#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn unbound() -> FormState {
        let mut data = BTreeMap::new();
        data.insert("text", String::new());
        FormState {
            is_bound: false,
            data,
            errors: FormErrors::default(),
        }
    }

    pub fn bound(&self, errors: FormErrors) -> FormState {
        let mut data = BTreeMap::new();
        data.insert("text", self.text.clone());
        FormState {
            is_bound: true,
            data,
            errors,
        }
    }

    /// Returns the normalized comment text.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let text = self.text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::default();
            errors.add("text", REQUIRED);
            return Err(errors);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Group;
    use crate::ports::BaseRepository;
    use async_trait::async_trait;

    /// 2x1 GIF.
    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    struct Groups(Vec<Group>);

    #[async_trait]
    impl BaseRepository<Group, Uuid> for Groups {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
            Ok(self.0.iter().find(|g| g.id == id).cloned())
        }
        async fn create(&self, group: Group) -> Result<Group, RepoError> {
            Ok(group)
        }
        async fn update(&self, group: Group) -> Result<Group, RepoError> {
            Ok(group)
        }
        async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
            Ok(())
        }
    }

    #[async_trait]
    impl GroupRepository for Groups {
        async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
            Ok(self.0.iter().find(|g| g.slug == slug).cloned())
        }
        async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
            Ok(self.0.iter().filter(|g| ids.contains(&g.id)).cloned().collect())
        }
        async fn list(&self) -> Result<Vec<Group>, RepoError> {
            Ok(self.0.clone())
        }
    }

    fn group() -> Group {
        Group::new("Тестовая группа", "test-slug", "Тестовое описание")
    }

    #[tokio::test]
    async fn valid_post_form_yields_draft() {
        let group = group();
        let groups = Groups(vec![group.clone()]);
        let form = PostForm {
            text: "  Тестовый пост ".to_string(),
            group: Some(group.id.to_string()),
            image: Some(ImageUpload::new("small.gif", SMALL_GIF.to_vec())),
        };

        let draft = form.clean(&groups).await.unwrap().unwrap();

        assert_eq!(draft.text, "Тестовый пост");
        assert_eq!(draft.group_id, Some(group.id));
        assert_eq!(draft.image.unwrap().file_name, "small.gif");
    }

    #[tokio::test]
    async fn blank_group_means_no_group() {
        let form = PostForm {
            text: "text".to_string(),
            group: Some(String::new()),
            image: None,
        };
        let draft = form.clean(&Groups(vec![])).await.unwrap().unwrap();
        assert_eq!(draft.group_id, None);
    }

    #[tokio::test]
    async fn reports_every_invalid_field() {
        let form = PostForm {
            text: "   ".to_string(),
            group: Some(Uuid::new_v4().to_string()),
            image: Some(ImageUpload::new("fake.gif", b"not an image".to_vec())),
        };

        let errors = form.clean(&Groups(vec![group()])).await.unwrap().unwrap_err();

        assert_eq!(errors.get("text"), [REQUIRED]);
        assert_eq!(errors.get("group"), [INVALID_CHOICE]);
        assert_eq!(errors.get("image"), [INVALID_IMAGE]);
    }

    #[tokio::test]
    async fn malformed_group_id_is_an_invalid_choice() {
        let form = PostForm {
            text: "text".to_string(),
            group: Some("test-slug".to_string()),
            image: None,
        };
        let errors = form.clean(&Groups(vec![group()])).await.unwrap().unwrap_err();
        assert_eq!(errors.get("group"), [INVALID_CHOICE]);
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let form = PostForm {
            text: "text".to_string(),
            group: None,
            image: Some(ImageUpload::new("small.gif", Vec::new())),
        };
        let errors = form.clean(&Groups(vec![])).await.unwrap().unwrap_err();
        assert_eq!(errors.get("image"), [EMPTY_FILE]);
    }

    #[test]
    fn bound_form_echoes_submission() {
        let form = PostForm {
            text: "draft".to_string(),
            group: None,
            image: None,
        };
        let mut errors = FormErrors::default();
        errors.add("group", INVALID_CHOICE);

        let state = form.bound(errors.clone());

        assert!(state.is_bound);
        assert_eq!(state.data["text"], "draft");
        assert_eq!(state.errors, errors);
    }

    #[test]
    fn comment_requires_text() {
        assert_eq!(CommentForm::new(" hi ").clean().unwrap(), "hi");
        let errors = CommentForm::new("\n").clean().unwrap_err();
        assert_eq!(errors.get("text"), [REQUIRED]);
    }
}
