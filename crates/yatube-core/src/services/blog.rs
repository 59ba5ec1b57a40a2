use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Actor, Comment, Follow, Post, User};
use crate::error::{DomainError, RepoError};
use crate::forms::{CommentForm, FormState, PostDraft, PostForm};
use crate::pagination::{Page, Paginator};
use crate::ports::{
    CommentRepository, FollowRepository, GroupRepository, ImageStore, PostFilter,
    PostRepository, UserRepository,
};

use super::context::{
    AuthorRef, CommentCard, FollowPage, GroupChoice, GroupPage, IndexPage, PostCard,
    PostDetailPage, PostFormPage, ProfilePage,
};

/// The repositories the blog reads and writes.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

/// Result of a form submission.
#[derive(Debug)]
pub enum Submission<T, P> {
    /// The record was persisted.
    Saved(T),
    /// Validation failed; re-render this page.
    Invalid(P),
}

/// Result of a follow request. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// The actor asked to follow themselves; nothing was stored.
    SelfFollow,
}

/// Blog pages and actions.
pub struct BlogService {
    repos: Repositories,
    images: Arc<dyn ImageStore>,
    paginator: Paginator,
}

impl BlogService {
    pub fn new(repos: Repositories, images: Arc<dyn ImageStore>, paginator: Paginator) -> Self {
        Self {
            repos,
            images,
            paginator,
        }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// All posts, newest first.
    pub async fn index(&self, page: Option<&str>) -> Result<IndexPage, DomainError> {
        Ok(IndexPage {
            page_obj: self.list_posts(PostFilter::All, page).await?,
        })
    }

    pub async fn group_posts(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<GroupPage, DomainError> {
        let group = self
            .repos
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", slug))?;

        let page_obj = self.list_posts(PostFilter::Group(group.id), page).await?;
        Ok(GroupPage { group, page_obj })
    }

    /// An author's posts. `following` is filled in for authenticated viewers.
    pub async fn profile(
        &self,
        viewer: Option<&Actor>,
        username: &str,
        page: Option<&str>,
    ) -> Result<ProfilePage, DomainError> {
        let author = self.find_user(username).await?;
        let page_obj = self.list_posts(PostFilter::Author(author.id), page).await?;

        let following = match viewer {
            Some(viewer) => Some(self.repos.follows.exists(viewer.user_id, author.id).await?),
            None => None,
        };

        Ok(ProfilePage {
            author: AuthorRef::from(&author),
            posts_count: page_obj.count,
            following,
            page_obj,
        })
    }

    pub async fn post_detail(&self, post_id: Uuid) -> Result<PostDetailPage, DomainError> {
        let post = self.find_post(post_id).await?;
        self.detail_page(post, CommentForm::unbound()).await
    }

    /// Empty post form for a new post.
    pub async fn new_post_form(&self) -> Result<PostFormPage, DomainError> {
        Ok(PostFormPage {
            form: PostForm::unbound(),
            is_edit: false,
            post_id: None,
            groups: self.group_choices().await?,
        })
    }

    /// Validate and store a new post authored by `actor`.
    pub async fn create_post(
        &self,
        actor: &Actor,
        form: PostForm,
    ) -> Result<Submission<Post, PostFormPage>, DomainError> {
        let draft = match form.clean(self.repos.groups.as_ref()).await? {
            Ok(draft) => draft,
            Err(errors) => {
                return Ok(Submission::Invalid(PostFormPage {
                    form: form.bound(errors),
                    is_edit: false,
                    post_id: None,
                    groups: self.group_choices().await?,
                }));
            }
        };

        let mut post = Post::new(actor.user_id, draft.text.clone(), draft.group_id);
        post.image = self.store_image(&draft).await?;

        let post = self.repos.posts.create(post).await?;
        tracing::info!(post_id = %post.id, author = %actor.username, "Post created");
        Ok(Submission::Saved(post))
    }

    /// Edit form for `post_id`, bound to the stored values.
    pub async fn edit_post_form(
        &self,
        actor: &Actor,
        post_id: Uuid,
    ) -> Result<PostFormPage, DomainError> {
        let post = self.find_post(post_id).await?;
        authorize_edit(actor, &post)?;

        Ok(PostFormPage {
            form: PostForm::initial(&post),
            is_edit: true,
            post_id: Some(post.id),
            groups: self.group_choices().await?,
        })
    }

    /// Apply an edit. Only the author may edit; anyone else gets
    /// [`DomainError::Forbidden`] and the post is left untouched.
    pub async fn edit_post(
        &self,
        actor: &Actor,
        post_id: Uuid,
        form: PostForm,
    ) -> Result<Submission<Post, PostFormPage>, DomainError> {
        let mut post = self.find_post(post_id).await?;
        authorize_edit(actor, &post)?;

        let draft = match form.clean(self.repos.groups.as_ref()).await? {
            Ok(draft) => draft,
            Err(errors) => {
                return Ok(Submission::Invalid(PostFormPage {
                    form: form.bound(errors),
                    is_edit: true,
                    post_id: Some(post.id),
                    groups: self.group_choices().await?,
                }));
            }
        };

        if let Some(path) = self.store_image(&draft).await? {
            post.image = Some(path);
        }
        post.text = draft.text;
        post.group_id = draft.group_id;

        let post = self.repos.posts.update(post).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::not_found("Post", post_id),
            other => other.into(),
        })?;
        tracing::info!(post_id = %post.id, author = %actor.username, "Post edited");
        Ok(Submission::Saved(post))
    }

    /// Store a comment by `actor` under `post_id`. Invalid input re-renders
    /// the post page with the form errors.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        post_id: Uuid,
        form: CommentForm,
    ) -> Result<Submission<Comment, PostDetailPage>, DomainError> {
        let post = self.find_post(post_id).await?;

        let text = match form.clean() {
            Ok(text) => text,
            Err(errors) => {
                let page = self.detail_page(post, form.bound(errors)).await?;
                return Ok(Submission::Invalid(page));
            }
        };

        let comment = self
            .repos
            .comments
            .create(Comment::new(post.id, actor.user_id, text))
            .await?;
        tracing::info!(post_id = %post.id, comment_id = %comment.id, "Comment added");
        Ok(Submission::Saved(comment))
    }

    /// Posts by the authors `actor` follows, newest first.
    pub async fn follow_index(
        &self,
        actor: &Actor,
        page: Option<&str>,
    ) -> Result<FollowPage, DomainError> {
        Ok(FollowPage {
            page_obj: self
                .list_posts(PostFilter::FollowedBy(actor.user_id), page)
                .await?,
        })
    }

    /// Follow `username`. Repeated and self follows are no-ops.
    pub async fn follow(
        &self,
        actor: &Actor,
        username: &str,
    ) -> Result<FollowOutcome, DomainError> {
        let author = self.find_user(username).await?;

        let Ok(follow) = Follow::new(actor.user_id, author.id) else {
            tracing::debug!(user = %actor.username, "Ignoring self-follow");
            return Ok(FollowOutcome::SelfFollow);
        };

        if self.repos.follows.exists(actor.user_id, author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        match self.repos.follows.get_or_create(follow).await {
            Ok(true) => {
                tracing::info!(user = %actor.username, author = %author.username, "Follow created");
                Ok(FollowOutcome::Created)
            }
            Ok(false) => Ok(FollowOutcome::AlreadyFollowing),
            Err(RepoError::Constraint(msg)) => {
                tracing::warn!(user = %actor.username, author = %author.username, error = %msg, "Follow constraint hit, treating as existing");
                Ok(FollowOutcome::AlreadyFollowing)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop following `username`; returns how many relations were removed.
    pub async fn unfollow(&self, actor: &Actor, username: &str) -> Result<u64, DomainError> {
        let author = self.find_user(username).await?;
        let removed = self
            .repos
            .follows
            .delete_pair(actor.user_id, author.id)
            .await?;
        tracing::info!(user = %actor.username, author = %author.username, removed, "Unfollowed");
        Ok(removed)
    }

    async fn find_user(&self, username: &str) -> Result<User, DomainError> {
        self.repos
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("User", username))
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.repos
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))
    }

    async fn store_image(&self, draft: &PostDraft) -> Result<Option<String>, DomainError> {
        match &draft.image {
            Some(upload) => self
                .images
                .save(upload)
                .await
                .map(Some)
                .map_err(|e| DomainError::Internal(e.to_string())),
            None => Ok(None),
        }
    }

    async fn group_choices(&self) -> Result<Vec<GroupChoice>, DomainError> {
        Ok(self
            .repos
            .groups
            .list()
            .await?
            .into_iter()
            .map(|group| GroupChoice {
                id: group.id,
                title: group.title,
            })
            .collect())
    }

    async fn detail_page(
        &self,
        post: Post,
        form: FormState,
    ) -> Result<PostDetailPage, DomainError> {
        let author_posts_count = self
            .repos
            .posts
            .count(PostFilter::Author(post.author_id))
            .await?;

        let comments = self.repos.comments.list_for_post(post.id).await?;
        let author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        let authors = self.authors(&author_ids).await?;
        let comments = comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id)?.clone();
                Some(CommentCard::new(comment, author))
            })
            .collect();

        let post = self
            .cards(vec![post])
            .await?
            .pop()
            .ok_or_else(|| DomainError::Internal("post author is missing".to_string()))?;

        Ok(PostDetailPage {
            post,
            author_posts_count,
            comments,
            form,
        })
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<PostCard>, DomainError> {
        let count = self.repos.posts.count(filter).await?;
        let window = self.paginator.window(count, page);
        let posts = self
            .repos
            .posts
            .list(filter, window.offset, window.limit)
            .await?;
        Ok(Page::new(self.cards(posts).await?, window))
    }

    /// Resolve authors and groups of `posts` in two batched lookups.
    async fn cards(&self, posts: Vec<Post>) -> Result<Vec<PostCard>, DomainError> {
        let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        let authors = self.authors(&author_ids).await?;

        let group_ids: Vec<Uuid> = unique(posts.iter().filter_map(|p| p.group_id));
        let groups: HashMap<_, _> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            self.repos
                .groups
                .find_many(&group_ids)
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect()
        };

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let Some(author) = authors.get(&post.author_id).cloned() else {
                    tracing::warn!(post_id = %post.id, "Skipping post without author");
                    return None;
                };
                let group = post.group_id.and_then(|id| groups.get(&id).cloned());
                Some(PostCard::new(post, author, group))
            })
            .collect())
    }

    async fn authors(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorRef>, DomainError> {
        let ids = unique(ids.iter().copied());
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .repos
            .users
            .find_many(&ids)
            .await?
            .iter()
            .map(|user| (user.id, AuthorRef::from(user)))
            .collect())
    }
}

fn authorize_edit(actor: &Actor, post: &Post) -> Result<(), DomainError> {
    if actor.is(post.author_id) {
        Ok(())
    } else {
        tracing::debug!(post_id = %post.id, user = %actor.username, "Edit by non-author refused");
        Err(DomainError::Forbidden)
    }
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
