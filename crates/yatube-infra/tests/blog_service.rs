//! Blog page logic against the in-memory database.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::domain::{Actor, Follow, Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::forms::{CommentForm, INVALID_CHOICE, PostForm, REQUIRED};
use yatube_core::pagination::Paginator;
use yatube_core::ports::{BaseRepository, FollowRepository, ImageUpload, PostFilter};
use yatube_core::services::{BlogService, FollowOutcome, Repositories, Submission};
use yatube_core::settings::{FIXTURE_TAIL_POSTS, POSTS_PER_PAGE};
use yatube_infra::{InMemoryDatabase, LocalImageStore};

const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

struct Fixture {
    blog: BlogService,
    repos: Repositories,
    media: TempDir,
    author: Actor,
    reader: Actor,
    group: Group,
}

async fn user(repos: &Repositories, username: &str) -> Actor {
    let user = repos
        .users
        .create(User::new(username, "hash"))
        .await
        .unwrap();
    Actor::from(&user)
}

async fn fixture() -> Fixture {
    let repos = Arc::new(InMemoryDatabase::new()).repositories();
    let media = tempfile::tempdir().unwrap();
    let blog = BlogService::new(
        repos.clone(),
        Arc::new(LocalImageStore::new(media.path())),
        Paginator::default(),
    );

    let author = user(&repos, "auth").await;
    let reader = user(&repos, "reader").await;
    let group = repos
        .groups
        .create(Group::new("Тестовая группа", "test-slug", "Тестовое описание"))
        .await
        .unwrap();

    Fixture {
        blog,
        repos,
        media,
        author,
        reader,
        group,
    }
}

async fn publish(repos: &Repositories, author: &Actor, text: &str, group: Option<Uuid>) -> Post {
    repos
        .posts
        .create(Post::new(author.user_id, text, group))
        .await
        .unwrap()
}

fn form(text: &str, group: Option<Uuid>) -> PostForm {
    PostForm {
        text: text.to_string(),
        group: group.map(|id| id.to_string()),
        image: None,
    }
}

#[tokio::test]
async fn create_post_stamps_author_and_stores_fields() {
    let fx = fixture().await;
    let mut submitted = form("Тестовый текст", Some(fx.group.id));
    submitted.image = Some(ImageUpload::new("small.gif", SMALL_GIF.to_vec()));

    let Submission::Saved(post) = fx.blog.create_post(&fx.author, submitted).await.unwrap() else {
        panic!("valid form was rejected");
    };

    assert_eq!(post.author_id, fx.author.user_id);
    assert_eq!(post.text, "Тестовый текст");
    assert_eq!(post.group_id, Some(fx.group.id));
    assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
    assert!(fx.media.path().join("posts/small.gif").exists());
    assert_eq!(fx.repos.posts.count(PostFilter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn invalid_post_is_not_persisted() {
    let fx = fixture().await;
    let submitted = PostForm {
        text: " ".to_string(),
        group: Some("nope".to_string()),
        image: None,
    };

    let Submission::Invalid(page) = fx.blog.create_post(&fx.author, submitted).await.unwrap()
    else {
        panic!("invalid form was accepted");
    };

    assert!(page.form.is_bound);
    assert_eq!(page.form.errors.get("text"), [REQUIRED]);
    assert_eq!(page.form.errors.get("group"), [INVALID_CHOICE]);
    assert_eq!(page.groups.len(), 1);
    assert_eq!(fx.repos.posts.count(PostFilter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn author_can_edit_post() {
    let fx = fixture().await;
    let post = publish(&fx.repos, &fx.author, "before", None).await;

    let page = fx.blog.edit_post_form(&fx.author, post.id).await.unwrap();
    assert!(page.is_edit);
    assert_eq!(page.form.data["text"], "before");

    let result = fx
        .blog
        .edit_post(&fx.author, post.id, form("after", Some(fx.group.id)))
        .await
        .unwrap();
    assert!(matches!(result, Submission::Saved(_)));

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "after");
    assert_eq!(stored.group_id, Some(fx.group.id));
    assert_eq!(stored.created_at, post.created_at);
}

#[tokio::test]
async fn edit_keeps_image_unless_replaced() {
    let fx = fixture().await;
    let post = fx
        .repos
        .posts
        .create(Post::new(fx.author.user_id, "pic", None).with_image("posts/old.gif"))
        .await
        .unwrap();

    fx.blog
        .edit_post(&fx.author, post.id, form("pic", None))
        .await
        .unwrap();

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.image.as_deref(), Some("posts/old.gif"));
}

#[tokio::test]
async fn non_author_edit_is_forbidden_and_changes_nothing() {
    let fx = fixture().await;
    let post = publish(&fx.repos, &fx.author, "original", None).await;

    let form_err = fx.blog.edit_post_form(&fx.reader, post.id).await;
    assert!(matches!(form_err, Err(DomainError::Forbidden)));

    let err = fx
        .blog
        .edit_post(&fx.reader, post.id, form("hijacked", Some(fx.group.id)))
        .await;
    assert!(matches!(err, Err(DomainError::Forbidden)));

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let fx = fixture().await;
    let err = fx.blog.post_detail(Uuid::new_v4()).await;
    assert!(matches!(err, Err(DomainError::NotFound { .. })));

    let err = fx
        .blog
        .add_comment(&fx.reader, Uuid::new_v4(), CommentForm::new("hi"))
        .await;
    assert!(matches!(err, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn unknown_group_and_profile_are_not_found() {
    let fx = fixture().await;
    assert!(matches!(
        fx.blog.group_posts("missing", None).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        fx.blog.profile(None, "ghost", None).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn listings_paginate_ten_then_three() {
    let fx = fixture().await;
    for i in 0..POSTS_PER_PAGE + FIXTURE_TAIL_POSTS {
        publish(&fx.repos, &fx.author, &format!("post {i}"), Some(fx.group.id)).await;
    }

    let first = fx.blog.index(None).await.unwrap().page_obj;
    let second = fx.blog.index(Some("2")).await.unwrap().page_obj;
    assert_eq!(first.len(), POSTS_PER_PAGE);
    assert_eq!(second.len(), FIXTURE_TAIL_POSTS);
    assert_eq!(first.object_list[0].text, format!("post {}", POSTS_PER_PAGE + FIXTURE_TAIL_POSTS - 1));

    let group = fx.blog.group_posts("test-slug", Some("2")).await.unwrap();
    assert_eq!(group.group.id, fx.group.id);
    assert_eq!(group.page_obj.len(), FIXTURE_TAIL_POSTS);

    let profile = fx.blog.profile(None, "auth", None).await.unwrap();
    assert_eq!(profile.page_obj.len(), POSTS_PER_PAGE);
    assert_eq!(profile.posts_count, (POSTS_PER_PAGE + FIXTURE_TAIL_POSTS) as u64);
    assert_eq!(profile.following, None);
}

#[tokio::test]
async fn listing_cards_resolve_author_and_group() {
    let fx = fixture().await;
    publish(&fx.repos, &fx.author, "grouped", Some(fx.group.id)).await;

    let page = fx.blog.index(None).await.unwrap().page_obj;
    let card = &page.object_list[0];
    assert_eq!(card.author.username, "auth");
    assert_eq!(card.group.as_ref().map(|g| g.slug.as_str()), Some("test-slug"));
}

#[tokio::test]
async fn comments_are_stamped_and_listed() {
    let fx = fixture().await;
    let post = publish(&fx.repos, &fx.author, "text", None).await;

    let saved = fx
        .blog
        .add_comment(&fx.reader, post.id, CommentForm::new("Тестовый комментарий"))
        .await
        .unwrap();
    let Submission::Saved(comment) = saved else {
        panic!("valid comment was rejected");
    };
    assert_eq!(comment.author_id, fx.reader.user_id);
    assert_eq!(comment.post_id, post.id);

    let page = fx.blog.post_detail(post.id).await.unwrap();
    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.comments[0].text, "Тестовый комментарий");
    assert_eq!(page.comments[0].author.username, "reader");
    assert_eq!(page.author_posts_count, 1);
    assert!(!page.form.is_bound);
}

#[tokio::test]
async fn blank_comment_rerenders_detail_with_errors() {
    let fx = fixture().await;
    let post = publish(&fx.repos, &fx.author, "text", None).await;

    let result = fx
        .blog
        .add_comment(&fx.reader, post.id, CommentForm::new("   "))
        .await
        .unwrap();

    let Submission::Invalid(page) = result else {
        panic!("blank comment was accepted");
    };
    assert_eq!(page.post.id, post.id);
    assert_eq!(page.form.errors.get("text"), [REQUIRED]);
    assert!(fx.repos.comments.list_for_post(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn follow_is_created_once_and_never_for_self() {
    let fx = fixture().await;

    assert_eq!(
        fx.blog.follow(&fx.reader, "auth").await.unwrap(),
        FollowOutcome::Created
    );
    assert_eq!(
        fx.blog.follow(&fx.reader, "auth").await.unwrap(),
        FollowOutcome::AlreadyFollowing
    );
    assert_eq!(
        fx.blog.follow(&fx.reader, "reader").await.unwrap(),
        FollowOutcome::SelfFollow
    );

    assert!(fx.repos.follows.exists(fx.reader.user_id, fx.author.user_id).await.unwrap());
    assert!(!fx.repos.follows.exists(fx.reader.user_id, fx.reader.user_id).await.unwrap());

    let profile = fx.blog.profile(Some(&fx.reader), "auth", None).await.unwrap();
    assert_eq!(profile.following, Some(true));
}

/// Follow store that loses every insert race: the pre-check finds nothing,
/// then the insert hits the unique constraint.
struct RacedFollows;

#[async_trait]
impl BaseRepository<Follow, Uuid> for RacedFollows {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Follow>, RepoError> {
        Ok(None)
    }
    async fn create(&self, _follow: Follow) -> Result<Follow, RepoError> {
        Err(RepoError::Constraint("follows_unique_pair".to_string()))
    }
    async fn update(&self, _follow: Follow) -> Result<Follow, RepoError> {
        Err(RepoError::NotFound)
    }
    async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
        Err(RepoError::NotFound)
    }
}

#[async_trait]
impl FollowRepository for RacedFollows {
    async fn exists(&self, _user_id: Uuid, _author_id: Uuid) -> Result<bool, RepoError> {
        Ok(false)
    }
    async fn get_or_create(&self, _follow: Follow) -> Result<bool, RepoError> {
        Err(RepoError::Constraint("follows_unique_pair".to_string()))
    }
    async fn delete_pair(&self, _user_id: Uuid, _author_id: Uuid) -> Result<u64, RepoError> {
        Ok(0)
    }
}

#[tokio::test]
async fn follow_lost_to_a_concurrent_insert_is_already_following() {
    let fx = fixture().await;
    let repos = Repositories {
        follows: Arc::new(RacedFollows),
        ..fx.repos.clone()
    };
    let blog = BlogService::new(
        repos,
        Arc::new(LocalImageStore::new(fx.media.path())),
        Paginator::default(),
    );

    let outcome = blog.follow(&fx.reader, "auth").await;

    assert!(matches!(outcome, Ok(FollowOutcome::AlreadyFollowing)));
}

#[tokio::test]
async fn unfollow_removes_exactly_one_relation() {
    let fx = fixture().await;
    let third = user(&fx.repos, "third").await;
    fx.blog.follow(&fx.reader, "auth").await.unwrap();
    fx.blog.follow(&third, "auth").await.unwrap();

    assert_eq!(fx.blog.unfollow(&fx.reader, "auth").await.unwrap(), 1);
    assert_eq!(fx.blog.unfollow(&fx.reader, "auth").await.unwrap(), 0);

    assert!(!fx.repos.follows.exists(fx.reader.user_id, fx.author.user_id).await.unwrap());
    assert!(fx.repos.follows.exists(third.user_id, fx.author.user_id).await.unwrap());
}

#[tokio::test]
async fn follow_index_lists_only_followed_authors() {
    let fx = fixture().await;
    let other = user(&fx.repos, "other").await;
    publish(&fx.repos, &fx.author, "older followed", None).await;
    publish(&fx.repos, &other, "not followed", None).await;
    publish(&fx.repos, &fx.author, "newer followed", None).await;

    fx.blog.follow(&fx.reader, "auth").await.unwrap();

    let feed = fx.blog.follow_index(&fx.reader, None).await.unwrap().page_obj;
    let texts: Vec<_> = feed.iter().map(|card| card.text.as_str()).collect();
    assert_eq!(texts, ["newer followed", "older followed"]);

    let empty = fx.blog.follow_index(&other, None).await.unwrap().page_obj;
    assert!(empty.is_empty());
}

#[tokio::test]
async fn new_post_form_lists_groups() {
    let fx = fixture().await;
    let page = fx.blog.new_post_form().await.unwrap();
    assert!(!page.is_edit);
    assert!(!page.form.is_bound);
    assert_eq!(page.groups[0].title, "Тестовая группа");
}
