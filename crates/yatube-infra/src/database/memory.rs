//! In-memory implementation of every repository.
//!
//! Mirrors the integrity rules the PostgreSQL schema enforces: unique
//! usernames, slugs and follow pairs, no self-follow, foreign keys, and the
//! cascades (posts and comments go with their author, comments go with their
//! post, a deleted group leaves its posts ungrouped).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostFilter,
    PostRepository, UserRepository,
};
use yatube_core::services::Repositories;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
}

impl Tables {
    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn check_post(&self, post: &Post) -> Result<(), RepoError> {
        if !self.user_exists(post.author_id) {
            return Err(RepoError::Constraint("posts.author_id".to_string()));
        }
        if let Some(group_id) = post.group_id {
            if !self.groups.iter().any(|g| g.id == group_id) {
                return Err(RepoError::Constraint("posts.group_id".to_string()));
            }
        }
        Ok(())
    }

    fn check_comment(&self, comment: &Comment) -> Result<(), RepoError> {
        if !self.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(RepoError::Constraint("comments.post_id".to_string()));
        }
        if !self.user_exists(comment.author_id) {
            return Err(RepoError::Constraint("comments.author_id".to_string()));
        }
        Ok(())
    }

    fn check_follow(&self, follow: &Follow) -> Result<(), RepoError> {
        if follow.user_id == follow.author_id {
            return Err(RepoError::Constraint("follows_prevent_self_follow".to_string()));
        }
        if !self.user_exists(follow.user_id) || !self.user_exists(follow.author_id) {
            return Err(RepoError::Constraint("follows.user_id".to_string()));
        }
        Ok(())
    }

    fn follows_pair(&self, user_id: Uuid, author_id: Uuid) -> bool {
        self.follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self.follows_pair(user_id, post.author_id),
        }
    }
}

/// Process-local store used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every repository backed by this store.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            groups: self.clone(),
            posts: self.clone(),
            comments: self.clone(),
            follows: self.clone(),
        }
    }
}

fn replace<T>(rows: &mut [T], is_row: impl Fn(&T) -> bool, row: T) -> Result<(), RepoError> {
    let slot = rows.iter_mut().find(|r| is_row(r)).ok_or(RepoError::NotFound)?;
    *slot = row;
    Ok(())
}

fn remove<T>(rows: &mut Vec<T>, is_row: impl Fn(&T) -> bool) -> Result<(), RepoError> {
    let before = rows.len();
    rows.retain(|r| !is_row(r));
    if rows.len() == before {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint("users_username_key".to_string()));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint("users_username_key".to_string()));
        }
        let id = user.id;
        replace(&mut tables.users, |u| u.id == id, user.clone())?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.users, |u| u.id == id)?;

        let orphaned: Vec<Uuid> = tables
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|p| p.author_id != id);
        tables
            .comments
            .retain(|c| c.author_id != id && !orphaned.contains(&c.post_id));
        tables
            .follows
            .retain(|f| f.user_id != id && f.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn create(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.iter().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint("groups_slug_key".to_string()));
        }
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .iter()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(RepoError::Constraint("groups_slug_key".to_string()));
        }
        let id = group.id;
        replace(&mut tables.groups, |g| g.id == id, group.clone())?;
        Ok(group)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.groups, |g| g.id == id)?;
        for post in tables.posts.iter_mut().filter(|p| p.group_id == Some(id)) {
            post.group_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryDatabase {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_post(&post)?;
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_post(&post)?;
        let id = post.id;
        replace(&mut tables.posts, |p| p.id == id, post.clone())?;
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.posts, |p| p.id == id)?;
        tables.comments.retain(|c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryDatabase {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| tables.matches(p, filter))
            .count() as u64)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        // Newest insert first among equal timestamps.
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .rev()
            .filter(|p| tables.matches(p, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_comment(&comment)?;
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_comment(&comment)?;
        let id = comment.id;
        replace(&mut tables.comments, |c| c.id == id, comment.clone())?;
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.comments, |c| c.id == id)
    }
}

#[async_trait]
impl CommentRepository for InMemoryDatabase {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

#[async_trait]
impl BaseRepository<Follow, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Follow>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().find(|f| f.id == id).cloned())
    }

    async fn create(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_follow(&follow)?;
        if tables.follows_pair(follow.user_id, follow.author_id) {
            return Err(RepoError::Constraint("follows_unique_pair".to_string()));
        }
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn update(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_follow(&follow)?;
        if tables.follows.iter().any(|f| {
            f.user_id == follow.user_id && f.author_id == follow.author_id && f.id != follow.id
        }) {
            return Err(RepoError::Constraint("follows_unique_pair".to_string()));
        }
        let id = follow.id;
        replace(&mut tables.follows, |f| f.id == id, follow.clone())?;
        Ok(follow)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.follows, |f| f.id == id)
    }
}

#[async_trait]
impl FollowRepository for InMemoryDatabase {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows_pair(user_id, author_id))
    }

    async fn get_or_create(&self, follow: Follow) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_follow(&follow)?;
        if tables.follows_pair(follow.user_id, follow.author_id) {
            return Ok(false);
        }
        tables.follows.push(follow);
        Ok(true)
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok((before - tables.follows.len()) as u64)
    }
}
