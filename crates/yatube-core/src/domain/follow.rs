use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Follow entity - `user` reads the posts of `author` in their feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    /// The follower.
    pub user_id: Uuid,
    /// The followed author.
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    /// Create a follow relation. A user cannot follow themselves.
    pub fn new(user_id: Uuid, author_id: Uuid) -> Result<Self, DomainError> {
        if user_id == author_id {
            return Err(DomainError::Validation(
                "users cannot follow themselves".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            author_id,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_follow() {
        let id = Uuid::new_v4();
        assert!(matches!(
            Follow::new(id, id),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn links_follower_and_author() {
        let (user, author) = (Uuid::new_v4(), Uuid::new_v4());
        let follow = Follow::new(user, author).unwrap();
        assert_eq!(follow.user_id, user);
        assert_eq!(follow.author_id, author);
    }
}
