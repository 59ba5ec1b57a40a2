//! Page logic: each operation takes the acting user explicitly and returns
//! either a render context or an explicit outcome the HTTP layer maps to a
//! redirect.

mod blog;
mod context;
mod page_cache;

pub use blog::{BlogService, FollowOutcome, Repositories, Submission};
pub use context::{
    AuthorRef, CommentCard, FollowPage, GroupChoice, GroupPage, IndexPage, PostCard,
    PostDetailPage, PostFormPage, ProfilePage,
};
pub use page_cache::PageCache;
