//! Subscriptions: the follow feed and (un)following authors.

use actix_web::{HttpResponse, web};


use crate::middleware::auth::Identity;
use crate::middleware::page::PageNumber;
use crate::middleware::error::AppResult;
use crate::render::{self, redirect};
use crate::state::AppState;
use crate::urls;

const FOLLOW_TEMPLATE: &str = "posts/follow.html";

/// GET /follow/ - posts by followed authors.
pub async fn follow_index(
    identity: Identity,
    state: web::Data<AppState>,
    page: PageNumber,
) -> AppResult<HttpResponse> {
    let context = state
        .blog
        .follow_index(&identity.actor(), page.as_deref())
        .await?;
    render::page(FOLLOW_TEMPLATE, &context)
}

/// /profile/{username}/follow/
pub async fn profile_follow(
    identity: Identity,
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.blog.follow(&identity.actor(), &username).await?;
    Ok(redirect(urls::profile(&username)))
}

/// /profile/{username}/unfollow/
pub async fn profile_unfollow(
    identity: Identity,
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.blog.unfollow(&identity.actor(), &username).await?;
    Ok(redirect(urls::profile(&username)))
}
