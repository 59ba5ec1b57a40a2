//! Paths of the blog pages, for redirects.

use uuid::Uuid;

pub const INDEX: &str = "/";
pub const LOGIN: &str = "/auth/login/";

pub fn profile(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_detail(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

/// Login page that returns to `next` afterwards.
pub fn login_with_next(next: &str) -> String {
    format!("{LOGIN}?next={}", quote_path(next))
}

/// Percent-encode `path` leaving the `/` separators readable.
fn quote_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Where to send the user after login: `next` when it stays on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next
        }
        _ => INDEX,
    }
}
