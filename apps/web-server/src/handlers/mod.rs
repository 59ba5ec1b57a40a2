//! HTTP handlers and route configuration.

mod auth;
mod follow;
mod health;
mod posts;


use actix_web::{HttpRequest, HttpResponse, web};

use crate::middleware::error::not_found_page;

/// Largest accepted form body; images travel base64-encoded inside it.
const FORM_LIMIT: usize = 10 * 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(FORM_LIMIT))
        .route("/health", web::get().to(health::health_check))
        // Blog pages
        .route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .service(
            web::resource("/posts/{post_id}/comment/")
                .route(web::get().to(posts::add_comment_redirect))
                .route(web::post().to(posts::add_comment)),
        )
        // Subscriptions
        .route("/follow/", web::get().to(follow::follow_index))
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(follow::profile_follow))
                .route(web::post().to(follow::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(follow::profile_unfollow))
                .route(web::post().to(follow::profile_unfollow)),
        )
        // Accounts
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                ),
        )
        .default_service(web::to(not_found));
}

/// Any path no route matches.
async fn not_found(req: HttpRequest) -> HttpResponse {
    not_found_page(Some(req.path()), None)
}
