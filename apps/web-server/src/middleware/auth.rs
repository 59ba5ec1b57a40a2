//! Session extractors.
//!
//! The session is a signed token kept in the `yatube_session` cookie; a
//! `Authorization: Bearer` header is accepted as well.

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::header, web};
use std::future::Future;
use std::pin::Pin;

use yatube_core::domain::Actor;
use yatube_core::error::RepoError;
use yatube_core::ports::AuthError;

use crate::middleware::error::AppError;
use crate::render;
use crate::state::AppState;
use crate::urls;

pub const SESSION_COOKIE: &str = "yatube_session";

type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Authenticated user identity extractor.
///
/// Anonymous requests are redirected to the login page with `next` set to
/// the requested path:
/// ```ignore
/// async fn follow_index(identity: Identity) -> impl Responder { ... }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: uuid::Uuid,
    pub username: String,
}

impl Identity {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.username.clone())
    }
}

/// Rejection of an anonymous request to a login-only page.
#[derive(Debug)]
pub struct LoginRequired {
    pub next: String,
    pub reason: AuthError,
}

impl std::fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "login required for {}: {}", self.next, self.reason)
    }
}

impl actix_web::ResponseError for LoginRequired {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        render::redirect(urls::login_with_next(&self.next))
    }
}

fn session_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingAuth);
    };
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

/// Why a request carries no usable identity.
enum Rejection {
    Anonymous(AuthError),
    Store(RepoError),
}

/// The session's user, loaded from the store. A token whose user no longer
/// exists counts as no session at all.
async fn authenticate(req: &HttpRequest) -> Result<Identity, Rejection> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return Err(Rejection::Anonymous(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        )));
    };

    let claims = session_token(req)
        .and_then(|token| state.tokens.validate_token(&token))
        .map_err(Rejection::Anonymous)?;

    match state.users.find_by_id(claims.user_id).await {
        Ok(Some(user)) => Ok(Identity {
            user_id: user.id,
            username: user.username,
        }),
        Ok(None) => {
            tracing::debug!(user_id = %claims.user_id, "Session of a deleted user");
            Err(Rejection::Anonymous(AuthError::InvalidToken(
                "Unknown user".to_string(),
            )))
        }
        Err(e) => Err(Rejection::Store(e)),
    }
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match authenticate(&req).await {
                Ok(identity) => Ok(identity),
                Err(Rejection::Anonymous(reason)) => {
                    let next = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str())
                        .unwrap_or_else(|| req.path())
                        .to_string();
                    tracing::debug!(next = %next, reason = %reason, "Anonymous request to login-only page");
                    Err(LoginRequired { next, reason }.into())
                }
                Err(Rejection::Store(e)) => Err(AppError::from(e).into()),
            }
        })
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(Identity::actor)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match authenticate(&req).await {
                Ok(identity) => Ok(OptionalIdentity(Some(identity))),
                Err(Rejection::Anonymous(_)) => Ok(OptionalIdentity(None)),
                Err(Rejection::Store(e)) => Err(AppError::from(e).into()),
            }
        })
    }
}
