//! Account handlers: signup, login and logout.
//!
//! A successful signup or login stores a signed session token in the
//! session cookie; logout replaces it with an expired one.

use std::collections::BTreeMap;

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, web};
use serde::Serialize;

use yatube_core::domain::User;
use yatube_core::error::RepoError;
use yatube_core::forms::{FormErrors, FormState, REQUIRED};
use yatube_shared::dto::{LoginForm, NextQuery, SignupForm};

use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::{AppError, AppResult};
use crate::render;
use crate::state::AppState;
use crate::urls;

const SIGNUP_TEMPLATE: &str = "users/signup.html";
const LOGIN_TEMPLATE: &str = "users/login.html";
const LOGGED_OUT_TEMPLATE: &str = "users/logged_out.html";

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;

const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Serialize)]
struct AccountPage {
    form: FormState,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

fn account_form(username: &str, is_bound: bool, errors: FormErrors) -> FormState {
    let mut data = BTreeMap::new();
    data.insert("username", username.to_string());
    data.insert("password", String::new());
    FormState {
        is_bound,
        data,
        errors,
    }
}

fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        errors.add("username", REQUIRED);
        return;
    }
    let len = username.chars().count();
    if len > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_LEN} characters (it has {len})."),
        );
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        errors.add("username", INVALID_USERNAME);
    }
}

fn validate_password(password: &str, errors: &mut FormErrors) {
    if password.is_empty() {
        errors.add("password", REQUIRED);
    } else if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "password",
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
            ),
        );
    }
}

/// Session cookie carrying a fresh token for `user`.
fn session_cookie(state: &AppState, user: &User) -> AppResult<Cookie<'static>> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(state.tokens.expiration_seconds()))
        .finish())
}

fn redirect_with_session(location: &str, cookie: Cookie<'static>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(cookie)
        .finish()
}

/// The account matching the credentials, if any.
async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let Some(user) = state.users.find_by_username(username).await? else {
        return Ok(None);
    };
    let valid = state
        .passwords
        .verify(password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(valid.then_some(user))
}

/// GET /auth/signup/
pub async fn signup_form() -> AppResult<HttpResponse> {
    render::page(
        SIGNUP_TEMPLATE,
        &AccountPage {
            form: account_form("", false, FormErrors::default()),
            next: None,
        },
    )
}

/// POST /auth/signup/ - creates the account and logs it in.
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> AppResult<HttpResponse> {
    let SignupForm { username, password } = form.into_inner();
    let username = username.trim().to_string();

    let mut errors = FormErrors::default();
    validate_username(&username, &mut errors);
    validate_password(&password, &mut errors);
    if errors.get("username").is_empty() && state.users.find_by_username(&username).await?.is_some()
    {
        errors.add("username", USERNAME_TAKEN);
    }

    if !errors.is_empty() {
        return render::page(
            SIGNUP_TEMPLATE,
            &AccountPage {
                form: account_form(&username, true, errors),
                next: None,
            },
        );
    }

    let password_hash = state
        .passwords
        .hash(&password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = match state.users.create(User::new(username.clone(), password_hash)).await {
        Ok(user) => user,
        Err(RepoError::Constraint(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", USERNAME_TAKEN);
            return render::page(
                SIGNUP_TEMPLATE,
                &AccountPage {
                    form: account_form(&username, true, errors),
                    next: None,
                },
            );
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
    let cookie = session_cookie(&state, &user)?;
    Ok(redirect_with_session(urls::INDEX, cookie))
}

/// GET /auth/login/
pub async fn login_form(query: web::Query<NextQuery>) -> AppResult<HttpResponse> {
    render::page(
        LOGIN_TEMPLATE,
        &AccountPage {
            form: account_form("", false, FormErrors::default()),
            next: query.into_inner().next,
        },
    )
}

/// POST /auth/login/ - on success returns to `next` when it is a local path.
pub async fn login(
    state: web::Data<AppState>,
    query: web::Query<NextQuery>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let LoginForm {
        username,
        password,
        next,
    } = form.into_inner();
    let next = next.filter(|n| !n.is_empty()).or(query.into_inner().next);

    let mut errors = FormErrors::default();
    if username.is_empty() {
        errors.add("username", REQUIRED);
    }
    if password.is_empty() {
        errors.add("password", REQUIRED);
    }

    let mut user = None;
    if errors.is_empty() {
        user = authenticate(&state, &username, &password).await?;
        if user.is_none() {
            errors.add("__all__", INVALID_LOGIN);
        }
    }

    let Some(user) = user else {
        tracing::debug!(username = %username, "Login rejected");
        return render::page(
            LOGIN_TEMPLATE,
            &AccountPage {
                form: account_form(&username, true, errors),
                next,
            },
        );
    };

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
    let cookie = session_cookie(&state, &user)?;
    Ok(redirect_with_session(urls::safe_next(next.as_deref()), cookie))
}

/// /auth/logout/ - drops the session cookie.
pub async fn logout() -> AppResult<HttpResponse> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    Ok(HttpResponse::build(StatusCode::OK)
        .content_type(header::ContentType::json())
        .cookie(cookie)
        .body(render::body(LOGGED_OUT_TEMPLATE, &serde_json::json!({}))?))
}
