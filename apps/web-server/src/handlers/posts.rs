//! Post pages: listings, detail, create, edit and comments.

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::forms::{CommentForm, PostForm};
use yatube_core::ports::ImageUpload;
use yatube_core::services::Submission;
use yatube_shared::dto::{CommentFormData, PostFormData};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::page::PageNumber;
use crate::middleware::error::{AppError, AppResult};
use crate::render::{self, redirect};
use crate::state::AppState;
use crate::urls;

const INDEX_TEMPLATE: &str = "posts/index.html";
const GROUP_TEMPLATE: &str = "posts/group_list.html";
const PROFILE_TEMPLATE: &str = "posts/profile.html";
const POST_DETAIL_TEMPLATE: &str = "posts/post_detail.html";
const POST_FORM_TEMPLATE: &str = "posts/create_post.html";

pub(super) fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Post {raw} not found")))
}

/// Decode the submitted form. An image that is not valid base64 is passed
/// on as raw bytes so validation reports it as a broken image.
fn post_form(data: PostFormData) -> PostForm {
    let image = data.image.filter(|encoded| !encoded.is_empty()).map(|encoded| {
        let content = STANDARD
            .decode(encoded.trim())
            .unwrap_or_else(|_| encoded.into_bytes());
        let file_name = data.image_name.unwrap_or_else(|| "image".to_string());
        ImageUpload::new(file_name, content)
    });

    PostForm {
        text: data.text,
        group: data.group,
        image,
    }
}

/// GET / - served from the page cache while fresh.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    page: PageNumber,
) -> AppResult<HttpResponse> {
    let key = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.path());
    let page = page.as_deref();
    let blog = &state.blog;

    let body = state
        .index_cache
        .get_or_render(key, || async move {
            let context = blog.index(page).await?;
            render::body(INDEX_TEMPLATE, &context)
        })
        .await?;

    Ok(render::respond(StatusCode::OK, body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    page: PageNumber,
) -> AppResult<HttpResponse> {
    let context = state
        .blog
        .group_posts(&slug, page.as_deref())
        .await?;
    render::page(GROUP_TEMPLATE, &context)
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    username: web::Path<String>,
    page: PageNumber,
) -> AppResult<HttpResponse> {
    let viewer = identity.actor();
    let context = state
        .blog
        .profile(viewer.as_ref(), &username, page.as_deref())
        .await?;
    render::page(PROFILE_TEMPLATE, &context)
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    let context = state.blog.post_detail(post_id).await?;
    render::page(POST_DETAIL_TEMPLATE, &context)
}

/// GET /create/
pub async fn post_create_form(
    _identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let context = state.blog.new_post_form().await?;
    render::page(POST_FORM_TEMPLATE, &context)
}

/// POST /create/ - on success redirects to the author's profile.
pub async fn post_create(
    identity: Identity,
    state: web::Data<AppState>,
    form: web::Form<PostFormData>,
) -> AppResult<HttpResponse> {
    let submission = state
        .blog
        .create_post(&identity.actor(), post_form(form.into_inner()))
        .await?;

    match submission {
        Submission::Saved(_) => Ok(redirect(urls::profile(&identity.username))),
        Submission::Invalid(context) => render::page(POST_FORM_TEMPLATE, &context),
    }
}

/// GET /posts/{post_id}/edit/ - non-authors are sent back to the post.
pub async fn post_edit_form(
    identity: Identity,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;

    match state.blog.edit_post_form(&identity.actor(), post_id).await {
        Ok(context) => render::page(POST_FORM_TEMPLATE, &context),
        Err(DomainError::Forbidden) => Ok(redirect(urls::post_detail(post_id))),
        Err(e) => Err(e.into()),
    }
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    identity: Identity,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
    form: web::Form<PostFormData>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    let form = post_form(form.into_inner());

    match state.blog.edit_post(&identity.actor(), post_id, form).await {
        Ok(Submission::Saved(post)) => Ok(redirect(urls::post_detail(post.id))),
        Ok(Submission::Invalid(context)) => render::page(POST_FORM_TEMPLATE, &context),
        Err(DomainError::Forbidden) => Ok(redirect(urls::post_detail(post_id))),
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/comment/ - nothing to submit, back to the post.
pub async fn add_comment_redirect(
    _identity: Identity,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    state.blog.post_detail(post_id).await?;
    Ok(redirect(urls::post_detail(post_id)))
}

/// POST /posts/{post_id}/comment/
pub async fn add_comment(
    identity: Identity,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
    form: web::Form<CommentFormData>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    let form = CommentForm::new(form.into_inner().text);

    match state.blog.add_comment(&identity.actor(), post_id, form).await? {
        Submission::Saved(_) => Ok(redirect(urls::post_detail(post_id))),
        Submission::Invalid(context) => render::page(POST_DETAIL_TEMPLATE, &context),
    }
}
