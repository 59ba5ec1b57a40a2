//! Page rendering.
//!
//! Templates live outside this service: a page is answered with the
//! template name and its context as a JSON document.

use actix_web::http::{StatusCode, header};
use actix_web::HttpResponse;
use serde::Serialize;

use crate::middleware::error::{AppError, AppResult};

#[derive(Serialize)]
struct Envelope<'a, C: Serialize> {
    template: &'a str,
    context: &'a C,
}

/// Serialized page body.
pub fn body<C: Serialize>(template: &str, context: &C) -> AppResult<String> {
    serde_json::to_string(&Envelope { template, context })
        .map_err(|e| AppError::Internal(format!("rendering {template}: {e}")))
}

/// Wrap an already rendered body.
pub fn respond(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(header::ContentType::json())
        .body(body)
}

pub fn page<C: Serialize>(template: &str, context: &C) -> AppResult<HttpResponse> {
    Ok(respond(StatusCode::OK, body(template, context)?))
}

/// `302 Found` to `location`.
pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}
