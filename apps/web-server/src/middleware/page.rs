//! `?page=` extractor.
//!
//! Listings never reject a query string: a repeated `page` keeps its last
//! value and an undecodable one is handed to the paginator as-is, which
//! reads it as the first page.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload};

/// Raw requested page number of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageNumber(pub Option<String>);

impl PageNumber {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Last `page` value of a query string.
pub fn page_param(query: &str) -> Option<String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .filter(|(key, _)| decode_component(key) == "page")
        .map(|(_, value)| decode_component(value))
        .last()
}

impl FromRequest for PageNumber {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(PageNumber(page_param(req.query_string()))))
    }
}
