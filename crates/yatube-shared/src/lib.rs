//! # Yatube Shared
//!
//! Wire types shared by the web server and its clients: submitted forms,
//! query strings and the problem-details error body.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
