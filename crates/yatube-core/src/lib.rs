//! # Yatube Core
//!
//! The domain layer of the Yatube blog.
//! Entities, ports, pagination, forms and the page logic live here with no
//! infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;
pub mod services;
pub mod settings;

pub use error::DomainError;
