//! Natural-language-to-SQL chat assistant for the credit card demo database.
//!
//! Library exports for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod core;
pub mod errors;
pub mod infrastructure;
