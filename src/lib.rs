//! bookstore-rs: A lightweight bookstore backend with catalog search and reviews.
//!
//! This crate provides a REST API for browsing a book catalog, managing
//! categories, submitting reviews and administering catalog entries behind
//! token authentication.
//!
//! # Features
//!
//! - Paginated catalog listing with case-insensitive keyword search
//! - Category associations resolved into book responses
//! - Customer reviews with one-review-per-user guard and mean rating
//! - Top-rated listing
//! - User accounts and token authentication
//! - Admin-only catalog deletion and category management

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Catalog service logic.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// HTTP server.
pub mod server;

#[cfg(test)]
mod tests;

pub use catalog::CatalogService;
pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
