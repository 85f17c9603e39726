//! Citequill Common Library
//!
//! Shared code for the Citequill reference-checking backend including:
//! - Database entities and repository
//! - Citation scoring callout client
//! - Mail notification callout client
//! - Error types and handling
//! - Configuration management
//! - Password hashing utilities
//! - Metrics

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;
pub mod scoring;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use mail::Mailer;
pub use scoring::CitationScorer;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default scoring model
pub const DEFAULT_SCORING_MODEL: &str = "gemini-2.0-flash-exp";
