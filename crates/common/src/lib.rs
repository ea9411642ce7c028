//! Lectorate Common Library
//!
//! Shared code for the lecturer rating service including:
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Submission validation and scoring
//! - Achievement notifier
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod notifier;
pub mod scoring;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{CommentPage, CommentView, DbPool, LecturerView, Repository};
pub use errors::{AppError, Result};
pub use notifier::AchievementNotifier;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
