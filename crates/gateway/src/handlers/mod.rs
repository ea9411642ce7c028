//! API handlers module

pub mod comments;
pub mod health;
pub mod lecturers;
pub mod reactions;

use serde::Serialize;

/// Generic status envelope returned by delete operations
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "Success",
            message: message.into(),
        }
    }
}
