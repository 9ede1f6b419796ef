use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Who is learning: an authenticated user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Identity {
    User(String),
    Session(String),
}

impl Identity {
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::User(_) => "user",
            Identity::Session(_) => "session",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Identity::User(key) | Identity::Session(key) => key,
        }
    }

    /// Value stored as a course creator.
    pub fn owner_tag(&self) -> String {
        format!("{}:{}", self.kind(), self.key())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.owner_tag())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProgress {
    pub id: String,
    pub identity_kind: String,
    pub identity_key: String,
    pub lesson_id: String,
    pub completed: bool,
    pub last_reviewed: String,
    pub next_review: Option<String>,
    pub ease_factor: f64,
    pub review_interval: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DueReview {
    pub lesson_id: String,
    pub lesson_title: String,
    pub module_id: String,
    pub course_id: String,
    pub next_review: String,
    pub ease_factor: f64,
    pub review_interval: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub success: bool,
    pub progress: UserProgress,
}
