use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::repository;
use crate::error::AppError;
use crate::generation::{GenerationClient, prompts};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl AssistantRequest {
    /// `context.lesson_id`, accepted as a string or a number.
    pub fn lesson_id(&self) -> Option<String> {
        match self.context.as_ref()?.get("lesson_id")? {
            Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantResponse {
    pub response: String,
    pub context: Value,
}

pub struct AssistantService {
    db: SqlitePool,
    client: Arc<dyn GenerationClient>,
    model: String,
}

impl AssistantService {
    pub fn new(db: SqlitePool, client: Arc<dyn GenerationClient>, model: impl Into<String>) -> Self {
        Self {
            db,
            client,
            model: model.into(),
        }
    }

    /// Answers a learner question grounded only in the lesson's content.
    pub async fn ask(&self, req: AssistantRequest) -> Result<AssistantResponse, AppError> {
        let message = req
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let (Some(message), Some(lesson_id)) = (message, req.lesson_id()) else {
            return Err(AppError::BadRequest(
                "Message and lesson_id are required".to_string(),
            ));
        };

        let lesson = repository::find_lesson_by_id(&self.db, &lesson_id)
            .await?
            .ok_or(AppError::NotFound)?;

        debug!("assistant question for lesson {}", lesson_id);
        let prompt = prompts::assistant_reply(&lesson.content, &message);
        let response = self.client.generate(&self.model, &prompt).await?;

        Ok(AssistantResponse {
            response,
            context: req.context.unwrap_or(Value::Null),
        })
    }
}
