use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::generation::{GenerationClient, GenerationError, LessonPayload, payload, prompts};
use crate::models::{Lesson, Module};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Generated,
    AlreadyPresent,
    InProgress,
    Failed { message: String },
    NotFound,
}

/// Fills in lesson content and its quiz, at most once per lesson.
#[derive(Clone)]
pub struct LessonGenerator {
    db: SqlitePool,
    client: Arc<dyn GenerationClient>,
    model: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl LessonGenerator {
    pub fn new(db: SqlitePool, client: Arc<dyn GenerationClient>, model: impl Into<String>) -> Self {
        Self {
            db,
            client,
            model: model.into(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Check-then-generate. Generation failures end up as lesson content and a
    /// `Failed` outcome; only storage errors are returned as `Err`.
    pub async fn generate_for_lesson(&self, lesson_id: &str) -> Result<GenerationOutcome, AppError> {
        let Some(lesson) = repository::find_lesson_by_id(&self.db, lesson_id).await? else {
            return Ok(GenerationOutcome::NotFound);
        };
        if lesson.has_content() {
            debug!("lesson {} already has content", lesson_id);
            return Ok(GenerationOutcome::AlreadyPresent);
        }

        let Some(_guard) = InFlight::claim(&self.in_flight, lesson_id) else {
            debug!("lesson {} is already being generated", lesson_id);
            return Ok(GenerationOutcome::InProgress);
        };
        self.generate_claimed(lesson_id).await
    }

    /// Runs with the in-flight claim held. The lesson is read again because a
    /// generation that finished between the first check and the claim has
    /// already filled it.
    async fn generate_claimed(&self, lesson_id: &str) -> Result<GenerationOutcome, AppError> {
        let Some(lesson) = repository::find_lesson_by_id(&self.db, lesson_id).await? else {
            return Ok(GenerationOutcome::NotFound);
        };
        if lesson.has_content() {
            debug!("lesson {} was filled while waiting for the claim", lesson_id);
            return Ok(GenerationOutcome::AlreadyPresent);
        }

        let module = repository::find_module_by_id(&self.db, &lesson.module_id)
            .await?
            .ok_or(AppError::NotFound)?;

        match self.request_payload(&lesson, &module).await {
            Ok(payload) => self.persist(&lesson, payload).await,
            Err(e) => {
                warn!("failed to generate content for lesson {}: {}", lesson_id, e);
                repository::fill_lesson_content(&self.db, lesson_id, &error_placeholder(&e)).await?;
                Ok(GenerationOutcome::Failed {
                    message: e.to_string(),
                })
            }
        }
    }

    async fn request_payload(
        &self,
        lesson: &Lesson,
        module: &Module,
    ) -> Result<LessonPayload, GenerationError> {
        let prompt = prompts::lesson_content(lesson, module);
        let raw = self.client.generate(&self.model, &prompt).await?;
        payload::parse_lesson(&raw)
    }

    async fn persist(
        &self,
        lesson: &Lesson,
        payload: LessonPayload,
    ) -> Result<GenerationOutcome, AppError> {
        let mut tx = self.db.begin().await?;

        if !repository::fill_lesson_content(&mut *tx, &lesson.id, &payload.lesson_content).await? {
            tx.rollback().await?;
            return Ok(GenerationOutcome::AlreadyPresent);
        }

        if repository::find_quiz_by_lesson(&mut *tx, &lesson.id).await?.is_none() {
            let quiz =
                repository::insert_quiz(&mut tx, &lesson.id, &format!("Quiz for {}", lesson.title))
                    .await?;
            let question = repository::insert_question(
                &mut tx,
                &quiz.id,
                &payload.quiz_question,
                &payload.explanation,
                0,
            )
            .await?;
            for (option, is_correct) in payload
                .options
                .iter()
                .zip(correct_flags(&payload.options, &payload.answer))
            {
                repository::insert_choice(&mut tx, &question.id, option, is_correct).await?;
            }
        }

        tx.commit().await?;
        info!("generated content for lesson {}", lesson.id);
        Ok(GenerationOutcome::Generated)
    }
}

/// Marks which options equal the stated answer. Exact (trimmed) matches win;
/// a case-insensitive match is only used when nothing matches exactly.
pub fn correct_flags(options: &[String], answer: &str) -> Vec<bool> {
    let answer = answer.trim();
    let exact: Vec<bool> = options.iter().map(|o| o.trim() == answer).collect();
    if exact.iter().any(|&hit| hit) {
        return exact;
    }
    options
        .iter()
        .map(|o| o.trim().eq_ignore_ascii_case(answer))
        .collect()
}

pub fn error_placeholder(error: &GenerationError) -> String {
    format!(
        "### Error Generating Content\n\nWe encountered an issue while preparing this lesson: `{}`\n\nPlease try refreshing later or contact support.",
        error
    )
}

struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    lesson_id: String,
}

impl InFlight {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, lesson_id: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lesson_id.to_string());
        inserted.then(|| Self {
            set: set.clone(),
            lesson_id: lesson_id.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.lesson_id);
    }
}
