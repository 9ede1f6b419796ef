#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tutor::config::{AppConfig, LessonContentMode};
use tutor::db::{self, repository};
use tutor::generation::{GenerationClient, GenerationError};
use tutor::models::{Lesson, Quiz};
use tutor::state::AppState;

pub const OUTLINE_JSON: &str = r#"```json
{
    "course_title": "Rust From Scratch",
    "course_description": "A practical introduction to Rust.",
    "modules": [
        {"title": "Basics", "objective": "Write small programs.", "lessons": ["Variables", "Functions"]},
        {"title": "Ownership", "objective": "Understand moves and borrows.", "lessons": ["Moves"]}
    ]
}
```"#;

pub const LESSON_JSON: &str = r#"Here you go:
```json
{
    "lesson_content": "Values have exactly one owner.",
    "quiz_question": "How many owners does a value have?",
    "options": ["Zero", "One", "Two", "Any number"],
    "answer": "One",
    "explanation": "Ownership is unique."
}
```"#;

/// Scripted generation service that answers by prompt kind.
pub struct FakeGenerator {
    pub outline_calls: AtomicUsize,
    pub lesson_calls: AtomicUsize,
    pub assistant_calls: AtomicUsize,
    lesson_reply: Option<String>,
    fail_all: bool,
    delay: Option<Duration>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            outline_calls: AtomicUsize::new(0),
            lesson_calls: AtomicUsize::new(0),
            assistant_calls: AtomicUsize::new(0),
            lesson_reply: Some(LESSON_JSON.to_string()),
            fail_all: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn with_lesson_reply(reply: &str) -> Self {
        Self {
            lesson_reply: Some(reply.to_string()),
            ..Self::new()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn lesson_calls(&self) -> usize {
        self.lesson_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for FakeGenerator {
    async fn generate(&self, _model: &str, prompt: &str) -> Result<String, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all {
            return Err(GenerationError::Unavailable);
        }

        if prompt.contains("curriculum designer") {
            self.outline_calls.fetch_add(1, Ordering::SeqCst);
            Ok(OUTLINE_JSON.to_string())
        } else if prompt.contains("expert educator") {
            self.lesson_calls.fetch_add(1, Ordering::SeqCst);
            self.lesson_reply.clone().ok_or(GenerationError::EmptyResponse)
        } else {
            self.assistant_calls.fetch_add(1, Ordering::SeqCst);
            Ok("Ownership means one owner.".to_string())
        }
    }
}

pub fn test_config(mode: LessonContentMode, background: bool) -> AppConfig {
    AppConfig {
        lesson_content_mode: mode,
        background_generation: background,
        ..AppConfig::default()
    }
}

pub async fn setup_state(
    generator: Arc<dyn GenerationClient>,
    mode: LessonContentMode,
    background: bool,
) -> AppState {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create test db");
    AppState::new(pool, generator, test_config(mode, background))
}

pub async fn course_lessons(pool: &SqlitePool, course_id: &str) -> Vec<Lesson> {
    repository::fetch_course_lessons(pool, course_id)
        .await
        .expect("Failed to fetch lessons")
}

/// Seeds a quiz with `questions` questions, each with a correct choice "right"
/// and a wrong one. Returns the quiz and `(question_id, right_id, wrong_id)`.
pub async fn seed_quiz(
    pool: &SqlitePool,
    lesson_id: &str,
    questions: usize,
) -> (Quiz, Vec<(String, String, String)>) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let quiz = repository::insert_quiz(&mut conn, lesson_id, "Seeded quiz")
        .await
        .expect("Failed to insert quiz");

    let mut ids = Vec::new();
    for position in 0..questions {
        let question = repository::insert_question(
            &mut conn,
            &quiz.id,
            &format!("Question {}", position),
            "",
            position as i64,
        )
        .await
        .expect("Failed to insert question");
        let right = repository::insert_choice(&mut conn, &question.id, "right", true)
            .await
            .expect("Failed to insert choice");
        let wrong = repository::insert_choice(&mut conn, &question.id, "wrong", false)
            .await
            .expect("Failed to insert choice");
        ids.push((question.id, right.id, wrong.id));
    }
    (quiz, ids)
}

/// Polls until every lesson of the course has content or the timeout passes.
pub async fn wait_for_content(pool: &SqlitePool, course_id: &str, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let lessons = course_lessons(pool, course_id).await;
        if lessons.iter().all(|l| l.has_content()) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
