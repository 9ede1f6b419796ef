use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::generation::GenerationClient;
use crate::services::{
    AssistantService, CourseService, GenerationQueue, GenerationWorker, LessonGenerator,
    LessonService, QuizService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub generation: Arc<dyn GenerationClient>,
    pub config: Arc<AppConfig>,
    pub lessons: LessonGenerator,
    pub queue: Option<GenerationQueue>,
}

impl AppState {
    /// Wires the services together; spawns the background worker when enabled,
    /// so this must run inside a tokio runtime.
    pub fn new(db: SqlitePool, generation: Arc<dyn GenerationClient>, config: AppConfig) -> Self {
        let lessons = LessonGenerator::new(
            db.clone(),
            generation.clone(),
            config.generation.lesson_model.clone(),
        );
        let queue = config
            .background_generation
            .then(|| GenerationWorker::spawn(lessons.clone(), config.generation_workers));

        Self {
            db,
            generation,
            config: Arc::new(config),
            lessons,
            queue,
        }
    }

    pub fn course_service(&self) -> CourseService {
        CourseService::new(
            self.db.clone(),
            self.generation.clone(),
            self.config.generation.outline_model.clone(),
            self.queue.clone(),
        )
    }

    pub fn lesson_service(&self) -> LessonService {
        LessonService::new(
            self.db.clone(),
            self.lessons.clone(),
            self.config.lesson_content_mode,
        )
    }

    pub fn quiz_service(&self) -> QuizService {
        QuizService::new(self.db.clone())
    }

    pub fn assistant_service(&self) -> AssistantService {
        AssistantService::new(
            self.db.clone(),
            self.generation.clone(),
            self.config.generation.lesson_model.clone(),
        )
    }
}
