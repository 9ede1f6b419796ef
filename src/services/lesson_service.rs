use sqlx::SqlitePool;
use tracing::debug;

use crate::config::LessonContentMode;
use crate::db::{self, progress, repository};
use crate::error::AppError;
use crate::models::{DueReview, Identity, LessonDetail, LessonRef, UserProgress};
use crate::services::lesson_generator::LessonGenerator;

pub const GENERATION_PENDING_NOTICE: &str = "### Content Generation in Progress\n\nOur AI tutor is currently preparing this lesson for you. Please check back in a moment. You can refresh the page to see the update.";

pub struct LessonService {
    db: SqlitePool,
    generator: LessonGenerator,
    mode: LessonContentMode,
}

impl LessonService {
    pub fn new(db: SqlitePool, generator: LessonGenerator, mode: LessonContentMode) -> Self {
        Self { db, generator, mode }
    }

    pub async fn lesson_detail(
        &self,
        course_id: &str,
        module_id: &str,
        lesson_id: &str,
        identity: &Identity,
    ) -> Result<LessonDetail, AppError> {
        let mut lesson = repository::find_lesson_in_course(&self.db, course_id, module_id, lesson_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut is_placeholder = false;
        if !lesson.has_content() {
            match self.mode {
                LessonContentMode::Placeholder => {
                    lesson.content = GENERATION_PENDING_NOTICE.to_string();
                    is_placeholder = true;
                }
                LessonContentMode::OnDemand => {
                    let outcome = self.generator.generate_for_lesson(lesson_id).await?;
                    debug!("on-demand generation for lesson {}: {:?}", lesson_id, outcome);
                    lesson = repository::find_lesson_by_id(&self.db, lesson_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                    if !lesson.has_content() {
                        // another request is still generating it
                        lesson.content = GENERATION_PENDING_NOTICE.to_string();
                        is_placeholder = true;
                    }
                }
            }
        }

        let course = repository::find_course_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let module = repository::find_module_by_id(&self.db, module_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let lesson_progress = progress::get_or_create_progress(&self.db, identity, lesson_id).await?;
        let refs = repository::fetch_course_lesson_refs(&self.db, course_id).await?;
        let (prev_lesson, next_lesson) = neighbors(&refs, lesson_id);
        let quiz = repository::find_quiz_by_lesson(&self.db, lesson_id).await?;

        Ok(LessonDetail {
            course,
            module,
            lesson,
            is_placeholder,
            progress: lesson_progress,
            prev_lesson,
            next_lesson,
            has_quiz: quiz.is_some(),
            quiz_id: quiz.map(|q| q.id),
        })
    }

    pub async fn mark_complete(
        &self,
        lesson_id: &str,
        identity: &Identity,
    ) -> Result<UserProgress, AppError> {
        repository::find_lesson_by_id(&self.db, lesson_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut conn = self.db.acquire().await?;
        Ok(progress::mark_completed(&mut conn, identity, lesson_id).await?)
    }

    pub async fn due_reviews(&self, identity: &Identity) -> Result<Vec<DueReview>, AppError> {
        let now = db::now_timestamp();
        Ok(progress::fetch_due_reviews(&self.db, identity, &now).await?)
    }
}

/// Previous and next lesson around `current_id` in reading order.
pub fn neighbors(lessons: &[LessonRef], current_id: &str) -> (Option<LessonRef>, Option<LessonRef>) {
    let Some(index) = lessons.iter().position(|l| l.id == current_id) else {
        return (None, None);
    };
    let prev = index.checked_sub(1).and_then(|i| lessons.get(i)).cloned();
    let next = lessons.get(index + 1).cloned();
    (prev, next)
}
