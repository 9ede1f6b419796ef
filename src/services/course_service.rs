use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{progress, repository};
use crate::error::AppError;
use crate::generation::{CourseOutline, GenerationClient, GenerationError, payload, prompts};
use crate::models::{
    CourseDetail, CreateCourseResponse, DeleteCourseResponse, Identity, LessonSummary,
    ModuleDetail, NewCourseRequest, Personalization,
};
use crate::services::worker::GenerationQueue;

const UNNAMED_TOPIC: &str = "Unnamed Topic";

pub struct CourseService {
    db: SqlitePool,
    client: Arc<dyn GenerationClient>,
    outline_model: String,
    queue: Option<GenerationQueue>,
}

impl CourseService {
    pub fn new(
        db: SqlitePool,
        client: Arc<dyn GenerationClient>,
        outline_model: impl Into<String>,
        queue: Option<GenerationQueue>,
    ) -> Self {
        Self {
            db,
            client,
            outline_model: outline_model.into(),
            queue,
        }
    }

    /// Outline from the generation service (or the placeholder outline when it
    /// fails), persisted atomically, then lessons queued for background generation.
    pub async fn create_course(
        &self,
        req: NewCourseRequest,
        creator: Option<&Identity>,
    ) -> Result<CreateCourseResponse, AppError> {
        let topic = req
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNNAMED_TOPIC)
            .to_string();

        let (outline, warning) = match self.request_outline(&topic, &req.personalization).await {
            Ok(outline) => (outline, None),
            Err(e) => {
                warn!("outline generation failed for topic {:?}: {}", topic, e);
                let warning = format!(
                    "Generation service unavailable ({}). A placeholder course has been created for demonstration.",
                    e.kind()
                );
                (CourseOutline::placeholder(&topic), Some(warning))
            }
        };

        let mut tx = self.db.begin().await?;
        let course = repository::insert_course(
            &mut tx,
            &outline.course_title,
            &outline.course_description,
            creator.map(Identity::owner_tag),
        )
        .await?;

        let mut lessons_to_generate = Vec::new();
        for (module_order, module_outline) in outline.modules.iter().enumerate() {
            let module = repository::insert_module(
                &mut tx,
                &course.id,
                &module_outline.title,
                &module_outline.objective,
                module_order as i64,
            )
            .await?;
            for (lesson_order, lesson_title) in module_outline.lessons.iter().enumerate() {
                let lesson =
                    repository::insert_lesson(&mut tx, &module.id, lesson_title, lesson_order as i64)
                        .await?;
                lessons_to_generate.push(lesson.id);
            }
        }
        tx.commit().await?;

        info!(
            "created course {} ({} lessons, placeholder: {})",
            course.id,
            lessons_to_generate.len(),
            warning.is_some()
        );

        if warning.is_none() {
            if let Some(queue) = &self.queue {
                for lesson_id in lessons_to_generate {
                    queue.enqueue(lesson_id);
                }
            }
        }

        Ok(CreateCourseResponse {
            success: true,
            course_id: course.id,
            warning,
        })
    }

    async fn request_outline(
        &self,
        topic: &str,
        personalization: &Personalization,
    ) -> Result<CourseOutline, GenerationError> {
        let prompt = prompts::course_outline(topic, personalization);
        let raw = self.client.generate(&self.outline_model, &prompt).await?;
        payload::parse_outline(&raw)
    }

    /// Only the creator may delete an owned course; unowned courses are open.
    pub async fn delete_course(
        &self,
        course_id: &str,
        identity: Option<&Identity>,
    ) -> Result<DeleteCourseResponse, AppError> {
        let course = repository::find_course_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(owner) = &course.created_by {
            let Some(identity) = identity else {
                return Err(AppError::Unauthorized(
                    "Sign in to delete this course.".to_string(),
                ));
            };
            if &identity.owner_tag() != owner {
                return Err(AppError::Forbidden(
                    "You are not authorized to delete this course.".to_string(),
                ));
            }
        }

        if !repository::delete_course(&self.db, course_id).await? {
            return Err(AppError::NotFound);
        }
        info!("deleted course {}", course_id);

        Ok(DeleteCourseResponse {
            success: true,
            message: "Course deleted successfully.".to_string(),
        })
    }

    pub async fn course_detail(
        &self,
        course_id: &str,
        identity: Option<&Identity>,
    ) -> Result<CourseDetail, AppError> {
        let course = repository::find_course_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let modules = repository::fetch_modules(&self.db, course_id).await?;
        let lessons = repository::fetch_course_lessons(&self.db, course_id).await?;
        let completed = match identity {
            Some(identity) => progress::completed_lesson_ids(&self.db, identity, course_id).await?,
            None => Default::default(),
        };

        let modules = modules
            .into_iter()
            .map(|module| {
                let lessons = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .map(|l| LessonSummary {
                        id: l.id.clone(),
                        title: l.title.clone(),
                        position: l.position,
                        has_content: l.has_content(),
                        completed: completed.contains(&l.id),
                    })
                    .collect();
                ModuleDetail { module, lessons }
            })
            .collect();

        Ok(CourseDetail { course, modules })
    }
}
