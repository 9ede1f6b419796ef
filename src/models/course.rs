use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub content: String,
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Lesson {
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Short reference used for navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LessonRef {
    pub id: String,
    pub module_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personalization {
    pub learner_level: Option<String>,
    pub goals: Option<String>,
    pub background: Option<String>,
}

impl Personalization {
    pub fn is_empty(&self) -> bool {
        [&self.learner_level, &self.goals, &self.background]
            .iter()
            .all(|field| field.as_deref().map(str::trim).unwrap_or("").is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCourseRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(flatten)]
    pub personalization: Personalization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseResponse {
    pub success: bool,
    pub course_id: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCourseResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub position: i64,
    pub has_content: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonDetail {
    pub course: Course,
    pub module: Module,
    pub lesson: Lesson,
    pub is_placeholder: bool,
    pub progress: super::UserProgress,
    pub prev_lesson: Option<LessonRef>,
    pub next_lesson: Option<LessonRef>,
    pub has_quiz: bool,
    pub quiz_id: Option<String>,
}
