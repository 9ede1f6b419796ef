pub mod assistant;
pub mod course_service;
pub mod lesson_generator;
pub mod lesson_service;
pub mod quiz_service;
pub mod review;
pub mod worker;

pub use assistant::{AssistantRequest, AssistantResponse, AssistantService};
pub use course_service::CourseService;
pub use lesson_generator::{GenerationOutcome, LessonGenerator};
pub use lesson_service::LessonService;
pub use quiz_service::{PASSING_SCORE, QuizService};
pub use worker::{GenerationQueue, GenerationWorker};
