pub mod course;
pub mod progress;
pub mod quiz;

pub use course::{
    Course, CourseDetail, CreateCourseResponse, DeleteCourseResponse, Lesson, LessonDetail,
    LessonRef, LessonSummary, Module, ModuleDetail, NewCourseRequest, Personalization,
};
pub use progress::{DueReview, Identity, ProgressResponse, UserProgress};
pub use quiz::{
    Choice, ChoiceView, Question, QuestionView, Quiz, QuizAttempt, QuizResult, QuizSubmission,
    QuizView,
};
