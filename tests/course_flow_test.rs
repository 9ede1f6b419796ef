mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tutor::config::LessonContentMode;
use tutor::db::{progress, repository};
use tutor::error::AppError;
use tutor::generation::UnavailableGenerationClient;
use tutor::models::{Identity, NewCourseRequest, QuizSubmission};
use tutor::services::GenerationOutcome;

use common::{FakeGenerator, course_lessons, seed_quiz, setup_state, wait_for_content};

fn course_request(topic: &str) -> NewCourseRequest {
    NewCourseRequest {
        topic: Some(topic.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_course_persists_outline_in_order() {
    let generator = Arc::new(FakeGenerator::new());
    let state = setup_state(generator.clone(), LessonContentMode::Placeholder, false).await;
    let owner = Identity::User("alice".to_string());

    let created = state
        .course_service()
        .create_course(course_request("Rust"), Some(&owner))
        .await
        .expect("Failed to create course");
    assert!(created.success);
    assert!(created.warning.is_none());

    let course = repository::find_course_by_id(&state.db, &created.course_id)
        .await
        .expect("query")
        .expect("course exists");
    assert_eq!(course.title, "Rust From Scratch");
    assert_eq!(course.created_by.as_deref(), Some("user:alice"));

    let modules = repository::fetch_modules(&state.db, &course.id).await.expect("modules");
    let module_titles: Vec<&str> = modules.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(module_titles, vec!["Basics", "Ownership"]);
    assert_eq!(modules[0].description, "Write small programs.");

    let lessons = course_lessons(&state.db, &course.id).await;
    let lesson_titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(lesson_titles, vec!["Variables", "Functions", "Moves"]);
    assert!(lessons.iter().all(|l| !l.has_content()));
    assert_eq!(generator.lesson_calls(), 0);
}

#[tokio::test]
async fn test_create_course_queues_background_generation() {
    let generator = Arc::new(FakeGenerator::new());
    let state = setup_state(generator.clone(), LessonContentMode::Placeholder, true).await;

    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("Failed to create course");

    assert!(
        wait_for_content(&state.db, &created.course_id, Duration::from_secs(5)).await,
        "background worker did not fill every lesson"
    );
    assert_eq!(generator.lesson_calls(), 3);

    for lesson in course_lessons(&state.db, &created.course_id).await {
        assert_eq!(lesson.content, "Values have exactly one owner.");
        let quiz = repository::find_quiz_by_lesson(&state.db, &lesson.id)
            .await
            .expect("query")
            .expect("quiz created with the content");
        let choices = repository::fetch_quiz_choices(&state.db, &quiz.id).await.expect("choices");
        assert_eq!(choices.len(), 4);
        assert_eq!(choices.iter().filter(|c| c.is_correct).count(), 1);
    }
}

#[tokio::test]
async fn test_unreachable_service_creates_placeholder_course() {
    let state = setup_state(
        Arc::new(UnavailableGenerationClient),
        LessonContentMode::Placeholder,
        true,
    )
    .await;

    let created = state
        .course_service()
        .create_course(course_request("Chess"), None)
        .await
        .expect("fallback never fails the request");

    let warning = created.warning.expect("warning is set");
    assert!(warning.contains("Unavailable"));

    let course = repository::find_course_by_id(&state.db, &created.course_id)
        .await
        .expect("query")
        .expect("course exists");
    assert!(course.title.contains("Chess"));

    let lessons = course_lessons(&state.db, &created.course_id).await;
    assert_eq!(lessons.len(), 4);

    // placeholder courses are not queued for generation
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(course_lessons(&state.db, &created.course_id)
        .await
        .iter()
        .all(|l| !l.has_content()));
}

#[tokio::test]
async fn test_blank_topic_becomes_unnamed() {
    let state = setup_state(
        Arc::new(UnavailableGenerationClient),
        LessonContentMode::Placeholder,
        false,
    )
    .await;

    let created = state
        .course_service()
        .create_course(NewCourseRequest::default(), None)
        .await
        .expect("course created");
    let course = repository::find_course_by_id(&state.db, &created.course_id)
        .await
        .expect("query")
        .expect("course exists");
    assert!(course.title.contains("Unnamed Topic"));
}

#[tokio::test]
async fn test_generation_runs_once_per_lesson() {
    let generator = Arc::new(FakeGenerator::new());
    let state = setup_state(generator.clone(), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);

    let first = state.lessons.generate_for_lesson(&lesson.id).await.expect("generate");
    let second = state.lessons.generate_for_lesson(&lesson.id).await.expect("generate");

    assert_eq!(first, GenerationOutcome::Generated);
    assert_eq!(second, GenerationOutcome::AlreadyPresent);
    assert_eq!(generator.lesson_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_generation_for_same_lesson_runs_once() {
    let generator = Arc::new(FakeGenerator::with_delay(Duration::from_millis(100)));
    let state = setup_state(generator.clone(), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);

    let (a, b) = tokio::join!(
        state.lessons.generate_for_lesson(&lesson.id),
        state.lessons.generate_for_lesson(&lesson.id),
    );
    let mut outcomes = vec![a.expect("generate"), b.expect("generate")];
    outcomes.sort_by_key(|o| format!("{:?}", o));

    assert_eq!(outcomes, vec![GenerationOutcome::Generated, GenerationOutcome::InProgress]);
    assert_eq!(generator.lesson_calls(), 1);

    let quizzes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE lesson_id = ?")
        .bind(&lesson.id)
        .fetch_one(&state.db)
        .await
        .expect("count");
    assert_eq!(quizzes, 1);
}

#[tokio::test]
async fn test_malformed_output_becomes_error_content() {
    let generator = Arc::new(FakeGenerator::with_lesson_reply("Sorry, I cannot do that."));
    let state = setup_state(generator.clone(), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);

    let outcome = state.lessons.generate_for_lesson(&lesson.id).await.expect("never propagates");
    assert!(matches!(outcome, GenerationOutcome::Failed { .. }));

    let stored = repository::find_lesson_by_id(&state.db, &lesson.id)
        .await
        .expect("query")
        .expect("lesson exists");
    assert!(stored.content.starts_with("### Error Generating Content"));
    assert!(repository::find_quiz_by_lesson(&state.db, &lesson.id)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn test_unknown_lesson_generation_is_not_found() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let outcome = state.lessons.generate_for_lesson("missing").await.expect("query");
    assert_eq!(outcome, GenerationOutcome::NotFound);
}

#[tokio::test]
async fn test_placeholder_mode_does_not_touch_content() {
    let generator = Arc::new(FakeGenerator::new());
    let state = setup_state(generator.clone(), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lessons = course_lessons(&state.db, &created.course_id).await;
    let learner = Identity::Session("session-1".to_string());

    let detail = state
        .lesson_service()
        .lesson_detail(&created.course_id, &lessons[1].module_id, &lessons[1].id, &learner)
        .await
        .expect("lesson detail");

    assert!(detail.is_placeholder);
    assert!(detail.lesson.content.contains("Content Generation in Progress"));
    assert_eq!(detail.prev_lesson.map(|l| l.id), Some(lessons[0].id.clone()));
    assert_eq!(detail.next_lesson.map(|l| l.id), Some(lessons[2].id.clone()));
    assert!(!detail.progress.completed);
    assert!(!detail.has_quiz);

    let stored = repository::find_lesson_by_id(&state.db, &lessons[1].id)
        .await
        .expect("query")
        .expect("lesson exists");
    assert_eq!(stored.content, "");
    assert_eq!(generator.lesson_calls(), 0);
}

#[tokio::test]
async fn test_on_demand_mode_generates_content() {
    let generator = Arc::new(FakeGenerator::new());
    let state = setup_state(generator.clone(), LessonContentMode::OnDemand, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lessons = course_lessons(&state.db, &created.course_id).await;
    let learner = Identity::User("bob".to_string());

    let detail = state
        .lesson_service()
        .lesson_detail(&created.course_id, &lessons[0].module_id, &lessons[0].id, &learner)
        .await
        .expect("lesson detail");
    assert!(!detail.is_placeholder);
    assert_eq!(detail.lesson.content, "Values have exactly one owner.");
    assert!(detail.has_quiz);
    assert!(detail.prev_lesson.is_none());

    state
        .lesson_service()
        .lesson_detail(&created.course_id, &lessons[0].module_id, &lessons[0].id, &learner)
        .await
        .expect("lesson detail");
    assert_eq!(generator.lesson_calls(), 1);
}

#[tokio::test]
async fn test_lesson_detail_rejects_wrong_parents() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lessons = course_lessons(&state.db, &created.course_id).await;
    let learner = Identity::Session("s".to_string());

    // "Moves" lives in the second module
    let result = state
        .lesson_service()
        .lesson_detail(&created.course_id, &lessons[0].module_id, &lessons[2].id, &learner)
        .await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_quiz_scoring_and_progress() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);
    let (quiz, ids) = seed_quiz(&state.db, &lesson.id, 4).await;
    let learner = Identity::User("carol".to_string());

    let mut answers: HashMap<String, String> = HashMap::new();
    for (i, (question, right, wrong)) in ids.iter().enumerate() {
        let pick = if i < 3 { right } else { wrong };
        answers.insert(question.clone(), pick.clone());
    }

    let result = state
        .quiz_service()
        .submit(&quiz.id, QuizSubmission { answers }, &learner)
        .await
        .expect("submit");
    assert_eq!(result.score, 75.0);
    assert!(result.passed);
    assert_eq!(result.correct_answers, 3);
    assert_eq!(result.total_questions, 4);

    let attempts = progress::fetch_attempts(&state.db, &learner, &quiz.id).await.expect("attempts");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].score, 75.0);
    assert!(attempts[0].completed_at.ends_with('Z'));

    let completed = progress::find_progress(&state.db, &learner, &lesson.id)
        .await
        .expect("query")
        .expect("progress exists");
    assert!(completed.completed);
    assert!(completed.next_review.is_some());

    // a failing attempt afterwards keeps the lesson completed
    let result = state
        .quiz_service()
        .submit(&quiz.id, QuizSubmission::default(), &learner)
        .await
        .expect("submit");
    assert_eq!(result.score, 0.0);
    assert!(!result.passed);

    let still = progress::find_progress(&state.db, &learner, &lesson.id)
        .await
        .expect("query")
        .expect("progress exists");
    assert!(still.completed);
    assert_eq!(still.review_interval, 1);

    let attempts = state.quiz_service().attempts(&quiz.id, &learner).await.expect("attempts");
    assert_eq!(attempts.len(), 2);
}

#[tokio::test]
async fn test_failing_first_attempt_creates_no_progress() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);
    let (quiz, ids) = seed_quiz(&state.db, &lesson.id, 2).await;
    let learner = Identity::Session("anon".to_string());

    let answers = HashMap::from([(ids[0].0.clone(), ids[0].1.clone())]);
    let result = state
        .quiz_service()
        .submit(&quiz.id, QuizSubmission { answers }, &learner)
        .await
        .expect("submit");
    assert_eq!(result.score, 50.0);
    assert!(!result.passed);

    assert!(progress::find_progress(&state.db, &learner, &lesson.id)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn test_failed_submission_records_no_attempt() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);
    let (quiz, ids) = seed_quiz(&state.db, &lesson.id, 1).await;
    let learner = Identity::User("dave".to_string());

    // completing the lesson will fail after the attempt row is written
    sqlx::query("DROP TABLE user_progress")
        .execute(&state.db)
        .await
        .expect("drop table");

    let answers = HashMap::from([(ids[0].0.clone(), ids[0].1.clone())]);
    let result = state
        .quiz_service()
        .submit(&quiz.id, QuizSubmission { answers }, &learner)
        .await;
    assert!(matches!(result, Err(AppError::Database(_))));

    let attempts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts")
        .fetch_one(&state.db)
        .await
        .expect("count");
    assert_eq!(attempts, 0);
}

#[tokio::test]
async fn test_quiz_without_questions_scores_zero() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);
    let (quiz, _) = seed_quiz(&state.db, &lesson.id, 0).await;

    let result = state
        .quiz_service()
        .submit(&quiz.id, QuizSubmission::default(), &Identity::Session("s".to_string()))
        .await
        .expect("submit");
    assert_eq!(result.score, 0.0);
    assert_eq!(result.total_questions, 0);
    assert!(!result.passed);
}

#[tokio::test]
async fn test_quiz_view_hides_correctness_and_keeps_choices() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);
    let (quiz, ids) = seed_quiz(&state.db, &lesson.id, 3).await;

    let view = state.quiz_service().quiz_view(&quiz.id).await.expect("view");
    assert_eq!(view.lesson_id, lesson.id);
    assert_eq!(view.questions.len(), 3);
    for (question, (question_id, right, wrong)) in view.questions.iter().zip(ids.iter()) {
        assert_eq!(&question.id, question_id);
        let mut choice_ids: Vec<&String> = question.choices.iter().map(|c| &c.id).collect();
        choice_ids.sort();
        let mut expected = vec![right, wrong];
        expected.sort();
        assert_eq!(choice_ids, expected);
    }

    let json = serde_json::to_string(&view).expect("serialize");
    assert!(!json.contains("is_correct"));
}

#[tokio::test]
async fn test_delete_course_checks_owner_and_cascades() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let owner = Identity::User("alice".to_string());
    let created = state
        .course_service()
        .create_course(course_request("Rust"), Some(&owner))
        .await
        .expect("course created");
    let lesson = course_lessons(&state.db, &created.course_id).await.remove(0);
    state.lessons.generate_for_lesson(&lesson.id).await.expect("generate");

    let intruder = Identity::User("mallory".to_string());
    let denied = state
        .course_service()
        .delete_course(&created.course_id, Some(&intruder))
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let anonymous = state.course_service().delete_course(&created.course_id, None).await;
    assert!(matches!(anonymous, Err(AppError::Unauthorized(_))));

    let deleted = state
        .course_service()
        .delete_course(&created.course_id, Some(&owner))
        .await
        .expect("owner may delete");
    assert!(deleted.success);

    for table in ["modules", "lessons", "quizzes", "questions", "choices"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&state.db)
            .await
            .expect("count");
        assert_eq!(count, 0, "{} should be empty after cascade", table);
    }

    let missing = state
        .course_service()
        .delete_course(&created.course_id, Some(&owner))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_course_detail_reports_completion() {
    let state = setup_state(Arc::new(FakeGenerator::new()), LessonContentMode::Placeholder, false).await;
    let created = state
        .course_service()
        .create_course(course_request("Rust"), None)
        .await
        .expect("course created");
    let lessons = course_lessons(&state.db, &created.course_id).await;
    let learner = Identity::Session("s-1".to_string());

    state
        .lesson_service()
        .mark_complete(&lessons[1].id, &learner)
        .await
        .expect("mark complete");

    let detail = state
        .course_service()
        .course_detail(&created.course_id, Some(&learner))
        .await
        .expect("detail");
    assert_eq!(detail.modules.len(), 2);
    let completed: Vec<bool> = detail
        .modules
        .iter()
        .flat_map(|m| m.lessons.iter().map(|l| l.completed))
        .collect();
    assert_eq!(completed, vec![false, true, false]);
}
