use std::collections::HashSet;

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::models::{DueReview, Identity, QuizAttempt, UserProgress};

const PROGRESS_COLUMNS: &str = "id, identity_kind, identity_key, lesson_id, completed, last_reviewed, next_review, ease_factor, review_interval";

pub async fn find_progress<'e, E>(
    db: E,
    identity: &Identity,
    lesson_id: &str,
) -> Result<Option<UserProgress>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, UserProgress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE identity_kind = ?1 AND identity_key = ?2 AND lesson_id = ?3"
    ))
    .bind(identity.kind())
    .bind(identity.key())
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

pub async fn get_or_create_progress(
    db: &SqlitePool,
    identity: &Identity,
    lesson_id: &str,
) -> Result<UserProgress, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = super::now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO user_progress (id, identity_kind, identity_key, lesson_id, completed, last_reviewed)
        VALUES (?1, ?2, ?3, ?4, 0, ?5)
        ON CONFLICT (identity_kind, identity_key, lesson_id) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(identity.kind())
    .bind(identity.key())
    .bind(lesson_id)
    .bind(&now)
    .execute(db)
    .await?;

    find_progress(db, identity, lesson_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Sets `completed`; an existing row is never flipped back to incomplete here.
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    identity: &Identity,
    lesson_id: &str,
) -> Result<UserProgress, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = super::now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO user_progress (id, identity_kind, identity_key, lesson_id, completed, last_reviewed)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        ON CONFLICT (identity_kind, identity_key, lesson_id)
        DO UPDATE SET completed = 1, last_reviewed = excluded.last_reviewed
        "#,
    )
    .bind(&id)
    .bind(identity.kind())
    .bind(identity.key())
    .bind(lesson_id)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    find_progress(&mut *conn, identity, lesson_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_review_schedule<'e, E>(
    db: E,
    progress_id: &str,
    ease_factor: f64,
    review_interval: i64,
    last_reviewed: &str,
    next_review: &str,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE user_progress
        SET ease_factor = ?1,
            review_interval = ?2,
            last_reviewed = ?3,
            next_review = ?4
        WHERE id = ?5
        "#,
    )
    .bind(ease_factor)
    .bind(review_interval)
    .bind(last_reviewed)
    .bind(next_review)
    .bind(progress_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn completed_lesson_ids(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT p.lesson_id
        FROM user_progress p
        JOIN lessons l ON l.id = p.lesson_id
        JOIN modules m ON m.id = l.module_id
        WHERE p.identity_kind = ?1 AND p.identity_key = ?2 AND m.course_id = ?3 AND p.completed = 1
        "#,
    )
    .bind(identity.kind())
    .bind(identity.key())
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Lessons whose scheduled review time has passed, most overdue first.
pub async fn fetch_due_reviews(
    db: &SqlitePool,
    identity: &Identity,
    now: &str,
) -> Result<Vec<DueReview>, sqlx::Error> {
    sqlx::query_as::<_, DueReview>(
        r#"
        SELECT
            p.lesson_id,
            l.title AS lesson_title,
            l.module_id,
            m.course_id,
            p.next_review,
            p.ease_factor,
            p.review_interval
        FROM user_progress p
        JOIN lessons l ON l.id = p.lesson_id
        JOIN modules m ON m.id = l.module_id
        WHERE p.identity_kind = ?1
          AND p.identity_key = ?2
          AND p.next_review IS NOT NULL
          AND p.next_review <= ?3
        ORDER BY p.next_review
        "#,
    )
    .bind(identity.kind())
    .bind(identity.key())
    .bind(now)
    .fetch_all(db)
    .await
}

pub async fn insert_attempt<'e, E>(
    db: E,
    identity: &Identity,
    quiz_id: &str,
    score: f64,
    correct_answers: i64,
    total_questions: i64,
) -> Result<QuizAttempt, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let id = Uuid::new_v4().to_string();
    let now = super::now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO quiz_attempts
            (id, identity_kind, identity_key, quiz_id, score, correct_answers, total_questions, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&id)
    .bind(identity.kind())
    .bind(identity.key())
    .bind(quiz_id)
    .bind(score)
    .bind(correct_answers)
    .bind(total_questions)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(QuizAttempt {
        id,
        identity_kind: identity.kind().to_string(),
        identity_key: identity.key().to_string(),
        quiz_id: quiz_id.to_string(),
        score,
        correct_answers,
        total_questions,
        completed_at: now,
    })
}

pub async fn fetch_attempts(
    db: &SqlitePool,
    identity: &Identity,
    quiz_id: &str,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, identity_kind, identity_key, quiz_id, score, correct_answers, total_questions, completed_at
        FROM quiz_attempts
        WHERE identity_kind = ?1 AND identity_key = ?2 AND quiz_id = ?3
        ORDER BY completed_at DESC, rowid DESC
        "#,
    )
    .bind(identity.kind())
    .bind(identity.key())
    .bind(quiz_id)
    .fetch_all(db)
    .await
}
