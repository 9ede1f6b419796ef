use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::models::{Choice, Course, Lesson, LessonRef, Module, Question, Quiz};

const COURSE_COLUMNS: &str = "id, title, description, created_by, created_at, updated_at";
const LESSON_COLUMNS: &str = "id, module_id, title, content, position, created_at, updated_at";

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id<'e, E>(db: E, id: &str) -> Result<Option<Course>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_course(
    conn: &mut SqliteConnection,
    title: &str,
    description: &str,
    created_by: Option<String>,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = super::now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO courses (id, title, description, created_by, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(description)
    .bind(&created_by)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(Course {
        id,
        title: title.to_string(),
        description: description.to_string(),
        created_by,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Deletes the course; modules, lessons and quizzes go with it through
/// `ON DELETE CASCADE`.
pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn insert_module(
    conn: &mut SqliteConnection,
    course_id: &str,
    title: &str,
    description: &str,
    position: i64,
) -> Result<Module, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO modules (id, course_id, title, description, position)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(course_id)
    .bind(title)
    .bind(description)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(Module {
        id,
        course_id: course_id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        position,
    })
}

pub async fn fetch_modules(db: &SqlitePool, course_id: &str) -> Result<Vec<Module>, sqlx::Error> {
    sqlx::query_as::<_, Module>(
        "SELECT id, course_id, title, description, position FROM modules WHERE course_id = ? ORDER BY position",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn find_module_by_id<'e, E>(db: E, id: &str) -> Result<Option<Module>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Module>(
        "SELECT id, course_id, title, description, position FROM modules WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_lesson(
    conn: &mut SqliteConnection,
    module_id: &str,
    title: &str,
    position: i64,
) -> Result<Lesson, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = super::now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO lessons (id, module_id, title, content, position, created_at, updated_at)
        VALUES (?1, ?2, ?3, '', ?4, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(module_id)
    .bind(title)
    .bind(position)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(Lesson {
        id,
        module_id: module_id.to_string(),
        title: title.to_string(),
        content: String::new(),
        position,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_lesson_by_id<'e, E>(db: E, id: &str) -> Result<Option<Lesson>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Lesson>(&format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Looks a lesson up only if it really sits under the given module and course.
pub async fn find_lesson_in_course(
    db: &SqlitePool,
    course_id: &str,
    module_id: &str,
    lesson_id: &str,
) -> Result<Option<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(
        r#"
        SELECT l.id, l.module_id, l.title, l.content, l.position, l.created_at, l.updated_at
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE l.id = ?1 AND l.module_id = ?2 AND m.course_id = ?3
        "#,
    )
    .bind(lesson_id)
    .bind(module_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

/// All lessons of a course in reading order: module position, then lesson position.
pub async fn fetch_course_lessons(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(
        r#"
        SELECT l.id, l.module_id, l.title, l.content, l.position, l.created_at, l.updated_at
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE m.course_id = ?1
        ORDER BY m.position, l.position
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_course_lesson_refs(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<LessonRef>, sqlx::Error> {
    sqlx::query_as::<_, LessonRef>(
        r#"
        SELECT l.id, l.module_id, l.title
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE m.course_id = ?1
        ORDER BY m.position, l.position
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

/// Writes content only while the lesson is still empty. Returns false when
/// another writer got there first.
pub async fn fill_lesson_content<'e, E>(
    db: E,
    lesson_id: &str,
    content: &str,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = super::now_timestamp();
    let result = sqlx::query(
        r#"
        UPDATE lessons
        SET content = ?1,
            updated_at = ?2
        WHERE id = ?3 AND TRIM(content) = ''
        "#,
    )
    .bind(content)
    .bind(now)
    .bind(lesson_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn find_quiz_by_id<'e, E>(db: E, id: &str) -> Result<Option<Quiz>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Quiz>("SELECT id, lesson_id, title, description FROM quizzes WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_quiz_by_lesson<'e, E>(
    db: E,
    lesson_id: &str,
) -> Result<Option<Quiz>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Quiz>(
        "SELECT id, lesson_id, title, description FROM quizzes WHERE lesson_id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_quiz(
    conn: &mut SqliteConnection,
    lesson_id: &str,
    title: &str,
) -> Result<Quiz, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO quizzes (id, lesson_id, title, description) VALUES (?1, ?2, ?3, '')")
        .bind(&id)
        .bind(lesson_id)
        .bind(title)
        .execute(&mut *conn)
        .await?;

    Ok(Quiz {
        id,
        lesson_id: lesson_id.to_string(),
        title: title.to_string(),
        description: String::new(),
    })
}

pub async fn insert_question(
    conn: &mut SqliteConnection,
    quiz_id: &str,
    question_text: &str,
    explanation: &str,
    position: i64,
) -> Result<Question, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO questions (id, quiz_id, question_text, explanation, position)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(quiz_id)
    .bind(question_text)
    .bind(explanation)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(Question {
        id,
        quiz_id: quiz_id.to_string(),
        question_text: question_text.to_string(),
        explanation: explanation.to_string(),
        position,
    })
}

pub async fn insert_choice(
    conn: &mut SqliteConnection,
    question_id: &str,
    choice_text: &str,
    is_correct: bool,
) -> Result<Choice, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO choices (id, question_id, choice_text, is_correct) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&id)
    .bind(question_id)
    .bind(choice_text)
    .bind(is_correct)
    .execute(&mut *conn)
    .await?;

    Ok(Choice {
        id,
        question_id: question_id.to_string(),
        choice_text: choice_text.to_string(),
        is_correct,
    })
}

pub async fn fetch_questions(db: &SqlitePool, quiz_id: &str) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text, explanation, position FROM questions WHERE quiz_id = ? ORDER BY position",
    )
    .bind(quiz_id)
    .fetch_all(db)
    .await
}

/// Every choice of every question in the quiz.
pub async fn fetch_quiz_choices(db: &SqlitePool, quiz_id: &str) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.id, c.question_id, c.choice_text, c.is_correct
        FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.quiz_id = ?1
        ORDER BY q.position, c.rowid
        "#,
    )
    .bind(quiz_id)
    .fetch_all(db)
    .await
}
