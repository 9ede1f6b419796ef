use std::collections::HashMap;

use chrono::Utc;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{self, progress, repository};
use crate::error::AppError;
use crate::models::{
    Choice, ChoiceView, Identity, Question, QuestionView, QuizAttempt, QuizResult, QuizSubmission,
    QuizView,
};
use crate::services::review;

pub const PASSING_SCORE: f64 = 70.0;

pub struct QuizService {
    db: SqlitePool,
}

impl QuizService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Questions in order with their choices shuffled; correctness is not exposed.
    pub async fn quiz_view(&self, quiz_id: &str) -> Result<QuizView, AppError> {
        let quiz = repository::find_quiz_by_id(&self.db, quiz_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let questions = repository::fetch_questions(&self.db, quiz_id).await?;
        let choices = repository::fetch_quiz_choices(&self.db, quiz_id).await?;

        let mut by_question: HashMap<String, Vec<ChoiceView>> = HashMap::new();
        for choice in choices {
            by_question
                .entry(choice.question_id)
                .or_default()
                .push(ChoiceView {
                    id: choice.id,
                    text: choice.choice_text,
                });
        }

        let questions: Vec<QuestionView> = {
            let mut rng = rand::thread_rng();
            questions
                .into_iter()
                .map(|question| {
                    let mut choices = by_question.remove(&question.id).unwrap_or_default();
                    choices.shuffle(&mut rng);
                    QuestionView {
                        id: question.id,
                        text: question.question_text,
                        explanation: question.explanation,
                        choices,
                    }
                })
                .collect()
        };

        Ok(QuizView {
            lesson_id: quiz.lesson_id.clone(),
            quiz,
            questions,
        })
    }

    /// Scores the answers, records the attempt, and on a pass marks the lesson
    /// complete. A failing score never resets completion. The attempt and the
    /// progress changes commit together.
    pub async fn submit(
        &self,
        quiz_id: &str,
        submission: QuizSubmission,
        identity: &Identity,
    ) -> Result<QuizResult, AppError> {
        let quiz = repository::find_quiz_by_id(&self.db, quiz_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let questions = repository::fetch_questions(&self.db, quiz_id).await?;
        let choices = repository::fetch_quiz_choices(&self.db, quiz_id).await?;

        let correct_answers = count_correct(&questions, &choices, &submission.answers);
        let total_questions = questions.len();
        let score = score_percent(correct_answers, total_questions);
        let passed = score >= PASSING_SCORE;

        let mut tx = self.db.begin().await?;
        progress::insert_attempt(
            &mut *tx,
            identity,
            quiz_id,
            score,
            correct_answers as i64,
            total_questions as i64,
        )
        .await?;

        let lesson_progress = if passed {
            Some(progress::mark_completed(&mut tx, identity, &quiz.lesson_id).await?)
        } else {
            progress::find_progress(&mut *tx, identity, &quiz.lesson_id).await?
        };
        if let Some(lesson_progress) = lesson_progress {
            let (ease, interval) = review::schedule(
                lesson_progress.ease_factor,
                lesson_progress.review_interval,
                review::quality_from_score(score),
            );
            let now = Utc::now();
            progress::update_review_schedule(
                &mut *tx,
                &lesson_progress.id,
                ease,
                interval,
                &db::format_timestamp(now),
                &db::format_timestamp(review::next_review_at(now, interval)),
            )
            .await?;
        }
        tx.commit().await?;

        info!(
            "quiz {} submitted by {}: {}/{} ({:.1})",
            quiz_id, identity, correct_answers, total_questions, score
        );

        Ok(QuizResult {
            success: true,
            score,
            correct_answers,
            total_questions,
            passed,
        })
    }

    pub async fn attempts(
        &self,
        quiz_id: &str,
        identity: &Identity,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        repository::find_quiz_by_id(&self.db, quiz_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(progress::fetch_attempts(&self.db, identity, quiz_id).await?)
    }
}

/// `100 * correct / total`, or 0 for a quiz without questions.
pub fn score_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

/// A question counts when it belongs to the quiz, has exactly one correct
/// choice, and the submitted choice is that one.
pub fn count_correct(
    questions: &[Question],
    choices: &[Choice],
    answers: &HashMap<String, String>,
) -> usize {
    questions
        .iter()
        .filter(|question| {
            let Some(submitted) = answers.get(&question.id) else {
                return false;
            };
            let mut correct = choices
                .iter()
                .filter(|c| c.question_id == question.id && c.is_correct);
            match (correct.next(), correct.next()) {
                (Some(only), None) => only.id == submitted.trim(),
                _ => false,
            }
        })
        .count()
}
