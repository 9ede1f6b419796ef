use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub question_text: String,
    pub explanation: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Choice {
    pub id: String,
    pub question_id: String,
    pub choice_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: String,
    pub identity_kind: String,
    pub identity_key: String,
    pub quiz_id: String,
    pub score: f64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub completed_at: String,
}

/// A choice as shown to the learner; correctness stays server side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub explanation: String,
    pub choices: Vec<ChoiceView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizView {
    pub quiz: Quiz,
    pub lesson_id: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizSubmission {
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub success: bool,
    pub score: f64,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub passed: bool,
}
