//! Parsing of the JSON-shaped text returned by the generation service.
//!
//! Models like to wrap JSON in Markdown fences or add a sentence before it, so
//! every parser first narrows the raw text down to the outermost object.

use serde::{Deserialize, Serialize};

use super::GenerationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutline {
    pub course_title: String,
    #[serde(default)]
    pub course_description: String,
    pub modules: Vec<ModuleOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub lessons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonPayload {
    pub lesson_content: String,
    pub quiz_question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl CourseOutline {
    /// Fixed outline used when the service cannot produce one.
    pub fn placeholder(topic: &str) -> Self {
        Self {
            course_title: format!("Placeholder Course: {}", topic),
            course_description: "This is a placeholder course created because the AI generation service is currently unavailable.".to_string(),
            modules: vec![
                ModuleOutline {
                    title: "Module 1: Getting Started (Placeholder)".to_string(),
                    objective: "This is a sample module objective.".to_string(),
                    lessons: vec![
                        "1.1: Placeholder Lesson A".to_string(),
                        "1.2: Placeholder Lesson B".to_string(),
                    ],
                },
                ModuleOutline {
                    title: "Module 2: Advanced Topics (Placeholder)".to_string(),
                    objective: "This is another sample module objective.".to_string(),
                    lessons: vec![
                        "2.1: Placeholder Content".to_string(),
                        "2.2: More Placeholder Content".to_string(),
                    ],
                },
            ],
        }
    }
}

/// Strips code fences and surrounding chatter, returning the outermost `{...}`.
pub fn clean_json_payload(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // drop the fence line, e.g. ```json
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches("json"),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

pub fn parse_outline(raw: &str) -> Result<CourseOutline, GenerationError> {
    let outline: CourseOutline = serde_json::from_str(clean_json_payload(raw))
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if outline.course_title.trim().is_empty() {
        return Err(GenerationError::Malformed("course_title is empty".to_string()));
    }
    if outline.modules.is_empty() {
        return Err(GenerationError::Malformed("outline has no modules".to_string()));
    }
    Ok(outline)
}

pub fn parse_lesson(raw: &str) -> Result<LessonPayload, GenerationError> {
    let lesson: LessonPayload = serde_json::from_str(clean_json_payload(raw))
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if lesson.lesson_content.trim().is_empty() {
        return Err(GenerationError::Malformed("lesson_content is empty".to_string()));
    }
    if lesson.options.len() < 2 {
        return Err(GenerationError::Malformed(format!(
            "expected at least 2 options, got {}",
            lesson.options.len()
        )));
    }
    Ok(lesson)
}
