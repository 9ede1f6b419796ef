use crate::models::{Lesson, Module, Personalization};

pub fn course_outline(topic: &str, personalization: &Personalization) -> String {
    let mut prompt = format!(
        r#"You are an expert curriculum designer. Generate a comprehensive course outline for the topic "{topic}".
"#
    );

    if !personalization.is_empty() {
        prompt.push_str("Tailor the course to this learner:\n");
        let fields = [
            ("Current level", &personalization.learner_level),
            ("Goals", &personalization.goals),
            ("Background", &personalization.background),
        ];
        for (label, value) in fields {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                prompt.push_str(&format!("- {label}: {value}\n"));
            }
        }
    }

    prompt.push_str(
        r#"The output must be a JSON object with the following structure:
- "course_title": A compelling title for the course.
- "course_description": A brief, one-paragraph description of the course.
- "modules": A list of 5-7 module objects. Each module object must have:
  - "title": The title of the module.
  - "objective": A one-sentence objective for the module.
  - "lessons": A list of lesson titles (strings).
Return only the JSON object."#,
    );
    prompt
}

pub fn lesson_content(lesson: &Lesson, module: &Module) -> String {
    format!(
        r#"You are an expert educator. Generate the content for a lesson titled "{lesson_title}" within the module "{module_title}".
The module's objective is: {objective}

The output must be a JSON object with the following structure:
- "lesson_content": The full lesson content in Markdown format. It should be detailed, clear, and easy to understand.
- "quiz_question": A multiple-choice question to test the core concept of the lesson.
- "options": A list of 4 strings representing the choices for the multiple-choice question.
- "answer": The correct choice, copied exactly from the options list.
- "explanation": One or two sentences explaining why the answer is correct.
Return only the JSON object."#,
        lesson_title = lesson.title,
        module_title = module.title,
        objective = module.description,
    )
}

pub fn assistant_reply(lesson_content: &str, message: &str) -> String {
    format!(
        r#"Context: You are an AI tutor explaining a lesson. The lesson content is as follows:
---
{lesson_content}
---
Based ONLY on the context above, answer the user's question.
User Question: {message}"#
    )
}
