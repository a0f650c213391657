use crate::models::LessonContext;

pub fn outline_prompt(topic: &str) -> String {
    format!(
        r#"You are an expert instructional designer. Design the outline of a course on the topic below.
Topic: "{topic}"

Respond with a single JSON object and nothing else, shaped like:
{{
  "title": "Course title",
  "description": "Two or three sentence overview.",
  "targetAudience": "Who the course is for.",
  "prerequisites": ["..."],
  "learningOutcomes": ["..."],
  "modules": [
    {{
      "title": "Module title",
      "description": "What the module covers.",
      "lessons": [{{ "title": "Lesson title", "description": "One sentence summary." }}]
    }}
  ]
}}

Use 3-5 modules with 2-4 lessons each. Do not write lesson content yet."#
    )
}

pub fn lesson_prompt(context: &LessonContext) -> String {
    let description = context.lesson_description.as_deref().unwrap_or("(none)");
    let audience = context.audience.as_deref().unwrap_or("general learners");

    format!(
        r#"You are writing one lesson of the course "{course}".
Module: "{module}"
Lesson: "{lesson}"
Lesson summary: {description}
Audience: {audience}

Respond with a JSON array of 5-10 content blocks and nothing else. Each block has a "type" and a "content":
- {{ "type": "heading", "content": "..." }}
- {{ "type": "text", "content": "markdown paragraph" }}
- {{ "type": "code", "content": "...", "language": "python" }}
- {{ "type": "video", "content": "search query for a relevant video" }}
- {{ "type": "quiz", "content": "question", "options": ["a", "b", "c"], "correctAnswer": "a", "explanation": "..." }}
- {{ "type": "list", "content": ["item", "item"], "listType": "bullet" or "numbered" }}
- {{ "type": "callout", "content": "...", "calloutType": "info" | "warning" | "tip" | "success" | "danger" }}
- {{ "type": "exercise", "content": "task for the learner", "hint": "..." }}

Start with a heading, mix block types, and end with a quiz or an exercise. A quiz's correctAnswer must be one of its options."#,
        course = context.course_title,
        module = context.module_title,
        lesson = context.lesson_title,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn lesson_prompt_includes_the_trace_to_course() {
        let prompt = lesson_prompt(&LessonContext {
            lesson_id: Uuid::new_v4(),
            lesson_title: "Intro to Loops".to_string(),
            lesson_description: None,
            module_title: "Control Flow".to_string(),
            course_title: "Python 101".to_string(),
            audience: Some("High school students".to_string()),
        });

        assert!(prompt.contains("\"Intro to Loops\""));
        assert!(prompt.contains("\"Control Flow\""));
        assert!(prompt.contains("\"Python 101\""));
        assert!(prompt.contains("High school students"));
        assert!(prompt.contains("Lesson summary: (none)"));
    }

    #[test]
    fn outline_prompt_embeds_topic() {
        assert!(outline_prompt("Rust lifetimes").contains("\"Rust lifetimes\""));
    }
}
