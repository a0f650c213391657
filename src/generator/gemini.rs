//! Gemini `generateContent` backend.
//!
//! Prompts are sent as a single user turn with a JSON response mime type.
//! The reply text is unwrapped from any markdown fence before parsing.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{lesson_prompt, outline_prompt, ContentGenerator, GenerationError};
use crate::models::{validate_blocks, ContentBlock, CourseOutline, LessonContext};

/// Default REST root for the public Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Point the generator at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send one prompt and return the concatenated text of the first candidate.
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        Ok(text)
    }
}

#[async_trait::async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_outline(&self, topic: &str) -> Result<CourseOutline, GenerationError> {
        tracing::debug!(model = %self.model, topic, "Requesting course outline");
        let text = self.complete(&outline_prompt(topic)).await?;
        parse_outline(&text)
    }

    async fn generate_lesson(
        &self,
        context: &LessonContext,
    ) -> Result<Vec<ContentBlock>, GenerationError> {
        tracing::debug!(
            model = %self.model,
            lesson_id = %context.lesson_id,
            "Requesting lesson content"
        );
        let text = self.complete(&lesson_prompt(context)).await?;
        parse_lesson_blocks(&text)
    }
}

/// Strip a surrounding ```` ```json ```` fence if the model added one anyway.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub(crate) fn parse_outline(text: &str) -> Result<CourseOutline, GenerationError> {
    let outline: CourseOutline = serde_json::from_str(strip_code_fences(text))?;
    outline
        .validate()
        .map_err(GenerationError::InvalidContent)?;
    Ok(outline)
}

/// Accepts either a bare array of blocks or an object with a `content` array.
pub(crate) fn parse_lesson_blocks(text: &str) -> Result<Vec<ContentBlock>, GenerationError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(text))?;

    let blocks_value = match value {
        array @ serde_json::Value::Array(_) => array,
        serde_json::Value::Object(mut map) => map.remove("content").ok_or_else(|| {
            GenerationError::InvalidContent("expected a `content` array of blocks".to_string())
        })?,
        _ => {
            return Err(GenerationError::InvalidContent(
                "expected a JSON array of blocks".to_string(),
            ))
        }
    };

    let blocks: Vec<ContentBlock> = serde_json::from_value(blocks_value)?;
    if blocks.is_empty() {
        return Err(GenerationError::InvalidContent(
            "lesson has no blocks".to_string(),
        ));
    }
    validate_blocks(&blocks)?;

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("  [2] "), "[2]");
    }

    #[test]
    fn parses_bare_block_array() {
        let blocks = parse_lesson_blocks(
            r#"[{"type":"heading","content":"Loops"},{"type":"text","content":"Repeat."}]"#,
        )
        .unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind(), "heading");
    }

    #[test]
    fn parses_wrapped_block_array() {
        let blocks = parse_lesson_blocks(
            "```json\n{\"content\":[{\"type\":\"video\",\"content\":\"for loops explained\"}]}\n```",
        )
        .unwrap();
        assert_eq!(
            blocks,
            vec![ContentBlock::Video {
                content: "for loops explained".to_string()
            }]
        );
    }

    #[test]
    fn rejects_empty_block_array() {
        assert!(matches!(
            parse_lesson_blocks("[]"),
            Err(GenerationError::InvalidContent(_))
        ));
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(
            parse_lesson_blocks("Here is your lesson!"),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn rejects_invalid_quiz() {
        let result = parse_lesson_blocks(
            r#"[{"type":"quiz","content":"?","options":["a","b"],"correctAnswer":"z"}]"#,
        );
        assert!(matches!(result, Err(GenerationError::InvalidContent(_))));
    }

    #[test]
    fn outline_must_have_modules() {
        let result = parse_outline(r#"{"title":"T","description":"D","modules":[]}"#);
        assert!(matches!(result, Err(GenerationError::InvalidContent(_))));
    }
}
