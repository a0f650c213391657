//! Content generation backends.
//!
//! The rest of the crate talks to a [`ContentGenerator`] trait object, so the
//! HTTP layer and the materializer never know which model sits behind it.

mod gemini;
mod prompts;

use std::time::Duration;

use thiserror::Error;

use crate::models::{BlockError, ContentBlock, CourseOutline, LessonContext};

pub use gemini::{GeminiGenerator, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompts::{lesson_prompt, outline_prompt};

/// Failures talking to, or understanding, a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to generation backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("generation backend returned no text")]
    Empty,

    #[error("generated output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("generated content is invalid: {0}")]
    InvalidContent(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<BlockError> for GenerationError {
    fn from(err: BlockError) -> Self {
        Self::InvalidContent(err.to_string())
    }
}

/// Something that can write courses.
///
/// Implementations are shared across request tasks behind an `Arc`.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce a course outline for a free-text topic.
    async fn generate_outline(&self, topic: &str) -> Result<CourseOutline, GenerationError>;

    /// Produce the content blocks for one lesson.
    async fn generate_lesson(
        &self,
        context: &LessonContext,
    ) -> Result<Vec<ContentBlock>, GenerationError>;
}
