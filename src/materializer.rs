//! Lazy lesson content.
//!
//! Lessons are created empty. The first read generates a body and stores it
//! with a version-checked write, so concurrent first reads of the same lesson
//! settle on a single stored body without any in-process locking:
//!
//! 1. read the lesson and remember its version;
//! 2. if it already has content, return it;
//! 3. otherwise generate a candidate body;
//! 4. write it only if the version is unchanged;
//! 5. on a version conflict another request won; re-read and return its body.
//!
//! The generator is never called twice by one request, and a losing
//! candidate is dropped.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::db::Database;
use crate::generator::{ContentGenerator, GenerationError};
use crate::models::{validate_blocks, ContentBlock, Lesson, LessonContext, WriteOutcome};

/// Default bound on a single lesson generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Lesson not found: {0}")]
    NotFound(Uuid),

    #[error("Content generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("Failed to persist lesson content: {0}")]
    PersistenceFailed(String),
}

impl MaterializeError {
    fn persistence(err: anyhow::Error) -> Self {
        Self::PersistenceFailed(format!("{:#}", err))
    }
}

/// The slice of the document store the materializer needs.
pub trait LessonStore: Send + Sync {
    fn load_lesson(&self, id: Uuid) -> anyhow::Result<Option<Lesson>>;

    fn load_context(&self, id: Uuid) -> anyhow::Result<Option<LessonContext>>;

    /// Conditional write: succeeds only while the lesson is at `expected_version`.
    fn write_content(
        &self,
        id: Uuid,
        content: &[ContentBlock],
        expected_version: i64,
    ) -> anyhow::Result<WriteOutcome>;
}

impl LessonStore for Database {
    fn load_lesson(&self, id: Uuid) -> anyhow::Result<Option<Lesson>> {
        self.get_lesson(id)
    }

    fn load_context(&self, id: Uuid) -> anyhow::Result<Option<LessonContext>> {
        self.get_lesson_context(id)
    }

    fn write_content(
        &self,
        id: Uuid,
        content: &[ContentBlock],
        expected_version: i64,
    ) -> anyhow::Result<WriteOutcome> {
        self.write_lesson_content(id, content, expected_version)
    }
}

pub struct Materializer<S> {
    store: S,
    generator: Arc<dyn ContentGenerator>,
    timeout: Duration,
}

impl<S: LessonStore> Materializer<S> {
    pub fn new(store: S, generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            store,
            generator,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the lesson, generating and storing its content first if it has none.
    pub async fn ensure_content(&self, lesson_id: Uuid) -> Result<Lesson, MaterializeError> {
        let lesson = self
            .store
            .load_lesson(lesson_id)
            .map_err(MaterializeError::persistence)?
            .ok_or(MaterializeError::NotFound(lesson_id))?;

        if lesson.is_materialized() {
            return Ok(lesson);
        }

        let context = self
            .store
            .load_context(lesson_id)
            .map_err(MaterializeError::persistence)?
            .ok_or(MaterializeError::NotFound(lesson_id))?;

        tracing::info!(
            %lesson_id,
            version = lesson.version,
            title = %context.lesson_title,
            "Generating lesson content"
        );

        let candidate = self.generate(&context).await?;

        match self
            .store
            .write_content(lesson_id, &candidate, lesson.version)
            .map_err(MaterializeError::persistence)?
        {
            WriteOutcome::Written(updated) => {
                tracing::info!(
                    %lesson_id,
                    version = updated.version,
                    blocks = updated.content.len(),
                    "Stored lesson content"
                );
                Ok(updated)
            }
            WriteOutcome::Conflict => {
                tracing::info!(%lesson_id, "Lesson was materialized concurrently, adopting stored content");
                self.reread_after_conflict(lesson_id)
            }
            WriteOutcome::Rejected(reason) => {
                tracing::error!(%lesson_id, %reason, "Lesson content write rejected");
                Err(MaterializeError::PersistenceFailed(reason))
            }
        }
    }

    async fn generate(&self, context: &LessonContext) -> Result<Vec<ContentBlock>, GenerationError> {
        let blocks = tokio::time::timeout(self.timeout, self.generator.generate_lesson(context))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        if blocks.is_empty() {
            return Err(GenerationError::InvalidContent(
                "lesson has no blocks".to_string(),
            ));
        }
        validate_blocks(&blocks)?;

        Ok(blocks)
    }

    fn reread_after_conflict(&self, lesson_id: Uuid) -> Result<Lesson, MaterializeError> {
        let lesson = self
            .store
            .load_lesson(lesson_id)
            .map_err(MaterializeError::persistence)?
            .ok_or(MaterializeError::NotFound(lesson_id))?;

        // A conflict means someone else wrote; an empty body here means the
        // winning write was not a materialization.
        if !lesson.is_materialized() {
            return Err(MaterializeError::PersistenceFailed(format!(
                "lesson {} changed concurrently but has no content",
                lesson_id
            )));
        }

        Ok(lesson)
    }
}
