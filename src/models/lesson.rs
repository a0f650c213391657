use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::ContentBlock;

/// A single lesson inside a module.
///
/// Lessons are created with an empty `content` when the course outline is
/// generated. The first read fills it in exactly once (see
/// [`crate::materializer`]); after that the content never changes.
///
/// `version` is maintained by the store and bumped on every successful
/// content write. It is the token the materializer compares against when it
/// performs its conditional write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub position: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: Vec<ContentBlock>,
    pub version: i64,
    /// When the content was written. `None` until then.
    pub materialized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    /// Whether the lesson body has been generated yet.
    pub fn is_materialized(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Everything the content generator is told about a lesson.
///
/// Built by walking lesson -> module -> course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContext {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub lesson_description: Option<String>,
    pub module_title: String,
    pub course_title: String,
    pub audience: Option<String>,
}

/// Result of a version-checked content write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write landed; carries the lesson as stored.
    Written(Lesson),
    /// The stored version no longer matched the expected one.
    Conflict,
    /// The store refused the write for a reason other than the version check.
    Rejected(String),
}
