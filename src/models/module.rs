use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lesson::Lesson;

/// A chapter of a course. Owns the ordering of its lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub position: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A module with its lessons in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<Lesson>,
}
