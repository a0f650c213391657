use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::module::ModuleDetail;

/// A generated course, owned by the user who asked for it.
///
/// Modules hang off the course in `position` order; see [`CourseDetail`] for
/// the fully populated tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub target_audience: Option<String>,
    pub prerequisites: Vec<String>,
    pub learning_outcomes: Vec<String>,
    /// Subject of the identity token that created the course.
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A course with its modules, each with its lessons.
///
/// The course fields are flattened into the JSON response alongside a
/// `modules` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleDetail>,
}

/// Listing entry for "my courses".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub target_audience: Option<String>,
    pub module_count: i64,
    pub lesson_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Request body for course generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCourseInput {
    #[serde(default)]
    pub topic: String,
}
