mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{types::Type, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

const COURSE_COLUMNS: &str = "id, title, description, target_audience, prerequisites, \
     learning_outcomes, creator, created_at, updated_at";

const MODULE_COLUMNS: &str = "id, course_id, position, title, description, created_at";

const LESSON_COLUMNS: &str = "id, module_id, position, title, description, content, version, \
     materialized_at, created_at, updated_at";

/// SQLite-backed document store for courses, modules and lessons.
///
/// Cloning is cheap and shares the underlying connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "coursegen")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("coursegen.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Course operations
    // ============================================================

    /// Persist a generated outline as a course tree owned by `creator`.
    ///
    /// Lessons, modules and the course land in a single transaction; every
    /// lesson starts with empty content at version 0.
    pub fn create_course(&self, creator: &str, outline: CourseOutline) -> Result<CourseDetail> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let now = Utc::now();

        let course = Course {
            id: Uuid::new_v4(),
            title: outline.title,
            description: outline.description,
            target_audience: outline.target_audience,
            prerequisites: outline.prerequisites,
            learning_outcomes: outline.learning_outcomes,
            creator: creator.to_string(),
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO courses (id, title, description, target_audience, prerequisites, learning_outcomes, creator, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                course.id.to_string(),
                &course.title,
                &course.description,
                &course.target_audience,
                serde_json::to_string(&course.prerequisites)?,
                serde_json::to_string(&course.learning_outcomes)?,
                &course.creator,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        let mut modules = Vec::with_capacity(outline.modules.len());
        for (module_pos, module_outline) in outline.modules.into_iter().enumerate() {
            let module = Module {
                id: Uuid::new_v4(),
                course_id: course.id,
                position: module_pos as i64,
                title: module_outline.title,
                description: module_outline.description,
                created_at: now,
            };

            tx.execute(
                "INSERT INTO modules (id, course_id, position, title, description, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    module.id.to_string(),
                    course.id.to_string(),
                    module.position,
                    &module.title,
                    &module.description,
                    now.to_rfc3339(),
                ),
            )?;

            let mut lessons = Vec::with_capacity(module_outline.lessons.len());
            for (lesson_pos, lesson_outline) in module_outline.lessons.into_iter().enumerate() {
                let lesson = Lesson {
                    id: Uuid::new_v4(),
                    module_id: module.id,
                    position: lesson_pos as i64,
                    title: lesson_outline.title,
                    description: lesson_outline.description,
                    content: Vec::new(),
                    version: 0,
                    materialized_at: None,
                    created_at: now,
                    updated_at: now,
                };

                tx.execute(
                    "INSERT INTO lessons (id, module_id, position, title, description, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    (
                        lesson.id.to_string(),
                        module.id.to_string(),
                        lesson.position,
                        &lesson.title,
                        &lesson.description,
                        now.to_rfc3339(),
                        now.to_rfc3339(),
                    ),
                )?;

                lessons.push(lesson);
            }

            modules.push(ModuleDetail { module, lessons });
        }

        tx.commit()?;

        tracing::debug!(
            course_id = %course.id,
            modules = modules.len(),
            "Created course from outline"
        );

        Ok(CourseDetail { course, modules })
    }

    pub fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM courses WHERE id = ?",
            COURSE_COLUMNS
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(course_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Course with modules and lessons, all in position order.
    pub fn get_course_detail(&self, id: Uuid) -> Result<Option<CourseDetail>> {
        let Some(course) = self.get_course(id)? else {
            return Ok(None);
        };

        let modules = self
            .get_modules_by_course(id)?
            .into_iter()
            .map(|module| {
                let lessons = self.get_lessons_by_module(module.id)?;
                Ok(ModuleDetail { module, lessons })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(CourseDetail { course, modules }))
    }

    /// Courses created by `creator`, newest first.
    pub fn get_courses_by_creator(&self, creator: &str) -> Result<Vec<CourseSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT c.id, c.title, c.description, c.target_audience, c.created_at,
                    (SELECT COUNT(*) FROM modules m WHERE m.course_id = c.id),
                    (SELECT COUNT(*) FROM lessons l JOIN modules m ON l.module_id = m.id
                      WHERE m.course_id = c.id)
             FROM courses c WHERE c.creator = ?
             ORDER BY c.created_at DESC, c.rowid DESC",
        )?;

        let courses = stmt
            .query_map([creator], |row| {
                Ok(CourseSummary {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    title: row.get(1)?,
                    description: row.get(2)?,
                    target_audience: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    module_count: row.get(5)?,
                    lesson_count: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(courses)
    }

    // ============================================================
    // Module operations
    // ============================================================

    pub fn get_module(&self, id: Uuid) -> Result<Option<Module>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM modules WHERE id = ?",
            MODULE_COLUMNS
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(module_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_modules_by_course(&self, course_id: Uuid) -> Result<Vec<Module>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM modules WHERE course_id = ? ORDER BY position",
            MODULE_COLUMNS
        ))?;

        let modules = stmt
            .query_map([course_id.to_string()], module_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(modules)
    }

    // ============================================================
    // Lesson operations
    // ============================================================

    pub fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        lesson_by_id(&conn, id)
    }

    pub fn get_lessons_by_module(&self, module_id: Uuid) -> Result<Vec<Lesson>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM lessons WHERE module_id = ? ORDER BY position",
            LESSON_COLUMNS
        ))?;

        let lessons = stmt
            .query_map([module_id.to_string()], lesson_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(lessons)
    }

    /// Lesson title and description plus the titles of its module and course.
    pub fn get_lesson_context(&self, id: Uuid) -> Result<Option<LessonContext>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let context = conn
            .query_row(
                "SELECT l.id, l.title, l.description, m.title, c.title, c.target_audience
                 FROM lessons l
                 JOIN modules m ON m.id = l.module_id
                 JOIN courses c ON c.id = m.course_id
                 WHERE l.id = ?",
                [id.to_string()],
                |row| {
                    Ok(LessonContext {
                        lesson_id: parse_uuid(row.get::<_, String>(0)?),
                        lesson_title: row.get(1)?,
                        lesson_description: row.get(2)?,
                        module_title: row.get(3)?,
                        course_title: row.get(4)?,
                        audience: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(context)
    }

    /// Replace a lesson's content if, and only if, its version still equals
    /// `expected_version`.
    ///
    /// A mismatch is reported as [`WriteOutcome::Conflict`], not as an error.
    /// An empty block sequence or a missing lesson is [`WriteOutcome::Rejected`].
    pub fn write_lesson_content(
        &self,
        id: Uuid,
        content: &[ContentBlock],
        expected_version: i64,
    ) -> Result<WriteOutcome> {
        if content.is_empty() {
            return Ok(WriteOutcome::Rejected(
                "lesson content must contain at least one block".to_string(),
            ));
        }

        let content_json = serde_json::to_string(content)?;
        let now = Utc::now();

        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE lessons SET content = ?, version = version + 1, materialized_at = ?, updated_at = ?
             WHERE id = ? AND version = ?",
            (
                &content_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
                id.to_string(),
                expected_version,
            ),
        )?;

        if rows == 1 {
            return match lesson_by_id(&conn, id)? {
                Some(lesson) => Ok(WriteOutcome::Written(lesson)),
                None => Ok(WriteOutcome::Rejected(format!(
                    "lesson {} disappeared after write",
                    id
                ))),
            };
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM lessons WHERE id = ?)",
            [id.to_string()],
            |row| row.get(0),
        )?;

        if exists {
            Ok(WriteOutcome::Conflict)
        } else {
            Ok(WriteOutcome::Rejected(format!("lesson {} not found", id)))
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn lesson_by_id(conn: &Connection, id: Uuid) -> Result<Option<Lesson>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM lessons WHERE id = ?",
        LESSON_COLUMNS
    ))?;

    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(lesson_from_row(row)?))
    } else {
        Ok(None)
    }
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        target_audience: row.get(3)?,
        prerequisites: serde_json::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        learning_outcomes: serde_json::from_str(&row.get::<_, String>(5)?).unwrap_or_default(),
        creator: row.get(6)?,
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn module_from_row(row: &Row<'_>) -> rusqlite::Result<Module> {
    Ok(Module {
        id: parse_uuid(row.get::<_, String>(0)?),
        course_id: parse_uuid(row.get::<_, String>(1)?),
        position: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn lesson_from_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    // Corrupt content must not read as "empty", or it would be regenerated
    let content_json: String = row.get(5)?;
    let content: Vec<ContentBlock> = serde_json::from_str(&content_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Lesson {
        id: parse_uuid(row.get::<_, String>(0)?),
        module_id: parse_uuid(row.get::<_, String>(1)?),
        position: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        content,
        version: row.get(6)?,
        materialized_at: row.get::<_, Option<String>>(7)?.map(parse_datetime),
        created_at: parse_datetime(row.get::<_, String>(8)?),
        updated_at: parse_datetime(row.get::<_, String>(9)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
