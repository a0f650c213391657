#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use coursegen::db::Database;
use coursegen::generator::{ContentGenerator, GenerationError};
use coursegen::materializer::LessonStore;
use coursegen::models::*;
use tokio::sync::Barrier;
use uuid::Uuid;

pub fn setup_db() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    db
}

pub fn sample_outline() -> CourseOutline {
    CourseOutline {
        title: "Python 101".to_string(),
        description: "A first course in Python.".to_string(),
        target_audience: Some("Beginners".to_string()),
        prerequisites: vec!["Basic computer skills".to_string()],
        learning_outcomes: vec!["Write loops".to_string(), "Define functions".to_string()],
        modules: vec![
            ModuleOutline {
                title: "Control Flow".to_string(),
                description: Some("Branching and looping".to_string()),
                lessons: vec![
                    LessonOutline {
                        title: "Intro to Loops".to_string(),
                        description: Some("Repeat work with for and while".to_string()),
                    },
                    LessonOutline {
                        title: "While Loops".to_string(),
                        description: None,
                    },
                ],
            },
            ModuleOutline {
                title: "Functions".to_string(),
                description: None,
                lessons: vec![LessonOutline {
                    title: "Defining Functions".to_string(),
                    description: None,
                }],
            },
        ],
    }
}

/// Heading, text, quiz.
pub fn three_blocks() -> Vec<ContentBlock> {
    vec![
        ContentBlock::Heading {
            content: "Intro to Loops".to_string(),
        },
        ContentBlock::Text {
            content: "A loop repeats a block of code.".to_string(),
        },
        ContentBlock::Quiz {
            content: "Which keyword starts a for loop?".to_string(),
            options: vec!["for".to_string(), "def".to_string(), "if".to_string()],
            correct_answer: "for".to_string(),
            explanation: None,
        },
    ]
}

/// Creates the sample course and returns the "Intro to Loops" lesson.
pub fn create_intro_lesson(db: &Database) -> Lesson {
    let course = db
        .create_course("user-1", sample_outline())
        .expect("Failed to create course");
    course.modules[0].lessons[0].clone()
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LessonMode {
    /// Always return [`three_blocks`].
    Fixed,
    /// Return a body unique to each call.
    PerCall,
    Fail,
    /// Return a quiz whose answer is not an option.
    Invalid,
}

/// In-process generator with call counters.
pub struct FakeGenerator {
    pub mode: LessonMode,
    pub outline: Option<CourseOutline>,
    pub delay: Option<Duration>,
    pub gate: Option<Barrier>,
    pub outline_calls: AtomicUsize,
    pub lesson_calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(mode: LessonMode) -> Self {
        Self {
            mode,
            outline: Some(sample_outline()),
            delay: None,
            gate: None,
            outline_calls: AtomicUsize::new(0),
            lesson_calls: AtomicUsize::new(0),
        }
    }

    /// Every lesson call waits until `n` calls are in flight.
    pub fn gated(mut self, n: usize) -> Self {
        self.gate = Some(Barrier::new(n));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn without_outline(mut self) -> Self {
        self.outline = None;
        self
    }

    pub fn lesson_calls(&self) -> usize {
        self.lesson_calls.load(Ordering::SeqCst)
    }

    pub fn outline_calls(&self) -> usize {
        self.outline_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate_outline(&self, _topic: &str) -> Result<CourseOutline, GenerationError> {
        self.outline_calls.fetch_add(1, Ordering::SeqCst);
        self.outline.clone().ok_or(GenerationError::Backend {
            status: 503,
            body: "model overloaded".to_string(),
        })
    }

    async fn generate_lesson(
        &self,
        _context: &LessonContext,
    ) -> Result<Vec<ContentBlock>, GenerationError> {
        let call = self.lesson_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.mode {
            LessonMode::Fixed => Ok(three_blocks()),
            LessonMode::PerCall => Ok(vec![
                ContentBlock::Heading {
                    content: "Intro to Loops".to_string(),
                },
                ContentBlock::Text {
                    content: format!("candidate {}", call),
                },
            ]),
            LessonMode::Fail => Err(GenerationError::Backend {
                status: 500,
                body: "upstream exploded".to_string(),
            }),
            LessonMode::Invalid => Ok(vec![ContentBlock::Quiz {
                content: "Pick one".to_string(),
                options: vec!["a".to_string(), "b".to_string()],
                correct_answer: "z".to_string(),
                explanation: None,
            }]),
        }
    }
}

/// Store wrapper that counts conditional writes, and can force an outcome.
pub struct CountingStore {
    pub db: Database,
    pub forced: Option<WriteOutcome>,
    pub write_attempts: AtomicUsize,
    pub successful_writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            forced: None,
            write_attempts: AtomicUsize::new(0),
            successful_writes: AtomicUsize::new(0),
        }
    }

    pub fn forcing(mut self, outcome: WriteOutcome) -> Self {
        self.forced = Some(outcome);
        self
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn successful_writes(&self) -> usize {
        self.successful_writes.load(Ordering::SeqCst)
    }
}

impl LessonStore for CountingStore {
    fn load_lesson(&self, id: Uuid) -> anyhow::Result<Option<Lesson>> {
        self.db.get_lesson(id)
    }

    fn load_context(&self, id: Uuid) -> anyhow::Result<Option<LessonContext>> {
        self.db.get_lesson_context(id)
    }

    fn write_content(
        &self,
        id: Uuid,
        content: &[ContentBlock],
        expected_version: i64,
    ) -> anyhow::Result<WriteOutcome> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(outcome) = &self.forced {
            return Ok(outcome.clone());
        }

        let outcome = self.db.write_lesson_content(id, content, expected_version)?;
        if matches!(outcome, WriteOutcome::Written(_)) {
            self.successful_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(outcome)
    }
}
