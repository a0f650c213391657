//! Domain models for coursegen.
//!
//! # Core Concepts
//!
//! - [`Course`]: Top-level container created from a generated outline, owned by
//!   the user who requested it.
//! - [`Module`]: An ordered chapter of a course.
//! - [`Lesson`]: An ordered unit inside a module. Starts with empty content and
//!   is materialized on first read.
//! - [`ContentBlock`]: One typed piece of lesson material (text, code, quiz...).
//!
//! Course, modules and lessons are created together from a [`CourseOutline`].
//! The only later mutation is the one-time write of a lesson's content.

mod content;
mod course;
mod lesson;
mod module;
mod outline;

pub use content::*;
pub use course::*;
pub use lesson::*;
pub use module::*;
pub use outline::*;
