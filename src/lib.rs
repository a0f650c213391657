//! coursegen: AI-generated courses with lazily materialized lessons.
//!
//! A topic becomes a course outline (course, modules, lessons) through a
//! [`generator::ContentGenerator`]. Lessons start empty and are filled on
//! first read by the [`materializer::Materializer`], which uses the store's
//! version-checked write so concurrent first reads agree on one body.

pub mod api;
pub mod config;
pub mod db;
pub mod generator;
pub mod materializer;
pub mod models;
