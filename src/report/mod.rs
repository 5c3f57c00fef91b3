//! Digest rendering.

pub mod generator;

pub use generator::{render_json, render_markdown, subject_line, write_document};
