//! Data models for the attachment mirror
//!
//! `attachment` holds the per-request mirror types, `student` the origin record
//! and the shapes returned to callers.

mod attachment;
mod student;

pub use attachment::*;
pub use student::*;
