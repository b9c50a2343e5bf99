//! Core data models for match coaching.

mod feedback;
mod match_document;
mod summary;

pub use feedback::*;
pub use match_document::*;
pub use summary::*;
