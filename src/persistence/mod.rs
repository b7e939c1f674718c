//! Persistence layer for FXLens.
//!
//! The only state FXLens writes is the flat CSV log of questions it could
//! not answer.

mod unanswered;

pub use unanswered::{UnansweredLog, UnansweredRecord};
