//! Pure domain logic for the StoryMe scene illustration pipeline.
//!
//! Everything in this crate is synchronous and free of I/O beyond optional
//! keyword-table loading: script parsing, location extraction, canonical
//! setting construction, character descriptor assembly, subject-type
//! classification and prompt composition.

pub mod character;
pub mod error;
pub mod generation;
pub mod location;
pub mod logging;
pub mod prompt;
pub mod script;
pub mod setting;
pub mod subject;
