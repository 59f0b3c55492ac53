//! Plan resolution and workout materialization engine.
//!
//! Every operation takes the acting user explicitly as an [`actor::Actor`];
//! nothing here reads an ambient identity.

pub mod actor;
pub mod alias;
pub mod calendar;
pub mod directory;
pub mod error;
pub mod plan;
pub mod template;
pub mod workouts;

pub use error::{EngineError, EngineResult};
