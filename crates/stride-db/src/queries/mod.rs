//! Query functions, one module per table family.

pub mod assignments;
pub mod groups;
pub mod plans;
pub mod sessions;
pub mod templates;
pub mod users;
