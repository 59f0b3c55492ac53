//! Persistence layer: models, connection pool, embedded migrations, and
//! plain-SQL query functions for the stride engine.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
