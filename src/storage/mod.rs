//! Storage layer: connection pooling, migrations, and repositories.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, DbPool};
