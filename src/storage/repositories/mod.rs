//! Repository traits and their sqlx implementations.

pub mod refresh_token;
pub mod task;
pub mod user;

pub use refresh_token::{RefreshTokenRepository, SqlxRefreshTokenRepository};
pub use task::{SqlxTaskRepository, Task, TaskRepository, TaskStatus};
pub use user::{SqlxUserRepository, UserRepository};
