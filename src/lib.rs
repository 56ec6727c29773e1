//! # Taskplane
//!
//! Taskplane is a multi-tenant team and task management backend. Accounts
//! authenticate with email and password, hold short-lived JWT access tokens,
//! and keep long-lived sessions through rotating refresh tokens with reuse
//! detection. Task access is decided by a scoped role policy (admin, manager,
//! team leader, member).
//!
//! ## Architecture
//!
//! ```text
//! REST API Layer → Auth / Task Services → Repositories → SQLite
//!      ↓                   ↓                    ↓
//! Bearer Middleware   Access Policy    Observability Stack
//! ```
//!
//! ## Core Components
//!
//! - **REST API**: Axum HTTP server for accounts, sessions, and tasks
//! - **Session Service**: refresh-token issuance, rotation, and revocation
//! - **Access Policy**: role and scope rules evaluated per resource
//! - **Persistence Layer**: SQLx with SQLite for accounts, teams, and tasks

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Result, TaskplaneError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
