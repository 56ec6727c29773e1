//! Domain model primitives shared across modules.

pub mod id;

pub use id::{OrganizationId, ProjectId, RefreshTokenId, TaskId, TeamId, UserId};
