//! Domain services built on the repositories and the access policy.

pub mod task_service;

pub use task_service::TaskService;
