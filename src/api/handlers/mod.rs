pub mod auth;
pub mod tasks;

pub use auth::{
    change_password_handler, login_handler, logout_handler, refresh_handler, register_handler,
};
pub use tasks::{get_task_handler, update_assignee_handler, update_status_handler};
