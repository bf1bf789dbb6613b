pub mod auth;
pub mod logs;
pub mod projects;
pub mod statuses;
pub mod tasks;
