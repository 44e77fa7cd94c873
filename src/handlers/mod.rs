// tutor-calendar/src/handlers/mod.rs
pub mod auth_handlers;
pub mod client_handlers;
pub mod health_handlers;
pub mod label_handlers;
pub mod lesson_handlers;
pub mod lesson_label_handlers;
