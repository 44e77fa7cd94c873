// tutor-calendar/src/lib.rs
//! Tutor calendar: an actix-web REST service for lessons, clients and labels,
//! plus a small HTTP client used by the `tutor-cli` binary.

pub mod auth_utils;
pub mod client;
pub mod config;
pub mod date_utils;
pub mod db;
pub mod dto;
pub mod error_handler;
pub mod handlers;
pub mod models;
pub mod scheduling;
pub mod schema;
pub mod seed;

use actix_web::web;
use error_handler::ServiceError;

/// Registers every `/api` route. Literal segments (`/search`, `/week`, ...)
/// are registered ahead of the `/{id}` routes of the same scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .service(handlers::health_handlers::health_check_handler)
            .service(
                web::scope("/auth")
                    .service(handlers::auth_handlers::login_handler)
                    .service(handlers::auth_handlers::register_handler),
            )
            .service(
                web::scope("/users")
                    .service(handlers::auth_handlers::get_current_user_handler)
                    .service(handlers::auth_handlers::update_current_user_handler),
            )
            .service(
                web::scope("/clients")
                    .service(handlers::client_handlers::create_client_handler)
                    .service(handlers::client_handlers::list_clients_handler)
                    .service(handlers::client_handlers::search_clients_handler)
                    .service(handlers::client_handlers::get_client_handler)
                    .service(handlers::client_handlers::update_client_handler)
                    .service(handlers::client_handlers::delete_client_handler),
            )
            .service(
                web::scope("/labels")
                    .service(handlers::label_handlers::create_label_handler)
                    .service(handlers::label_handlers::list_labels_handler)
                    .service(handlers::label_handlers::get_label_handler)
                    .service(handlers::label_handlers::update_label_handler)
                    .service(handlers::label_handlers::delete_label_handler),
            )
            .service(
                web::scope("/lessons")
                    .service(handlers::lesson_handlers::create_lesson_handler)
                    .service(handlers::lesson_handlers::list_lessons_handler)
                    .service(handlers::lesson_handlers::list_week_lessons_handler)
                    .service(handlers::lesson_handlers::list_client_lessons_handler)
                    .service(handlers::lesson_handlers::list_label_lessons_handler)
                    .service(handlers::lesson_handlers::get_lesson_handler)
                    .service(handlers::lesson_handlers::update_lesson_handler)
                    .service(handlers::lesson_handlers::delete_lesson_handler)
                    .service(handlers::lesson_handlers::update_lesson_status_handler)
                    .service(handlers::lesson_handlers::replace_lesson_labels_handler)
                    .service(handlers::lesson_label_handlers::add_label_to_lesson_handler)
                    .service(handlers::lesson_label_handlers::list_labels_for_lesson_handler)
                    .service(handlers::lesson_label_handlers::remove_label_from_lesson_handler),
            ),
    );
}
