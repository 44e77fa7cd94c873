// tutor-calendar/src/error_handler.rs
use crate::date_utils::DateParseError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::bb8::RunError as BB8RunError;
use diesel_async::pooled_connection::PoolError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Database Error: {0}")]
    DatabaseError(String), // already user-safe
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Pool Error: {0}")]
    PoolError(String),
}

impl ServiceError {
    fn from_diesel_error(error: DieselError) -> ServiceError {
        match error {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                log::warn!("Unique constraint violated: {}", info.message());
                ServiceError::Conflict("A record with the same unique value already exists.".to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                log::warn!("Foreign key constraint violated: {}", info.message());
                ServiceError::BadRequest("The request references a record that does not exist.".to_string())
            }
            DieselError::DatabaseError(kind, info) => {
                log::error!("Internal Database Error: {:?} - Info: {}", kind, info.message());
                ServiceError::DatabaseError("A database operation failed.".to_string())
            }
            DieselError::NotFound => {
                ServiceError::NotFound("The requested record was not found.".to_string())
            }
            err => {
                log::error!("Unexpected Diesel error: {}", err);
                ServiceError::DatabaseError("An unexpected database error occurred.".to_string())
            }
        }
    }
}

impl From<DieselError> for ServiceError {
    fn from(error: DieselError) -> ServiceError {
        ServiceError::from_diesel_error(error)
    }
}

impl From<PoolError> for ServiceError {
    fn from(error: PoolError) -> ServiceError {
        log::error!("Pool error: {:?}", error);
        ServiceError::PoolError("Could not connect to the database pool.".to_string())
    }
}

impl From<BB8RunError> for ServiceError {
    fn from(error: BB8RunError) -> ServiceError {
        log::error!("BB8 connection pool error: {:?}", error);
        ServiceError::PoolError("Could not obtain connection from database pool.".to_string())
    }
}

impl From<DateParseError> for ServiceError {
    fn from(error: DateParseError) -> ServiceError {
        ServiceError::BadRequest(error.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match *self {
            ServiceError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::PoolError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        // Server-side details were logged where the error was built.
        let user_facing_message = if status_code.is_server_error() {
            "An internal server error occurred. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        if status_code.is_server_error() {
            log::error!(
                "Responding with server error ({}): {}",
                status_code,
                self
            );
        } else {
            log::warn!(
                "Responding with client error ({}): {}",
                status_code,
                user_facing_message
            );
        }

        HttpResponse::build(status_code).json(json!({
            "status": "error",
            "statusCode": status_code.as_u16(),
            "message": user_facing_message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn client_errors_keep_their_message() {
        let (status, body) = body_json(ServiceError::NotFound("Client with id 42 not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "Not Found: Client with id 42 not found");
    }

    #[actix_web::test]
    async fn server_errors_are_masked() {
        let (status, body) = body_json(ServiceError::DatabaseError("relation missing".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["message"],
            "An internal server error occurred. Please try again later."
        );
    }

    #[test]
    fn status_codes_follow_variant() {
        assert_eq!(ServiceError::BadRequest(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::Unauthorized(String::new()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::Conflict(String::new()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ServiceError::PoolError(String::new()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        assert!(matches!(ServiceError::from(DieselError::NotFound), ServiceError::NotFound(_)));
    }

    #[test]
    fn date_errors_become_bad_requests() {
        let err = ServiceError::from(DateParseError("tomorrow".into()));
        assert_eq!(err.to_string(), "Bad Request: Invalid date format: tomorrow");
    }
}
