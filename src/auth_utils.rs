// tutor-calendar/src/auth_utils.rs
use crate::error_handler::ServiceError;
use actix_web::{dev::Payload, Error as ActixWebError, FromRequest, HttpRequest};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use futures_util::future::{err, ok, Ready};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Caller identity, carried in the `X-User-Id` header returned by login/register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixWebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(header_value) = req.headers().get(USER_ID_HEADER) else {
            log::warn!("{} header was NOT found in request headers.", USER_ID_HEADER);
            return err(
                ServiceError::Unauthorized("Missing X-User-Id header. Authentication required.".to_string())
                    .into(),
            );
        };

        let Ok(user_id_str) = header_value.to_str() else {
            log::warn!("{} header is not valid UTF-8.", USER_ID_HEADER);
            return err(
                ServiceError::BadRequest("X-User-Id header contains invalid characters.".to_string()).into(),
            );
        };

        if user_id_str.trim().is_empty() {
            log::warn!("{} header is present but empty.", USER_ID_HEADER);
            return err(ServiceError::BadRequest("X-User-Id header cannot be empty.".to_string()).into());
        }

        match Uuid::parse_str(user_id_str.trim()) {
            Ok(id) => {
                log::debug!("Successfully parsed X-User-Id: {}", id);
                ok(AuthenticatedUser { id })
            }
            Err(parse_err) => {
                log::warn!(
                    "Failed to parse X-User-Id '{}' to UUID: {}",
                    user_id_str,
                    parse_err
                );
                err(ServiceError::BadRequest(
                    "Invalid X-User-Id header format (not a valid UUID).".to_string(),
                )
                .into())
            }
        }
    }
}

/// Hashes a password into a PHC string (argon2id, random salt).
pub fn hash_password(raw_password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw_password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("Password hashing failed: {}", e);
            ServiceError::InternalServerError("Could not hash password.".to_string())
        })
}

/// A stored hash that cannot be parsed never matches.
pub fn verify_password(raw_password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}
