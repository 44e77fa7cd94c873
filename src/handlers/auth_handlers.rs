// tutor-calendar/src/handlers/auth_handlers.rs
use crate::auth_utils::{hash_password, verify_password, AuthenticatedUser};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::dto::{LoginPayload, RegisterPayload, UpdateUserPayload, UserResponse};
use crate::error_handler::ServiceError;
use crate::models::{NewUser, UpdateUserChangeset, User};
use crate::schema::users::{self, dsl::*};
use crate::scheduling::timezone_or_default;
use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

/// Loads the calling user; an id that no longer exists is treated as unauthenticated.
pub(crate) async fn load_user(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
) -> Result<User, ServiceError> {
    users
        .filter(id.eq(user_uuid))
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::Unauthorized(format!("Unknown user {}", user_uuid)))
}

// === POST /api/auth/login ===
#[post("/login")]
pub async fn login_handler(
    pool: web::Data<DbPool>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Login attempt for user: {}", payload.username);

    let mut conn = pool.get().await?;

    let user_option = users
        .filter(username.eq(&payload.username))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .await
        .optional()?;

    match user_option {
        Some(user) if verify_password(&payload.password, &user.password_hash) => {
            log::info!("Login successful for user: {}", user.username);
            Ok(HttpResponse::Ok().json(UserResponse::from(user)))
        }
        Some(_) => {
            log::warn!("Password mismatch for user: {}", payload.username);
            Err(ServiceError::Unauthorized("Invalid username or password".to_string()))
        }
        None => {
            log::warn!("User not found: {}", payload.username);
            Err(ServiceError::Unauthorized("Invalid username or password".to_string()))
        }
    }
}

// === POST /api/auth/register ===
#[post("/register")]
pub async fn register_handler(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Registration attempt for user: {}", payload.username);
    payload.validate()?;

    let mut conn = pool.get().await?;

    let requested_username = payload.username.trim().to_string();
    let already_taken = users
        .filter(username.eq(&requested_username))
        .select(id)
        .first::<Uuid>(&mut conn)
        .await
        .optional()?
        .is_some();

    if already_taken {
        log::warn!("User already exists: {}", requested_username);
        return Err(ServiceError::BadRequest(format!(
            "User '{}' already exists",
            requested_username
        )));
    }

    let new_user = NewUser {
        username: requested_username,
        password_hash: hash_password(&payload.password)?,
        timezone: timezone_or_default(payload.timezone.as_deref(), &config.default_timezone),
    };

    // A concurrent registration can still hit the unique index; report it as 400 too.
    let created_user = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result::<User>(&mut conn)
        .await
        .map_err(|db_err| match ServiceError::from(db_err) {
            ServiceError::Conflict(_) => ServiceError::BadRequest(format!(
                "User '{}' already exists",
                new_user.username
            )),
            other => other,
        })?;

    log::info!("User created successfully: {}", created_user.username);
    Ok(HttpResponse::Created().json(UserResponse::from(created_user)))
}

// === GET /api/users/me ===
#[get("/me")]
pub async fn get_current_user_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;
    let user = load_user(&mut conn, authenticated_user.id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

// === PUT /api/users/me ===
#[put("/me")]
pub async fn update_current_user_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<UpdateUserPayload>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    log::info!("Updating profile of user {}: {:?}", user_uuid, payload);

    if let Some(tz) = &payload.timezone {
        if tz.trim().is_empty() {
            return Err(ServiceError::BadRequest("timezone must not be empty".to_string()));
        }
    }

    let changes = UpdateUserChangeset {
        timezone: payload.timezone.as_ref().map(|tz| tz.trim().to_string()),
        telegram_chat_id: payload.telegram_chat_id.clone(),
        updated_at: Utc::now(),
    };

    let mut conn = pool.get().await?;

    let updated_user = diesel::update(users.filter(id.eq(user_uuid)))
        .set(&changes)
        .get_result::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::Unauthorized(format!("Unknown user {}", user_uuid)))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(updated_user)))
}
