// tutor-calendar/src/handlers/label_handlers.rs
use crate::auth_utils::AuthenticatedUser;
use crate::db::DbPool;
use crate::dto::{LabelPayload, LabelResponse};
use crate::error_handler::ServiceError;
use crate::handlers::auth_handlers::load_user;
use crate::models::{Label, LabelChangeset, NewLabel};
use crate::schema::labels::{self, dsl::*};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::json;
use uuid::Uuid;

/// Label names are unique per user; `except` skips the label being renamed.
async fn ensure_name_available(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    label_name: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = labels
        .filter(user_id.eq(user_uuid))
        .filter(name.eq(label_name))
        .select(id)
        .into_boxed();

    if let Some(current_id) = except {
        query = query.filter(id.ne(current_id));
    }

    let clash = query.first::<Uuid>(conn).await.optional()?;
    match clash {
        Some(_) => Err(ServiceError::Conflict(format!(
            "Label with name '{}' already exists",
            label_name
        ))),
        None => Ok(()),
    }
}

// === POST /api/labels ===
#[post("")]
pub async fn create_label_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<LabelPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Create label payload received: {:?}", payload);
    payload.validate()?;

    let mut conn = pool.get().await?;
    let owner = load_user(&mut conn, authenticated_user.id).await?;

    let label_name = payload.name.trim().to_string();
    ensure_name_available(&mut conn, owner.id, &label_name, None).await?;

    let new_label_data = NewLabel {
        user_id: owner.id,
        name: label_name,
        color: payload.color.clone(),
        emoji: payload.emoji.clone(),
    };

    let created_label = diesel::insert_into(labels::table)
        .values(&new_label_data)
        .get_result::<Label>(&mut conn)
        .await?;

    log::info!("Label created successfully: {:?}", created_label);
    Ok(HttpResponse::Created().json(LabelResponse::from(created_label)))
}

// === GET /api/labels ===
#[get("")]
pub async fn list_labels_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    log::info!("Listing labels for user: {}", user_uuid);

    let mut conn = pool.get().await?;

    let label_list = labels
        .filter(user_id.eq(user_uuid))
        .order(name.asc())
        .select(Label::as_select())
        .load::<Label>(&mut conn)
        .await?;

    let response: Vec<LabelResponse> = label_list.into_iter().map(LabelResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/labels/{label_id_path} ===
#[get("/{label_id_path}")]
pub async fn get_label_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    label_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let label_to_find_id = label_id_path.into_inner();

    log::info!("Fetching label {} for user {}", label_to_find_id, user_uuid);

    let mut conn = pool.get().await?;

    let label_option = labels
        .filter(user_id.eq(user_uuid))
        .filter(id.eq(label_to_find_id))
        .select(Label::as_select())
        .first::<Label>(&mut conn)
        .await
        .optional()?;

    match label_option {
        Some(label) => Ok(HttpResponse::Ok().json(LabelResponse::from(label))),
        None => Err(ServiceError::NotFound(format!(
            "Label with id {} not found or not owned by user",
            label_to_find_id
        ))),
    }
}

// === PUT /api/labels/{label_id_path} ===
#[put("/{label_id_path}")]
pub async fn update_label_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    label_id_path: web::Path<Uuid>,
    payload: web::Json<LabelPayload>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let label_to_update_id = label_id_path.into_inner();

    log::info!(
        "Update label payload for label {}: {:?}",
        label_to_update_id,
        payload
    );
    payload.validate()?;

    let mut conn = pool.get().await?;

    let label_name = payload.name.trim().to_string();
    ensure_name_available(&mut conn, user_uuid, &label_name, Some(label_to_update_id)).await?;

    let label_changes = LabelChangeset {
        name: label_name,
        color: payload.color.clone(),
        emoji: payload.emoji.clone(),
        updated_at: Utc::now(),
    };

    let updated_label = diesel::update(
        labels
            .filter(id.eq(label_to_update_id))
            .filter(user_id.eq(user_uuid)),
    )
    .set(&label_changes)
    .get_result::<Label>(&mut conn)
    .await
    .optional()?;

    match updated_label {
        Some(label) => Ok(HttpResponse::Ok().json(LabelResponse::from(label))),
        None => Err(ServiceError::NotFound(format!(
            "Label with id {} not found or not owned by user",
            label_to_update_id
        ))),
    }
}

// === DELETE /api/labels/{label_id_path} ===
// Lesson associations are removed by the lesson_labels cascade.
#[delete("/{label_id_path}")]
pub async fn delete_label_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    label_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let label_to_delete_id = label_id_path.into_inner();

    log::info!(
        "Deleting label {} for user {}",
        label_to_delete_id,
        user_uuid
    );

    let mut conn = pool.get().await?;

    let num_deleted = diesel::delete(
        labels
            .filter(user_id.eq(user_uuid))
            .filter(id.eq(label_to_delete_id)),
    )
    .execute(&mut conn)
    .await?;

    if num_deleted > 0 {
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Label with id {} deleted successfully", label_to_delete_id)
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Label with id {} not found or not owned by user to delete",
            label_to_delete_id
        )))
    }
}
