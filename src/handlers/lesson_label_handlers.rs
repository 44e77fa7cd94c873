// tutor-calendar/src/handlers/lesson_label_handlers.rs
use crate::auth_utils::AuthenticatedUser;
use crate::db::DbPool;
use crate::dto::LabelResponse;
use crate::error_handler::ServiceError;
use crate::handlers::lesson_handlers::{ensure_lesson_owned, fetch_lesson_response};
use crate::models::{Label, NewLessonLabelAssociation};
use crate::schema::{labels, lesson_labels};
use actix_web::{delete, get, post, web, HttpResponse};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

async fn ensure_label_owned(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    label_uuid: Uuid,
) -> Result<(), ServiceError> {
    let label_check = labels::table
        .filter(labels::id.eq(label_uuid))
        .filter(labels::user_id.eq(user_uuid))
        .select(labels::id)
        .first::<Uuid>(conn)
        .await
        .optional()?;

    if label_check.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Label with id {} not found or not owned by user",
            label_uuid
        )));
    }
    Ok(())
}

// === POST /api/lessons/{lesson_id_path}/labels/{label_id_path} ===
// Attaching a label that is already on the lesson is a no-op.
#[post("/{lesson_id_path}/labels/{label_id_path}")]
pub async fn add_label_to_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    path_params: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ServiceError> {
    let (lesson_uuid, label_uuid) = path_params.into_inner();
    let user_uuid = authenticated_user.id;

    log::info!(
        "User {} attempting to add label {} to lesson {}",
        user_uuid,
        label_uuid,
        lesson_uuid
    );

    let mut conn = pool.get().await?;

    ensure_lesson_owned(&mut conn, user_uuid, lesson_uuid).await?;
    ensure_label_owned(&mut conn, user_uuid, label_uuid).await?;

    let new_association = NewLessonLabelAssociation {
        lesson_id: lesson_uuid,
        label_id: label_uuid,
    };

    diesel::insert_into(lesson_labels::table)
        .values(&new_association)
        .on_conflict_do_nothing()
        .execute(&mut conn)
        .await?;

    let response = fetch_lesson_response(&mut conn, user_uuid, lesson_uuid).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === DELETE /api/lessons/{lesson_id_path}/labels/{label_id_path} ===
#[delete("/{lesson_id_path}/labels/{label_id_path}")]
pub async fn remove_label_from_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    path_params: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ServiceError> {
    let (lesson_uuid, label_uuid) = path_params.into_inner();
    let user_uuid = authenticated_user.id;

    log::info!(
        "User {} attempting to remove label {} from lesson {}",
        user_uuid,
        label_uuid,
        lesson_uuid
    );

    let mut conn = pool.get().await?;

    // Ownership of the lesson guards against editing another tutor's lessons by id.
    ensure_lesson_owned(&mut conn, user_uuid, lesson_uuid).await?;

    let num_deleted = diesel::delete(
        lesson_labels::table
            .filter(lesson_labels::lesson_id.eq(lesson_uuid))
            .filter(lesson_labels::label_id.eq(label_uuid)),
    )
    .execute(&mut conn)
    .await?;

    if num_deleted == 0 {
        return Err(ServiceError::NotFound(format!(
            "Label {} is not attached to lesson {}",
            label_uuid, lesson_uuid
        )));
    }

    let response = fetch_lesson_response(&mut conn, user_uuid, lesson_uuid).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/lessons/{lesson_id_path}/labels ===
#[get("/{lesson_id_path}/labels")]
pub async fn list_labels_for_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    lesson_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let lesson_uuid = lesson_id_path.into_inner();
    let user_uuid = authenticated_user.id;

    log::info!("User {} listing labels for lesson {}", user_uuid, lesson_uuid);

    let mut conn = pool.get().await?;

    ensure_lesson_owned(&mut conn, user_uuid, lesson_uuid).await?;

    let labels_for_lesson = lesson_labels::table
        .filter(lesson_labels::lesson_id.eq(lesson_uuid))
        .inner_join(labels::table.on(labels::id.eq(lesson_labels::label_id)))
        .order(labels::name.asc())
        .select(Label::as_select())
        .load::<Label>(&mut conn)
        .await?;

    let response: Vec<LabelResponse> = labels_for_lesson.into_iter().map(LabelResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}
