// tutor-calendar/src/handlers/lesson_handlers.rs
use crate::auth_utils::AuthenticatedUser;
use crate::db::DbPool;
use crate::dto::{LessonLabelsPayload, LessonPayload, LessonResponse, LessonStatusPayload, WeekQuery};
use crate::error_handler::ServiceError;
use crate::handlers::auth_handlers::load_user;
use crate::models::{
    Client, Label, Lesson, LessonChangeset, LessonLabel, LessonStatusChangeset, NewLesson,
    NewLessonLabelAssociation,
};
use crate::schema::{clients, labels, lesson_labels, lessons};
use crate::scheduling::{resolve_timing, retain_owned_labels, timezone_or_default, WeekRange};
use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde_json::json;
use uuid::Uuid;

/// Builds the row to store from a payload, applying timezone defaults and
/// deriving whichever of end time / duration is missing.
pub(crate) fn build_new_lesson(
    user_uuid: Uuid,
    tutor_default_tz: &str,
    client: &Client,
    payload: &LessonPayload,
) -> Result<NewLesson, ServiceError> {
    let timing = resolve_timing(payload.start_time, payload.end_time, payload.duration_minutes)?;

    Ok(NewLesson {
        user_id: user_uuid,
        client_id: client.id,
        start_time: payload.start_time,
        end_time: timing.end_time,
        duration_minutes: timing.duration_minutes,
        description: payload
            .description
            .as_ref()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        is_paid: payload.is_paid,
        is_trial: payload.is_trial,
        requires_preparation: payload.requires_preparation,
        homework_sent: payload.homework_sent,
        tutor_timezone: timezone_or_default(payload.tutor_timezone.as_deref(), tutor_default_tz),
        client_timezone: timezone_or_default(payload.client_timezone.as_deref(), &client.timezone),
    })
}

fn into_changeset(lesson: NewLesson) -> LessonChangeset {
    LessonChangeset {
        client_id: lesson.client_id,
        start_time: lesson.start_time,
        end_time: lesson.end_time,
        duration_minutes: lesson.duration_minutes,
        description: lesson.description,
        is_paid: lesson.is_paid,
        is_trial: lesson.is_trial,
        requires_preparation: lesson.requires_preparation,
        homework_sent: lesson.homework_sent,
        tutor_timezone: lesson.tutor_timezone,
        client_timezone: lesson.client_timezone,
        updated_at: Utc::now(),
    }
}

/// Attaches labels to (lesson, client) rows, preserving row order.
async fn attach_labels(
    conn: &mut AsyncPgConnection,
    rows: Vec<(Lesson, Client)>,
) -> Result<Vec<LessonResponse>, ServiceError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let (lesson_list, client_list): (Vec<Lesson>, Vec<Client>) = rows.into_iter().unzip();

    let label_rows = LessonLabel::belonging_to(&lesson_list)
        .inner_join(labels::table)
        .order(labels::name.asc())
        .select((LessonLabel::as_select(), Label::as_select()))
        .load::<(LessonLabel, Label)>(conn)
        .await?;

    let labels_per_lesson = label_rows.grouped_by(&lesson_list);

    Ok(lesson_list
        .into_iter()
        .zip(client_list.iter())
        .zip(labels_per_lesson)
        .map(|((lesson, client), label_group)| {
            let lesson_labels_list = label_group.into_iter().map(|(_, label)| label).collect();
            LessonResponse::from_parts(lesson, client, lesson_labels_list)
        })
        .collect())
}

pub(crate) async fn ensure_lesson_owned(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    lesson_uuid: Uuid,
) -> Result<(), ServiceError> {
    let found = lessons::table
        .filter(lessons::id.eq(lesson_uuid))
        .filter(lessons::user_id.eq(user_uuid))
        .select(lessons::id)
        .first::<Uuid>(conn)
        .await
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(ServiceError::NotFound(format!(
            "Lesson with id {} not found or not owned by user",
            lesson_uuid
        ))),
    }
}

pub(crate) async fn fetch_lesson_response(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    lesson_uuid: Uuid,
) -> Result<LessonResponse, ServiceError> {
    let row = lessons::table
        .inner_join(clients::table)
        .filter(lessons::id.eq(lesson_uuid))
        .filter(lessons::user_id.eq(user_uuid))
        .select((Lesson::as_select(), Client::as_select()))
        .first::<(Lesson, Client)>(conn)
        .await
        .optional()?;

    match row {
        Some(row) => attach_labels(conn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalServerError("Lesson row vanished".to_string())),
        None => Err(ServiceError::NotFound(format!(
            "Lesson with id {} not found or not owned by user",
            lesson_uuid
        ))),
    }
}

async fn fetch_client_for_lesson(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    client_uuid: Uuid,
) -> Result<Client, ServiceError> {
    clients::table
        .filter(clients::id.eq(client_uuid))
        .filter(clients::user_id.eq(user_uuid))
        .select(Client::as_select())
        .first::<Client>(conn)
        .await
        .optional()?
        .ok_or_else(|| {
            ServiceError::BadRequest(format!(
                "Client with id {} not found or not owned by user",
                client_uuid
            ))
        })
}

/// Filters requested label ids down to the ones the user owns.
async fn owned_label_ids(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    requested: &[Uuid],
) -> Result<Vec<Uuid>, ServiceError> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let owned = labels::table
        .filter(labels::user_id.eq(user_uuid))
        .filter(labels::id.eq_any(requested))
        .select(labels::id)
        .load::<Uuid>(conn)
        .await?;

    let kept = retain_owned_labels(requested, &owned);
    if kept.len() < requested.len() {
        log::warn!(
            "Ignoring {} label id(s) not owned by user {}",
            requested.len() - kept.len(),
            user_uuid
        );
    }
    Ok(kept)
}

async fn replace_lesson_labels(
    conn: &mut AsyncPgConnection,
    lesson_uuid: Uuid,
    label_ids: &[Uuid],
) -> Result<(), ServiceError> {
    diesel::delete(lesson_labels::table.filter(lesson_labels::lesson_id.eq(lesson_uuid)))
        .execute(conn)
        .await?;

    if label_ids.is_empty() {
        return Ok(());
    }

    let associations: Vec<NewLessonLabelAssociation> = label_ids
        .iter()
        .map(|label_uuid| NewLessonLabelAssociation {
            lesson_id: lesson_uuid,
            label_id: *label_uuid,
        })
        .collect();

    diesel::insert_into(lesson_labels::table)
        .values(&associations)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    Ok(())
}

/// Replaces a lesson's label set in one transaction. On failure the previous
/// set is left untouched.
pub async fn store_lesson_labels(
    conn: &mut AsyncPgConnection,
    lesson_uuid: Uuid,
    label_ids: &[Uuid],
) -> Result<(), ServiceError> {
    conn.transaction::<_, ServiceError, _>(|conn| {
        async move { replace_lesson_labels(conn, lesson_uuid, label_ids).await }.scope_boxed()
    })
    .await
}

// === POST /api/lessons ===
#[post("")]
pub async fn create_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<LessonPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!(
        "User {} creating lesson with payload: {:?}",
        authenticated_user.id,
        payload.0
    );
    payload.validate()?;

    let mut conn = pool.get().await?;

    let owner = load_user(&mut conn, authenticated_user.id).await?;
    let client = fetch_client_for_lesson(&mut conn, owner.id, payload.client_id).await?;
    let new_lesson = build_new_lesson(owner.id, &owner.timezone, &client, &payload)?;
    let requested_labels = &payload.label_ids;

    let created_lesson_id = conn
        .transaction::<_, ServiceError, _>(|conn| {
            async move {
                let created_lesson = diesel::insert_into(lessons::table)
                    .values(&new_lesson)
                    .get_result::<Lesson>(conn)
                    .await?;

                let label_ids = owned_label_ids(conn, new_lesson.user_id, requested_labels).await?;
                replace_lesson_labels(conn, created_lesson.id, &label_ids).await?;
                Ok(created_lesson.id)
            }
            .scope_boxed()
        })
        .await?;

    let response = fetch_lesson_response(&mut conn, owner.id, created_lesson_id).await?;
    log::info!("Lesson created successfully: {}", response.id);
    Ok(HttpResponse::Created().json(response))
}

// === GET /api/lessons ===
#[get("")]
pub async fn list_lessons_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    log::info!("Listing all lessons for user: {}", user_uuid);

    let mut conn = pool.get().await?;

    let rows = lessons::table
        .inner_join(clients::table)
        .filter(lessons::user_id.eq(user_uuid))
        .order(lessons::start_time.asc())
        .select((Lesson::as_select(), Client::as_select()))
        .load::<(Lesson, Client)>(&mut conn)
        .await?;

    let response = attach_labels(&mut conn, rows).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/lessons/week?weekStart=YYYY-MM-DD ===
#[get("/week")]
pub async fn list_week_lessons_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    query: web::Query<WeekQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let week = WeekRange::starting(query.week_start)?;
    log::info!(
        "Listing lessons for user {} in week {} - {}",
        user_uuid,
        week.first_day(),
        week.last_day()
    );

    let mut conn = pool.get().await?;

    let rows = lessons::table
        .inner_join(clients::table)
        .filter(lessons::user_id.eq(user_uuid))
        .filter(lessons::start_time.ge(week.start))
        .filter(lessons::start_time.lt(week.end_exclusive))
        .order(lessons::start_time.asc())
        .select((Lesson::as_select(), Client::as_select()))
        .load::<(Lesson, Client)>(&mut conn)
        .await?;

    let response = attach_labels(&mut conn, rows).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/lessons/client/{client_id_path} ===
#[get("/client/{client_id_path}")]
pub async fn list_client_lessons_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    client_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let client_uuid = client_id_path.into_inner();
    log::info!("Listing lessons of client {} for user {}", client_uuid, user_uuid);

    let mut conn = pool.get().await?;

    let client_exists = clients::table
        .filter(clients::id.eq(client_uuid))
        .filter(clients::user_id.eq(user_uuid))
        .select(clients::id)
        .first::<Uuid>(&mut conn)
        .await
        .optional()?;

    if client_exists.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Client with id {} not found or not owned by user",
            client_uuid
        )));
    }

    let rows = lessons::table
        .inner_join(clients::table)
        .filter(lessons::user_id.eq(user_uuid))
        .filter(lessons::client_id.eq(client_uuid))
        .order(lessons::start_time.asc())
        .select((Lesson::as_select(), Client::as_select()))
        .load::<(Lesson, Client)>(&mut conn)
        .await?;

    let response = attach_labels(&mut conn, rows).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/lessons/label/{label_id_path} ===
#[get("/label/{label_id_path}")]
pub async fn list_label_lessons_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    label_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let label_uuid = label_id_path.into_inner();
    log::info!("Listing lessons with label {} for user {}", label_uuid, user_uuid);

    let mut conn = pool.get().await?;

    let label_exists = labels::table
        .filter(labels::id.eq(label_uuid))
        .filter(labels::user_id.eq(user_uuid))
        .select(labels::id)
        .first::<Uuid>(&mut conn)
        .await
        .optional()?;

    if label_exists.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Label with id {} not found or not owned by user",
            label_uuid
        )));
    }

    let rows = lessons::table
        .inner_join(clients::table)
        .inner_join(lesson_labels::table)
        .filter(lessons::user_id.eq(user_uuid))
        .filter(lesson_labels::label_id.eq(label_uuid))
        .order(lessons::start_time.asc())
        .select((Lesson::as_select(), Client::as_select()))
        .load::<(Lesson, Client)>(&mut conn)
        .await?;

    let response = attach_labels(&mut conn, rows).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/lessons/{lesson_id_path} ===
#[get("/{lesson_id_path}")]
pub async fn get_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    lesson_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;
    let response =
        fetch_lesson_response(&mut conn, authenticated_user.id, lesson_id_path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === PUT /api/lessons/{lesson_id_path} ===
// Full replace: absent optional fields are cleared and an absent labelIds empties the label set.
#[put("/{lesson_id_path}")]
pub async fn update_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    lesson_id_path: web::Path<Uuid>,
    payload: web::Json<LessonPayload>,
) -> Result<HttpResponse, ServiceError> {
    let lesson_to_update_id = lesson_id_path.into_inner();
    log::info!(
        "Update lesson payload for lesson {}: {:?}",
        lesson_to_update_id,
        payload.0
    );
    payload.validate()?;

    let mut conn = pool.get().await?;

    let owner = load_user(&mut conn, authenticated_user.id).await?;
    ensure_lesson_owned(&mut conn, owner.id, lesson_to_update_id).await?;
    let client = fetch_client_for_lesson(&mut conn, owner.id, payload.client_id).await?;
    let lesson_changes = into_changeset(build_new_lesson(owner.id, &owner.timezone, &client, &payload)?);
    let owner_id = owner.id;
    let requested_labels = &payload.label_ids;

    conn.transaction::<_, ServiceError, _>(|conn| {
        async move {
            diesel::update(
                lessons::table
                    .filter(lessons::id.eq(lesson_to_update_id))
                    .filter(lessons::user_id.eq(owner_id)),
            )
            .set(&lesson_changes)
            .execute(conn)
            .await?;

            let label_ids = owned_label_ids(conn, owner_id, requested_labels).await?;
            replace_lesson_labels(conn, lesson_to_update_id, &label_ids).await
        }
        .scope_boxed()
    })
    .await?;

    let response = fetch_lesson_response(&mut conn, owner.id, lesson_to_update_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === DELETE /api/lessons/{lesson_id_path} ===
#[delete("/{lesson_id_path}")]
pub async fn delete_lesson_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    lesson_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let lesson_to_delete_id = lesson_id_path.into_inner();

    log::info!(
        "Deleting lesson {} for user {}",
        lesson_to_delete_id,
        user_uuid
    );

    let mut conn = pool.get().await?;

    // lesson_labels rows go with the lesson through ON DELETE CASCADE.
    let num_deleted = diesel::delete(
        lessons::table
            .filter(lessons::user_id.eq(user_uuid))
            .filter(lessons::id.eq(lesson_to_delete_id)),
    )
    .execute(&mut conn)
    .await?;

    if num_deleted > 0 {
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Lesson with id {} deleted successfully", lesson_to_delete_id)
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Lesson with id {} not found or not owned by user to delete",
            lesson_to_delete_id
        )))
    }
}

// === PATCH /api/lessons/{lesson_id_path}/status ===
#[patch("/{lesson_id_path}/status")]
pub async fn update_lesson_status_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    lesson_id_path: web::Path<Uuid>,
    payload: web::Json<LessonStatusPayload>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let lesson_uuid = lesson_id_path.into_inner();
    log::info!("Status update for lesson {}: {:?}", lesson_uuid, payload.0);

    if *payload == LessonStatusPayload::default() {
        return Err(ServiceError::BadRequest(
            "At least one of isPaid, isTrial, requiresPreparation, homeworkSent is required"
                .to_string(),
        ));
    }

    let status_changes = LessonStatusChangeset {
        is_paid: payload.is_paid,
        is_trial: payload.is_trial,
        requires_preparation: payload.requires_preparation,
        homework_sent: payload.homework_sent,
        updated_at: Some(Utc::now()),
    };

    let mut conn = pool.get().await?;

    let num_updated = diesel::update(
        lessons::table
            .filter(lessons::id.eq(lesson_uuid))
            .filter(lessons::user_id.eq(user_uuid)),
    )
    .set(&status_changes)
    .execute(&mut conn)
    .await?;

    if num_updated == 0 {
        return Err(ServiceError::NotFound(format!(
            "Lesson with id {} not found or not owned by user",
            lesson_uuid
        )));
    }

    let response = fetch_lesson_response(&mut conn, user_uuid, lesson_uuid).await?;
    Ok(HttpResponse::Ok().json(response))
}

// === PATCH /api/lessons/{lesson_id_path}/labels ===
// Replaces the whole label set; ids the user does not own are dropped.
#[patch("/{lesson_id_path}/labels")]
pub async fn replace_lesson_labels_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    lesson_id_path: web::Path<Uuid>,
    payload: web::Json<LessonLabelsPayload>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let lesson_uuid = lesson_id_path.into_inner();
    log::info!("Replacing labels of lesson {}: {:?}", lesson_uuid, payload.label_ids);

    let mut conn = pool.get().await?;

    ensure_lesson_owned(&mut conn, user_uuid, lesson_uuid).await?;
    let label_ids = owned_label_ids(&mut conn, user_uuid, &payload.label_ids).await?;
    store_lesson_labels(&mut conn, lesson_uuid, &label_ids).await?;

    let response = fetch_lesson_response(&mut conn, user_uuid, lesson_uuid).await?;
    Ok(HttpResponse::Ok().json(response))
}
