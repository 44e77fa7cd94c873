// tutor-calendar/src/handlers/client_handlers.rs
use crate::auth_utils::AuthenticatedUser;
use crate::db::DbPool;
use crate::dto::{ClientPayload, ClientResponse, ClientSearchQuery};
use crate::error_handler::ServiceError;
use crate::handlers::auth_handlers::load_user;
use crate::models::{Client, ClientChangeset, NewClient};
use crate::schema::clients::{self, dsl::*};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;
use uuid::Uuid;

/// Escapes LIKE wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// === POST /api/clients ===
#[post("")]
pub async fn create_client_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<ClientPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Create client payload received: {:?}", payload);
    payload.validate()?;

    let mut conn = pool.get().await?;
    let owner = load_user(&mut conn, authenticated_user.id).await?;

    let payload = payload.into_inner();
    let new_client = NewClient {
        user_id: owner.id,
        name: payload.name,
        phone: payload.phone,
        timezone: payload.timezone,
        city: payload.city,
        description: payload.description,
        lesson_price: payload.lesson_price,
    };

    let created_client = diesel::insert_into(clients::table)
        .values(&new_client)
        .get_result::<Client>(&mut conn)
        .await?;

    log::info!("Client created successfully: {}", created_client.id);
    Ok(HttpResponse::Created().json(ClientResponse::from(created_client)))
}

// === GET /api/clients ===
#[get("")]
pub async fn list_clients_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    log::info!("Listing clients for user: {}", user_uuid);

    let mut conn = pool.get().await?;

    let client_list = clients
        .filter(user_id.eq(user_uuid))
        .order(name.asc())
        .select(Client::as_select())
        .load::<Client>(&mut conn)
        .await?;

    let response: Vec<ClientResponse> = client_list.into_iter().map(ClientResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/clients/search?name= ===
#[get("/search")]
pub async fn search_clients_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    query: web::Query<ClientSearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    log::info!("User {} searching clients by name '{}'", user_uuid, query.name);

    let mut conn = pool.get().await?;

    let client_list = clients
        .filter(user_id.eq(user_uuid))
        .filter(name.ilike(like_pattern(query.name.trim())))
        .order(name.asc())
        .select(Client::as_select())
        .load::<Client>(&mut conn)
        .await?;

    let response: Vec<ClientResponse> = client_list.into_iter().map(ClientResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

// === GET /api/clients/{client_id_path} ===
#[get("/{client_id_path}")]
pub async fn get_client_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    client_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let client_to_find_id = client_id_path.into_inner();

    let mut conn = pool.get().await?;

    let client_option = clients
        .filter(user_id.eq(user_uuid))
        .filter(id.eq(client_to_find_id))
        .select(Client::as_select())
        .first::<Client>(&mut conn)
        .await
        .optional()?;

    match client_option {
        Some(client) => Ok(HttpResponse::Ok().json(ClientResponse::from(client))),
        None => Err(ServiceError::NotFound(format!(
            "Client with id {} not found or not owned by user",
            client_to_find_id
        ))),
    }
}

// === PUT /api/clients/{client_id_path} ===
#[put("/{client_id_path}")]
pub async fn update_client_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    client_id_path: web::Path<Uuid>,
    payload: web::Json<ClientPayload>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let client_to_update_id = client_id_path.into_inner();

    log::info!(
        "Update client payload for client {}: {:?}",
        client_to_update_id,
        payload
    );
    payload.validate()?;

    let payload = payload.into_inner();
    let client_changes = ClientChangeset {
        name: payload.name,
        phone: payload.phone,
        timezone: payload.timezone,
        city: payload.city,
        description: payload.description,
        lesson_price: payload.lesson_price,
        updated_at: Utc::now(),
    };

    let mut conn = pool.get().await?;

    let updated_client = diesel::update(
        clients
            .filter(id.eq(client_to_update_id))
            .filter(user_id.eq(user_uuid)),
    )
    .set(&client_changes)
    .get_result::<Client>(&mut conn)
    .await
    .optional()?;

    match updated_client {
        Some(client) => Ok(HttpResponse::Ok().json(ClientResponse::from(client))),
        None => Err(ServiceError::NotFound(format!(
            "Client with id {} not found or not owned by user",
            client_to_update_id
        ))),
    }
}

// === DELETE /api/clients/{client_id_path} ===
// The client's lessons go with it through the foreign key cascade.
#[delete("/{client_id_path}")]
pub async fn delete_client_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    client_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let user_uuid = authenticated_user.id;
    let client_to_delete_id = client_id_path.into_inner();

    log::info!(
        "Deleting client {} for user {}",
        client_to_delete_id,
        user_uuid
    );

    let mut conn = pool.get().await?;

    let num_deleted = diesel::delete(
        clients
            .filter(user_id.eq(user_uuid))
            .filter(id.eq(client_to_delete_id)),
    )
    .execute(&mut conn)
    .await?;

    if num_deleted > 0 {
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Client with id {} deleted successfully", client_to_delete_id)
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Client with id {} not found or not owned by user to delete",
            client_to_delete_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("iva"), "%iva%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
