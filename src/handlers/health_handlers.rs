// tutor-calendar/src/handlers/health_handlers.rs
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use actix_web::{get, web, HttpResponse};

// === GET /api/health ===
#[get("/health")]
pub async fn health_check_handler(pool: web::Data<DbPool>) -> Result<HttpResponse, ServiceError> {
    match pool.get().await {
        Ok(_conn) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "message": "Server is running and DB pool accessible"
        }))),
        Err(e) => {
            log::error!("Failed to get connection from pool: {:?}", e);
            Err(ServiceError::InternalServerError(
                "Failed to check DB pool".to_string(),
            ))
        }
    }
}
