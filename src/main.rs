// tutor-calendar/src/main.rs
use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use tutor_calendar::auth_utils::USER_ID_HEADER;
use tutor_calendar::config::AppConfig;
use tutor_calendar::{configure_api, db, seed};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    if cfg!(debug_assertions) {
        match dotenvy::dotenv() {
            Ok(path) => log::info!(".env file loaded from path: {}", path.display()),
            Err(e) => log::warn!(
                "Could not load .env file: {}, using environment variables.",
                e
            ),
        }
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let pool = db::create_pool(&config.database_url, config.pool_max_size)
        .await
        .map_err(|e| {
            log::error!("Failed to create database connection pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?;

    if config.seed_demo_data {
        if let Err(e) = seed::seed_demo_data(&pool, &config.default_timezone).await {
            log::error!("Demo data seeding failed: {}", e);
        }
    }

    log::info!("🚀 Tutor Calendar service starting...");
    log::info!("Server will start at http://{}", config.bind_address());
    log::info!("Allowed CORS origins: {:?}", config.allowed_origins);

    let bind_address = config.bind_address();
    let app_config = web::Data::new(config);

    HttpServer::new(move || {
        let cors = app_config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .allowed_header(USER_ID_HEADER)
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(pool.clone()))
            .app_data(app_config.clone())
            .configure(configure_api)
    })
    .bind(bind_address)?
    .run()
    .await
}
