use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tokio::signal;

mod api_error;
mod auth;
mod config;
mod db;
mod http;
mod middleware;
mod models;
mod service;
mod telemetry;

use crate::auth::{AuthMiddleware, JwtConfig, JwtService};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::http::settlement_handler::AppState;
use crate::middleware::cors_middleware;
use crate::service::SettlementService;
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    // Initialize telemetry
    init_telemetry();

    // Create database pool and apply migrations
    let db_pool = create_pool(&config)
        .await
        .expect("Failed to create database pool");
    run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(JwtConfig::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_expiry_minutes,
    ));
    let settlement_service = Arc::new(SettlementService::new(db_pool.clone()));

    tracing::info!(
        "Starting Last Man Standing backend server on {}:{}",
        config.server.host,
        config.server.port
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(AppState {
                settlement_service: settlement_service.clone(),
            }))
            .wrap(cors_middleware())
            .wrap(actix_web::middleware::Logger::default())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(crate::http::health::health_check)),
            )
            .service(
                web::scope("")
                    .wrap(AuthMiddleware::new(jwt_service.clone()))
                    .configure(crate::http::settlement_handler::configure_routes),
            )
    })
    .bind((config.server.host.clone(), config.server.port))?
    .run();

    // Graceful shutdown
    let server_handle = server.handle();
    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .expect("Failed to listen for shutdown signal");
        tracing::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    server.await
}
