use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod device;
mod docs;
mod error;
mod model;
mod models;
mod remote;
mod routes;
mod service;
mod stage;
#[cfg(test)]
mod testing;
mod utils;
mod verification;

use config::Config;
use db::init_db;

use crate::device::SimulatedDevice;
use crate::docs::ApiDoc;
use crate::service::AttendanceService;
use crate::service::clock::SystemClock;
use crate::stage::{SessionStage, SqliteStore};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Staff attendance agent"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Attendance agent starting...");

    let pool = init_db(&config.stage_database_url).await?;
    let stage = SessionStage::new(Arc::new(SqliteStore::new(pool)));

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let device = SimulatedDevice::load(config.device_settings()).await?;
    let verifier = config.verifier(http.clone());
    let remote = config.remote(http);

    let service = Arc::new(AttendanceService::new(
        Arc::new(device),
        Arc::new(verifier),
        Arc::new(remote),
        stage,
        Arc::new(SystemClock),
        config.service_settings(),
    ));

    match service.recover().await {
        Ok(open) => info!(open_shifts = open, "Staging recovered"),
        Err(e) => warn!(error = %e, "Could not list staged check-ins"),
    }

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(service.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
