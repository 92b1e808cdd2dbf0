use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod repository;
mod routes;
#[cfg(test)]
mod testing;
mod workflow;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::repository::{MySqlAcademicDirectory, MySqlLeavePermitRepository};
use crate::workflow::LeavePermitService;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Leave permit service is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log; the guard flushes on drop, so it lives as long as main
    let file_appender = rolling::daily(&config.log_dir, "app.log");
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

    info!("Server starting...");

    let school_offset = config.school_offset()?;
    let pool = init_db(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    let service = Data::new(LeavePermitService::new(
        Arc::new(MySqlAcademicDirectory::new(pool.clone())),
        Arc::new(MySqlLeavePermitRepository::new(pool)),
        school_offset,
    ));
    let protected_limiter = Arc::new(routes::build_limiter(config.rate_protected_per_min)?);

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    info!(addr = %server_addr, prefix = %config.api_prefix, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone(), protected_limiter.clone()))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
