use actix_web::{middleware::Logger, web, App, HttpServer};
use alzheimer_api::config::ServerOptions;
use alzheimer_api::routes::{self, UploadLimit};
use alzheimer_api::state::AppState;
use anyhow::Context;
use clap::Parser;
use log::{error, info, LevelFilter};

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let options = ServerOptions::parse();

    env_logger::Builder::new()
        .filter_level(options.log_level.unwrap_or(LOG_LEVEL))
        .parse_default_env()
        .init();

    // Both models must load before we bind; there is no degraded mode.
    let state = match AppState::load(&options.models) {
        Ok(state) => state,
        Err(e) => {
            error!("Error loading models, refusing to start: {:?}", e);
            return Err(e).context("Failed to load models");
        }
    };
    let state = web::Data::new(state);
    let upload_limit = UploadLimit(options.max_upload_bytes());

    info!("Listening on {}:{}", options.host, options.port);
    let mut server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .app_data(state.clone())
                .app_data(upload_limit)
                .configure(routes::configure)
        })
        .bind((options.host.as_str(), options.port))
        .with_context(|| format!("Failed to bind {}:{}", options.host, options.port))?;

    if let Some(workers) = options.workers {
        server = server.workers(workers);
    }

    server.run().await?;

    Ok(())
}
