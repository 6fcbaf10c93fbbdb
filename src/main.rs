use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use std::io;

use tweet_api::config::AppConfig;
use tweet_api::{build_state, handlers};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting tweet API...");
    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let state = build_state(&config).await.map_err(|e| {
        error!("Failed to initialise store: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;
    let state = web::Data::new(state);

    info!("Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .workers(config.workers)
    .bind(config.bind_address())?
    .run()
    .await
}
