// Node module
//
// This module contains the HTTP facade over the ledger engine

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;

use actix_web::{middleware, web, App, HttpServer};
use log::info;

use std::path::Path;

use crate::ledger::Ledger;

/// TCP port the HTTP facade listens on by default
pub const DEFAULT_HTTP_PORT: u16 = 4444;

/// Bootstraps the ledger from the data directory and serves the HTTP API
/// until the process is stopped
pub async fn run(data_dir: &Path, port: u16) -> anyhow::Result<()> {
    let ledger = web::Data::new(Ledger::from_disk(data_dir)?);

    info!("Listening on HTTP port: {}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(ledger.clone())
            .configure(configure_routes)
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await?;

    Ok(())
}
