#[macro_use]
extern crate tracing;

use std::sync::Arc;

use axum::{Router, extract::FromRef};

use axum_extra::middleware::option_layer;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

mod api;
mod config;
mod error;
mod lookup;
mod middleware;
mod trace;
mod util;

pub use config::CONFIG;
pub use error::Error;

use lookup::{HistoryStore, HttpFetcher, LookupService};

#[tokio::main]
async fn main() {
    launch_info();
    dotenv().ok();
    trace::init(&CONFIG.log);

    let lookup = match init_lookup() {
        Ok(lookup) => Arc::new(lookup),
        Err(err) => {
            error!("failed to start lookup service: {}", err);
            return;
        }
    };

    let cors = if CONFIG.debug {
        Some(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods(Any)
                .allow_origin(Any),
        )
    } else {
        None
    };
    let cors = option_layer(cors);
    let layer = ServiceBuilder::new()
        .layer(middleware::TraceLayer)
        .layer(cors);
    let state = AppState {
        lookup: Arc::clone(&lookup),
    };
    let app = Router::new()
        .nest("/api", api::routes())
        .fallback_service(ServeDir::new(&CONFIG.web_dir))
        .layer(layer)
        .with_state(state);

    let listener = match TcpListener::bind(CONFIG.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {}", CONFIG.addr, err);
            return;
        }
    };
    match listener.local_addr() {
        Ok(addr) => info!("listening on http://{}", addr),
        Err(err) => warn!("listening on unknown address: {}", err),
    }
    info!("history file: {}", lookup.history().path().display());

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {}", err);
    }

    lookup.shutdown().await;
    info!("lookup workers stopped");
}

#[derive(FromRef, Clone)]
pub struct AppState {
    pub lookup: Arc<LookupService>,
}

fn init_lookup() -> Result<LookupService, Error> {
    let fetcher = HttpFetcher::new(CONFIG.lookup.clone())?;
    let history = HistoryStore::new(&CONFIG.history_file);
    Ok(LookupService::new(
        fetcher,
        history,
        CONFIG.lookup.workers,
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn launch_info() {
    println!();
    println!(
        "=================== Starting IP Lookup {} ===================",
        env!("CARGO_PKG_VERSION")
    );
    println!();
}
