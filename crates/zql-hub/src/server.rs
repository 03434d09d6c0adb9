//! # HTTP Server
//!
//! `/convert` answers every method with a JSON envelope and HTTP 200; all
//! other paths are served from the static root.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::IntoResponse,
    routing::any,
    Router,
};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, ServerConfig};
use crate::gateway::{Gateway, QueryCompiler};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn router<C: QueryCompiler>(gateway: Arc<Gateway<C>>, server: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/convert", any(convert::<C>))
        .fallback_service(ServeDir::new(&server.static_root))
        .with_state(gateway)
        .layer(TraceLayer::new_for_http());

    if server.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn convert<C: QueryCompiler>(
    State(gateway): State<Arc<Gateway<C>>>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> impl IntoResponse {
    let pairs = match pairs {
        Ok(Query(pairs)) => pairs,
        Err(e) => {
            tracing::debug!("Unreadable query string, treating as empty: {}", e);
            Vec::new()
        }
    };

    let params = first_values(pairs);
    let body = gateway.respond(&params);
    ([(header::CONTENT_TYPE, "application/json")], body)
}

/// Collapse repeated keys, keeping the first occurrence of each.
fn first_values(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    let mut params = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        params.entry(key).or_insert(value);
    }
    params
}

/// Bind and serve until the process is stopped.
pub async fn serve<C: QueryCompiler>(
    gateway: Arc<Gateway<C>>,
    server: &ServerConfig,
) -> Result<(), ServerError> {
    let addr = server.socket_addr()?;
    let app = router(gateway, server);

    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  ZQL gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Convert:  http://{}/convert?type=<target>&zql=<query>", addr);
    tracing::info!("  Static:   {:?}", server.static_root);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
