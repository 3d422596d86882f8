// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Function HTTP server built on axum.
//!
//! Sets up routes and the cross-origin header layers.

use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use voteros_config::model::FunctionsConfig;
use voteros_core::VoterosError;

use crate::handlers;

/// Path the hosted function is published under.
pub const GENERATE_MESSAGES_PATH: &str = "/functions/v1/generate-messages";

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Builds the function router.
///
/// Every response, errors and preflights included, carries permissive
/// cross-origin headers.
pub fn router() -> Router {
    let generate = post(handlers::generate_messages).options(handlers::preflight);

    Router::new()
        .route(GENERATE_MESSAGES_PATH, generate.clone())
        .route("/", generate)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}

/// Binds to the configured host:port and serves until `cancel` fires.
pub async fn start_server(
    config: &FunctionsConfig,
    cancel: CancellationToken,
) -> Result<(), VoterosError> {
    let listener = bind(config).await?;
    serve(listener, cancel).await
}

/// Binds the configured host:port.
pub async fn bind(config: &FunctionsConfig) -> Result<TcpListener, VoterosError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| VoterosError::Config(format!("failed to bind functions server to {addr}: {e}")))
}

/// Serves the router on an already bound listener.
pub async fn serve(listener: TcpListener, cancel: CancellationToken) -> Result<(), VoterosError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("functions server listening on {addr}");
    }

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| VoterosError::Internal(format!("functions server error: {e}")))?;

    tracing::info!("functions server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_headers_parse_as_header_value() {
        assert!(HeaderValue::from_str(ALLOWED_HEADERS).is_ok());
    }

    #[tokio::test]
    async fn bind_failure_is_a_config_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = FunctionsConfig {
            host: "127.0.0.1".to_string(),
            port,
        };

        let err = start_server(&config, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VoterosError::Config(msg) if msg.contains("failed to bind")));
    }
}
