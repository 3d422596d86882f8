// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local host for the message suggestion function.
//!
//! The function answers `{prompt, language, messageType}` with one of two
//! fixed suggestion sets. It sits outside the sync core and shares nothing
//! with it beyond configuration and the error type.

pub mod handlers;
pub mod server;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use voteros_config::model::FunctionsConfig;
use voteros_core::{AdapterType, HealthStatus, PluginAdapter, VoterosError};

pub use server::{GENERATE_MESSAGES_PATH, router, start_server};

/// Runs the function server as a background task.
pub struct FunctionsServer {
    config: FunctionsConfig,
    cancel: CancellationToken,
    server_handle: Mutex<Option<JoinHandle<()>>>,
}

impl FunctionsServer {
    pub fn new(config: FunctionsConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            server_handle: Mutex::new(None),
        }
    }

    /// Binds the listener and spawns the server. Calling it again while
    /// running is a no-op.
    pub async fn start(&self) -> Result<(), VoterosError> {
        let mut handle = self.server_handle.lock().await;
        if handle.is_some() {
            return Ok(());
        }

        let listener = server::bind(&self.config).await?;
        let cancel = self.cancel.child_token();
        *handle = Some(tokio::spawn(async move {
            if let Err(e) = server::serve(listener, cancel).await {
                tracing::error!("functions server error: {e}");
            }
        }));
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FunctionsServer {
    fn name(&self) -> &str {
        "functions"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Function
    }

    async fn health_check(&self) -> Result<HealthStatus, VoterosError> {
        let handle = self.server_handle.lock().await;
        match handle.as_ref() {
            None => Ok(HealthStatus::Unhealthy("server not started".to_string())),
            Some(h) if h.is_finished() => {
                Ok(HealthStatus::Unhealthy("server stopped".to_string()))
            }
            Some(_) => Ok(HealthStatus::Healthy),
        }
    }

    async fn shutdown(&self) -> Result<(), VoterosError> {
        self.cancel.cancel();
        let handle = self.server_handle.lock().await.take();
        if let Some(h) = handle {
            h.await
                .map_err(|e| VoterosError::Internal(format!("functions server task failed: {e}")))?;
        }
        Ok(())
    }
}
