// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `voteros serve` command implementation.
//!
//! Hosts the suggestion function locally until SIGINT or SIGTERM.

use tracing::info;

use voteros_config::VoterosConfig;
use voteros_core::{PluginAdapter, VoterosError};
use voteros_functions::FunctionsServer;

use crate::shutdown;

pub async fn run_serve(config: VoterosConfig) -> Result<(), VoterosError> {
    info!(name = %config.app.name, "starting voteros serve");

    let server = FunctionsServer::new(config.functions.clone());
    server.start().await?;

    let cancel = shutdown::install_signal_handler();
    cancel.cancelled().await;

    server.shutdown().await?;
    info!("voteros serve shutdown complete");
    Ok(())
}
