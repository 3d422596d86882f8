// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `voteros watch` command implementation.
//!
//! Connects the reconciler to the configured backend and logs every cache
//! change until SIGINT or SIGTERM. With `--once` the caches are loaded a
//! single time and summarized.

use std::sync::Arc;

use tracing::{info, warn};

use voteros_backend::SupabaseGateway;
use voteros_config::VoterosConfig;
use voteros_core::{EntityKind, HealthStatus, PluginAdapter, VoterosError};
use voteros_sync::Reconciler;

use crate::shutdown;

pub async fn run_watch(config: VoterosConfig, once: bool) -> Result<(), VoterosError> {
    let gateway = Arc::new(SupabaseGateway::new(&config.backend, &config.realtime)?);
    let reconciler = Reconciler::new(
        gateway.clone(),
        config.sync.clone(),
        config.backend.communications_limit,
    );

    if once {
        reconciler.initialize_all().await?;
        for line in summary(&reconciler) {
            println!("{line}");
        }
        return gateway.shutdown().await;
    }

    info!(realtime = gateway.realtime_enabled(), "starting voteros watch");
    reconciler.start().await?;
    report(&reconciler).await;

    let cancel = shutdown::install_signal_handler();
    let mut templates = reconciler.templates().watch();
    let mut scheduled = reconciler.scheduled_messages().watch();
    let mut communications = reconciler.communications().watch();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Ok(()) = templates.changed() => {}
            Ok(()) = scheduled.changed() => {}
            Ok(()) = communications.changed() => {}
        }
        for line in summary(&reconciler) {
            info!("{line}");
        }
    }

    reconciler.stop_all().await;
    gateway.shutdown().await?;
    info!("voteros watch shutdown complete");
    Ok(())
}

async fn report(reconciler: &Reconciler) {
    for line in summary(reconciler) {
        info!("{line}");
    }
    match reconciler.health_check().await {
        Ok(HealthStatus::Healthy) => {}
        Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
            warn!(%reason, "sync degraded");
        }
        Err(e) => warn!(error = %e, "health check failed"),
    }
}

/// One line per entity kind: row count and where the rows came from.
fn summary(reconciler: &Reconciler) -> Vec<String> {
    EntityKind::ALL
        .into_iter()
        .map(|kind| {
            format!(
                "{kind}: {} rows ({})",
                reconciler.count(kind),
                reconciler.source(kind).as_str()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voteros_config::model::SyncConfig;
    use voteros_test_utils::{MockGateway, records};

    #[tokio::test]
    async fn summary_lists_every_kind() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_rows(
            EntityKind::Templates.table(),
            vec![records::template("t1", "One"), records::template("t2", "Two")],
        );
        gateway.fail_fetch(EntityKind::Communications.table());
        let reconciler = Reconciler::new(gateway, SyncConfig::default(), 20);
        reconciler.initialize_all().await.unwrap();

        let lines = summary(&reconciler);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().any(|l| l.ends_with("2 rows (live)")));
        assert!(lines.iter().any(|l| l.ends_with("0 rows (live)")));
        assert!(lines.iter().any(|l| l.ends_with("1 rows (placeholder)")));
    }
}
