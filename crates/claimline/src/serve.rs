// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `claimline serve`, `claimline sweep` and `claimline stats` implementations.
//!
//! `serve` wires storage, the queue engine, the notification worker, the
//! periodic sweeper and the HTTP gateway together, then runs until Ctrl-C.

use std::path::Path;
use std::sync::Arc;

use claimline_bus::{LogNotifier, NotificationTrigger};
use claimline_config::ClaimlineConfig;
use claimline_core::{ClaimlineError, ItemId};
use claimline_queue::{QueueEngine, QueueQueries, QueueSweeper};
use claimline_storage::{ClaimStore, Database};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collaborators::OpenCatalog;

#[cfg(feature = "prometheus")]
use claimline_prometheus::PrometheusAdapter;

#[cfg(feature = "gateway")]
use claimline_gateway::{GatewayState, HealthState, ServerConfig};

/// Engine and query surface over one opened database.
struct Runtime {
    db: Database,
    engine: Arc<QueueEngine>,
    queries: Arc<QueueQueries>,
}

async fn open_database(config: &ClaimlineConfig) -> Result<Database, ClaimlineError> {
    if let Some(parent) = Path::new(&config.storage.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClaimlineError::Storage { source: Box::new(e) })?;
        }
    }
    Database::open_with_config(&config.storage).await
}

async fn build_runtime(
    config: &ClaimlineConfig,
    trigger: Option<NotificationTrigger>,
) -> Result<Runtime, ClaimlineError> {
    let db = open_database(config).await?;
    let store = ClaimStore::new(db.clone(), config.queue.lock_timeout());
    let engine = Arc::new(QueueEngine::new(
        store.clone(),
        Arc::new(OpenCatalog),
        trigger,
    ));
    let queries = Arc::new(QueueQueries::new(
        store,
        None,
        config.queue.default_claims_limit,
        config.queue.max_claims_limit,
    ));
    Ok(Runtime {
        db,
        engine,
        queries,
    })
}

fn sweeper_for(
    config: &ClaimlineConfig,
    runtime: &Runtime,
    trigger: Option<NotificationTrigger>,
) -> QueueSweeper {
    QueueSweeper::new(
        runtime.engine.clone(),
        runtime.queries.clone(),
        trigger,
        config.sweep.interval(),
        config.queue.stale_head_after(),
        config.queue.pending_expiry(),
    )
}

/// Runs the `claimline serve` command.
pub async fn run_serve(config: ClaimlineConfig) -> Result<(), ClaimlineError> {
    init_tracing(&config.log.level);

    info!("starting claimline serve");

    #[cfg(feature = "prometheus")]
    let prometheus = if config.metrics.enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => Some(Arc::new(adapter)),
            Err(e) => {
                warn!(error = %e, "metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let (trigger, notifier_worker) = NotificationTrigger::spawn(
        Arc::new(LogNotifier),
        config.queue.notification_buffer,
        cancel.child_token(),
    );

    let runtime = build_runtime(&config, Some(trigger.clone())).await?;
    info!(path = %config.storage.database_path, "claim store ready");

    let sweeper = if config.sweep.enabled {
        let sweeper = sweeper_for(&config, &runtime, Some(trigger.clone()));
        Some(tokio::spawn(sweeper.run(cancel.child_token())))
    } else {
        None
    };

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });

    #[cfg(feature = "gateway")]
    let served = if config.gateway.enabled {
        let health = HealthState {
            start_time: std::time::Instant::now(),
            #[cfg(feature = "prometheus")]
            prometheus_render: prometheus.clone().map(|adapter| {
                Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>
            }),
            #[cfg(not(feature = "prometheus"))]
            prometheus_render: None,
        };
        let state = GatewayState {
            engine: runtime.engine.clone(),
            queries: runtime.queries.clone(),
            health,
        };
        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let result = claimline_gateway::start_server(&server_config, state, cancel.clone()).await;
        // A bind failure must not leave the rest of the service running.
        cancel.cancel();
        result
    } else {
        cancel.cancelled().await;
        Ok(())
    };

    #[cfg(not(feature = "gateway"))]
    let served: Result<(), ClaimlineError> = {
        cancel.cancelled().await;
        Ok(())
    };

    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "sweeper task ended abnormally");
        }
    }

    // Dropping the last trigger handles lets the worker drain and exit.
    drop(trigger);
    drop(runtime.engine);
    if let Err(e) = notifier_worker.await {
        warn!(error = %e, "notification worker ended abnormally");
    }

    runtime.db.close().await?;
    info!("claimline stopped");
    served
}

/// Runs the `claimline sweep` command: one pass, then exit.
pub async fn run_sweep(config: ClaimlineConfig) -> Result<(), ClaimlineError> {
    init_tracing(&config.log.level);

    let cancel = CancellationToken::new();
    let (trigger, notifier_worker) = NotificationTrigger::spawn(
        Arc::new(LogNotifier),
        config.queue.notification_buffer,
        cancel.child_token(),
    );
    let runtime = build_runtime(&config, Some(trigger.clone())).await?;
    let sweeper = sweeper_for(&config, &runtime, Some(trigger));

    let report = sweeper.run_once(&cancel).await;

    drop(sweeper);
    drop(runtime.engine);
    drop(runtime.queries);
    cancel.cancel();
    if let Err(e) = notifier_worker.await {
        warn!(error = %e, "notification worker ended abnormally");
    }
    runtime.db.close().await?;

    let report = report?;
    println!(
        "expired {} claim(s), {} left for the next pass, sent {} head reminder(s)",
        report.expired, report.failed, report.reminders
    );
    Ok(())
}

/// Runs the `claimline stats ITEM` command.
pub async fn run_stats(config: ClaimlineConfig, item: String) -> Result<(), ClaimlineError> {
    init_tracing(&config.log.level);

    let runtime = build_runtime(&config, None).await?;
    let stats = runtime
        .queries
        .get_queue_statistics(&ItemId::from(item))
        .await;
    drop(runtime.engine);
    drop(runtime.queries);
    runtime.db.close().await?;

    let json = serde_json::to_string_pretty(&stats?)
        .map_err(|e| ClaimlineError::Internal(format!("failed to render statistics: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("claimline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
