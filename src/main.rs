// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use anyhow::{Context, Result};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use controller_manager::cache::ScopeRouter;
use controller_manager::config::Config;
use controller_manager::controllers::{AuditController, Manager};
use controller_manager::kubernetes::{ClusterApi, KubeClusterApi};
use controller_manager::types::schema::enmasse;
use controller_manager::types::Schema;
use controller_manager::upgrade::{default_migrations, UpgradeGate};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("Starting EnMasse controller manager version {}", VERSION);

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Watching on namespace '{}' (empty means all namespaces)",
        config.namespace
    );

    let mut schema = Schema::new();
    enmasse::add_to_schema(&mut schema).context("Failed to register EnMasse schema")?;
    let policy = config
        .scope_policy(&schema)
        .context("Failed to build scope policy")?;
    for kind in policy.cluster_wide() {
        info!("Watching {} cluster-wide", kind);
    }

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let cluster: Arc<dyn ClusterApi> = Arc::new(KubeClusterApi::new(client));

    let router = Arc::new(ScopeRouter::new(&schema, &policy, cluster.clone()));

    UpgradeGate::new(cluster, schema, &config.operator_namespace, VERSION)
        .with_migrations(default_migrations())
        .check_upgrade()
        .await
        .context("Failed to upgrade")?;

    info!("Registering components...");
    let mut manager = Manager::new(router.clone(), config.drain_timeout);
    manager
        .register(Arc::new(AuditController::new(router.kinds().cloned().collect())))
        .context("Failed to register controller")?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    info!("Starting the operator");
    manager.run(cancel).await.context("Manager exited non-zero")?;

    info!("Operator stopped");
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Received shutdown signal");
    token.cancel();
}
