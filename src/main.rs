//! # labelmirror - entry point
//!
//! ## Startup Sequence
//!
//! 1. **Tracing** - env-filtered subscriber
//! 2. **Configuration** - CLI flags validated into a `LoopConfig`
//! 3. **Cluster client** - kubeconfig or in-cluster credentials
//! 4. **Reconciliation loop** - bootstrap snapshot, then watch until
//!    a termination signal arrives
//!
//! ## Shutdown
//!
//! SIGINT/SIGTERM flip the loop's stop handle; the loop drains the final
//! mapping into the ConfigMap and the process exits 0. Unrecoverable
//! bootstrap or connection faults exit nonzero.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use labelmirror_core::Error;
use labelmirror_kube::{KubeConfigMapStore, KubeNodeSource};
use labelmirror_reconciler::{
    ExistingDocPolicy, LoopConfig, LoopStopper, PersistPolicy, ReconciliationLoop, RunMode,
};

mod cli;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = loop_config(&cli)?;

    info!(
        namespace = %cli.namespace,
        configmap = %config.document,
        prefix = %config.label_prefix,
        "labelmirror starting"
    );

    let client = labelmirror_kube::connect()
        .await
        .context("Failed to connect to the cluster")?;
    let source = Arc::new(KubeNodeSource::new(client.clone()));
    let store = Arc::new(KubeConfigMapStore::new(client, &cli.namespace));

    let mut reconciler = ReconciliationLoop::new(source, store, config);
    let stopper = reconciler.stopper();
    tokio::spawn(wait_for_shutdown(stopper));

    reconciler
        .run()
        .await
        .context("Reconciler terminated with an unrecoverable fault")?;

    info!("labelmirror stopped cleanly");
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Validate CLI flags into a loop configuration.
///
/// Empty identifiers are configuration faults and fail before any
/// connection is attempted.
fn loop_config(cli: &Cli) -> Result<LoopConfig> {
    if cli.namespace.trim().is_empty() {
        return Err(Error::config("namespace must not be empty").into());
    }
    if cli.configmap_name.trim().is_empty() {
        return Err(Error::config("configmap name must not be empty").into());
    }
    if cli.label_prefix.trim().is_empty() {
        return Err(Error::config("label prefix must not be empty").into());
    }

    let mode = if cli.one_shot {
        RunMode::OneShot
    } else {
        RunMode::Watch
    };
    let persist = if cli.write_through {
        PersistPolicy::WriteThrough
    } else {
        PersistPolicy::OnDrain
    };
    let existing_doc = if cli.adopt_existing {
        ExistingDocPolicy::Adopt
    } else {
        ExistingDocPolicy::Replace
    };

    Ok(LoopConfig::new(&cli.configmap_name)
        .with_label_prefix(&cli.label_prefix)
        .with_mode(mode)
        .with_persist(persist)
        .with_existing_doc(existing_doc)
        .with_max_resubscribe_attempts(cli.max_resubscribe_attempts))
}

/// Wait for SIGINT or SIGTERM, then request a graceful drain.
async fn wait_for_shutdown(stopper: LoopStopper) {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, initiating graceful drain"),
            Err(err) => error!(error = %err, "Failed to listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = interrupt => {}
                    _ = terminate.recv() => {
                        info!("Received SIGTERM, initiating graceful drain");
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                interrupt.await;
            }
        }
    }

    #[cfg(not(unix))]
    interrupt.await;

    stopper.stop();
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn base_cli() -> Cli {
        Cli {
            namespace: "kube-system".to_string(),
            configmap_name: "node-labels".to_string(),
            label_prefix: "kubernetes.io".to_string(),
            one_shot: false,
            write_through: false,
            adopt_existing: false,
            max_resubscribe_attempts: 5,
        }
    }

    #[test]
    fn test_empty_namespace_is_a_config_fault() {
        let cli = Cli {
            namespace: "  ".to_string(),
            ..base_cli()
        };
        assert!(loop_config(&cli).is_err());
    }

    #[test]
    fn test_flags_map_onto_policies() {
        let cli = Cli {
            one_shot: true,
            write_through: true,
            adopt_existing: true,
            ..base_cli()
        };
        let config = loop_config(&cli).unwrap();
        assert_eq!(config.mode, RunMode::OneShot);
        assert_eq!(config.persist, PersistPolicy::WriteThrough);
        assert_eq!(config.existing_doc, ExistingDocPolicy::Adopt);
    }
}
