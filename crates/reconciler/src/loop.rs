//! The phased reconciliation loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use labelmirror_cluster::{DocumentStore, EntitySource, EventStream, NodeEvent};
use labelmirror_core::Node;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::projector::LabelProjector;
use crate::state::MirrorState;
use crate::types::{ExistingDocPolicy, LoopConfig, PersistPolicy, Phase, RunMode};

/// Stateful engine folding a node snapshot plus watch events into the
/// mirror document.
///
/// A single task drives the whole state machine; the watch stream and the
/// stop signal are multiplexed into one suspension point, so the mapping
/// needs no locking.
pub struct ReconciliationLoop {
    /// Where nodes come from.
    source: Arc<dyn EntitySource>,
    /// Where the mirror document lives.
    store: Arc<dyn DocumentStore>,
    /// Projection for the recognized label namespace.
    projector: LabelProjector,
    /// Loop configuration.
    config: LoopConfig,
    /// The in-memory mapping.
    state: MirrorState,
    /// Current lifecycle phase.
    phase: Phase,
    /// Stop signal receiver.
    stop_rx: watch::Receiver<bool>,
    /// Stop signal sender (for external control).
    stop_tx: watch::Sender<bool>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop.
    pub fn new(
        source: Arc<dyn EntitySource>,
        store: Arc<dyn DocumentStore>,
        config: LoopConfig,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let projector = LabelProjector::new(config.label_prefix.clone());
        Self {
            source,
            store,
            projector,
            config,
            state: MirrorState::new(),
            phase: Phase::Bootstrapping,
            stop_rx,
            stop_tx,
        }
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The currently visible mapping.
    pub fn data(&self) -> BTreeMap<String, String> {
        self.state.data()
    }

    /// Get the configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run until drained.
    ///
    /// Returns `Ok(())` after a clean drain; any error is unrecoverable
    /// and the process should exit nonzero.
    pub async fn run(&mut self) -> Result<()> {
        self.bootstrap().await?;
        if self.config.mode == RunMode::Watch {
            self.sync().await?;
        }
        self.drain().await
    }

    /// Bootstrapping: apply the bulk snapshot, then settle the document.
    async fn bootstrap(&mut self) -> Result<()> {
        self.phase = Phase::Bootstrapping;
        info!(
            document = %self.config.document,
            prefix = %self.projector.prefix(),
            "Bootstrapping from cluster snapshot"
        );

        let nodes = self
            .source
            .list()
            .await
            .map_err(|fault| Error::bootstrap("list entities", fault.to_string()))?;
        for node in &nodes {
            let projected = self.projector.project(&node.labels);
            self.state.upsert(&node.name, projected);
        }
        info!(
            nodes = nodes.len(),
            keys = self.state.len(),
            "Applied bootstrap snapshot"
        );

        self.settle_document().await
    }

    /// Read-or-create the mirror document.
    ///
    /// Two passes cover the bootstrap race: a concurrent writer can create
    /// the document between our not-found read and our create.
    async fn settle_document(&mut self) -> Result<()> {
        for attempt in 0..2 {
            match self.store.get(&self.config.document).await {
                Ok(existing) => return self.adopt_or_replace(existing.data).await,
                Err(fault) if fault.is_not_found() => {
                    match self
                        .store
                        .create(&self.config.document, self.state.data())
                        .await
                    {
                        Ok(_) => {
                            info!(
                                document = %self.config.document,
                                keys = self.state.len(),
                                "Created mirror document"
                            );
                            return Ok(());
                        }
                        Err(fault) if fault.is_already_exists() && attempt == 0 => {
                            warn!(
                                document = %self.config.document,
                                "Document appeared concurrently; re-reading"
                            );
                        }
                        Err(fault) => {
                            return Err(Error::bootstrap("create document", fault.to_string()));
                        }
                    }
                }
                Err(fault) => return Err(Error::bootstrap("read document", fault.to_string())),
            }
        }
        Err(Error::bootstrap(
            "read document",
            "document flapped between absent and present",
        ))
    }

    /// Apply the existing-document policy from bootstrap.
    async fn adopt_or_replace(&mut self, stored: BTreeMap<String, String>) -> Result<()> {
        match self.config.existing_doc {
            ExistingDocPolicy::Replace => {
                debug!(
                    document = %self.config.document,
                    "Document exists; replacing with fresh snapshot"
                );
                self.store
                    .apply(&self.config.document, self.state.data())
                    .await
                    .map_err(|fault| Error::bootstrap("apply document", fault.to_string()))
            }
            ExistingDocPolicy::Adopt => {
                info!(
                    document = %self.config.document,
                    keys = stored.len(),
                    "Adopting stored document as starting state"
                );
                self.state.seed_baseline(stored);
                Ok(())
            }
        }
    }

    /// Syncing: fold watch events until the stop signal arrives.
    async fn sync(&mut self) -> Result<()> {
        self.phase = Phase::Syncing;
        info!("Entering sync phase");

        let mut stream = match self.subscribe().await? {
            Some(stream) => stream,
            None => return Ok(()),
        };

        loop {
            tokio::select! {
                maybe_event = stream.next() => match maybe_event {
                    Some(NodeEvent::Added(node)) | Some(NodeEvent::Modified(node)) => {
                        self.apply_upsert(node).await;
                    }
                    Some(NodeEvent::Deleted(node)) => {
                        self.apply_delete(node).await;
                    }
                    Some(NodeEvent::Error { reason }) => {
                        warn!(reason = %reason, "Watch stream reported an error; re-subscribing");
                        match self.subscribe().await? {
                            Some(next) => stream = next,
                            None => return Ok(()),
                        }
                    }
                    None => {
                        warn!("Watch stream closed; re-subscribing");
                        match self.subscribe().await? {
                            Some(next) => stream = next,
                            None => return Ok(()),
                        }
                    }
                },
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        info!("Stop requested; leaving sync phase");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Open the watch subscription, retrying with exponential backoff.
    ///
    /// Returns `Ok(None)` if a stop request arrives while retrying; the
    /// caller proceeds to draining.
    async fn subscribe(&mut self) -> Result<Option<EventStream>> {
        let mut backoff = self.config.initial_backoff;
        let mut last_reason = String::from("watch subscription unavailable");

        for attempt in 1..=self.config.max_resubscribe_attempts {
            if *self.stop_rx.borrow() {
                return Ok(None);
            }
            match self.source.watch().await {
                Ok(stream) => {
                    if attempt > 1 {
                        info!(attempt, "Watch subscription re-established");
                    }
                    return Ok(Some(stream));
                }
                Err(fault) => {
                    last_reason = fault.to_string();
                    warn!(
                        attempt,
                        max = self.config.max_resubscribe_attempts,
                        error = %fault,
                        "Failed to open watch subscription"
                    );
                    if attempt < self.config.max_resubscribe_attempts {
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            changed = self.stop_rx.changed() => {
                                if changed.is_err() || *self.stop_rx.borrow() {
                                    return Ok(None);
                                }
                            }
                        }
                        backoff = backoff.saturating_mul(2).min(self.config.max_backoff);
                    }
                }
            }
        }

        error!(
            attempts = self.config.max_resubscribe_attempts,
            "Exhausted watch re-subscribe budget"
        );
        Err(Error::resubscribe_exhausted(
            self.config.max_resubscribe_attempts,
            last_reason,
        ))
    }

    /// Fold an added or modified node into the mapping.
    async fn apply_upsert(&mut self, node: Node) {
        let projected = self.projector.project(&node.labels);
        debug!(node = %node.name, keys = projected.len(), "Applying node upsert");
        self.state.upsert(&node.name, projected);
        self.write_through().await;
    }

    /// Fold a node deletion into the mapping.
    async fn apply_delete(&mut self, node: Node) {
        let removal = self.projector.removal_keys(&node.labels);
        debug!(node = %node.name, keys = removal.len(), "Applying node deletion");
        self.state.remove_node(&node.name, &removal);
        self.write_through().await;
    }

    /// Push the mapping to the store under the write-through policy.
    ///
    /// A failure here is logged and retried implicitly at the next
    /// mutation; the drain flush still carries the bounded-retry
    /// guarantee.
    async fn write_through(&mut self) {
        if self.config.persist != PersistPolicy::WriteThrough {
            return;
        }
        if let Err(fault) = self
            .store
            .apply(&self.config.document, self.state.data())
            .await
        {
            warn!(
                document = %self.config.document,
                error = %fault,
                "Write-through persist failed"
            );
        }
    }

    /// Draining: persist the final mapping with bounded retries.
    async fn drain(&mut self) -> Result<()> {
        self.phase = Phase::Draining;
        info!(
            document = %self.config.document,
            keys = self.state.len(),
            "Draining: persisting final state"
        );

        let mut backoff = self.config.initial_backoff;
        let mut last_reason = String::from("no persist attempts permitted");

        for attempt in 1..=self.config.max_persist_attempts {
            match self
                .store
                .apply(&self.config.document, self.state.data())
                .await
            {
                Ok(()) => {
                    self.phase = Phase::Stopped;
                    info!("Drained; reconciler stopped");
                    return Ok(());
                }
                Err(fault) => {
                    last_reason = fault.to_string();
                    warn!(
                        attempt,
                        max = self.config.max_persist_attempts,
                        error = %fault,
                        "Drain persist failed"
                    );
                    if attempt < self.config.max_persist_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = backoff.saturating_mul(2).min(self.config.max_backoff);
                    }
                }
            }
        }

        error!(
            attempts = self.config.max_persist_attempts,
            "Exhausted drain persist budget; final state may be lost"
        );
        self.phase = Phase::Stopped;
        Err(Error::persist_exhausted(
            self.config.max_persist_attempts,
            last_reason,
        ))
    }
}

/// Handle to request a graceful stop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Request a stop; the loop drains and exits its run.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use labelmirror_cluster::{InMemoryCluster, InMemoryDocumentStore};

    fn setup() -> (Arc<InMemoryCluster>, Arc<InMemoryDocumentStore>) {
        (
            Arc::new(InMemoryCluster::new()),
            Arc::new(InMemoryDocumentStore::new()),
        )
    }

    #[tokio::test]
    async fn test_one_shot_creates_document_from_snapshot() {
        let (cluster, store) = setup();
        cluster
            .add_node(
                Node::new("n1")
                    .with_label("kubernetes.io/zone", "a")
                    .with_label("custom/x", "y"),
            )
            .await;

        let config = LoopConfig::new("node-labels").with_mode(RunMode::OneShot);
        let mut reconciler = ReconciliationLoop::new(cluster, store.clone(), config);

        assert!(reconciler.run().await.is_ok());
        assert_eq!(reconciler.phase(), Phase::Stopped);

        let document = store.document("node-labels").await.unwrap();
        assert_eq!(
            document.data,
            BTreeMap::from([("zone".to_string(), "a".to_string())])
        );
    }

    #[tokio::test]
    async fn test_bootstrap_list_failure_is_fatal() {
        let (cluster, store) = setup();
        cluster.fail_list(true);

        let config = LoopConfig::new("node-labels").with_mode(RunMode::OneShot);
        let mut reconciler = ReconciliationLoop::new(cluster, store, config);

        let result = reconciler.run().await;
        assert!(matches!(result, Err(Error::Bootstrap { .. })));
    }

    #[tokio::test]
    async fn test_stopper_is_cloneable_and_idempotent() {
        let (cluster, store) = setup();
        let reconciler =
            ReconciliationLoop::new(cluster, store, LoopConfig::new("node-labels"));

        let stopper = reconciler.stopper();
        let clone = stopper.clone();
        stopper.stop();
        clone.stop();
        assert!(*reconciler.stop_rx.borrow());
    }
}
