//! In-memory implementations for tests and local runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use labelmirror_core::{Error, MirrorDocument, Node, Result};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::event::NodeEvent;
use crate::source::{EntitySource, EventStream};
use crate::store::DocumentStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-memory entity source.
///
/// Nodes are mutated through the helper methods, each of which records the
/// change and emits the matching watch event to every open subscription.
/// Fault-injection switches let tests exercise the loop's connection and
/// resubscribe handling.
pub struct InMemoryCluster {
    nodes: RwLock<HashMap<String, Node>>,
    events: RwLock<broadcast::Sender<NodeEvent>>,
    watch_count: AtomicUsize,
    fail_list: AtomicBool,
    fail_watch: AtomicBool,
}

impl InMemoryCluster {
    /// Create an empty cluster.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            nodes: RwLock::new(HashMap::new()),
            events: RwLock::new(events),
            watch_count: AtomicUsize::new(0),
            fail_list: AtomicBool::new(false),
            fail_watch: AtomicBool::new(false),
        }
    }

    /// Insert or replace a node and emit an `Added` event.
    pub async fn add_node(&self, node: Node) {
        self.nodes
            .write()
            .await
            .insert(node.name.clone(), node.clone());
        self.emit(NodeEvent::Added(node)).await;
    }

    /// Replace a node's attributes and emit a `Modified` event.
    pub async fn modify_node(&self, node: Node) {
        self.nodes
            .write()
            .await
            .insert(node.name.clone(), node.clone());
        self.emit(NodeEvent::Modified(node)).await;
    }

    /// Remove a node and emit a `Deleted` event carrying its last labels.
    pub async fn remove_node(&self, name: &str) {
        let removed = self.nodes.write().await.remove(name);
        if let Some(node) = removed {
            self.emit(NodeEvent::Deleted(node)).await;
        }
    }

    /// Emit a raw event to every open subscription.
    pub async fn emit(&self, event: NodeEvent) {
        debug!(node = ?event.node_name(), "Emitting event");
        let _ = self.events.read().await.send(event);
    }

    /// Close every open subscription. Later `watch` calls get a fresh
    /// stream, so this simulates a server-side watch reset.
    pub async fn interrupt(&self) {
        debug!("Interrupting watch streams");
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        *self.events.write().await = events;
    }

    /// Number of receivers on the current event channel.
    pub async fn subscriber_count(&self) -> usize {
        self.events.read().await.receiver_count()
    }

    /// Number of `watch` calls that returned a subscription.
    pub fn watch_count(&self) -> usize {
        self.watch_count.load(Ordering::Relaxed)
    }

    /// Make `list` fail with a connection fault.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::Relaxed);
    }

    /// Make `watch` fail with a connection fault.
    pub fn fail_watch(&self, fail: bool) {
        self.fail_watch.store(fail, Ordering::Relaxed);
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntitySource for InMemoryCluster {
    async fn list(&self) -> Result<Vec<Node>> {
        if self.fail_list.load(Ordering::Relaxed) {
            return Err(Error::connection("list nodes", "injected list failure"));
        }
        let nodes = self.nodes.read().await;
        let mut snapshot: Vec<Node> = nodes.values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(snapshot)
    }

    async fn watch(&self) -> Result<EventStream> {
        if self.fail_watch.load(Ordering::Relaxed) {
            return Err(Error::connection("watch nodes", "injected watch failure"));
        }
        let receiver = self.events.read().await.subscribe();
        self.watch_count.fetch_add(1, Ordering::Relaxed);
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(event) => Some((event, receiver)),
                Err(broadcast::error::RecvError::Closed) => None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => Some((
                    NodeEvent::error(format!("event stream lagged by {skipped}")),
                    receiver,
                )),
            }
        });
        Ok(stream.boxed())
    }
}

/// In-memory document store.
///
/// Records every successful `apply` so tests can assert persistence
/// behavior, and supports budgeted apply failures for retry tests.
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, MirrorDocument>>,
    apply_count: AtomicUsize,
    fail_applies: AtomicUsize,
    fail_get: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            apply_count: AtomicUsize::new(0),
            fail_applies: AtomicUsize::new(0),
            fail_get: AtomicBool::new(false),
        }
    }

    /// Seed a document without going through `create`.
    pub async fn insert(&self, name: &str, data: BTreeMap<String, String>) {
        self.documents
            .write()
            .await
            .insert(name.to_string(), MirrorDocument::new(data));
    }

    /// Read back a stored document.
    pub async fn document(&self, name: &str) -> Option<MirrorDocument> {
        self.documents.read().await.get(name).cloned()
    }

    /// Number of `apply` calls that persisted data.
    pub fn apply_count(&self) -> usize {
        self.apply_count.load(Ordering::Relaxed)
    }

    /// Make the next `count` apply calls fail with a connection fault.
    pub fn fail_next_applies(&self, count: usize) {
        self.fail_applies.store(count, Ordering::Relaxed);
    }

    /// Make `get` fail with a connection fault.
    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::Relaxed);
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume one unit from a failure budget, if any remains.
fn take_budgeted_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, name: &str) -> Result<MirrorDocument> {
        if self.fail_get.load(Ordering::Relaxed) {
            return Err(Error::connection("get document", "injected get failure"));
        }
        self.documents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(name))
    }

    async fn create(&self, name: &str, data: BTreeMap<String, String>) -> Result<MirrorDocument> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(name) {
            return Err(Error::already_exists(name));
        }
        let document = MirrorDocument::new(data);
        documents.insert(name.to_string(), document.clone());
        Ok(document)
    }

    async fn apply(&self, name: &str, data: BTreeMap<String, String>) -> Result<()> {
        if take_budgeted_failure(&self.fail_applies) {
            return Err(Error::connection("apply document", "injected apply failure"));
        }
        let mut documents = self.documents.write().await;
        documents
            .entry(name.to_string())
            .or_insert_with(MirrorDocument::default)
            .data = data;
        self.apply_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
