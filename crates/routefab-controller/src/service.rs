use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, Notify, Semaphore};

use routefab_core::{NodeKind, NodeName};
use routefab_crypto::{KeyPair, SealedPayload};
use routefab_net::{recv_message, send_message, NetError, RegisterRequest, RegisterResponse};
use routefab_routing::{
    RoutingTableStore, ShortestPathEngine, TableRow, TopologyError, TopologyGraph,
};

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::liveness::LivenessTracker;
use crate::snapshot::{self, Snapshot};

/// The controller: owns the topology and the published routing table for its
/// whole lifetime, admits and evicts nodes, and serves table rows to
/// registering agents.
pub struct Controller {
    config: ControllerConfig,
    keypair: KeyPair,
    engine: ShortestPathEngine,
    /// The single mutation path for the topology. Admission, eviction, and
    /// administrative link changes all serialize through this lock.
    graph: Mutex<TopologyGraph>,
    store: RoutingTableStore,
    liveness: LivenessTracker,
    /// Taken once by the eviction loop.
    expired_rx: StdMutex<Option<mpsc::UnboundedReceiver<NodeName>>>,
    /// Wakes the recompute loop after a topology mutation.
    recompute: Notify,
    /// Source of fresh ids for admitted nodes.
    next_id: AtomicU32,
    /// Bounds the number of concurrently served registration connections.
    workers: Arc<Semaphore>,
}

impl Controller {
    /// Create a controller from config: build the seed topology and, if a
    /// persisted snapshot exists, publish it immediately so restarts have no
    /// empty-table window. Snapshot load failures are logged, not fatal.
    pub fn new(config: ControllerConfig, keypair: KeyPair) -> Result<Arc<Self>, ControllerError> {
        let graph = config.topology.build()?;

        let store = match snapshot::load(&config.snapshot_path) {
            Ok(Some(snap)) => {
                tracing::info!(
                    computed_at = %snap.computed_at,
                    sources = snap.table.len(),
                    "loaded persisted routing table"
                );
                RoutingTableStore::with_table(snap.table)
            }
            Ok(None) => RoutingTableStore::new(),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot load failed, starting with an empty table");
                RoutingTableStore::new()
            }
        };

        let (liveness, expired_rx) = LivenessTracker::new(config.liveness_ttl());
        let next_id = AtomicU32::new(graph.max_id().map_or(1, |max| max + 1));
        let workers = Arc::new(Semaphore::new(config.max_connections));
        let engine = ShortestPathEngine::new(config.algorithm);

        Ok(Arc::new(Self {
            config,
            keypair,
            engine,
            graph: Mutex::new(graph),
            store,
            liveness,
            expired_rx: StdMutex::new(Some(expired_rx)),
            recompute: Notify::new(),
            next_id,
            workers,
        }))
    }

    /// The published routing table store.
    pub fn store(&self) -> &RoutingTableStore {
        &self.store
    }

    /// The liveness tracker.
    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// The X25519 key agents must seal their identity with.
    pub fn sealing_key(&self) -> [u8; 32] {
        routefab_crypto::sealing_key(&self.keypair)
    }

    /// Whether a node is currently in the topology.
    pub async fn contains_node(&self, name: &NodeName) -> bool {
        self.graph.lock().await.contains_name(name)
    }

    /// Apply an administrative topology change (link add/remove etc.) and
    /// wake the recompute loop.
    pub async fn mutate_topology<F>(&self, mutation: F) -> Result<(), ControllerError>
    where
        F: FnOnce(&mut TopologyGraph) -> Result<(), TopologyError>,
    {
        {
            let mut graph = self.graph.lock().await;
            mutation(&mut graph)?;
        }
        self.recompute.notify_one();
        Ok(())
    }

    /// Bind the configured listener and run until process termination.
    pub async fn run(self: Arc<Self>) -> Result<(), ControllerError> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(NetError::Io)?;
        self.run_with_listener(listener).await;
        Ok(())
    }

    /// Run against an already-bound listener (tests bind port 0 first).
    pub async fn run_with_listener(self: Arc<Self>, listener: TcpListener) {
        let recompute = Arc::clone(&self);
        tokio::spawn(async move { recompute.recompute_loop().await });

        let eviction = Arc::clone(&self);
        tokio::spawn(async move { eviction.eviction_loop().await });

        self.accept_loop(listener).await;
    }

    /// Accept loop: one bounded worker per connection, errors confined to
    /// the connection that raised them.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "controller listening");
        }
        loop {
            let permit = Arc::clone(&self.workers)
                .acquire_owned()
                .await
                .expect("worker semaphore closed");
            match listener.accept().await {
                Ok((mut stream, peer)) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = this.handle_connection(&mut stream).await {
                            tracing::warn!(%peer, error = %e, "registration connection failed");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    drop(permit);
                }
            }
        }
    }

    /// Serve one registration: unseal the identity, refresh its deadline,
    /// admit it if the topology does not know it yet, and answer with the
    /// node's full destination-map row.
    pub async fn handle_connection<S>(&self, stream: &mut S) -> Result<(), ControllerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let io_timeout = self.config.io_timeout();

        let request: RegisterRequest = recv_message(stream, io_timeout).await?;
        let sealed = SealedPayload::from_bytes(&request.identity)?;
        let plaintext = routefab_crypto::open(&sealed, &self.keypair)?;
        let name = String::from_utf8(plaintext)
            .map_err(|_| ControllerError::InvalidIdentity("identity is not UTF-8".into()))?;
        let name =
            NodeName::new(name).map_err(|e| ControllerError::InvalidIdentity(e.to_string()))?;

        self.liveness.refresh(name.clone());

        let known = self.graph.lock().await.contains_name(&name);
        if known {
            tracing::debug!(%name, "known node refreshed");
        } else {
            self.admit(name.clone()).await?;
        }

        let table = self.store.slice(&name).unwrap_or_else(TableRow::new);
        send_message(stream, &RegisterResponse { table }, io_timeout).await?;
        Ok(())
    }

    /// Add a previously unknown (or previously evicted) node back to the
    /// topology under a fresh id and wake the recompute loop.
    pub async fn admit(&self, name: NodeName) -> Result<(), ControllerError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let result = {
            let mut graph = self.graph.lock().await;
            graph.add_node(id, name.clone(), NodeKind::Host)
        };
        match result {
            Ok(()) => {
                tracing::info!(%name, id, "node admitted to topology");
                self.recompute.notify_one();
                Ok(())
            }
            // A concurrent registration admitted the same name first.
            Err(TopologyError::DuplicateName { .. }) => {
                tracing::debug!(%name, "admission lost a race, node already present");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an expired node. Idempotent: an expiry for a node already
    /// removed is a no-op.
    pub async fn evict(&self, name: &NodeName) {
        let removed = {
            let mut graph = self.graph.lock().await;
            graph.remove_node(name)
        };
        match removed {
            Ok(node) => {
                tracing::info!(%name, id = node.id, "node evicted from topology");
                self.recompute.notify_one();
            }
            Err(TopologyError::NodeNotFound { .. }) => {
                tracing::debug!(%name, "expiry for a node already removed");
            }
            Err(e) => tracing::warn!(%name, error = %e, "eviction failed"),
        }
    }

    /// Recompute all-pairs shortest paths and publish the result. On
    /// failure (negative cycle) the previously published snapshot stays
    /// authoritative. Persistence is best-effort and never fails the
    /// recompute.
    pub async fn recompute_now(&self) -> Result<(), ControllerError> {
        let table = {
            let graph = self.graph.lock().await;
            self.engine.all_pairs(&graph)?
        };
        let sources = table.len();
        let persisted = Snapshot::new(self.engine.algorithm(), table.clone());
        self.store.replace(table);

        if let Err(e) = snapshot::save(&self.config.snapshot_path, &persisted) {
            tracing::warn!(
                error = %e,
                path = %self.config.snapshot_path.display(),
                "snapshot persistence failed"
            );
        }
        tracing::info!(sources, algorithm = %self.engine.algorithm(), "routing table recomputed");
        Ok(())
    }

    /// Periodic recomputation plus immediate recomputation after any
    /// liveness-driven or administrative mutation.
    async fn recompute_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.recompute_period());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.recompute.notified() => {}
            }
            if let Err(e) = self.recompute_now().await {
                tracing::warn!(
                    error = %e,
                    "recomputation failed, previous snapshot remains authoritative"
                );
            }
        }
    }

    /// Consume liveness expiries and turn them into evictions.
    async fn eviction_loop(self: Arc<Self>) {
        let mut expired_rx = self
            .expired_rx
            .lock()
            .unwrap()
            .take()
            .expect("eviction loop started twice");
        while let Some(name) = expired_rx.recv().await {
            tracing::info!(%name, "liveness TTL expired");
            self.evict(&name).await;
        }
    }
}
