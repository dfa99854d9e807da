use std::sync::{Arc, Mutex as StdMutex, RwLock};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use routefab_core::{split_chunks, Envelope, EnvelopeKind, NodeName};
use routefab_crypto::{KeyPair, SealedPayload};
use routefab_net::{connect, recv_message, send_message, NetError, RegisterRequest, RegisterResponse};
use routefab_routing::{RoutingError, TableRow};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::phase::AgentPhase;
use crate::reassembly::ChunkAssembler;

/// A message that reached its destination, decrypted and (for bulk
/// transfers) reassembled, handed to the local consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub origin: NodeName,
    pub payload: Vec<u8>,
}

/// One node of the fabric.
///
/// The agent registers with the controller at a fixed interval (registration
/// doubles as the liveness heartbeat), caches the routing row the controller
/// returns, and serves inbound envelopes: deliver locally when this node is
/// the destination, otherwise push one hop along the cached path. Each hop is
/// a fresh connection with a deadline; a failed envelope is logged and
/// dropped, never reported upstream.
pub struct NodeAgent {
    config: AgentConfig,
    keypair: KeyPair,
    phase: RwLock<AgentPhase>,
    /// Cached routing row, swapped wholesale on every registration.
    row: RwLock<Arc<TableRow>>,
    assembler: StdMutex<ChunkAssembler>,
    delivered_tx: mpsc::UnboundedSender<Delivery>,
}

impl NodeAgent {
    /// Create an agent in the `Unregistered` phase. Local deliveries arrive
    /// on the returned receiver.
    pub fn new(
        config: AgentConfig,
        keypair: KeyPair,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Delivery>) {
        let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                config,
                keypair,
                phase: RwLock::new(AgentPhase::Unregistered),
                row: RwLock::new(Arc::new(TableRow::new())),
                assembler: StdMutex::new(ChunkAssembler::new()),
                delivered_tx,
            }),
            delivered_rx,
        )
    }

    pub fn name(&self) -> &NodeName {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn phase(&self) -> AgentPhase {
        *self.phase.read().unwrap()
    }

    /// The currently cached routing row.
    pub fn row(&self) -> Arc<TableRow> {
        self.row.read().unwrap().clone()
    }

    /// The key peers seal payloads for this node with.
    pub fn sealing_key(&self) -> [u8; 32] {
        routefab_crypto::sealing_key(&self.keypair)
    }

    fn cache_row(&self, row: TableRow) {
        *self.row.write().unwrap() = Arc::new(row);
    }

    fn advance(&self, next: AgentPhase) {
        let mut phase = self.phase.write().unwrap();
        if *phase == next {
            return;
        }
        if phase.can_transition(next) {
            tracing::info!(name = %self.config.name, from = %*phase, to = %next, "phase transition");
            *phase = next;
        } else {
            tracing::warn!(name = %self.config.name, from = %*phase, to = %next, "phase transition refused");
        }
    }

    /// Bind the envelope listener, register (retrying until the controller
    /// answers), then serve forever with the heartbeat running alongside.
    pub async fn run(self: Arc<Self>) -> Result<(), AgentError> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(NetError::Io)?;

        let mut interval = tokio::time::interval(self.config.register_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match self.register().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "initial registration failed, retrying")
                }
            }
        }

        let heartbeat = Arc::clone(&self);
        tokio::spawn(async move { heartbeat.register_loop().await });

        self.serve(listener).await;
        Ok(())
    }

    /// One registration round trip against the configured controller.
    pub async fn register(&self) -> Result<(), AgentError> {
        let mut stream = connect(&self.config.controller_addr, self.config.io_timeout()).await?;
        self.register_with(&mut stream).await
    }

    /// Registration over an already open stream: send the sealed identity,
    /// cache the routing row the controller returns.
    pub async fn register_with<S>(&self, stream: &mut S) -> Result<(), AgentError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let controller_key = self.config.controller_sealing_key()?;
        let sealed = routefab_crypto::seal(self.config.name.as_str().as_bytes(), &controller_key)?;
        let deadline = self.config.io_timeout();

        send_message(
            stream,
            &RegisterRequest {
                identity: sealed.to_bytes(),
            },
            deadline,
        )
        .await?;
        let response: RegisterResponse = recv_message(stream, deadline).await?;

        let destinations = response.table.len();
        self.cache_row(response.table);
        // A heartbeat while already forwarding refreshes the row only.
        if self.phase() == AgentPhase::Unregistered {
            self.advance(AgentPhase::Registered);
        }
        tracing::debug!(name = %self.config.name, destinations, "registered with controller");
        Ok(())
    }

    /// Re-register at the configured interval, forever. Failures are logged
    /// and retried; the cached row from the last success stays in use.
    pub async fn register_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.register_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = self.register().await {
                tracing::warn!(name = %self.config.name, error = %e, "registration failed, will retry");
            }
        }
    }

    /// Accept loop for inbound envelopes. One envelope per connection;
    /// errors stay on the connection that raised them.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        self.advance(AgentPhase::Forwarding);
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(name = %self.config.name, %addr, "agent listening");
        }
        loop {
            match listener.accept().await {
                Ok((mut stream, peer)) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        let deadline = this.config.io_timeout();
                        let envelope: Envelope = match recv_message(&mut stream, deadline).await {
                            Ok(envelope) => envelope,
                            Err(e) => {
                                tracing::warn!(%peer, error = %e, "unreadable inbound frame");
                                return;
                            }
                        };
                        if let Err(e) = this.handle_envelope(envelope).await {
                            tracing::warn!(%peer, error = %e, "envelope dropped");
                        }
                    });
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
    }

    /// Route one envelope: local delivery when this node is the destination,
    /// otherwise one hop along the cached path over a fresh connection.
    pub async fn handle_envelope(&self, envelope: Envelope) -> Result<(), AgentError> {
        envelope.validate()?;

        if envelope.destination == self.config.name {
            return self.deliver_local(envelope);
        }

        let row = self.row();
        let next_hop = row
            .get(&envelope.destination)
            .and_then(|entry| entry.next_hop())
            .cloned()
            .ok_or_else(|| RoutingError::NoEntry {
                src: self.config.name.clone(),
                destination: envelope.destination.clone(),
            })?;

        let addr = self
            .config
            .address_book
            .addr_of(&next_hop)
            .ok_or_else(|| AgentError::UnknownPeer {
                name: next_hop.clone(),
            })?;

        let deadline = self.config.io_timeout();
        let mut stream = connect(addr, deadline).await?;
        let forwarded = envelope.forwarded();
        send_message(&mut stream, &forwarded, deadline).await?;
        tracing::debug!(
            destination = %forwarded.destination,
            %next_hop,
            hop_count = forwarded.hop_count,
            "envelope forwarded"
        );
        Ok(())
    }

    /// Decrypt at the destination and hand the plaintext to the local
    /// consumer. Bulk chunks go through reassembly first.
    fn deliver_local(&self, envelope: Envelope) -> Result<(), AgentError> {
        let sealed = SealedPayload::from_bytes(&envelope.payload)?;
        let plaintext = routefab_crypto::open(&sealed, &self.keypair)?;

        match envelope.kind {
            EnvelopeKind::Text => {
                tracing::info!(
                    origin = %envelope.origin,
                    hop_count = envelope.hop_count,
                    bytes = plaintext.len(),
                    "message delivered"
                );
                self.delivered_tx
                    .send(Delivery {
                        origin: envelope.origin,
                        payload: plaintext,
                    })
                    .map_err(|_| AgentError::DeliveryClosed)
            }
            EnvelopeKind::BulkChunk { seq, total } => {
                let complete = self
                    .assembler
                    .lock()
                    .unwrap()
                    .accept(&envelope.origin, seq, total, plaintext)?;
                if let Some(payload) = complete {
                    tracing::info!(
                        origin = %envelope.origin,
                        bytes = payload.len(),
                        chunks = total,
                        "bulk transfer reassembled"
                    );
                    self.delivered_tx
                        .send(Delivery {
                            origin: envelope.origin,
                            payload,
                        })
                        .map_err(|_| AgentError::DeliveryClosed)?;
                }
                Ok(())
            }
        }
    }

    /// Originate a single text message, sealed end to end for the
    /// destination.
    pub async fn send_text(&self, destination: &NodeName, plaintext: &[u8]) -> Result<(), AgentError> {
        let payload = self.seal_for(destination, plaintext)?;
        let envelope = Envelope::text(self.config.name.clone(), destination.clone(), payload);
        self.handle_envelope(envelope).await
    }

    /// Originate a bulk transfer: split into fixed-size chunks, seal each
    /// independently, route each as its own envelope. Chunks carry explicit
    /// sequence numbers, so per-chunk routes and arrival order are free to
    /// differ.
    pub async fn send_bulk(&self, destination: &NodeName, payload: &[u8]) -> Result<(), AgentError> {
        if self.config.chunk_size == 0 {
            return Err(AgentError::InvalidConfig(
                "chunk_size must be positive".into(),
            ));
        }
        let chunks = split_chunks(payload, self.config.chunk_size);
        let total = chunks.len() as u32;
        for (seq, chunk) in chunks.into_iter().enumerate() {
            let sealed = self.seal_for(destination, &chunk)?;
            let envelope = Envelope::bulk_chunk(
                self.config.name.clone(),
                destination.clone(),
                seq as u32,
                total,
                sealed,
            );
            self.handle_envelope(envelope).await?;
        }
        tracing::info!(%destination, chunks = total, "bulk transfer dispatched");
        Ok(())
    }

    fn seal_for(&self, destination: &NodeName, plaintext: &[u8]) -> Result<Vec<u8>, AgentError> {
        let key = if *destination == self.config.name {
            self.sealing_key()
        } else {
            self.config.address_book.sealing_key_of(destination)?
        };
        Ok(routefab_crypto::seal(plaintext, &key)?.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AddressBook, Peer};
    use routefab_routing::PathEntry;
    use std::time::Duration;

    const DEADLINE: Duration = Duration::from_secs(1);

    fn name(s: &str) -> NodeName {
        NodeName::from(s)
    }

    fn test_config(agent_name: &str, controller_key: [u8; 32]) -> AgentConfig {
        AgentConfig {
            name: name(agent_name),
            listen_addr: "127.0.0.1:0".into(),
            controller_addr: "127.0.0.1:9".into(),
            controller_sealing_key: hex::encode(controller_key),
            register_interval_secs: 5,
            io_timeout_ms: 1_000,
            chunk_size: 4,
            address_book: AddressBook::new(),
        }
    }

    fn agent(agent_name: &str) -> (Arc<NodeAgent>, mpsc::UnboundedReceiver<Delivery>) {
        let config = test_config(agent_name, [0u8; 32]);
        NodeAgent::new(config, KeyPair::generate())
    }

    /// Payload sealed for the agent itself, as a remote origin would.
    fn sealed_for(agent: &NodeAgent, plaintext: &[u8]) -> Vec<u8> {
        routefab_crypto::seal(plaintext, &agent.sealing_key())
            .unwrap()
            .to_bytes()
    }

    #[tokio::test]
    async fn test_register_caches_row_and_advances_phase() {
        let controller_kp = KeyPair::generate();
        let config = test_config("r1", routefab_crypto::sealing_key(&controller_kp));
        let (agent, _deliveries) = NodeAgent::new(config, KeyPair::generate());
        assert_eq!(agent.phase(), AgentPhase::Unregistered);

        let (mut agent_side, mut controller_side) = tokio::io::duplex(64 * 1024);
        let controller = async {
            let request: RegisterRequest = recv_message(&mut controller_side, DEADLINE)
                .await
                .unwrap();
            let sealed = SealedPayload::from_bytes(&request.identity).unwrap();
            let identity = routefab_crypto::open(&sealed, &controller_kp).unwrap();
            assert_eq!(identity, b"r1");

            let mut table = TableRow::new();
            table.insert(
                name("r2"),
                PathEntry::Path(vec![name("r1"), name("r2")]),
            );
            send_message(&mut controller_side, &RegisterResponse { table }, DEADLINE)
                .await
                .unwrap();
        };
        let register = agent.register_with(&mut agent_side);
        let ((), registered) = tokio::join!(controller, register);
        registered.unwrap();

        assert_eq!(agent.phase(), AgentPhase::Registered);
        assert_eq!(agent.row().len(), 1);
    }

    #[tokio::test]
    async fn test_unroutable_destination_is_dropped_with_routing_error() {
        let (agent, _deliveries) = agent("r1");
        let envelope = Envelope::text(name("r9"), name("r5"), vec![0u8; 44]);
        let result = agent.handle_envelope(envelope).await;
        assert!(matches!(
            result,
            Err(AgentError::Routing(RoutingError::NoEntry { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_entry_is_dropped_with_routing_error() {
        let (agent, _deliveries) = agent("r1");
        let mut row = TableRow::new();
        row.insert(name("r5"), PathEntry::Unreachable);
        agent.cache_row(row);

        let envelope = Envelope::text(name("r9"), name("r5"), vec![0u8; 44]);
        assert!(matches!(
            agent.handle_envelope(envelope).await,
            Err(AgentError::Routing(RoutingError::NoEntry { .. }))
        ));
    }

    #[tokio::test]
    async fn test_local_delivery_decrypts_text() {
        let (agent, mut deliveries) = agent("r1");
        let payload = sealed_for(&agent, b"hello r1");
        let mut envelope = Envelope::text(name("r9"), name("r1"), payload);
        envelope.hop_count = 3;

        agent.handle_envelope(envelope).await.unwrap();
        let delivery = deliveries.try_recv().unwrap();
        assert_eq!(delivery.origin, name("r9"));
        assert_eq!(delivery.payload, b"hello r1");
    }

    #[tokio::test]
    async fn test_out_of_order_chunks_reassemble() {
        let (agent, mut deliveries) = agent("r1");
        let chunks: [&[u8]; 3] = [b"abcd", b"efgh", b"ij"];

        // Arrival order 2, 0, 1; no delivery until the set is complete.
        for seq in [2u32, 0, 1] {
            let payload = sealed_for(&agent, chunks[seq as usize]);
            let envelope =
                Envelope::bulk_chunk(name("r9"), name("r1"), seq, 3, payload);
            agent.handle_envelope(envelope).await.unwrap();
            if seq != 1 {
                assert!(deliveries.try_recv().is_err());
            }
        }

        let delivery = deliveries.try_recv().unwrap();
        assert_eq!(delivery.payload, b"abcdefghij");
    }

    #[tokio::test]
    async fn test_forward_uses_next_hop_from_cached_row() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let next_hop_addr = listener.local_addr().unwrap();

        let mut config = test_config("b", [0u8; 32]);
        config.address_book.insert(
            name("c"),
            Peer {
                addr: next_hop_addr.to_string(),
                sealing_key: None,
            },
        );
        let (agent, _deliveries) = NodeAgent::new(config, KeyPair::generate());
        let mut row = TableRow::new();
        row.insert(
            name("d"),
            PathEntry::Path(vec![name("b"), name("c"), name("d")]),
        );
        agent.cache_row(row);

        let mut envelope = Envelope::text(name("a"), name("d"), vec![0u8; 44]);
        envelope.hop_count = 1;

        let forward = agent.handle_envelope(envelope.clone());
        let receive = async {
            let (mut stream, _) = listener.accept().await.unwrap();
            recv_message::<_, Envelope>(&mut stream, DEADLINE).await.unwrap()
        };
        let (forwarded, received) = tokio::join!(forward, receive);
        forwarded.unwrap();

        // Unchanged apart from the hop bookkeeping.
        assert_eq!(received.hop_count, 2);
        assert_eq!(received.payload, envelope.payload);
        assert_eq!(received.origin, envelope.origin);
        assert_eq!(received.destination, envelope.destination);
    }

    #[tokio::test]
    async fn test_forward_without_address_book_entry_fails() {
        let (agent, _deliveries) = agent("b");
        let mut row = TableRow::new();
        row.insert(
            name("d"),
            PathEntry::Path(vec![name("b"), name("c"), name("d")]),
        );
        agent.cache_row(row);

        let envelope = Envelope::text(name("a"), name("d"), vec![0u8; 44]);
        assert!(matches!(
            agent.handle_envelope(envelope).await,
            Err(AgentError::UnknownPeer { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_text_to_self_delivers_locally() {
        let (agent, mut deliveries) = agent("r1");
        agent.send_text(&name("r1"), b"loopback").await.unwrap();

        let delivery = deliveries.try_recv().unwrap();
        assert_eq!(delivery.origin, name("r1"));
        assert_eq!(delivery.payload, b"loopback");
    }

    #[tokio::test]
    async fn test_send_bulk_to_self_chunks_and_reassembles() {
        // chunk_size 4 in the test config, so 10 bytes means 3 chunks.
        let (agent, mut deliveries) = agent("r1");
        agent.send_bulk(&name("r1"), b"0123456789").await.unwrap();

        let delivery = deliveries.try_recv().unwrap();
        assert_eq!(delivery.payload, b"0123456789");
        assert!(deliveries.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_bulk_with_zero_chunk_size_errors_without_panicking() {
        let mut config = test_config("r1", [0u8; 32]);
        config.chunk_size = 0;
        let (agent, _deliveries) = NodeAgent::new(config, KeyPair::generate());

        assert!(matches!(
            agent.send_bulk(&name("r1"), b"0123456789").await,
            Err(AgentError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_chunk_numbering_rejected_before_routing() {
        let (agent, _deliveries) = agent("r1");
        let envelope = Envelope::bulk_chunk(name("r9"), name("r1"), 5, 5, vec![0u8; 44]);
        assert!(matches!(
            agent.handle_envelope(envelope).await,
            Err(AgentError::Core(_))
        ));
    }
}
