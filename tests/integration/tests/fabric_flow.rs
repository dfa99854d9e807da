//! End-to-end fabric flow over real sockets: registration, hop-by-hop
//! forwarding, and bulk transfer along a four-node line.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::TcpListener;
use tokio::time::timeout;

use routefab_agent::{AddressBook, AgentConfig, Delivery, NodeAgent, Peer};
use routefab_controller::{Controller, ControllerConfig, SeedLink, SeedNode, TopologySeed};
use routefab_core::{NodeKind, NodeName};
use routefab_crypto::KeyPair;

const WAIT: Duration = Duration::from_secs(5);

fn name(s: &str) -> NodeName {
    NodeName::from(s)
}

fn temp_snapshot(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("routefab-e2e-{}-{}.json", tag, nanos))
}

/// Controller seeded with the line a - b - c - d, listening on an ephemeral
/// port with its loops running.
async fn start_controller(tag: &str) -> (Arc<Controller>, SocketAddr, PathBuf) {
    let node_names = ["a", "b", "c", "d"];
    let seed = TopologySeed {
        nodes: node_names
            .iter()
            .enumerate()
            .map(|(i, n)| SeedNode {
                id: i as u32 + 1,
                name: name(n),
                kind: NodeKind::Router,
            })
            .collect(),
        links: (1..4)
            .map(|i| SeedLink {
                source: i,
                destination: i + 1,
                bandwidth: 1200.0,
            })
            .collect(),
    };
    let snapshot_path = temp_snapshot(tag);
    let config = ControllerConfig {
        listen_addr: "127.0.0.1:0".into(),
        snapshot_path: snapshot_path.clone(),
        topology: seed,
        ..ControllerConfig::default()
    };

    let controller = Controller::new(config, KeyPair::generate()).unwrap();
    controller.recompute_now().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = Arc::clone(&controller);
    tokio::spawn(async move { serving.run_with_listener(listener).await });

    (controller, addr, snapshot_path)
}

fn agent_config(
    agent_name: &str,
    controller_addr: SocketAddr,
    controller_key: [u8; 32],
    address_book: AddressBook,
) -> AgentConfig {
    AgentConfig {
        name: name(agent_name),
        listen_addr: "127.0.0.1:0".into(),
        controller_addr: controller_addr.to_string(),
        controller_sealing_key: hex::encode(controller_key),
        register_interval_secs: 1,
        io_timeout_ms: 2_000,
        chunk_size: 8,
        address_book,
    }
}

fn peer(addr: SocketAddr, sealing_key: Option<[u8; 32]>) -> Peer {
    Peer {
        addr: addr.to_string(),
        sealing_key: sealing_key.map(hex::encode),
    }
}

/// The four agents of the line, registered, with b, c, d serving envelopes.
/// Returns agent a (the origin) and d's delivery inbox.
async fn start_line_fabric(
    controller_addr: SocketAddr,
    controller_key: [u8; 32],
) -> (Arc<NodeAgent>, tokio::sync::mpsc::UnboundedReceiver<Delivery>) {
    let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener_c = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener_d = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr_b = listener_b.local_addr().unwrap();
    let addr_c = listener_c.local_addr().unwrap();
    let addr_d = listener_d.local_addr().unwrap();

    let (agent_d, inbox_d) = NodeAgent::new(
        agent_config("d", controller_addr, controller_key, AddressBook::new()),
        KeyPair::generate(),
    );

    let mut book_c = AddressBook::new();
    book_c.insert(name("d"), peer(addr_d, None));
    let (agent_c, _inbox_c) = NodeAgent::new(
        agent_config("c", controller_addr, controller_key, book_c),
        KeyPair::generate(),
    );

    let mut book_b = AddressBook::new();
    book_b.insert(name("c"), peer(addr_c, None));
    let (agent_b, _inbox_b) = NodeAgent::new(
        agent_config("b", controller_addr, controller_key, book_b),
        KeyPair::generate(),
    );

    // The origin needs b's address to forward and d's sealing key to
    // originate; intermediate hops never need the key.
    let mut book_a = AddressBook::new();
    book_a.insert(name("b"), peer(addr_b, None));
    book_a.insert(name("d"), peer(addr_d, Some(agent_d.sealing_key())));
    let (agent_a, _inbox_a) = NodeAgent::new(
        agent_config("a", controller_addr, controller_key, book_a),
        KeyPair::generate(),
    );

    for agent in [&agent_a, &agent_b, &agent_c, &agent_d] {
        agent.register().await.unwrap();
    }
    tokio::spawn(Arc::clone(&agent_b).serve(listener_b));
    tokio::spawn(Arc::clone(&agent_c).serve(listener_c));
    tokio::spawn(Arc::clone(&agent_d).serve(listener_d));

    (agent_a, inbox_d)
}

#[tokio::test]
async fn test_registration_returns_the_full_routing_row() {
    let (controller, addr, snapshot) = start_controller("register").await;
    let config = agent_config("a", addr, controller.sealing_key(), AddressBook::new());
    let (agent, _inbox) = NodeAgent::new(config, KeyPair::generate());

    agent.register().await.unwrap();

    let row = agent.row();
    assert_eq!(
        row[&name("d")].path().unwrap(),
        &[name("a"), name("b"), name("c"), name("d")]
    );
    assert!(controller.liveness().is_tracked(&name("a")));

    std::fs::remove_file(snapshot).ok();
}

#[tokio::test]
async fn test_unknown_node_is_admitted_and_routed_after_recompute() {
    let (controller, addr, snapshot) = start_controller("admit").await;
    let config = agent_config("x", addr, controller.sealing_key(), AddressBook::new());
    let (agent, _inbox) = NodeAgent::new(config, KeyPair::generate());

    // First registration admits the newcomer; its row is still empty.
    agent.register().await.unwrap();
    assert!(agent.row().is_empty());
    assert!(controller.contains_node(&name("x")).await);

    controller.recompute_now().await.unwrap();
    agent.register().await.unwrap();
    assert!(agent.row()[&name("x")].is_reachable());

    std::fs::remove_file(snapshot).ok();
}

#[tokio::test]
async fn test_text_message_traverses_the_line_and_delivers_at_destination() {
    let (controller, controller_addr, snapshot) = start_controller("text").await;
    let (agent_a, mut inbox_d) =
        start_line_fabric(controller_addr, controller.sealing_key()).await;

    agent_a
        .send_text(&name("d"), b"across the fabric")
        .await
        .unwrap();

    let delivery = timeout(WAIT, inbox_d.recv()).await.unwrap().unwrap();
    assert_eq!(delivery.origin, name("a"));
    assert_eq!(delivery.payload, b"across the fabric");

    std::fs::remove_file(snapshot).ok();
}

#[tokio::test]
async fn test_bulk_transfer_is_chunked_sealed_and_reassembled() {
    let (controller, controller_addr, snapshot) = start_controller("bulk").await;
    let (agent_a, mut inbox_d) =
        start_line_fabric(controller_addr, controller.sealing_key()).await;

    // chunk_size is 8 in the test config, so this travels as 13 chunks.
    let payload: Vec<u8> = (0..100u8).collect();
    agent_a.send_bulk(&name("d"), &payload).await.unwrap();

    let delivery = timeout(WAIT, inbox_d.recv()).await.unwrap().unwrap();
    assert_eq!(delivery.origin, name("a"));
    assert_eq!(delivery.payload, payload);

    std::fs::remove_file(snapshot).ok();
}
