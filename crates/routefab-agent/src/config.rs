use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use routefab_core::NodeName;

use crate::error::AgentError;

/// Configuration for one node agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// This node's name, the identity it registers under.
    pub name: NodeName,
    /// Address the envelope listener binds to.
    pub listen_addr: String,
    /// Address of the controller's registration listener.
    pub controller_addr: String,
    /// Hex-encoded X25519 sealing key of the controller.
    pub controller_sealing_key: String,
    /// Seconds between registration attempts. Registration doubles as the
    /// liveness heartbeat, so this must stay well under the controller TTL.
    #[serde(default = "default_register_interval")]
    pub register_interval_secs: u64,
    /// Deadline for each socket operation, in milliseconds.
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,
    /// Bytes per bulk-transfer chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Static name-to-address map for every peer this agent may talk to.
    #[serde(default)]
    pub address_book: AddressBook,
}

fn default_register_interval() -> u64 {
    5
}

fn default_io_timeout() -> u64 {
    5_000
}

fn default_chunk_size() -> usize {
    1024
}

impl AgentConfig {
    /// Reject a configuration the agent cannot run with. Called once after
    /// loading, so the hot paths can rely on the fields being sane.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.chunk_size == 0 {
            return Err(AgentError::InvalidConfig(
                "chunk_size must be positive".into(),
            ));
        }
        if self.register_interval_secs == 0 {
            return Err(AgentError::InvalidConfig(
                "register_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn register_interval(&self) -> Duration {
        Duration::from_secs(self.register_interval_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Decode the controller's sealing key.
    pub fn controller_sealing_key(&self) -> Result<[u8; 32], AgentError> {
        decode_sealing_key(&self.controller_sealing_key).ok_or(AgentError::InvalidSealingKey {
            name: NodeName::from("controller"),
        })
    }
}

/// Static name-to-address map, loaded once at startup. Membership changes
/// flow through the controller's topology, not through this map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    peers: BTreeMap<NodeName, Peer>,
}

/// One peer: where to connect, and (for peers this agent originates
/// messages to) the key to seal payloads with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealing_key: Option<String>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: NodeName, peer: Peer) {
        self.peers.insert(name, peer);
    }

    /// Connection address for a peer.
    pub fn addr_of(&self, name: &NodeName) -> Option<&str> {
        self.peers.get(name).map(|p| p.addr.as_str())
    }

    /// Decoded sealing key for a peer, required when originating to it.
    pub fn sealing_key_of(&self, name: &NodeName) -> Result<[u8; 32], AgentError> {
        let peer = self.peers.get(name).ok_or_else(|| AgentError::UnknownPeer {
            name: name.clone(),
        })?;
        let hex_key = peer
            .sealing_key
            .as_deref()
            .ok_or_else(|| AgentError::MissingSealingKey { name: name.clone() })?;
        decode_sealing_key(hex_key).ok_or_else(|| AgentError::InvalidSealingKey {
            name: name.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

fn decode_sealing_key(hex_key: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(hex_key).ok()?;
    bytes.try_into().ok()
}
