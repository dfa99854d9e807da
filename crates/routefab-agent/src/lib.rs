//! Routefab node agent.
//!
//! An agent registers with the controller, caches its own routing-table row,
//! and forwards envelopes hop by hop: each inbound envelope is either handed
//! to the local consumer (this node is the destination) or pushed one hop
//! closer over a fresh connection to the next node on the cached path.

pub mod agent;
pub mod config;
pub mod error;
pub mod phase;
pub mod reassembly;

pub use agent::{Delivery, NodeAgent};
pub use config::{AddressBook, AgentConfig, Peer};
pub use error::AgentError;
pub use phase::AgentPhase;
pub use reassembly::ChunkAssembler;
