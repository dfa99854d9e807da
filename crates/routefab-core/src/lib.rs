//! Shared types for the routing fabric.
//!
//! This crate provides:
//! - [`NodeName`] and [`Node`], the participant identity types.
//! - [`Envelope`], the hop-by-hop message carried between agents.
//! - [`CoreError`], validation errors shared across the workspace.

pub mod envelope;
pub mod error;
pub mod types;

pub use envelope::{split_chunks, Envelope, EnvelopeKind};
pub use error::CoreError;
pub use types::{Node, NodeKind, NodeName};
