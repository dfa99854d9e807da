use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The unique external identifier of a fabric participant.
///
/// Names are what the routing table, the liveness tracker, and the wire
/// protocol all key on; numeric ids are an internal topology handle only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeName(pub String);

impl NodeName {
    /// Create a validated node name. Names must be non-empty and contain no
    /// whitespace so they can serve as stable map keys and log fields.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::InvalidNodeName("name is empty".into()));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidNodeName(format!(
                "name contains whitespace: {:?}",
                name
            )));
        }
        Ok(Self(name))
    }

    /// The raw name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeName {
    /// Infallible conversion for literals; use [`NodeName::new`] for
    /// externally supplied names.
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The role a node plays in the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Interior node that forwards traffic.
    Router,
    /// Edge node that originates and consumes traffic.
    Host,
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Router => "router",
            Self::Host => "host",
        }
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        Self::Router
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A participant in the fabric topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Internal topology handle.
    pub id: u32,
    /// Unique external identifier.
    pub name: NodeName,
    /// Role of the node.
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: u32, name: NodeName, kind: NodeKind) -> Self {
        Self { id, name, kind }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={}, kind={})", self.name, self.id, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_rejects_empty() {
        assert!(NodeName::new("").is_err());
    }

    #[test]
    fn test_node_name_rejects_whitespace() {
        assert!(NodeName::new("office 1").is_err());
        assert!(NodeName::new("office\t1").is_err());
    }

    #[test]
    fn test_node_name_accepts_plain() {
        let name = NodeName::new("r1").unwrap();
        assert_eq!(name.as_str(), "r1");
    }

    #[test]
    fn test_node_name_serde_transparent() {
        let name = NodeName::from("r7");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"r7\"");
        let back: NodeName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_node_display() {
        let node = Node::new(3, NodeName::from("r3"), NodeKind::Router);
        assert_eq!(node.to_string(), "r3 (id=3, kind=router)");
    }
}
