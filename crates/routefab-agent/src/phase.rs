use std::fmt;

/// Lifecycle of a node agent.
///
/// An agent starts `Unregistered`, becomes `Registered` once the controller
/// has handed it its routing row, and `Forwarding` once its envelope listener
/// is serving. A failed registration never moves the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Unregistered,
    Registered,
    Forwarding,
}

impl AgentPhase {
    /// Whether the phase machine permits moving to `next`. Re-entering the
    /// current phase is always permitted (re-registration refreshes the row
    /// without demoting the agent).
    pub fn can_transition(self, next: AgentPhase) -> bool {
        use AgentPhase::*;
        matches!(
            (self, next),
            (Unregistered, Registered) | (Registered, Forwarding) | (Forwarding, Forwarding)
        ) || self == next
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Forwarding => "forwarding",
        };
        f.write_str(s)
    }
}
