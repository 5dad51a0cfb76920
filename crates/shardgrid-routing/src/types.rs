//! Shard identity and placement descriptors.
//!
//! A [`ShardRouting`] is an immutable value: every lifecycle transition
//! returns a new descriptor and leaves the old one untouched, so a caller
//! holding an older value can always be detected as stale by the registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RoutingError, RoutingResult};

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

/// Name of a workload class (the logical dataset a shard belongs to).
pub type ClassName = String;

// ── Identity ──────────────────────────────────────────────────────

/// Identity of one shard: its workload class plus its ordinal in that class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId {
    pub class: ClassName,
    pub ordinal: u32,
}

impl ShardId {
    pub fn new(class: impl Into<ClassName>, ordinal: u32) -> Self {
        Self {
            class: class.into(),
            ordinal,
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.class, self.ordinal)
    }
}

// ── State ─────────────────────────────────────────────────────────

/// Lifecycle state of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardRoutingState {
    Unassigned,
    Initializing,
    Started,
    /// Mid-transfer to another node. Not charged against any node's capacity.
    Relocating,
}

impl ShardRoutingState {
    pub const ALL: [ShardRoutingState; 4] = [
        ShardRoutingState::Unassigned,
        ShardRoutingState::Initializing,
        ShardRoutingState::Started,
        ShardRoutingState::Relocating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShardRoutingState::Unassigned => "UNASSIGNED",
            ShardRoutingState::Initializing => "INITIALIZING",
            ShardRoutingState::Started => "STARTED",
            ShardRoutingState::Relocating => "RELOCATING",
        }
    }
}

impl fmt::Display for ShardRoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Routing ───────────────────────────────────────────────────────

/// Placement descriptor for one shard at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardRouting {
    shard_id: ShardId,
    primary: bool,
    state: ShardRoutingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relocating_node_id: Option<NodeId>,
}

impl ShardRouting {
    /// A fresh, unassigned shard.
    pub fn unassigned(shard_id: ShardId, primary: bool) -> Self {
        Self {
            shard_id,
            primary,
            state: ShardRoutingState::Unassigned,
            current_node_id: None,
            relocating_node_id: None,
        }
    }

    /// A shard already started on `node_id`. Mostly useful for seeding a
    /// registry from a snapshot.
    pub fn started(shard_id: ShardId, primary: bool, node_id: impl Into<NodeId>) -> Self {
        Self {
            shard_id,
            primary,
            state: ShardRoutingState::Started,
            current_node_id: Some(node_id.into()),
            relocating_node_id: None,
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn class(&self) -> &str {
        &self.shard_id.class
    }

    pub fn primary(&self) -> bool {
        self.primary
    }

    pub fn state(&self) -> ShardRoutingState {
        self.state
    }

    pub fn current_node_id(&self) -> Option<&str> {
        self.current_node_id.as_deref()
    }

    pub fn relocating_node_id(&self) -> Option<&str> {
        self.relocating_node_id.as_deref()
    }

    pub fn relocating(&self) -> bool {
        self.state == ShardRoutingState::Relocating
    }

    pub fn assigned_to_node(&self) -> bool {
        self.current_node_id.is_some()
    }

    /// UNASSIGNED → INITIALIZING on `node_id`.
    pub fn initialize(&self, node_id: impl Into<NodeId>) -> RoutingResult<Self> {
        self.expect_state(ShardRoutingState::Unassigned, ShardRoutingState::Initializing)?;
        Ok(Self {
            state: ShardRoutingState::Initializing,
            current_node_id: Some(node_id.into()),
            relocating_node_id: None,
            ..self.clone()
        })
    }

    /// INITIALIZING → STARTED.
    pub fn move_to_started(&self) -> RoutingResult<Self> {
        self.expect_state(ShardRoutingState::Initializing, ShardRoutingState::Started)?;
        Ok(Self {
            state: ShardRoutingState::Started,
            relocating_node_id: None,
            ..self.clone()
        })
    }

    /// STARTED → RELOCATING towards `target`.
    pub fn relocate(&self, target: impl Into<NodeId>) -> RoutingResult<Self> {
        self.expect_state(ShardRoutingState::Started, ShardRoutingState::Relocating)?;
        Ok(Self {
            state: ShardRoutingState::Relocating,
            relocating_node_id: Some(target.into()),
            ..self.clone()
        })
    }

    /// RELOCATING → STARTED on the source node.
    pub fn cancel_relocation(&self) -> RoutingResult<Self> {
        self.expect_state(ShardRoutingState::Relocating, ShardRoutingState::Started)?;
        Ok(Self {
            state: ShardRoutingState::Started,
            relocating_node_id: None,
            ..self.clone()
        })
    }

    /// Any assigned state → UNASSIGNED.
    pub fn move_to_unassigned(&self) -> RoutingResult<Self> {
        if self.state == ShardRoutingState::Unassigned {
            return Err(self.invalid_transition(ShardRoutingState::Unassigned));
        }
        Ok(Self {
            state: ShardRoutingState::Unassigned,
            current_node_id: None,
            relocating_node_id: None,
            ..self.clone()
        })
    }

    /// Compact one-line description for diagnostics.
    pub fn short_summary(&self) -> String {
        let mut s = format!(
            "{}, node[{}], ",
            self.shard_id,
            self.current_node_id.as_deref().unwrap_or("null")
        );
        if let Some(target) = &self.relocating_node_id {
            s.push_str(&format!("relocating [{target}], "));
        }
        s.push_str(if self.primary { "[P]" } else { "[R]" });
        s.push_str(&format!(", s[{}]", self.state));
        s
    }

    fn expect_state(&self, from: ShardRoutingState, to: ShardRoutingState) -> RoutingResult<()> {
        if self.state == from {
            Ok(())
        } else {
            Err(self.invalid_transition(to))
        }
    }

    fn invalid_transition(&self, to: ShardRoutingState) -> RoutingError {
        RoutingError::InvalidTransition {
            shard: self.shard_id.clone(),
            from: self.state,
            to,
        }
    }
}

impl fmt::Display for ShardRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_summary())
    }
}
