//! Run-wide innovation bookkeeping.
//!
//! The tracker hands out innovation numbers for new connections and node ids
//! for split events. Identical structural mutations made while the lookup
//! table is live receive identical ids, which is what lets crossover and the
//! compatibility distance align genes of unrelated genomes.
//!
//! The tracker is an explicit service passed to mutation calls. It guards its
//! table with a mutex so genomes may be mutated from several threads.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::gene::{Innovation, NodeId};

/// Lifetime of the structure-to-id lookup table.
///
/// Counters never move backwards under either policy; the policy only decides
/// how long a structural mutation keeps mapping to the id it first received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InnovationPolicy {
    /// The table is cleared at the start of every reproduction phase. The same
    /// mutation made in a later generation gets a new id.
    #[default]
    PerGeneration,
    /// The table lives for the whole run.
    PerRun,
}

/// Ids produced when a connection is split by an add-node mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIds {
    /// Id of the inserted hidden node.
    pub node: NodeId,
    /// Innovation of the `source -> node` connection.
    pub incoming: Innovation,
    /// Innovation of the `node -> target` connection.
    pub outgoing: Innovation,
}

#[derive(Debug, Clone)]
struct InnovationTable {
    next_innovation: Innovation,
    next_node: NodeId,
    connections: HashMap<(NodeId, NodeId), Innovation>,
    splits: HashMap<Innovation, SplitIds>,
}

impl InnovationTable {
    fn allocate_innovation(&mut self) -> Innovation {
        let id = self.next_innovation;
        self.next_innovation += 1;
        id
    }

    fn allocate_split(&mut self) -> SplitIds {
        let node = self.next_node;
        self.next_node += 1;
        SplitIds {
            node,
            incoming: self.allocate_innovation(),
            outgoing: self.allocate_innovation(),
        }
    }
}

/// Plain-data copy of the tracker, used by checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnovationSnapshot {
    /// Reuse policy.
    pub policy: InnovationPolicy,
    /// Next innovation number to hand out.
    pub next_innovation: Innovation,
    /// Next hidden node id to hand out.
    pub next_node: NodeId,
    /// Live connection entries as `(source, target, innovation)`.
    pub connections: Vec<(NodeId, NodeId, Innovation)>,
    /// Live split entries as `(split innovation, ids)`.
    pub splits: Vec<(Innovation, SplitIds)>,
}

/// Shared allocator of innovation numbers and hidden node ids.
#[derive(Debug)]
pub struct InnovationTracker {
    policy: InnovationPolicy,
    table: Mutex<InnovationTable>,
}

impl InnovationTracker {
    /// Creates a tracker whose first innovation is 1 and first node id is 0.
    pub fn new(policy: InnovationPolicy) -> Self {
        Self::starting_at(policy, 0, 1)
    }

    /// Creates a tracker that continues from the given counters.
    pub fn starting_at(
        policy: InnovationPolicy,
        next_node: NodeId,
        next_innovation: Innovation,
    ) -> Self {
        Self {
            policy,
            table: Mutex::new(InnovationTable {
                next_innovation,
                next_node,
                connections: HashMap::new(),
                splits: HashMap::new(),
            }),
        }
    }

    fn table(&self) -> std::sync::MutexGuard<'_, InnovationTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reuse policy of this tracker.
    pub fn policy(&self) -> InnovationPolicy {
        self.policy
    }

    /// Looks up or allocates the innovation for a `source -> target` connection.
    pub fn connection(&self, source: NodeId, target: NodeId) -> Innovation {
        let mut table = self.table();
        if let Some(&id) = table.connections.get(&(source, target)) {
            return id;
        }
        let id = table.allocate_innovation();
        table.connections.insert((source, target), id);
        id
    }

    /// Looks up or allocates the ids for splitting the connection `split`.
    ///
    /// `source` and `target` are the endpoints of the split connection; the two
    /// new connections are registered so a later add-connection of the same
    /// pair maps to the same innovation.
    pub fn split(&self, split: Innovation, source: NodeId, target: NodeId) -> SplitIds {
        let mut table = self.table();
        if let Some(&ids) = table.splits.get(&split) {
            return ids;
        }
        let ids = table.allocate_split();
        table.splits.insert(split, ids);
        table.connections.insert((source, ids.node), ids.incoming);
        table.connections.insert((ids.node, target), ids.outgoing);
        ids
    }

    /// Allocates new split ids without recording them.
    ///
    /// Used when a genome already holds the node a cached split would insert,
    /// which happens when a re-enabled connection is split a second time.
    pub fn fresh_split(&self) -> SplitIds {
        self.table().allocate_split()
    }

    /// Makes sure node ids below `count` are never handed out for hidden nodes.
    pub fn reserve_nodes(&self, count: NodeId) {
        let mut table = self.table();
        table.next_node = table.next_node.max(count);
    }

    /// Makes sure innovations below `next` are never handed out.
    pub fn reserve_innovations(&self, next: Innovation) {
        let mut table = self.table();
        table.next_innovation = table.next_innovation.max(next);
    }

    /// Marks the start of a reproduction phase.
    pub fn begin_generation(&self) {
        if self.policy == InnovationPolicy::PerGeneration {
            let mut table = self.table();
            table.connections.clear();
            table.splits.clear();
        }
    }

    /// Innovation number the next new structure will receive.
    pub fn peek_innovation(&self) -> Innovation {
        self.table().next_innovation
    }

    /// Node id the next split will receive.
    pub fn peek_node(&self) -> NodeId {
        self.table().next_node
    }

    /// Copies the tracker's state.
    pub fn snapshot(&self) -> InnovationSnapshot {
        let table = self.table();
        let mut connections: Vec<_> = table
            .connections
            .iter()
            .map(|(&(source, target), &id)| (source, target, id))
            .collect();
        connections.sort_unstable_by_key(|&(_, _, id)| id);
        let mut splits: Vec<_> = table.splits.iter().map(|(&k, &v)| (k, v)).collect();
        splits.sort_unstable_by_key(|&(k, _)| k);

        InnovationSnapshot {
            policy: self.policy,
            next_innovation: table.next_innovation,
            next_node: table.next_node,
            connections,
            splits,
        }
    }

    /// Rebuilds a tracker from a snapshot.
    pub fn from_snapshot(snapshot: InnovationSnapshot) -> Self {
        let tracker =
            Self::starting_at(snapshot.policy, snapshot.next_node, snapshot.next_innovation);
        {
            let mut table = tracker.table();
            table.connections = snapshot
                .connections
                .into_iter()
                .map(|(source, target, id)| ((source, target), id))
                .collect();
            table.splits = snapshot.splits.into_iter().collect();
        }
        tracker
    }
}
