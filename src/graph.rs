use crate::node::FootstepNode;
use fxhash::FxBuildHasher;
use indexmap::map::Entry::{Occupied, Vacant};
use indexmap::IndexMap;
use log::trace;

pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Best known way of reaching a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootstepGraphRecord {
    /// Arena index of the parent, `None` for the start node.
    pub parent: Option<usize>,
    pub edge_cost: f64,
    pub cost_from_start: f64,
}

/// Search tree stored as an insertion ordered arena keyed by node value. Every node has at most
/// one parent, the one through which it was reached with the lowest known cost, so rewiring is a
/// single record update.
#[derive(Clone, Debug, Default)]
pub struct FootstepGraph {
    records: FxIndexMap<FootstepNode, FootstepGraphRecord>,
}

impl FootstepGraph {
    pub fn new() -> FootstepGraph {
        FootstepGraph::default()
    }

    /// Clears the graph and inserts the start node with zero cost and no parent.
    pub fn initialize(&mut self, start: FootstepNode) -> usize {
        self.records.clear();
        let (index, _) = self.records.insert_full(
            start,
            FootstepGraphRecord {
                parent: None,
                edge_cost: 0.0,
                cost_from_start: 0.0,
            },
        );
        index
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, node: &FootstepNode) -> bool {
        self.records.contains_key(node)
    }

    pub fn start(&self) -> Option<FootstepNode> {
        self.records.get_index(0).map(|(node, _)| *node)
    }

    pub fn index_of(&self, node: &FootstepNode) -> Option<usize> {
        self.records.get_index_of(node)
    }

    pub fn get_index(&self, index: usize) -> Option<(&FootstepNode, &FootstepGraphRecord)> {
        self.records.get_index(index)
    }

    pub fn record(&self, node: &FootstepNode) -> Option<&FootstepGraphRecord> {
        self.records.get(node)
    }

    pub fn cost_from_start(&self, node: &FootstepNode) -> Option<f64> {
        self.records.get(node).map(|r| r.cost_from_start)
    }

    pub fn parent(&self, node: &FootstepNode) -> Option<FootstepNode> {
        let parent = self.records.get(node)?.parent?;
        self.records.get_index(parent).map(|(node, _)| *node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FootstepNode> {
        self.records.keys()
    }

    /// Connects `child` below `parent` when the child is new or the edge strictly lowers its cost
    /// from the start. Returns the child's arena index and new cost if the graph changed.
    pub fn check_and_set_edge(
        &mut self,
        parent: &FootstepNode,
        child: FootstepNode,
        edge_cost: f64,
    ) -> Option<(usize, f64)> {
        let (parent_index, _, parent_record) = self.records.get_full(parent)?;
        let cost_from_start = parent_record.cost_from_start + edge_cost;
        let record = FootstepGraphRecord {
            parent: Some(parent_index),
            edge_cost,
            cost_from_start,
        };
        match self.records.entry(child) {
            Vacant(e) => {
                let index = e.index();
                e.insert(record);
                Some((index, cost_from_start))
            }
            Occupied(mut e) => {
                if cost_from_start < e.get().cost_from_start {
                    trace!(
                        "Rewiring {} below {}: {:.3} -> {:.3}",
                        e.key(),
                        parent,
                        e.get().cost_from_start,
                        cost_from_start
                    );
                    let index = e.index();
                    e.insert(record);
                    Some((index, cost_from_start))
                } else {
                    None
                }
            }
        }
    }

    /// Nodes from the start to `node`, both included.
    pub fn path_from_start(&self, node: &FootstepNode) -> Option<Vec<FootstepNode>> {
        let index = self.records.get_index_of(node)?;
        Some(self.reverse_path(index))
    }

    pub(crate) fn reverse_path(&self, index: usize) -> Vec<FootstepNode> {
        let mut path: Vec<FootstepNode> = itertools::unfold(Some(index), |i| {
            let (node, record) = self.records.get_index((*i)?)?;
            *i = record.parent;
            Some(*node)
        })
        .collect();
        path.reverse();
        path
    }
}
