//! Priority queue of the footstep search.
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Open set entry pointing into the graph arena. Entries are never updated in place: a node
/// whose cost improves is pushed again and the outdated entry is skipped when popped.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SmallestCostHolder {
    estimated_cost: OrderedFloat<f64>,
    heuristic: OrderedFloat<f64>,
    order: u64,
    pub index: usize,
    pub cost: f64,
}

impl Eq for SmallestCostHolder {}

impl PartialEq for SmallestCostHolder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for SmallestCostHolder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestCostHolder {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest estimated cost first, then the lowest
        // heuristic, then the oldest entry.
        other
            .estimated_cost
            .cmp(&self.estimated_cost)
            .then_with(|| other.heuristic.cmp(&self.heuristic))
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct OpenSet {
    heap: BinaryHeap<SmallestCostHolder>,
    pushed: u64,
}

impl OpenSet {
    pub fn push(&mut self, index: usize, cost: f64, heuristic: f64) {
        self.heap.push(SmallestCostHolder {
            estimated_cost: OrderedFloat(cost + heuristic),
            heuristic: OrderedFloat(heuristic),
            order: self.pushed,
            index,
            cost,
        });
        self.pushed += 1;
    }

    pub fn pop(&mut self) -> Option<SmallestCostHolder> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
