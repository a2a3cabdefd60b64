//! Observer hooks into the search.
//!
//! Hooks run synchronously on the planning thread and only ever see borrowed views of the
//! search. A listener that reports to another thread must copy what it needs, which is what
//! [ThrottledProgressListener] does.
use crate::checker::RejectionReason;
use crate::graph::FootstepGraph;
use crate::node::FootstepNode;
use crate::planner::PlannerStatus;
use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::time::{Duration, Instant};

/// Borrowed view of the search handed to [FootstepPlannerListener::tick_and_update].
pub struct SearchProgress<'a> {
    pub iterations: usize,
    pub expanded_nodes: usize,
    pub graph: &'a FootstepGraph,
    /// Expanded node closest to the goal so far.
    pub best_node: Option<FootstepNode>,
}

impl SearchProgress<'_> {
    /// Nodes from the start to the best node, both included.
    pub fn best_path(&self) -> Vec<FootstepNode> {
        self.best_node
            .and_then(|node| self.graph.path_from_start(&node))
            .unwrap_or_default()
    }
}

/// Callbacks invoked by the planner. Every method defaults to doing nothing.
pub trait FootstepPlannerListener: Send {
    /// A candidate was accepted into the graph, or rewired below a cheaper parent.
    fn node_added(&mut self, _node: &FootstepNode, _parent: Option<&FootstepNode>) {}

    fn node_rejected(
        &mut self,
        _node: &FootstepNode,
        _parent: Option<&FootstepNode>,
        _reason: RejectionReason,
    ) {
    }

    /// Called once per expansion.
    fn tick_and_update(&mut self, _progress: &SearchProgress<'_>) {}

    fn planner_finished(&mut self, _status: PlannerStatus, _best_path: &[FootstepNode]) {}
}

/// Owned copy of the search progress since the previous snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlannerProgressSnapshot {
    pub added_nodes: Vec<(FootstepNode, Option<FootstepNode>)>,
    pub rejected_nodes: Vec<(FootstepNode, RejectionReason)>,
    pub best_path: Vec<FootstepNode>,
    pub iterations: usize,
    /// Set on the snapshot sent when the search terminates.
    pub status: Option<PlannerStatus>,
}

/// Collects progress and sends it over a channel at most once per interval, plus once when the
/// search terminates.
pub struct ThrottledProgressListener {
    sender: Sender<PlannerProgressSnapshot>,
    interval: Duration,
    last_sent: Option<Instant>,
    pending: PlannerProgressSnapshot,
}

impl ThrottledProgressListener {
    /// Creates a listener together with the receiving end of its channel.
    pub fn new(interval: Duration) -> (ThrottledProgressListener, Receiver<PlannerProgressSnapshot>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (ThrottledProgressListener::with_sender(sender, interval), receiver)
    }

    pub fn with_sender(sender: Sender<PlannerProgressSnapshot>, interval: Duration) -> ThrottledProgressListener {
        ThrottledProgressListener {
            sender,
            interval,
            last_sent: None,
            pending: PlannerProgressSnapshot::default(),
        }
    }

    fn send(&mut self) {
        let snapshot = std::mem::take(&mut self.pending);
        if self.sender.send(snapshot).is_err() {
            debug!("Progress receiver disconnected");
        }
        self.last_sent = Some(Instant::now());
    }
}

impl FootstepPlannerListener for ThrottledProgressListener {
    fn node_added(&mut self, node: &FootstepNode, parent: Option<&FootstepNode>) {
        self.pending.added_nodes.push((*node, parent.copied()));
    }

    fn node_rejected(
        &mut self,
        node: &FootstepNode,
        _parent: Option<&FootstepNode>,
        reason: RejectionReason,
    ) {
        self.pending.rejected_nodes.push((*node, reason));
    }

    fn tick_and_update(&mut self, progress: &SearchProgress<'_>) {
        self.pending.iterations = progress.iterations;
        let due = self
            .last_sent
            .map_or(true, |sent| sent.elapsed() >= self.interval);
        if due {
            self.pending.best_path = progress.best_path();
            self.send();
        }
    }

    fn planner_finished(&mut self, status: PlannerStatus, best_path: &[FootstepNode]) {
        self.pending.best_path = best_path.to_vec();
        self.pending.status = Some(status);
        self.send();
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RobotSide;

    #[test]
    fn throttles_until_finished() {
        let (mut listener, receiver) = ThrottledProgressListener::new(Duration::from_secs(3600));
        let mut graph = FootstepGraph::new();
        let start = FootstepNode::new(0, 0, 0, RobotSide::Left);
        let step = FootstepNode::new(6, -4, 0, RobotSide::Right);
        graph.initialize(start);
        graph.check_and_set_edge(&start, step, 0.2);
        let progress = SearchProgress {
            iterations: 1,
            expanded_nodes: 1,
            graph: &graph,
            best_node: Some(step),
        };

        listener.node_added(&step, Some(&start));
        listener.tick_and_update(&progress);
        let first = receiver.try_recv().unwrap();
        assert_eq!(first.added_nodes, vec![(step, Some(start))]);
        assert_eq!(first.best_path, vec![start, step]);
        assert_eq!(first.status, None);

        listener.node_rejected(&start, Some(&step), RejectionReason::StepTooFar);
        listener.tick_and_update(&progress);
        assert!(receiver.try_recv().is_err());

        listener.planner_finished(PlannerStatus::TimedOut, &[start, step]);
        let last = receiver.try_recv().unwrap();
        assert_eq!(last.rejected_nodes, vec![(start, RejectionReason::StepTooFar)]);
        assert_eq!(last.status, Some(PlannerStatus::TimedOut));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn disconnected_receiver_is_tolerated() {
        let (mut listener, receiver) = ThrottledProgressListener::new(Duration::ZERO);
        drop(receiver);
        listener.planner_finished(PlannerStatus::Infeasible, &[]);
    }
}
