//! The footstep planner: request validation, the A* loop and result assembly.
use crate::checker::{CheckerContext, NodeCheckerPipeline, RejectionReason};
use crate::cost::{DistanceAndYawHeuristic, FootstepCost};
use crate::error::{PlannerError, Result};
use crate::expansion::ParameterBasedNodeExpansion;
use crate::graph::{FootstepGraph, FxIndexMap};
use crate::listener::{FootstepPlannerListener, SearchProgress};
use crate::node::{wrap_angle, yaw_of, FootstepNode, RobotSide};
use crate::parameters::FootstepPlannerParameters;
use crate::plan::{extract_plan, FootstepPlan};
use crate::search::OpenSet;
use crate::snapper::{FootstepNodeSnapData, FootstepNodeSnapper};
use crate::terrain::Terrain;
use fxhash::FxHashMap;
use log::{info, trace, warn};
use nalgebra::{Isometry3, Vector3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a search terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlannerStatus {
    SolutionFound,
    /// The open set ran empty before the goal was reached.
    Infeasible,
    /// The expansion budget or the timeout ran out.
    TimedOut,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    Planning,
    Finished(PlannerStatus),
}

/// Limits on a single call to [FootstepPlanner::plan] or [FootstepPlanner::resume].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchBudget {
    pub timeout: Option<Duration>,
    pub max_expansions: Option<usize>,
}

impl SearchBudget {
    pub fn unlimited() -> SearchBudget {
        SearchBudget::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> SearchBudget {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> SearchBudget {
        self.max_expansions = Some(max_expansions);
        self
    }

    fn is_exceeded(&self, expansions: usize, elapsed: Duration) -> bool {
        self.max_expansions.is_some_and(|max| expansions >= max)
            || self.timeout.is_some_and(|timeout| elapsed >= timeout)
    }
}

/// Cooperative cancellation flag, checked once per search iteration. Clones share the flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Left and right sole poses standing around `pose` with the given distance between the feet.
pub fn feet_around(pose: &Isometry3<f64>, step_width: f64) -> (Isometry3<f64>, Isometry3<f64>) {
    let half = step_width / 2.0;
    (
        pose * Isometry3::translation(0.0, half, 0.0),
        pose * Isometry3::translation(0.0, -half, 0.0),
    )
}

#[derive(Clone, Debug, PartialEq)]
pub enum FootstepPlannerGoal {
    /// Stand with the feet `ideal_step_width` apart around this pose.
    PoseBetweenFeet(Isometry3<f64>),
    Footsteps {
        left: Isometry3<f64>,
        right: Isometry3<f64>,
    },
}

impl FootstepPlannerGoal {
    /// Goal sole poses as `(left, right)`.
    pub fn feet(&self, parameters: &FootstepPlannerParameters) -> (Isometry3<f64>, Isometry3<f64>) {
        match self {
            FootstepPlannerGoal::PoseBetweenFeet(pose) => feet_around(pose, parameters.ideal_step_width),
            FootstepPlannerGoal::Footsteps { left, right } => (*left, *right),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FootstepPlannerRequest {
    pub start_left_sole: Isometry3<f64>,
    pub start_right_sole: Isometry3<f64>,
    /// Foot that stays on the ground for the first step.
    pub initial_stance_side: RobotSide,
    pub goal: FootstepPlannerGoal,
    /// Foot that must make the last step, if any.
    pub goal_ending_side: Option<RobotSide>,
    pub terrain: Terrain,
    pub budget: SearchBudget,
}

impl FootstepPlannerRequest {
    pub fn new(
        start_left_sole: Isometry3<f64>,
        start_right_sole: Isometry3<f64>,
        goal: FootstepPlannerGoal,
        terrain: Terrain,
    ) -> FootstepPlannerRequest {
        FootstepPlannerRequest {
            start_left_sole,
            start_right_sole,
            initial_stance_side: RobotSide::Left,
            goal,
            goal_ending_side: None,
            terrain,
            budget: SearchBudget::unlimited(),
        }
    }

    fn start_sole(&self, side: RobotSide) -> &Isometry3<f64> {
        match side {
            RobotSide::Left => &self.start_left_sole,
            RobotSide::Right => &self.start_right_sole,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlannerStatistics {
    pub iterations: usize,
    pub expanded_nodes: usize,
    /// Candidates run through the checker pipeline.
    pub checked_nodes: usize,
    pub rejected_nodes: usize,
    pub graph_size: usize,
    pub planning_time: Duration,
}

impl PlannerStatistics {
    pub fn percent_rejected(&self) -> f64 {
        if self.checked_nodes == 0 {
            0.0
        } else {
            100.0 * self.rejected_nodes as f64 / self.checked_nodes as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FootstepPlannerOutput {
    pub status: PlannerStatus,
    /// The plan to the goal, or the best partial plan when the goal was not reached.
    pub plan: FootstepPlan,
    /// Last rejection reason of every rejected candidate, in rejection order.
    pub diagnostics: FxIndexMap<FootstepNode, RejectionReason>,
    pub statistics: PlannerStatistics,
    /// Whether the plan is guaranteed to be a least cost plan.
    pub optimal: bool,
}

#[derive(Clone, Copy, Debug)]
struct BestNode {
    index: usize,
    heuristic: f64,
    cost: f64,
}

/// Everything a search needs to continue where it stopped.
struct SearchState {
    snapper: FootstepNodeSnapper,
    graph: FootstepGraph,
    open: OpenSet,
    /// Cost at which each arena index was last expanded.
    closed: FxHashMap<usize, f64>,
    diagnostics: FxIndexMap<FootstepNode, RejectionReason>,
    heuristic: DistanceAndYawHeuristic,
    goal_left: Isometry3<f64>,
    goal_right: Isometry3<f64>,
    goal_ending_side: Option<RobotSide>,
    start_swing: FootstepNode,
    best: Option<BestNode>,
    statistics: PlannerStatistics,
}

impl SearchState {
    fn goal_foot(&self, side: RobotSide) -> &Isometry3<f64> {
        match side {
            RobotSide::Left => &self.goal_left,
            RobotSide::Right => &self.goal_right,
        }
    }

    fn within_goal_tolerance(&self, side: RobotSide, pose: &Isometry3<f64>, parameters: &FootstepPlannerParameters) -> bool {
        let goal = self.goal_foot(side);
        let offset = pose.translation.vector.xy() - goal.translation.vector.xy();
        offset.norm() <= parameters.goal_distance_proximity + 1e-9
            && wrap_angle(yaw_of(pose) - yaw_of(goal)).abs() <= parameters.goal_yaw_proximity + 1e-9
    }

    /// Both feet are at the goal once `node` is placed, and the ending side matches.
    fn is_goal(&self, node: &FootstepNode, parameters: &FootstepPlannerParameters) -> bool {
        if self.goal_ending_side.is_some_and(|side| side != node.side) {
            return false;
        }
        let partner = self.graph.parent(node).unwrap_or(self.start_swing);
        let pose = self.snapper.get(node).and_then(|data| data.snap_transform);
        let partner_pose = self.snapper.get(&partner).and_then(|data| data.snap_transform);
        match (pose, partner_pose) {
            (Some(pose), Some(partner_pose)) => {
                self.within_goal_tolerance(node.side, &pose, parameters)
                    && self.within_goal_tolerance(partner.side, &partner_pose, parameters)
            }
            _ => false,
        }
    }

    fn best_node(&self) -> Option<FootstepNode> {
        self.best
            .and_then(|best| self.graph.get_index(best.index))
            .map(|(node, _)| *node)
    }

    fn best_path(&self) -> Vec<FootstepNode> {
        self.best_node()
            .and_then(|node| self.graph.path_from_start(&node))
            .unwrap_or_default()
    }
}

/// A* footstep planner. A planner keeps the state of its last search, so a search that timed
/// out or was cancelled can be resumed.
pub struct FootstepPlanner {
    parameters: FootstepPlannerParameters,
    checkers: NodeCheckerPipeline,
    expansion: ParameterBasedNodeExpansion,
    cost: FootstepCost,
    listener: Option<Box<dyn FootstepPlannerListener>>,
    cancellation: CancellationToken,
    state: PlannerState,
    search: Option<SearchState>,
}

impl FootstepPlanner {
    pub fn new(parameters: FootstepPlannerParameters) -> FootstepPlanner {
        FootstepPlanner {
            expansion: ParameterBasedNodeExpansion::new(&parameters),
            cost: FootstepCost::new(&parameters),
            checkers: NodeCheckerPipeline::default_checkers(),
            parameters,
            listener: None,
            cancellation: CancellationToken::new(),
            state: PlannerState::Idle,
            search: None,
        }
    }

    pub fn with_listener<L: FootstepPlannerListener + 'static>(mut self, listener: L) -> FootstepPlanner {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn with_checkers(mut self, checkers: NodeCheckerPipeline) -> FootstepPlanner {
        self.checkers = checkers;
        self
    }

    pub fn parameters(&self) -> &FootstepPlannerParameters {
        &self.parameters
    }

    pub fn checkers(&self) -> &NodeCheckerPipeline {
        &self.checkers
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Graph of the last search.
    pub fn graph(&self) -> Option<&FootstepGraph> {
        self.search.as_ref().map(|search| &search.graph)
    }

    /// Snapper of the last search, holding the snap results of every node it touched.
    pub fn snapper(&self) -> Option<&FootstepNodeSnapper> {
        self.search.as_ref().map(|search| &search.snapper)
    }

    /// Validates the request and searches for a plan. Input errors are returned before the
    /// planner enters [PlannerState::Planning]; everything that happens during the search is
    /// reported through the output status. A cancellation requested while the call is setting
    /// up the search still stops it.
    pub fn plan(&mut self, request: FootstepPlannerRequest) -> Result<FootstepPlannerOutput> {
        self.cancellation.reset();
        // A rejected request must not leave an older search around to be resumed.
        self.search = None;
        self.state = PlannerState::Idle;
        let budget = request.budget;
        self.start_search(request)?;
        self.run(budget)
    }

    /// Validates the request and seeds a new search with its start feet.
    fn start_search(&mut self, request: FootstepPlannerRequest) -> Result<()> {
        self.parameters.validate()?;
        check_pose(&request.start_left_sole, "start left sole")?;
        check_pose(&request.start_right_sole, "start right sole")?;
        let (goal_left, goal_right) = request.goal.feet(&self.parameters);
        check_pose(&goal_left, "goal left sole")?;
        check_pose(&goal_right, "goal right sole")?;
        request.terrain.validate()?;

        let stance_side = request.initial_stance_side;
        let stance_pose = *request.start_sole(stance_side);
        let swing_pose = *request.start_sole(stance_side.opposite());
        let start = FootstepNode::from_sole_pose(&stance_pose, stance_side);
        let start_swing = FootstepNode::from_sole_pose(&swing_pose, stance_side.opposite());

        for pose in [&stance_pose, &swing_pose] {
            let t = pose.translation.vector;
            if request.terrain.highest_surface_at(t.x, t.y).is_none() {
                info!("Start foot at ({:.2}, {:.2}) is not supported by the terrain", t.x, t.y);
            }
        }

        let mut snapper = FootstepNodeSnapper::new(request.terrain, &self.parameters);
        let foot = snapper.foot_polygon().clone();
        snapper.add_snap_data(
            start,
            FootstepNodeSnapData::new(stance_pose, foot.clone(), stance_pose.rotation * Vector3::z()),
        );
        snapper.add_snap_data(
            start_swing,
            FootstepNodeSnapData::new(swing_pose, foot, swing_pose.rotation * Vector3::z()),
        );

        let mut graph = FootstepGraph::new();
        let start_index = graph.initialize(start);
        let heuristic = DistanceAndYawHeuristic::new(&self.parameters, &goal_left, &goal_right);
        let mut open = OpenSet::default();
        open.push(start_index, 0.0, heuristic.compute(&start));

        let goal_midpoint = heuristic.goal_midpoint();
        info!(
            "Planning from {} to ({:.2}, {:.2}, yaw {:.2})",
            start,
            goal_midpoint.x,
            goal_midpoint.y,
            heuristic.goal_yaw()
        );
        self.search = Some(SearchState {
            snapper,
            graph,
            open,
            closed: FxHashMap::default(),
            diagnostics: FxIndexMap::default(),
            heuristic,
            goal_left,
            goal_right,
            goal_ending_side: request.goal_ending_side,
            start_swing,
            best: None,
            statistics: PlannerStatistics::default(),
        });
        Ok(())
    }

    /// Continues a search that timed out or was cancelled, keeping its graph, open set and
    /// snap cache.
    pub fn resume(&mut self, budget: SearchBudget) -> Result<FootstepPlannerOutput> {
        self.cancellation.reset();
        match self.state {
            PlannerState::Finished(PlannerStatus::TimedOut)
            | PlannerState::Finished(PlannerStatus::Cancelled)
                if self.search.is_some() =>
            {
                self.run(budget)
            }
            _ => Err(PlannerError::NothingToResume),
        }
    }

    fn run(&mut self, budget: SearchBudget) -> Result<FootstepPlannerOutput> {
        let mut search = self.search.take().ok_or(PlannerError::NothingToResume)?;
        self.state = PlannerState::Planning;
        let started = Instant::now();
        let mut expansions = 0;

        let (status, terminal) = loop {
            if self.cancellation.is_cancelled() {
                warn!("Footstep planning cancelled");
                break (PlannerStatus::Cancelled, None);
            }
            if budget.is_exceeded(expansions, started.elapsed()) {
                warn!(
                    "Footstep planning ran out of budget after {} expansions",
                    expansions
                );
                break (PlannerStatus::TimedOut, None);
            }
            let Some(entry) = search.open.pop() else {
                warn!("Open set exhausted before reaching the goal, is the goal reachable?");
                break (PlannerStatus::Infeasible, None);
            };
            search.statistics.iterations += 1;

            let Some((&node, record)) = search.graph.get_index(entry.index) else {
                continue;
            };
            // Outdated entry of a node that has been reached more cheaply since.
            if entry.cost > record.cost_from_start {
                continue;
            }
            if search
                .closed
                .get(&entry.index)
                .is_some_and(|&expanded_cost| expanded_cost <= entry.cost)
            {
                continue;
            }
            if search.is_goal(&node, &self.parameters) {
                break (PlannerStatus::SolutionFound, Some(node));
            }

            search.closed.insert(entry.index, entry.cost);
            search.statistics.expanded_nodes += 1;
            expansions += 1;
            let h = search.heuristic.compute(&node);
            let improves = search.best.map_or(true, |best| {
                h < best.heuristic || (h == best.heuristic && entry.cost < best.cost)
            });
            if improves {
                search.best = Some(BestNode {
                    index: entry.index,
                    heuristic: h,
                    cost: entry.cost,
                });
            }

            self.expand(&mut search, &node);

            if let Some(listener) = self.listener.as_deref_mut() {
                listener.tick_and_update(&SearchProgress {
                    iterations: search.statistics.iterations,
                    expanded_nodes: search.statistics.expanded_nodes,
                    graph: &search.graph,
                    best_node: search.best_node(),
                });
            }
        };

        search.statistics.graph_size = search.graph.len();
        search.statistics.planning_time += started.elapsed();
        let terminal = match terminal {
            Some(node) => node,
            None => search
                .best_node()
                .or_else(|| search.graph.start())
                .ok_or(PlannerError::NothingToResume)?,
        };
        let plan = extract_plan(&search.graph, &search.snapper, &terminal);
        let statistics = search.statistics;
        info!(
            "Footstep planning finished: {:?}, {} iterations, {} expanded, {} rejected ({:.1}%), {} left open, {:.3}s",
            status,
            statistics.iterations,
            statistics.expanded_nodes,
            statistics.rejected_nodes,
            statistics.percent_rejected(),
            search.open.len(),
            statistics.planning_time.as_secs_f64()
        );
        if let Some(listener) = self.listener.as_deref_mut() {
            let path = match status {
                PlannerStatus::SolutionFound => search.graph.path_from_start(&terminal).unwrap_or_default(),
                _ => search.best_path(),
            };
            listener.planner_finished(status, &path);
        }
        let diagnostics = search.diagnostics.clone();
        self.search = Some(search);
        self.state = PlannerState::Finished(status);

        Ok(FootstepPlannerOutput {
            status,
            plan: plan?,
            diagnostics,
            statistics,
            optimal: status == PlannerStatus::SolutionFound && self.parameters.heuristic_weight <= 1.0,
        })
    }

    /// Checks every successor of `node` and records the accepted ones in the graph.
    fn expand(&mut self, search: &mut SearchState, node: &FootstepNode) {
        let stance_pose = search.snapper.snap_transform(node);
        for candidate in self.expansion.expand(node) {
            search.statistics.checked_nodes += 1;
            let mut ctx = CheckerContext::new(&self.parameters, &mut search.snapper, &search.graph)
                .with_start_swing(search.start_swing);
            if !self.checkers.is_valid(&candidate, Some(node), &mut ctx) {
                let reason = self
                    .checkers
                    .rejection_reason()
                    .unwrap_or(RejectionReason::CouldNotSnap);
                trace!("Rejected {} from {}: {}", candidate, node, reason);
                search.statistics.rejected_nodes += 1;
                search.diagnostics.insert(candidate, reason);
                if let Some(listener) = self.listener.as_deref_mut() {
                    listener.node_rejected(&candidate, Some(node), reason);
                }
                continue;
            }

            let (Some(stance_pose), Some(candidate_pose)) =
                (stance_pose, search.snapper.snap_transform(&candidate))
            else {
                continue;
            };
            let edge_cost = self
                .cost
                .edge_cost(&stance_pose, &candidate_pose, candidate.side);
            if let Some((index, cost)) = search.graph.check_and_set_edge(node, candidate, edge_cost) {
                search
                    .open
                    .push(index, cost, search.heuristic.compute(&candidate));
                if let Some(listener) = self.listener.as_deref_mut() {
                    listener.node_added(&candidate, Some(node));
                }
            }
        }
    }
}

fn check_pose(pose: &Isometry3<f64>, what: &'static str) -> Result<()> {
    let finite = pose
        .translation
        .vector
        .iter()
        .chain(pose.rotation.coords.iter())
        .all(|v| v.is_finite());
    if finite {
        Ok(())
    } else {
        Err(PlannerError::NonFinitePose { what })
    }
}
