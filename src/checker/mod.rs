//! Feasibility checks applied to every candidate footstep before it enters the graph.
//!
//! Each check is a [FootstepNodeChecker]. A [NodeCheckerPipeline] runs an ordered list of them
//! and stops at the first rejection, so cheap checks should come first. The pipeline is itself
//! a checker, which lets pipelines nest.
mod body;
mod cliff;
mod collision;
mod foothold;
mod geometry;
mod snap;

pub use body::BodyCollisionChecker;
pub use cliff::CliffAvoidanceChecker;
pub use collision::ObstacleBetweenStepsChecker;
pub use foothold::FootholdAreaChecker;
pub use geometry::{StepGeometryChecker, StepOffset};
pub use snap::SnapValidityChecker;

use crate::graph::FootstepGraph;
use crate::node::FootstepNode;
use crate::parameters::FootstepPlannerParameters;
use crate::snapper::FootstepNodeSnapper;
use core::fmt;

/// Tolerance that keeps bounds inclusive against floating point noise.
pub const BOUND_EPSILON: f64 = 1e-9;

/// Why a candidate footstep was rejected. Purely diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectionReason {
    CouldNotSnap,
    SurfaceTooSteep,
    FootholdAreaTooSmall,
    StepNotWideEnough,
    StepTooWide,
    StepNotLongEnough,
    StepTooHighOrLow,
    StepTooForwardAndDown,
    StepTooFar,
    StepTooFarAndHigh,
    StepYawedTooMuch,
    /// Distance covered by the swinging foot since it left the ground is too large.
    SwingReachExceeded,
    /// Height change of the swinging foot since it left the ground is too large.
    SwingHeightExceeded,
    /// Terrain rising too high right next to the foothold.
    TooCloseToLedge,
    ObstacleBlockingStep,
    BodyBoxCollision,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            RejectionReason::CouldNotSnap => "could not snap",
            RejectionReason::SurfaceTooSteep => "surface too steep",
            RejectionReason::FootholdAreaTooSmall => "foothold area too small",
            RejectionReason::StepNotWideEnough => "step not wide enough",
            RejectionReason::StepTooWide => "step too wide",
            RejectionReason::StepNotLongEnough => "step not long enough",
            RejectionReason::StepTooHighOrLow => "step too high or low",
            RejectionReason::StepTooForwardAndDown => "step too forward and down",
            RejectionReason::StepTooFar => "step too far",
            RejectionReason::StepTooFarAndHigh => "step too far and high",
            RejectionReason::StepYawedTooMuch => "step yawed too much",
            RejectionReason::SwingReachExceeded => "swing reach exceeded",
            RejectionReason::SwingHeightExceeded => "swing height exceeded",
            RejectionReason::TooCloseToLedge => "too close to ledge",
            RejectionReason::ObstacleBlockingStep => "obstacle blocking step",
            RejectionReason::BodyBoxCollision => "body box collision",
        };
        write!(f, "{}", text)
    }
}

/// What a checker may look at while judging a candidate.
pub struct CheckerContext<'a> {
    pub parameters: &'a FootstepPlannerParameters,
    pub snapper: &'a mut FootstepNodeSnapper,
    pub graph: &'a FootstepGraph,
    /// The foot that is not the start node, which the first step swings from.
    pub start_swing: Option<FootstepNode>,
}

impl<'a> CheckerContext<'a> {
    pub fn new(
        parameters: &'a FootstepPlannerParameters,
        snapper: &'a mut FootstepNodeSnapper,
        graph: &'a FootstepGraph,
    ) -> CheckerContext<'a> {
        CheckerContext {
            parameters,
            snapper,
            graph,
            start_swing: None,
        }
    }

    pub fn with_start_swing(mut self, start_swing: FootstepNode) -> CheckerContext<'a> {
        self.start_swing = Some(start_swing);
        self
    }

    /// Where the swinging foot lifted off for a candidate placed from `stance`: the stance's
    /// parent, or the start swing foot when the stance is the start node.
    pub fn grandparent(&self, stance: &FootstepNode) -> Option<FootstepNode> {
        let record = self.graph.record(stance)?;
        match record.parent {
            Some(_) => self.graph.parent(stance),
            None => self.start_swing,
        }
    }
}

pub trait FootstepNodeChecker: Send {
    fn name(&self) -> &'static str;

    /// Judges `candidate` as a step placed while standing on `stance`. A missing stance means
    /// the candidate is judged on its own.
    fn check(
        &self,
        candidate: &FootstepNode,
        stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason>;
}

/// Ordered list of checkers that short-circuits on the first rejection.
#[derive(Default)]
pub struct NodeCheckerPipeline {
    checkers: Vec<Box<dyn FootstepNodeChecker>>,
    rejection_reason: Option<RejectionReason>,
}

impl NodeCheckerPipeline {
    /// A pipeline without any checker, which accepts everything.
    pub fn new() -> NodeCheckerPipeline {
        NodeCheckerPipeline::default()
    }

    /// Snap validity, foothold area, step geometry, cliff, obstacle and body checks, in that
    /// order. The last three only reject when enabled in the parameters.
    pub fn default_checkers() -> NodeCheckerPipeline {
        NodeCheckerPipeline::new()
            .with(SnapValidityChecker)
            .with(FootholdAreaChecker)
            .with(StepGeometryChecker)
            .with(CliffAvoidanceChecker)
            .with(ObstacleBetweenStepsChecker)
            .with(BodyCollisionChecker)
    }

    pub fn with<C: FootstepNodeChecker + 'static>(mut self, checker: C) -> NodeCheckerPipeline {
        self.push(checker);
        self
    }

    pub fn push<C: FootstepNodeChecker + 'static>(&mut self, checker: C) {
        self.checkers.push(Box::new(checker));
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn checker_names(&self) -> Vec<&'static str> {
        self.checkers.iter().map(|c| c.name()).collect()
    }

    /// Runs the checkers in order and remembers the reason of a rejection.
    pub fn is_valid(
        &mut self,
        candidate: &FootstepNode,
        stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> bool {
        match self.check(candidate, stance, ctx) {
            Ok(()) => {
                self.rejection_reason = None;
                true
            }
            Err(reason) => {
                self.rejection_reason = Some(reason);
                false
            }
        }
    }

    /// Reason of the last rejection by [is_valid](Self::is_valid), `None` if it accepted.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason
    }
}

impl FootstepNodeChecker for NodeCheckerPipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        self.checkers
            .iter()
            .try_for_each(|checker| checker.check(candidate, stance, ctx))
    }
}

impl fmt::Debug for NodeCheckerPipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeCheckerPipeline")
            .field("checkers", &self.checker_names())
            .field("rejection_reason", &self.rejection_reason)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RobotSide;
    use crate::terrain::Terrain;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        verdict: Result<(), RejectionReason>,
    }

    impl FootstepNodeChecker for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn check(
            &self,
            _: &FootstepNode,
            _: Option<&FootstepNode>,
            _: &mut CheckerContext<'_>,
        ) -> Result<(), RejectionReason> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }
    }

    #[test]
    fn default_order() {
        assert_eq!(
            NodeCheckerPipeline::default_checkers().checker_names(),
            vec![
                "snap validity",
                "foothold area",
                "step geometry",
                "cliff avoidance",
                "obstacle between steps",
                "body collision"
            ]
        );
    }

    /// The first rejection stops the pipeline and is remembered until the next accepted node.
    #[test]
    fn short_circuits_on_first_rejection() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut pipeline = NodeCheckerPipeline::new()
            .with(Counting {
                calls: first.clone(),
                verdict: Err(RejectionReason::StepTooFar),
            })
            .with(Counting {
                calls: second.clone(),
                verdict: Ok(()),
            });
        let parameters = FootstepPlannerParameters::default();
        let mut snapper = FootstepNodeSnapper::new(Terrain::FlatGround { height: 0.0 }, &parameters);
        let graph = FootstepGraph::new();
        let mut ctx = CheckerContext::new(&parameters, &mut snapper, &graph);
        let node = FootstepNode::new(0, 0, 0, RobotSide::Left);
        assert!(!pipeline.is_valid(&node, None, &mut ctx));
        assert_eq!(pipeline.rejection_reason(), Some(RejectionReason::StepTooFar));
        assert_eq!(pipeline.rejection_reason(), Some(RejectionReason::StepTooFar));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        let mut accepting = NodeCheckerPipeline::new();
        assert!(accepting.is_valid(&node, None, &mut ctx));
        assert_eq!(accepting.rejection_reason(), None);
    }

    #[test]
    fn grandparent_falls_back_to_start_swing() {
        let parameters = FootstepPlannerParameters::default();
        let mut snapper = FootstepNodeSnapper::new(Terrain::FlatGround { height: 0.0 }, &parameters);
        let start = FootstepNode::new(0, -2, 0, RobotSide::Right);
        let swing = FootstepNode::new(0, 2, 0, RobotSide::Left);
        let step = FootstepNode::new(6, 2, 0, RobotSide::Left);
        let mut graph = FootstepGraph::new();
        graph.initialize(start);
        graph.check_and_set_edge(&start, step, 1.0);
        let ctx = CheckerContext::new(&parameters, &mut snapper, &graph).with_start_swing(swing);
        assert_eq!(ctx.grandparent(&start), Some(swing));
        assert_eq!(ctx.grandparent(&step), Some(start));
        assert_eq!(ctx.grandparent(&swing), None);
    }
}
