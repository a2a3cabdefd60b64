use super::{CheckerContext, FootstepNodeChecker, RejectionReason, BOUND_EPSILON};
use crate::geometry::z_up_frame;
use crate::node::{wrap_angle, yaw_of, FootstepNode, RobotSide};
use crate::parameters::FootstepPlannerParameters;
use nalgebra::{Isometry3, Point3};

/// Placement of a foot relative to a reference sole, measured in the reference's Z-up frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOffset {
    pub forward: f64,
    /// Lateral offset, positive away from the reference foot.
    pub width: f64,
    pub height: f64,
    pub yaw: f64,
}

impl StepOffset {
    pub fn between(reference: &Isometry3<f64>, placed: &Isometry3<f64>, placed_side: RobotSide) -> StepOffset {
        let relative = z_up_frame(reference)
            .inverse_transform_point(&Point3::from(placed.translation.vector));
        StepOffset {
            forward: relative.x,
            width: placed_side.negate_if_right(relative.y),
            height: relative.z,
            yaw: wrap_angle(yaw_of(placed) - yaw_of(reference)),
        }
    }

    /// Distance from the ideal lateral placement straight beside the reference.
    pub fn reach(&self, ideal_step_width: f64) -> f64 {
        self.forward.hypot(self.width - ideal_step_width)
    }

    /// Planar distance from the reference.
    pub fn planar_distance(&self) -> f64 {
        self.forward.hypot(self.width)
    }
}

/// Bounds the step relative to the stance foot, and the swing relative to where the swinging
/// foot lifted off.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepGeometryChecker;

impl StepGeometryChecker {
    /// Checks a step offset from the stance foot against the reachability bounds.
    pub fn check_step(
        &self,
        step: &StepOffset,
        parameters: &FootstepPlannerParameters,
    ) -> Result<(), RejectionReason> {
        let p = parameters;
        let eps = BOUND_EPSILON;
        if step.width < p.min_step_width - eps {
            return Err(RejectionReason::StepNotWideEnough);
        }
        if step.width > p.max_step_width + eps {
            return Err(RejectionReason::StepTooWide);
        }
        if step.forward < p.min_step_length - eps {
            return Err(RejectionReason::StepNotLongEnough);
        }
        if step.height.abs() > p.max_step_z + eps {
            return Err(RejectionReason::StepTooHighOrLow);
        }
        if step.forward > p.max_step_x_when_forward_and_down + eps
            && step.height < -p.max_step_z_when_forward_and_down - eps
        {
            return Err(RejectionReason::StepTooForwardAndDown);
        }
        let reach = step.reach(p.ideal_step_width);
        if reach > p.max_step_reach + eps {
            return Err(RejectionReason::StepTooFar);
        }
        if step.height > p.max_step_z_when_stepping_up + eps
            && reach > p.max_step_reach_when_stepping_up + eps
        {
            return Err(RejectionReason::StepTooFarAndHigh);
        }
        if step.yaw.abs() > p.max_step_yaw + eps {
            return Err(RejectionReason::StepYawedTooMuch);
        }
        Ok(())
    }

    /// Checks the offset of the candidate from the sole it swings from, two steps back. The
    /// bounds are the single step ones scaled by `translation_scale_from_grandparent_node`.
    pub fn check_swing(
        &self,
        swing: &StepOffset,
        parameters: &FootstepPlannerParameters,
    ) -> Result<(), RejectionReason> {
        let p = parameters;
        let scale = p.translation_scale_from_grandparent_node;
        if scale <= 0.0 {
            return Ok(());
        }
        let eps = BOUND_EPSILON;
        let reach = swing.planar_distance();
        if swing.height > p.max_step_z_when_stepping_up + eps
            && reach > scale * p.max_step_reach_when_stepping_up + eps
        {
            return Err(RejectionReason::SwingReachExceeded);
        }
        if swing.height < -p.max_step_z_when_forward_and_down - eps
            && reach > scale * p.max_step_x_when_forward_and_down + eps
        {
            return Err(RejectionReason::SwingReachExceeded);
        }
        if swing.height.abs() > scale * p.max_step_z + eps {
            return Err(RejectionReason::SwingHeightExceeded);
        }
        Ok(())
    }
}

impl FootstepNodeChecker for StepGeometryChecker {
    fn name(&self) -> &'static str {
        "step geometry"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        let Some(stance) = stance else {
            return Ok(());
        };
        let placed = ctx
            .snapper
            .snap_transform(candidate)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let stance_pose = ctx
            .snapper
            .snap_transform(stance)
            .ok_or(RejectionReason::CouldNotSnap)?;
        self.check_step(
            &StepOffset::between(&stance_pose, &placed, candidate.side),
            ctx.parameters,
        )?;

        if ctx.parameters.translation_scale_from_grandparent_node <= 0.0 {
            return Ok(());
        }
        let Some(grandparent) = ctx.grandparent(stance) else {
            return Ok(());
        };
        match ctx.snapper.snap_transform(&grandparent) {
            Some(lift_off) => self.check_swing(
                &StepOffset::between(&lift_off, &placed, candidate.side),
                ctx.parameters,
            ),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FootstepGraph;
    use crate::snapper::FootstepNodeSnapper;
    use crate::terrain::{PlanarRegion, PlanarRegionsList, Terrain};
    use proptest::prelude::*;

    fn check(candidate: FootstepNode, stance: FootstepNode) -> Result<(), RejectionReason> {
        let parameters = FootstepPlannerParameters::default();
        let mut snapper = FootstepNodeSnapper::new(Terrain::FlatGround { height: 0.0 }, &parameters);
        let graph = FootstepGraph::new();
        let mut ctx = CheckerContext::new(&parameters, &mut snapper, &graph);
        StepGeometryChecker.check(&candidate, Some(&stance), &mut ctx)
    }

    fn offset(forward: f64, width: f64, height: f64) -> StepOffset {
        StepOffset {
            forward,
            width,
            height,
            yaw: 0.0,
        }
    }

    /// A step exactly at the maximum width passes, one lattice cell wider does not.
    #[test]
    fn max_width_is_inclusive() {
        let stance = FootstepNode::new(0, 0, 0, RobotSide::Right);
        assert_eq!(check(FootstepNode::new(0, 8, 0, RobotSide::Left), stance), Ok(()));
        assert_eq!(
            check(FootstepNode::new(0, 9, 0, RobotSide::Left), stance),
            Err(RejectionReason::StepTooWide)
        );
    }

    #[test]
    fn width_is_sided() {
        // A right foot placed to the left of a left stance crosses over.
        let stance = FootstepNode::new(0, 0, 0, RobotSide::Left);
        assert_eq!(
            check(FootstepNode::new(0, 2, 0, RobotSide::Right), stance),
            Err(RejectionReason::StepNotWideEnough)
        );
        assert_eq!(check(FootstepNode::new(0, -4, 0, RobotSide::Right), stance), Ok(()));
    }

    #[test]
    fn step_bounds() {
        let stance = FootstepNode::new(0, 0, 0, RobotSide::Right);
        assert_eq!(
            check(FootstepNode::new(-4, 4, 0, RobotSide::Left), stance),
            Err(RejectionReason::StepNotLongEnough)
        );
        assert_eq!(
            check(FootstepNode::new(10, 4, 0, RobotSide::Left), stance),
            Err(RejectionReason::StepTooFar)
        );
        assert_eq!(check(FootstepNode::new(9, 4, 0, RobotSide::Left), stance), Ok(()));
        assert_eq!(
            check(FootstepNode::new(6, 4, 2, RobotSide::Left), stance),
            Err(RejectionReason::StepYawedTooMuch)
        );
        assert_eq!(check(FootstepNode::new(6, 4, 1, RobotSide::Left), stance), Ok(()));
    }

    #[test]
    fn height_bounds() {
        let parameters = FootstepPlannerParameters::default();
        let checker = StepGeometryChecker;
        assert_eq!(
            checker.check_step(&offset(0.1, 0.2, 0.3), &parameters),
            Err(RejectionReason::StepTooHighOrLow)
        );
        assert_eq!(
            checker.check_step(&offset(0.3, 0.2, -0.15), &parameters),
            Err(RejectionReason::StepTooForwardAndDown)
        );
        assert_eq!(checker.check_step(&offset(0.2, 0.2, -0.15), &parameters), Ok(()));
        assert_eq!(
            checker.check_step(&offset(0.4, 0.2, 0.15), &parameters),
            Err(RejectionReason::StepTooFarAndHigh)
        );
        assert_eq!(checker.check_step(&offset(0.3, 0.2, 0.15), &parameters), Ok(()));
    }

    #[test]
    fn swing_bounds() {
        let mut parameters = FootstepPlannerParameters::default();
        let checker = StepGeometryChecker;
        assert_eq!(
            checker.check_swing(&offset(0.6, 0.0, 0.2), &parameters),
            Err(RejectionReason::SwingReachExceeded)
        );
        assert_eq!(
            checker.check_swing(&offset(0.4, 0.0, -0.2), &parameters),
            Err(RejectionReason::SwingReachExceeded)
        );
        assert_eq!(
            checker.check_swing(&offset(0.1, 0.0, 0.4), &parameters),
            Err(RejectionReason::SwingHeightExceeded)
        );
        assert_eq!(checker.check_swing(&offset(0.9, 0.0, 0.0), &parameters), Ok(()));
        parameters.translation_scale_from_grandparent_node = 0.0;
        assert_eq!(checker.check_swing(&offset(0.6, 0.0, 0.2), &parameters), Ok(()));
    }

    /// Two steps up a 0.12 m staircase with treads too deep to span in one swing.
    #[test]
    fn grandparent_limits_swing_up_stairs() {
        let parameters = FootstepPlannerParameters::default();
        let terrain = Terrain::from(PlanarRegionsList::new(vec![
            PlanarRegion::horizontal_rectangle(-1.0, -1.0, 0.2, 1.0, 0.0),
            PlanarRegion::horizontal_rectangle(0.2, -1.0, 0.5, 1.0, 0.12),
            PlanarRegion::horizontal_rectangle(0.5, -1.0, 0.8, 1.0, 0.24),
        ]));
        let mut snapper = FootstepNodeSnapper::new(terrain, &parameters);
        let lift_off = FootstepNode::new(0, 2, 0, RobotSide::Left);
        let stance = FootstepNode::new(7, -2, 0, RobotSide::Right);
        let candidate = FootstepNode::new(13, 2, 0, RobotSide::Left);
        let mut graph = FootstepGraph::new();
        graph.initialize(lift_off);
        graph.check_and_set_edge(&lift_off, stance, 1.0);
        let mut ctx = CheckerContext::new(&parameters, &mut snapper, &graph);
        assert_eq!(
            StepGeometryChecker.check(&candidate, Some(&stance), &mut ctx),
            Err(RejectionReason::SwingReachExceeded)
        );
        let shorter = FootstepNode::new(7, 2, 0, RobotSide::Left);
        assert_eq!(StepGeometryChecker.check(&shorter, Some(&stance), &mut ctx), Ok(()));
    }

    proptest! {
        /// Pulling a step towards the ideal placement never makes it too far.
        #[test]
        fn reach_check_is_monotone(
            forward in -0.15f64..0.8,
            width in 0.1f64..0.4,
            scale in 0.0f64..1.0,
        ) {
            let parameters = FootstepPlannerParameters::default();
            let checker = StepGeometryChecker;
            let ideal = parameters.ideal_step_width;
            let original = offset(forward, width, 0.0);
            let scaled = offset(forward * scale, ideal + (width - ideal) * scale, 0.0);
            if checker.check_step(&scaled, &parameters) == Err(RejectionReason::StepTooFar) {
                prop_assert_eq!(
                    checker.check_step(&original, &parameters),
                    Err(RejectionReason::StepTooFar)
                );
            }
            if checker.check_step(&original, &parameters).is_ok() {
                prop_assert!(checker.check_step(&scaled, &parameters).is_ok());
            }
        }
    }
}
