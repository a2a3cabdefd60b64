//! Edge cost and heuristic of the footstep search.
use crate::checker::StepOffset;
use crate::node::{wrap_angle, yaw_of, FootstepNode, RobotSide, GRID_SIZE_XY};
use crate::parameters::FootstepPlannerParameters;
use nalgebra::{Isometry3, Vector2};

/// Cost of a step: a constant per step plus weighted deviations from the ideal step.
#[derive(Clone, Debug)]
pub struct FootstepCost {
    parameters: FootstepPlannerParameters,
}

impl FootstepCost {
    pub fn new(parameters: &FootstepPlannerParameters) -> FootstepCost {
        FootstepCost {
            parameters: parameters.clone(),
        }
    }

    /// Cost of placing `child_side` at `child` while standing on `parent`, measured in the
    /// parent's Z-up frame.
    pub fn edge_cost(&self, parent: &Isometry3<f64>, child: &Isometry3<f64>, child_side: RobotSide) -> f64 {
        let p = &self.parameters;
        let step = StepOffset::between(parent, child, child_side);
        p.cost_per_step
            + p.forward_weight * (step.forward - p.ideal_step_length).abs()
            + p.lateral_weight * (step.width - p.ideal_step_width).abs()
            + p.yaw_weight * step.yaw.abs()
            + p.step_up_weight * step.height.max(0.0)
            + p.step_down_weight * (-step.height).max(0.0)
    }
}

/// Lower bound on the remaining cost from the number of steps still needed to cover the distance
/// to the goal and the yaw still to turn, scaled by `heuristic_weight`.
#[derive(Clone, Debug)]
pub struct DistanceAndYawHeuristic {
    goal_midpoint: Vector2<f64>,
    goal_yaw: f64,
    weight: f64,
    cost_per_step: f64,
    yaw_weight: f64,
    max_stride: f64,
    distance_slack: f64,
    yaw_slack: f64,
}

impl DistanceAndYawHeuristic {
    /// Heuristic towards standing on the given goal soles. The goal is their midpoint and mean
    /// heading, and the slack lets every node that passes the goal test estimate zero.
    pub fn new(
        parameters: &FootstepPlannerParameters,
        goal_left: &Isometry3<f64>,
        goal_right: &Isometry3<f64>,
    ) -> DistanceAndYawHeuristic {
        let (left, right) = (goal_left.translation.vector.xy(), goal_right.translation.vector.xy());
        let (left_yaw, right_yaw) = (yaw_of(goal_left), yaw_of(goal_right));
        let heading = Vector2::new(left_yaw.cos(), left_yaw.sin())
            + Vector2::new(right_yaw.cos(), right_yaw.sin());
        DistanceAndYawHeuristic {
            goal_midpoint: (left + right) / 2.0,
            goal_yaw: heading.y.atan2(heading.x),
            weight: parameters.heuristic_weight,
            cost_per_step: parameters.cost_per_step,
            yaw_weight: parameters.yaw_weight,
            max_stride: parameters.max_stride(),
            distance_slack: parameters.goal_distance_proximity
                + (left - right).norm() / 2.0
                + GRID_SIZE_XY,
            yaw_slack: parameters.goal_yaw_proximity
                + wrap_angle(left_yaw - right_yaw).abs() / 2.0,
        }
    }

    pub fn goal_midpoint(&self) -> Vector2<f64> {
        self.goal_midpoint
    }

    pub fn goal_yaw(&self) -> f64 {
        self.goal_yaw
    }

    pub fn compute(&self, node: &FootstepNode) -> f64 {
        let distance = (node.position() - self.goal_midpoint).norm();
        let steps = (distance - self.distance_slack).max(0.0) / self.max_stride;
        let yaw = (wrap_angle(node.yaw() - self.goal_yaw).abs() - self.yaw_slack).max(0.0);
        self.weight * (self.cost_per_step * steps + self.yaw_weight * yaw)
    }
}
