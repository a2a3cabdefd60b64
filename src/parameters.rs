use crate::error::{PlannerError, Result};
use crate::node::{GRID_SIZE_XY, YAW_RESOLUTION};

/// Reachability, snapping, cost and goal parameters of the planner. All lengths are in meters
/// and all angles in radians. Lateral quantities are sided so that positive means away from
/// the stance foot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FootstepPlannerParameters {
    pub ideal_step_length: f64,
    pub ideal_step_width: f64,
    pub min_step_width: f64,
    pub max_step_width: f64,
    pub min_step_length: f64,
    /// Bound on `hypot(forward, width - ideal_step_width)`.
    pub max_step_reach: f64,
    pub max_step_yaw: f64,
    pub max_step_z: f64,
    pub max_step_x_when_forward_and_down: f64,
    pub max_step_z_when_forward_and_down: f64,
    pub max_step_reach_when_stepping_up: f64,
    pub max_step_z_when_stepping_up: f64,
    /// Scales the bounds used when comparing a candidate with the start of its swing, two steps
    /// back. Values `<= 0` disable the comparison.
    pub translation_scale_from_grandparent_node: f64,

    pub foot_length: f64,
    pub foot_width: f64,
    pub min_foothold_percent: f64,
    pub max_surface_incline: f64,

    /// Terrain rising more than this next to a foothold counts as a cliff.
    pub cliff_height_to_avoid: f64,
    /// How far a foothold keeps from the bottom of a cliff. Values `<= 0` disable the check.
    pub min_distance_from_cliff_bottoms: f64,

    pub check_for_path_collisions: bool,
    pub obstacle_clearance_height: f64,
    pub obstacle_check_height: f64,

    pub check_for_body_box_collisions: bool,
    /// Extent of the body box along the walking direction.
    pub body_box_depth: f64,
    pub body_box_width: f64,
    pub body_box_height: f64,
    /// Forward offset of the body box center from the midpoint between the feet.
    pub body_box_base_x: f64,
    /// Height of the bottom of the body box above the higher foot.
    pub body_box_base_z: f64,

    pub cost_per_step: f64,
    pub forward_weight: f64,
    pub lateral_weight: f64,
    pub yaw_weight: f64,
    pub step_up_weight: f64,
    pub step_down_weight: f64,
    /// Inflation of the heuristic. The search only guarantees optimal plans at or below 1.
    pub heuristic_weight: f64,

    pub goal_distance_proximity: f64,
    pub goal_yaw_proximity: f64,
}

impl Default for FootstepPlannerParameters {
    fn default() -> FootstepPlannerParameters {
        FootstepPlannerParameters {
            ideal_step_length: 0.3,
            ideal_step_width: 0.2,
            min_step_width: 0.1,
            max_step_width: 0.4,
            min_step_length: -0.15,
            max_step_reach: 0.45,
            max_step_yaw: 0.4,
            max_step_z: 0.25,
            max_step_x_when_forward_and_down: 0.25,
            max_step_z_when_forward_and_down: 0.1,
            max_step_reach_when_stepping_up: 0.35,
            max_step_z_when_stepping_up: 0.1,
            translation_scale_from_grandparent_node: 1.5,
            foot_length: 0.22,
            foot_width: 0.11,
            min_foothold_percent: 0.9,
            max_surface_incline: 0.7,
            cliff_height_to_avoid: 0.15,
            min_distance_from_cliff_bottoms: 0.0,
            check_for_path_collisions: true,
            obstacle_clearance_height: 0.05,
            obstacle_check_height: 0.5,
            check_for_body_box_collisions: false,
            body_box_depth: 0.3,
            body_box_width: 0.7,
            body_box_height: 1.5,
            body_box_base_x: 0.0,
            body_box_base_z: 0.25,
            cost_per_step: 0.15,
            forward_weight: 0.2,
            lateral_weight: 0.2,
            yaw_weight: 0.1,
            step_up_weight: 0.0,
            step_down_weight: 0.0,
            heuristic_weight: 1.5,
            goal_distance_proximity: 0.08,
            goal_yaw_proximity: 0.2,
        }
    }
}

fn invalid(name: &'static str, reason: &str) -> PlannerError {
    PlannerError::InvalidParameter {
        name,
        reason: reason.to_owned(),
    }
}

impl FootstepPlannerParameters {
    /// Largest planar displacement a single accepted step can produce relative to its stance foot.
    pub fn max_stride(&self) -> f64 {
        self.max_step_reach
            .max(self.min_step_length.abs())
            .hypot(self.max_step_width)
    }

    /// Rejects parameter sets the search cannot work with, such as empty reachability envelopes
    /// or goal tolerances finer than the lattice.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("ideal_step_length", self.ideal_step_length),
            ("ideal_step_width", self.ideal_step_width),
            ("min_step_width", self.min_step_width),
            ("max_step_width", self.max_step_width),
            ("min_step_length", self.min_step_length),
            ("max_step_reach", self.max_step_reach),
            ("max_step_yaw", self.max_step_yaw),
            ("max_step_z", self.max_step_z),
            (
                "max_step_x_when_forward_and_down",
                self.max_step_x_when_forward_and_down,
            ),
            (
                "max_step_z_when_forward_and_down",
                self.max_step_z_when_forward_and_down,
            ),
            (
                "max_step_reach_when_stepping_up",
                self.max_step_reach_when_stepping_up,
            ),
            (
                "max_step_z_when_stepping_up",
                self.max_step_z_when_stepping_up,
            ),
            (
                "translation_scale_from_grandparent_node",
                self.translation_scale_from_grandparent_node,
            ),
            ("foot_length", self.foot_length),
            ("foot_width", self.foot_width),
            ("min_foothold_percent", self.min_foothold_percent),
            ("max_surface_incline", self.max_surface_incline),
            ("cliff_height_to_avoid", self.cliff_height_to_avoid),
            (
                "min_distance_from_cliff_bottoms",
                self.min_distance_from_cliff_bottoms,
            ),
            ("obstacle_clearance_height", self.obstacle_clearance_height),
            ("obstacle_check_height", self.obstacle_check_height),
            ("body_box_depth", self.body_box_depth),
            ("body_box_width", self.body_box_width),
            ("body_box_height", self.body_box_height),
            ("body_box_base_x", self.body_box_base_x),
            ("body_box_base_z", self.body_box_base_z),
            ("cost_per_step", self.cost_per_step),
            ("forward_weight", self.forward_weight),
            ("lateral_weight", self.lateral_weight),
            ("yaw_weight", self.yaw_weight),
            ("step_up_weight", self.step_up_weight),
            ("step_down_weight", self.step_down_weight),
            ("heuristic_weight", self.heuristic_weight),
            ("goal_distance_proximity", self.goal_distance_proximity),
            ("goal_yaw_proximity", self.goal_yaw_proximity),
        ];
        if let Some(&(name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(name, "must be finite"));
        }
        if self.max_step_reach <= 0.0 {
            return Err(invalid("max_step_reach", "must be positive"));
        }
        if self.min_step_width < 0.0 {
            return Err(invalid("min_step_width", "must not be negative"));
        }
        if self.max_step_width <= self.min_step_width {
            return Err(invalid(
                "max_step_width",
                "must be larger than min_step_width",
            ));
        }
        if self.min_step_length > self.max_step_reach {
            return Err(invalid(
                "min_step_length",
                "must not exceed max_step_reach",
            ));
        }
        if self.max_step_z <= 0.0 {
            return Err(invalid("max_step_z", "must be positive"));
        }
        if self.max_step_yaw < 0.0 {
            return Err(invalid("max_step_yaw", "must not be negative"));
        }
        if self.foot_length <= 0.0 || self.foot_width <= 0.0 {
            return Err(invalid("foot_length", "foot dimensions must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_foothold_percent) {
            return Err(invalid("min_foothold_percent", "must lie in [0, 1]"));
        }
        let weights = [
            ("cost_per_step", self.cost_per_step),
            ("forward_weight", self.forward_weight),
            ("lateral_weight", self.lateral_weight),
            ("yaw_weight", self.yaw_weight),
            ("step_up_weight", self.step_up_weight),
            ("step_down_weight", self.step_down_weight),
            ("heuristic_weight", self.heuristic_weight),
            ("goal_distance_proximity", self.goal_distance_proximity),
            ("goal_yaw_proximity", self.goal_yaw_proximity),
        ];
        if let Some(&(name, _)) = weights.iter().find(|(_, v)| *v < 0.0) {
            return Err(invalid(name, "must not be negative"));
        }
        if self.check_for_body_box_collisions
            && (self.body_box_depth <= 0.0 || self.body_box_width <= 0.0 || self.body_box_height <= 0.0)
        {
            return Err(invalid("body_box_depth", "body box dimensions must be positive"));
        }
        // Coarser than the lattice, otherwise a goal between lattice poses is never reached.
        if self.goal_distance_proximity < GRID_SIZE_XY * std::f64::consts::FRAC_1_SQRT_2 {
            return Err(invalid(
                "goal_distance_proximity",
                "must cover half a diagonal of the xy lattice",
            ));
        }
        if self.goal_yaw_proximity < YAW_RESOLUTION / 2.0 {
            return Err(invalid(
                "goal_yaw_proximity",
                "must cover half of the yaw resolution",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(FootstepPlannerParameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_envelope() {
        let mut parameters = FootstepPlannerParameters::default();
        parameters.max_step_width = parameters.min_step_width;
        assert!(matches!(
            parameters.validate(),
            Err(PlannerError::InvalidParameter {
                name: "max_step_width",
                ..
            })
        ));

        let mut parameters = FootstepPlannerParameters::default();
        parameters.max_step_reach = 0.0;
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut parameters = FootstepPlannerParameters::default();
        parameters.yaw_weight = f64::NAN;
        assert!(matches!(
            parameters.validate(),
            Err(PlannerError::InvalidParameter {
                name: "yaw_weight",
                ..
            })
        ));
    }

    /// A goal yaw halfway between two lattice yaws is only reachable with half a resolution
    /// of tolerance.
    #[test]
    fn goal_tolerances_cover_the_lattice() {
        let parameters = FootstepPlannerParameters {
            goal_yaw_proximity: 0.1,
            ..FootstepPlannerParameters::default()
        };
        assert!(matches!(
            parameters.validate(),
            Err(PlannerError::InvalidParameter {
                name: "goal_yaw_proximity",
                ..
            })
        ));
        let parameters = FootstepPlannerParameters {
            goal_distance_proximity: 0.02,
            ..FootstepPlannerParameters::default()
        };
        assert!(matches!(
            parameters.validate(),
            Err(PlannerError::InvalidParameter {
                name: "goal_distance_proximity",
                ..
            })
        ));
        let parameters = FootstepPlannerParameters {
            goal_yaw_proximity: YAW_RESOLUTION / 2.0,
            goal_distance_proximity: GRID_SIZE_XY,
            ..FootstepPlannerParameters::default()
        };
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn max_stride_bounds_envelope() {
        let parameters = FootstepPlannerParameters::default();
        assert!((parameters.max_stride() - 0.45_f64.hypot(0.4)).abs() < 1e-12);
    }
}
