use crate::node::{FootstepNode, GRID_SIZE_XY, YAW_RESOLUTION};
use crate::parameters::FootstepPlannerParameters;
use indexmap::IndexSet;
use itertools::iproduct;

/// Enumerates the opposite side lattice nodes inside the reachability envelope of a stance
/// node. The envelope is a box in the stance frame, so candidates outside the true bounds are
/// left for the checkers to reject.
#[derive(Clone, Debug)]
pub struct ParameterBasedNodeExpansion {
    forward_offsets: Vec<f64>,
    width_offsets: Vec<f64>,
    yaw_offsets: Vec<i32>,
}

fn lattice_range(min: f64, max: f64, resolution: f64) -> Vec<f64> {
    let first = (min / resolution - 1e-9).ceil() as i64;
    let last = (max / resolution + 1e-9).floor() as i64;
    (first..=last).map(|i| i as f64 * resolution).collect()
}

impl ParameterBasedNodeExpansion {
    pub fn new(parameters: &FootstepPlannerParameters) -> ParameterBasedNodeExpansion {
        let max_yaw = (parameters.max_step_yaw / YAW_RESOLUTION + 1e-9).floor() as i32;
        ParameterBasedNodeExpansion {
            forward_offsets: lattice_range(
                parameters.min_step_length,
                parameters.max_step_reach,
                GRID_SIZE_XY,
            ),
            width_offsets: lattice_range(
                parameters.min_step_width,
                parameters.max_step_width,
                GRID_SIZE_XY,
            ),
            yaw_offsets: (-max_yaw..=max_yaw).collect(),
        }
    }

    /// Candidate nodes for the foot that swings while standing on `node`, without duplicates and
    /// in a fixed order.
    pub fn expand(&self, node: &FootstepNode) -> Vec<FootstepNode> {
        let side = node.side.opposite();
        let (sin, cos) = node.yaw().sin_cos();
        let candidates: IndexSet<FootstepNode> = iproduct!(
            self.forward_offsets.iter(),
            self.width_offsets.iter(),
            self.yaw_offsets.iter()
        )
        .map(|(&forward, &width, &yaw)| {
            let lateral = side.negate_if_right(width);
            let x = node.x() + cos * forward - sin * lateral;
            let y = node.y() + sin * forward + cos * lateral;
            FootstepNode::new(
                (x / GRID_SIZE_XY).round() as i32,
                (y / GRID_SIZE_XY).round() as i32,
                node.yaw_index + yaw,
                side,
            )
        })
        .collect();
        candidates.into_iter().collect()
    }
}
