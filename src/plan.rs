use crate::error::{PlannerError, Result};
use crate::geometry::ConvexPolygon2D;
use crate::graph::FootstepGraph;
use crate::node::{FootstepNode, RobotSide};
use crate::snapper::FootstepNodeSnapper;
use nalgebra::Isometry3;

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedFootstep {
    pub side: RobotSide,
    pub node: FootstepNode,
    /// Snapped world pose of the sole.
    pub sole_pose: Isometry3<f64>,
    /// Supported part of the foot, in the sole frame.
    pub foothold: ConvexPolygon2D,
}

/// Footsteps to take in order, excluding the feet the robot starts on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FootstepPlan {
    pub steps: Vec<PlannedFootstep>,
}

impl FootstepPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedFootstep> {
        self.steps.iter()
    }

    pub fn last(&self) -> Option<&PlannedFootstep> {
        self.steps.last()
    }
}

/// Walks the parent links from `terminal` back to the start and pairs every step after the start
/// node with its snap result.
pub fn extract_plan(
    graph: &FootstepGraph,
    snapper: &FootstepNodeSnapper,
    terminal: &FootstepNode,
) -> Result<FootstepPlan> {
    let path = graph
        .path_from_start(terminal)
        .ok_or(PlannerError::NodeNotInGraph(*terminal))?;
    let steps = path
        .iter()
        .skip(1)
        .map(|node| {
            let data = snapper
                .get(node)
                .ok_or(PlannerError::MissingSnapData(*node))?;
            let sole_pose = data
                .snap_transform
                .ok_or(PlannerError::MissingSnapData(*node))?;
            Ok(PlannedFootstep {
                side: node.side,
                node: *node,
                sole_pose,
                foothold: data.foothold.clone(),
            })
        })
        .collect::<Result<Vec<PlannedFootstep>>>()?;
    Ok(FootstepPlan { steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::FootstepPlannerParameters;
    use crate::terrain::Terrain;

    #[test]
    fn start_node_is_dropped() {
        let mut snapper = FootstepNodeSnapper::new(
            Terrain::FlatGround { height: 0.0 },
            &FootstepPlannerParameters::default(),
        );
        let start = FootstepNode::new(0, 2, 0, RobotSide::Left);
        let first = FootstepNode::new(6, -2, 0, RobotSide::Right);
        let second = FootstepNode::new(12, 2, 0, RobotSide::Left);
        let mut graph = FootstepGraph::new();
        graph.initialize(start);
        graph.check_and_set_edge(&start, first, 0.15);
        graph.check_and_set_edge(&first, second, 0.15);
        for node in [start, first, second] {
            snapper.snap(&node);
        }
        let plan = extract_plan(&graph, &snapper, &second).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].node, first);
        assert_eq!(plan.steps[1].side, RobotSide::Left);
        assert!((plan.steps[1].sole_pose.translation.vector.x - 0.6).abs() < 1e-12);
        assert!(extract_plan(&graph, &snapper, &start).unwrap().is_empty());
    }

    #[test]
    fn missing_nodes_are_errors() {
        let mut snapper = FootstepNodeSnapper::new(
            Terrain::FlatGround { height: 0.0 },
            &FootstepPlannerParameters::default(),
        );
        let start = FootstepNode::new(0, 2, 0, RobotSide::Left);
        let step = FootstepNode::new(6, -2, 0, RobotSide::Right);
        let mut graph = FootstepGraph::new();
        graph.initialize(start);
        assert_eq!(
            extract_plan(&graph, &snapper, &step),
            Err(PlannerError::NodeNotInGraph(step))
        );
        graph.check_and_set_edge(&start, step, 0.15);
        snapper.snap(&start);
        assert_eq!(
            extract_plan(&graph, &snapper, &step),
            Err(PlannerError::MissingSnapData(step))
        );
    }
}
