use super::{CheckerContext, FootstepNodeChecker, RejectionReason};
use crate::node::{yaw_of, FootstepNode};
use itertools::Itertools;
use nalgebra::{Isometry2, Point2, Vector2};

/// Points sampled along each foot edge, corners included.
const SAMPLES_PER_EDGE: usize = 4;
/// Fractions of `min_distance_from_cliff_bottoms` at which the ring around the foot is sampled.
const RING_FRACTIONS: [f64; 2] = [0.5, 1.0];

/// Rejects footholds at the bottom of a cliff, where the ankle or the toe would hit terrain
/// rising more than `cliff_height_to_avoid` within `min_distance_from_cliff_bottoms` of the
/// foot. Disabled while the distance is not positive.
#[derive(Clone, Copy, Debug, Default)]
pub struct CliffAvoidanceChecker;

impl FootstepNodeChecker for CliffAvoidanceChecker {
    fn name(&self) -> &'static str {
        "cliff avoidance"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        _stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        let parameters = ctx.parameters;
        let clearance = parameters.min_distance_from_cliff_bottoms;
        if clearance <= 0.0 {
            return Ok(());
        }
        let pose = ctx
            .snapper
            .snap_transform(candidate)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let sole = pose.translation.vector;
        let to_world = Isometry2::new(Vector2::new(sole.x, sole.y), yaw_of(&pose));
        let max_z = sole.z + parameters.cliff_height_to_avoid;
        let terrain = ctx.snapper.terrain();

        let too_close = ring_around(ctx.snapper.foot_polygon().vertices(), clearance)
            .into_iter()
            .map(|p| to_world * p)
            .any(|p| terrain.highest_surface_at(p.x, p.y).is_some_and(|z| z > max_z));
        if too_close {
            return Err(RejectionReason::TooCloseToLedge);
        }
        Ok(())
    }
}

/// Points around a counter-clockwise polygon, pushed outward from its edges.
fn ring_around(vertices: &[Point2<f64>], clearance: f64) -> Vec<Point2<f64>> {
    let mut ring = Vec::new();
    for (a, b) in vertices.iter().circular_tuple_windows() {
        let edge = b - a;
        let Some(outward) = Vector2::new(edge.y, -edge.x).try_normalize(f64::EPSILON) else {
            continue;
        };
        for i in 0..SAMPLES_PER_EDGE {
            let on_edge = a + edge * (i as f64 / SAMPLES_PER_EDGE as f64);
            ring.extend(RING_FRACTIONS.iter().map(|f| on_edge + outward * clearance * *f));
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FootstepGraph;
    use crate::node::RobotSide;
    use crate::parameters::FootstepPlannerParameters;
    use crate::snapper::FootstepNodeSnapper;
    use crate::terrain::{HeightMap, PlanarRegion, PlanarRegionsList, Terrain};

    fn parameters() -> FootstepPlannerParameters {
        FootstepPlannerParameters {
            min_distance_from_cliff_bottoms: 0.1,
            ..FootstepPlannerParameters::default()
        }
    }

    /// Floor up to x = 0.3 with a 0.4 m high block behind it.
    fn cliff() -> Terrain {
        Terrain::from(PlanarRegionsList::new(vec![
            PlanarRegion::horizontal_rectangle(-1.0, -1.0, 0.3, 1.0, 0.0),
            PlanarRegion::horizontal_rectangle(0.3, -1.0, 1.0, 1.0, 0.4),
        ]))
    }

    fn check(terrain: Terrain, parameters: &FootstepPlannerParameters, node: FootstepNode) -> Result<(), RejectionReason> {
        let mut snapper = FootstepNodeSnapper::new(terrain, parameters);
        let graph = FootstepGraph::new();
        let mut ctx = CheckerContext::new(parameters, &mut snapper, &graph);
        CliffAvoidanceChecker.check(&node, None, &mut ctx)
    }

    #[test]
    fn foot_at_the_base_of_a_cliff() {
        // Toe at x = 0.26, four centimeters from the block.
        let near = FootstepNode::from_pose(0.15, 0.0, 0.0, RobotSide::Left);
        assert_eq!(
            check(cliff(), &parameters(), near),
            Err(RejectionReason::TooCloseToLedge)
        );
        // Toe at x = 0.11, nineteen centimeters from the block.
        let away = FootstepNode::from_pose(0.0, 0.0, 0.0, RobotSide::Left);
        assert_eq!(check(cliff(), &parameters(), away), Ok(()));
    }

    #[test]
    fn low_ledges_and_disabled_checker_pass() {
        let near = FootstepNode::from_pose(0.15, 0.0, 0.0, RobotSide::Left);
        let low = FootstepPlannerParameters {
            cliff_height_to_avoid: 0.5,
            ..parameters()
        };
        assert_eq!(check(cliff(), &low, near), Ok(()));
        assert_eq!(check(cliff(), &FootstepPlannerParameters::default(), near), Ok(()));
    }

    /// Standing on top of the cliff looks down, not up.
    #[test]
    fn top_of_cliff_is_fine() {
        let on_top = FootstepNode::from_pose(0.45, 0.0, 0.0, RobotSide::Left);
        assert_eq!(check(cliff(), &parameters(), on_top), Ok(()));
    }

    #[test]
    fn wall_in_a_height_map() {
        let map = HeightMap::from_fn(0.05, Point2::new(0.0, 0.0), 40, |x, _| {
            Some(if x > 0.3 { 0.4 } else { 0.0 })
        });
        let near = FootstepNode::from_pose(0.15, 0.0, 0.0, RobotSide::Left);
        assert_eq!(
            check(map.into(), &parameters(), near),
            Err(RejectionReason::TooCloseToLedge)
        );
    }
}
