use super::{CheckerContext, FootstepNodeChecker, RejectionReason};
use crate::node::{FootstepNode, GRID_SIZE_XY};
use crate::terrain::Terrain;
use nalgebra::{Point3, Vector3};

/// Spacing of the terrain samples taken between two footsteps.
const SAMPLE_SPACING: f64 = GRID_SIZE_XY / 2.0;
/// Vertical spacing of the swept segments tested against steep regions.
const SWEEP_SPACING: f64 = 0.1;

/// Rejects steps whose straight line from the stance foot passes through terrain that rises
/// above the feet, or through a wall.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObstacleBetweenStepsChecker;

impl FootstepNodeChecker for ObstacleBetweenStepsChecker {
    fn name(&self) -> &'static str {
        "obstacle between steps"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        let parameters = ctx.parameters;
        if !parameters.check_for_path_collisions {
            return Ok(());
        }
        let Some(stance) = stance else {
            return Ok(());
        };
        let end = ctx
            .snapper
            .snap_transform(candidate)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let start = ctx
            .snapper
            .snap_transform(stance)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let start = Point3::from(start.translation.vector);
        let end = Point3::from(end.translation.vector);
        let terrain = ctx.snapper.terrain();

        let clearance_z = start.z.max(end.z) + parameters.obstacle_clearance_height;
        let distance = (end.xy() - start.xy()).norm();
        let samples = (distance / SAMPLE_SPACING).ceil().max(1.0) as usize;
        let blocked = (0..=samples).any(|i| {
            let p = start + (end - start) * (i as f64 / samples as f64);
            terrain
                .highest_surface_at(p.x, p.y)
                .is_some_and(|z| z > clearance_z)
        });
        if blocked {
            return Err(RejectionReason::ObstacleBlockingStep);
        }

        if let Terrain::PlanarRegions(regions) = terrain {
            let min_up = parameters.max_surface_incline.cos();
            let sweeps = (parameters.obstacle_check_height / SWEEP_SPACING).ceil().max(1.0) as usize;
            for region in regions.regions().iter().filter(|r| r.normal().z < min_up) {
                let hit = (0..=sweeps).any(|k| {
                    let lift = parameters.obstacle_clearance_height
                        + parameters.obstacle_check_height * k as f64 / sweeps as f64;
                    let raise = Vector3::z() * lift;
                    region.intersect_segment(&(start + raise), &(end + raise)).is_some()
                });
                if hit {
                    return Err(RejectionReason::ObstacleBlockingStep);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ConvexPolygon2D;
    use crate::graph::FootstepGraph;
    use crate::node::RobotSide;
    use crate::parameters::FootstepPlannerParameters;
    use crate::snapper::FootstepNodeSnapper;
    use crate::terrain::{PlanarRegion, PlanarRegionsList};
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    fn check(regions: Vec<PlanarRegion>, parameters: &FootstepPlannerParameters) -> Result<(), RejectionReason> {
        let terrain = Terrain::from(PlanarRegionsList::new(regions));
        let mut snapper = FootstepNodeSnapper::new(terrain, parameters);
        let graph = FootstepGraph::new();
        let mut ctx = CheckerContext::new(parameters, &mut snapper, &graph);
        let stance = FootstepNode::new(0, -2, 0, RobotSide::Right);
        let candidate = FootstepNode::new(8, 2, 0, RobotSide::Left);
        ObstacleBetweenStepsChecker.check(&candidate, Some(&stance), &mut ctx)
    }

    fn ground() -> PlanarRegion {
        PlanarRegion::horizontal_rectangle(-1.0, -1.0, 1.0, 1.0, 0.0)
    }

    #[test]
    fn open_ground_is_clear() {
        let parameters = FootstepPlannerParameters::default();
        assert_eq!(check(vec![ground()], &parameters), Ok(()));
    }

    #[test]
    fn block_between_feet() {
        let parameters = FootstepPlannerParameters::default();
        let block = PlanarRegion::horizontal_rectangle(0.18, -1.0, 0.22, 1.0, 0.3);
        assert_eq!(
            check(vec![ground(), block.clone()], &parameters),
            Err(RejectionReason::ObstacleBlockingStep)
        );
        let disabled = FootstepPlannerParameters {
            check_for_path_collisions: false,
            ..parameters
        };
        assert_eq!(check(vec![ground(), block], &disabled), Ok(()));
    }

    #[test]
    fn wall_between_feet() {
        let parameters = FootstepPlannerParameters::default();
        let wall = PlanarRegion::new(
            Isometry3::from_parts(
                Translation3::new(0.2, 0.0, 0.25),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
            ),
            ConvexPolygon2D::centered_rectangle(0.5, 2.0),
        );
        assert_eq!(
            check(vec![ground(), wall], &parameters),
            Err(RejectionReason::ObstacleBlockingStep)
        );
        let high_wall = PlanarRegion::new(
            Isometry3::from_parts(
                Translation3::new(0.2, 0.0, 1.5),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
            ),
            ConvexPolygon2D::centered_rectangle(0.5, 2.0),
        );
        assert_eq!(check(vec![ground(), high_wall], &parameters), Ok(()));
    }
}
