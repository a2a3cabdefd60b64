use super::{CheckerContext, FootstepNodeChecker, RejectionReason};
use crate::geometry::ConvexPolygon2D;
use crate::node::{yaw_of, FootstepNode};
use crate::parameters::FootstepPlannerParameters;
use crate::terrain::{PlanarRegion, Terrain};
use itertools::Itertools;
use nalgebra::{Isometry2, Isometry3, Point2, Point3, Vector2};

/// Vertical spacing of the box outlines tested against vertical regions.
const SWEEP_SPACING: f64 = 0.1;

/// Rejects steps after which the body, approximated by a box standing between both feet,
/// would intersect the terrain. Only runs with `check_for_body_box_collisions`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BodyCollisionChecker;

impl FootstepNodeChecker for BodyCollisionChecker {
    fn name(&self) -> &'static str {
        "body collision"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        if !ctx.parameters.check_for_body_box_collisions {
            return Ok(());
        }
        let Some(stance) = stance else {
            return Ok(());
        };
        let candidate_pose = ctx
            .snapper
            .snap_transform(candidate)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let stance_pose = ctx
            .snapper
            .snap_transform(stance)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let body = BodyBox::between_feet(&stance_pose, &candidate_pose, ctx.parameters);
        if body.collides_with(ctx.snapper.terrain()) {
            return Err(RejectionReason::BodyBoxCollision);
        }
        Ok(())
    }
}

/// Gravity aligned box given by its footprint and vertical extent.
#[derive(Clone, Debug)]
struct BodyBox {
    footprint: ConvexPolygon2D,
    bottom: f64,
    top: f64,
}

impl BodyBox {
    fn between_feet(a: &Isometry3<f64>, b: &Isometry3<f64>, parameters: &FootstepPlannerParameters) -> BodyBox {
        let (ta, tb) = (a.translation.vector, b.translation.vector);
        let heading = Vector2::new(yaw_of(a).cos(), yaw_of(a).sin())
            + Vector2::new(yaw_of(b).cos(), yaw_of(b).sin());
        let yaw = heading.y.atan2(heading.x);
        let midpoint = (ta.xy() + tb.xy()) / 2.0;
        let center = midpoint + Vector2::new(yaw.cos(), yaw.sin()) * parameters.body_box_base_x;
        let footprint =
            ConvexPolygon2D::centered_rectangle(parameters.body_box_depth, parameters.body_box_width)
                .transformed(&Isometry2::new(center, yaw));
        let bottom = ta.z.max(tb.z) + parameters.body_box_base_z;
        BodyBox {
            footprint,
            bottom,
            top: bottom + parameters.body_box_height,
        }
    }

    /// Whether anything between `low` and `high` reaches into the box.
    fn spans(&self, low: f64, high: f64) -> bool {
        high > self.bottom && low < self.top
    }

    fn collides_with(&self, terrain: &Terrain) -> bool {
        match terrain {
            Terrain::FlatGround { height } => self.spans(*height, *height),
            Terrain::PlanarRegions(regions) => regions.regions().iter().any(|r| self.hits_region(r)),
            Terrain::HeightMap(map) => map
                .known_cells_overlapping(&self.footprint)
                .iter()
                .any(|&(_, _, z)| self.spans(z, z)),
        }
    }

    fn hits_region(&self, region: &PlanarRegion) -> bool {
        if region.is_vertical() {
            return self.sweep_hits(region);
        }
        let overlap = region.world_polygon().intersection(&self.footprint);
        // Planes are linear, so the extremes over the overlap are at its vertices.
        overlap
            .vertices()
            .iter()
            .filter_map(|p| region.plane_z_at(p.x, p.y))
            .minmax()
            .into_option()
            .is_some_and(|(low, high)| self.spans(low, high))
    }

    /// Tests the outline and the diagonals of the footprint at several heights.
    fn sweep_hits(&self, region: &PlanarRegion) -> bool {
        let segments: Vec<(&Point2<f64>, &Point2<f64>)> = self
            .footprint
            .vertices()
            .iter()
            .tuple_combinations()
            .collect();
        let levels = ((self.top - self.bottom) / SWEEP_SPACING).ceil().max(1.0) as usize;
        (0..=levels).any(|k| {
            let z = self.bottom + (self.top - self.bottom) * k as f64 / levels as f64;
            segments.iter().any(|(a, b)| {
                region
                    .intersect_segment(&Point3::new(a.x, a.y, z), &Point3::new(b.x, b.y, z))
                    .is_some()
            })
        })
    }
}
