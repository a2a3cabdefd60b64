use crate::error::{PlannerError, Result};
use crate::geometry::ConvexPolygon2D;
use nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector3};

/// Normals whose z component is below this are treated as vertical walls.
pub const VERTICAL_NORMAL_Z: f64 = 1e-6;

/// A bounded convex patch of a plane. The polygon lives in the plane's local frame, whose z axis
/// is the surface normal.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanarRegion {
    transform_to_world: Isometry3<f64>,
    polygon: ConvexPolygon2D,
    world_polygon: ConvexPolygon2D,
}

impl PlanarRegion {
    pub fn new(transform_to_world: Isometry3<f64>, polygon: ConvexPolygon2D) -> PlanarRegion {
        let world_polygon = ConvexPolygon2D::from_points(polygon.vertices().iter().map(|p| {
            let world = transform_to_world * Point3::new(p.x, p.y, 0.0);
            Point2::new(world.x, world.y)
        }));
        PlanarRegion {
            transform_to_world,
            polygon,
            world_polygon,
        }
    }

    /// Horizontal axis aligned rectangle at height `z`.
    pub fn horizontal_rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64, z: f64) -> PlanarRegion {
        let transform = Isometry3::from_parts(
            Translation3::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, z),
            UnitQuaternion::identity(),
        );
        PlanarRegion::new(
            transform,
            ConvexPolygon2D::centered_rectangle(max_x - min_x, max_y - min_y),
        )
    }

    pub fn transform_to_world(&self) -> &Isometry3<f64> {
        &self.transform_to_world
    }

    pub fn polygon(&self) -> &ConvexPolygon2D {
        &self.polygon
    }

    /// Projection of the region onto the world xy plane. Empty for vertical regions.
    pub fn world_polygon(&self) -> &ConvexPolygon2D {
        &self.world_polygon
    }

    /// Unit normal in world, always pointing upward for non-vertical regions.
    pub fn normal(&self) -> Vector3<f64> {
        let normal = self.transform_to_world.rotation * Vector3::z();
        if normal.z < 0.0 {
            -normal
        } else {
            normal
        }
    }

    pub fn is_vertical(&self) -> bool {
        self.normal().z < VERTICAL_NORMAL_Z
    }

    /// Height of the infinite plane at a world xy position.
    pub fn plane_z_at(&self, x: f64, y: f64) -> Option<f64> {
        let normal = self.normal();
        if normal.z < VERTICAL_NORMAL_Z {
            return None;
        }
        let origin = self.transform_to_world.translation.vector;
        Some(origin.z - (normal.x * (x - origin.x) + normal.y * (y - origin.y)) / normal.z)
    }

    /// Height of the region at a world xy position, when the position lies above or below it.
    pub fn surface_z_at(&self, x: f64, y: f64) -> Option<f64> {
        if self.world_polygon.contains(&Point2::new(x, y)) {
            self.plane_z_at(x, y)
        } else {
            None
        }
    }

    /// Point where the segment pierces the region, if it does.
    pub fn intersect_segment(&self, start: &Point3<f64>, end: &Point3<f64>) -> Option<Point3<f64>> {
        let local_start = self.transform_to_world.inverse_transform_point(start);
        let local_end = self.transform_to_world.inverse_transform_point(end);
        let (d0, d1) = (local_start.z, local_end.z);
        if (d0 > 0.0 && d1 > 0.0) || (d0 < 0.0 && d1 < 0.0) {
            return None;
        }
        let local = if (d0 - d1).abs() < f64::EPSILON {
            // Segment lies in the plane, any of its points that is inside counts.
            [local_start, local_end]
                .into_iter()
                .find(|p| self.polygon.contains(&Point2::new(p.x, p.y)))?
        } else {
            local_start + (local_end - local_start) * (d0 / (d0 - d1))
        };
        if self.polygon.contains(&Point2::new(local.x, local.y)) {
            Some(self.transform_to_world * local)
        } else {
            None
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let t = self.transform_to_world.translation.vector;
        let q = self.transform_to_world.rotation.coords;
        if t.iter().chain(q.iter()).any(|v| !v.is_finite()) {
            return Err(PlannerError::InvalidTerrain(
                "planar region transform is not finite".to_string(),
            ));
        }
        if self.polygon.area() <= 0.0 {
            return Err(PlannerError::InvalidTerrain(
                "planar region polygon has no area".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ordered collection of planar regions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanarRegionsList {
    regions: Vec<PlanarRegion>,
}

impl PlanarRegionsList {
    pub fn new(regions: Vec<PlanarRegion>) -> PlanarRegionsList {
        PlanarRegionsList { regions }
    }

    pub fn push(&mut self, region: PlanarRegion) {
        self.regions.push(region);
    }

    pub fn regions(&self) -> &[PlanarRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Highest non-vertical region surface at a world xy position.
    pub fn highest_surface_at(&self, x: f64, y: f64) -> Option<f64> {
        self.regions
            .iter()
            .filter_map(|region| region.surface_z_at(x, y))
            .reduce(f64::max)
    }
}

impl From<Vec<PlanarRegion>> for PlanarRegionsList {
    fn from(regions: Vec<PlanarRegion>) -> PlanarRegionsList {
        PlanarRegionsList::new(regions)
    }
}
