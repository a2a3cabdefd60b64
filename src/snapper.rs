//! Projection of lattice nodes onto the terrain.
use crate::geometry::ConvexPolygon2D;
use crate::node::FootstepNode;
use crate::parameters::FootstepPlannerParameters;
use crate::terrain::{HeightMap, PlanarRegionsList, Terrain, VERTICAL_NORMAL_Z};
use fxhash::FxHashMap;
use log::trace;
use nalgebra::{Isometry2, Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Result of snapping a node. A missing transform means no surface supports the foot.
#[derive(Clone, Debug, PartialEq)]
pub struct FootstepNodeSnapData {
    /// World pose of the snapped sole.
    pub snap_transform: Option<Isometry3<f64>>,
    /// Supported part of the foot, in the sole frame.
    pub foothold: ConvexPolygon2D,
    pub region_normal: Option<Vector3<f64>>,
}

impl FootstepNodeSnapData {
    pub fn new(snap_transform: Isometry3<f64>, foothold: ConvexPolygon2D, region_normal: Vector3<f64>) -> FootstepNodeSnapData {
        FootstepNodeSnapData {
            snap_transform: Some(snap_transform),
            foothold,
            region_normal: Some(region_normal),
        }
    }

    pub fn could_not_snap() -> FootstepNodeSnapData {
        FootstepNodeSnapData {
            snap_transform: None,
            foothold: ConvexPolygon2D::default(),
            region_normal: None,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snap_transform.is_some()
    }
}

/// Snaps nodes onto a terrain and memoizes the results for the lifetime of the terrain.
#[derive(Clone, Debug)]
pub struct FootstepNodeSnapper {
    terrain: Terrain,
    foot_polygon: ConvexPolygon2D,
    cache: FxHashMap<FootstepNode, FootstepNodeSnapData>,
}

impl FootstepNodeSnapper {
    pub fn new(terrain: Terrain, parameters: &FootstepPlannerParameters) -> FootstepNodeSnapper {
        FootstepNodeSnapper {
            terrain,
            foot_polygon: ConvexPolygon2D::centered_rectangle(
                parameters.foot_length,
                parameters.foot_width,
            ),
            cache: FxHashMap::default(),
        }
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Nominal foot polygon in the sole frame.
    pub fn foot_polygon(&self) -> &ConvexPolygon2D {
        &self.foot_polygon
    }

    pub fn snap(&mut self, node: &FootstepNode) -> &FootstepNodeSnapData {
        let terrain = &self.terrain;
        let foot = &self.foot_polygon;
        self.cache.entry(*node).or_insert_with(|| {
            let data = snap_to_terrain(terrain, foot, node);
            if !data.is_snapped() {
                trace!("Could not snap {}", node);
            }
            data
        })
    }

    /// Cached result without snapping.
    pub fn get(&self, node: &FootstepNode) -> Option<&FootstepNodeSnapData> {
        self.cache.get(node)
    }

    /// Snaps the node and returns only its sole pose.
    pub fn snap_transform(&mut self, node: &FootstepNode) -> Option<Isometry3<f64>> {
        self.snap(node).snap_transform
    }

    /// Seeds the cache with a known result, such as the exact pose of a start foot.
    pub fn add_snap_data(&mut self, node: FootstepNode, data: FootstepNodeSnapData) {
        self.cache.insert(node, data);
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

fn snap_to_terrain(
    terrain: &Terrain,
    foot: &ConvexPolygon2D,
    node: &FootstepNode,
) -> FootstepNodeSnapData {
    let pose_2d = node.pose_2d();
    let foot_in_world = foot.transformed(&pose_2d);
    match terrain {
        Terrain::FlatGround { height } => FootstepNodeSnapData::new(
            sole_transform(node, *height, &Vector3::z()),
            foot.clone(),
            Vector3::z(),
        ),
        Terrain::PlanarRegions(regions) => {
            snap_to_planar_regions(regions, &foot_in_world, &pose_2d, node)
        }
        Terrain::HeightMap(map) => snap_to_height_map(map, &foot_in_world, &pose_2d, node),
    }
}

fn snap_to_planar_regions(
    regions: &PlanarRegionsList,
    foot_in_world: &ConvexPolygon2D,
    pose_2d: &Isometry2<f64>,
    node: &FootstepNode,
) -> FootstepNodeSnapData {
    let mut best: Option<(f64, ConvexPolygon2D, Vector3<f64>)> = None;
    for region in regions.regions().iter().filter(|r| !r.is_vertical()) {
        let overlap = region.world_polygon().intersection(foot_in_world);
        if overlap.is_empty() {
            continue;
        }
        let Some(z) = region.plane_z_at(node.x(), node.y()) else {
            continue;
        };
        if best.as_ref().map_or(true, |(best_z, _, _)| z > *best_z) {
            best = Some((z, overlap, region.normal()));
        }
    }
    match best {
        Some((z, overlap, normal)) => FootstepNodeSnapData::new(
            sole_transform(node, z, &normal),
            overlap.transformed(&pose_2d.inverse()),
            normal,
        ),
        None => FootstepNodeSnapData::could_not_snap(),
    }
}

fn snap_to_height_map(
    map: &HeightMap,
    foot_in_world: &ConvexPolygon2D,
    pose_2d: &Isometry2<f64>,
    node: &FootstepNode,
) -> FootstepNodeSnapData {
    let cells = map.known_cells_overlapping(foot_in_world);
    if cells.len() < 3 {
        return FootstepNodeSnapData::could_not_snap();
    }
    // Least squares fit of z = a (x - x0) + b (y - y0) + c around the node.
    let mut normal_matrix = Matrix3::<f64>::zeros();
    let mut rhs = Vector3::<f64>::zeros();
    for &(ix, iy, z) in cells.iter() {
        let c = map.cell_center(ix, iy);
        let row = Vector3::new(c.x - node.x(), c.y - node.y(), 1.0);
        normal_matrix += row * row.transpose();
        rhs += row * z;
    }
    let Some(plane) = normal_matrix.lu().solve(&rhs) else {
        return FootstepNodeSnapData::could_not_snap();
    };
    if !plane.iter().all(|v| v.is_finite()) {
        return FootstepNodeSnapData::could_not_snap();
    }
    let normal = Vector3::new(-plane.x, -plane.y, 1.0).normalize();
    let covered = ConvexPolygon2D::from_points(
        cells
            .iter()
            .flat_map(|&(ix, iy, _)| map.cell_polygon(ix, iy).vertices().to_vec()),
    );
    let foothold = covered.intersection(foot_in_world);
    FootstepNodeSnapData::new(
        sole_transform(node, plane.z, &normal),
        foothold.transformed(&pose_2d.inverse()),
        normal,
    )
}

/// Sole pose at the node's xy and the given height, with z along `normal` and the heading of
/// the x axis equal to the node yaw.
fn sole_transform(node: &FootstepNode, z: f64, normal: &Vector3<f64>) -> Isometry3<f64> {
    let (sin, cos) = node.yaw().sin_cos();
    let normal = if normal.z < VERTICAL_NORMAL_Z {
        Vector3::z()
    } else {
        *normal
    };
    let dz = -(normal.x * cos + normal.y * sin) / normal.z;
    let x_axis = Vector3::new(cos, sin, dz).normalize();
    let y_axis = normal.cross(&x_axis);
    let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x_axis, y_axis, normal]));
    Isometry3::from_parts(
        Translation3::new(node.x(), node.y(), z),
        UnitQuaternion::from_rotation_matrix(&rotation),
    )
}
