use crate::error::{PlannerError, Result};
use crate::geometry::ConvexPolygon2D;
use nalgebra::Point2;

/// Square elevation grid centered on `center`. Cells without a measurement hold `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    resolution: f64,
    center: Point2<f64>,
    cells_per_side: usize,
    heights: Vec<f64>,
}

impl HeightMap {
    /// A map in which every cell is unknown.
    pub fn new(resolution: f64, center: Point2<f64>, cells_per_side: usize) -> HeightMap {
        HeightMap {
            resolution,
            center,
            cells_per_side,
            heights: vec![f64::NAN; cells_per_side * cells_per_side],
        }
    }

    /// Fills every cell by evaluating `height` at its center. `None` leaves the cell unknown.
    pub fn from_fn<F>(resolution: f64, center: Point2<f64>, cells_per_side: usize, mut height: F) -> HeightMap
    where
        F: FnMut(f64, f64) -> Option<f64>,
    {
        let mut map = HeightMap::new(resolution, center, cells_per_side);
        for iy in 0..cells_per_side {
            for ix in 0..cells_per_side {
                let c = map.cell_center(ix, iy);
                if let Some(z) = height(c.x, c.y) {
                    map.heights[iy * cells_per_side + ix] = z;
                }
            }
        }
        map
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn center(&self) -> Point2<f64> {
        self.center
    }

    pub fn cells_per_side(&self) -> usize {
        self.cells_per_side
    }

    fn min_corner(&self) -> Point2<f64> {
        let half_extent = self.cells_per_side as f64 * self.resolution / 2.0;
        Point2::new(self.center.x - half_extent, self.center.y - half_extent)
    }

    pub fn cell_center(&self, ix: usize, iy: usize) -> Point2<f64> {
        let min = self.min_corner();
        Point2::new(
            min.x + (ix as f64 + 0.5) * self.resolution,
            min.y + (iy as f64 + 0.5) * self.resolution,
        )
    }

    /// Axis aligned square covered by a cell.
    pub fn cell_polygon(&self, ix: usize, iy: usize) -> ConvexPolygon2D {
        let c = self.cell_center(ix, iy);
        let h = self.resolution / 2.0;
        ConvexPolygon2D::rectangle(Point2::new(c.x - h, c.y - h), Point2::new(c.x + h, c.y + h))
    }

    pub fn cell_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let min = self.min_corner();
        let fx = ((x - min.x) / self.resolution).floor();
        let fy = ((y - min.y) / self.resolution).floor();
        let n = self.cells_per_side as f64;
        if fx < 0.0 || fy < 0.0 || fx >= n || fy >= n || fx.is_nan() || fy.is_nan() {
            return None;
        }
        Some((fx as usize, fy as usize))
    }

    pub fn set_height(&mut self, ix: usize, iy: usize, height: f64) {
        if ix < self.cells_per_side && iy < self.cells_per_side {
            self.heights[iy * self.cells_per_side + ix] = height;
        }
    }

    /// Known height of a cell.
    pub fn cell_height(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.cells_per_side || iy >= self.cells_per_side {
            return None;
        }
        let z = self.heights[iy * self.cells_per_side + ix];
        z.is_finite().then_some(z)
    }

    pub fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        let (ix, iy) = self.cell_index(x, y)?;
        self.cell_height(ix, iy)
    }

    /// Known cells whose square overlaps the polygon, as `(ix, iy, height)`.
    pub fn known_cells_overlapping(&self, polygon: &ConvexPolygon2D) -> Vec<(usize, usize, f64)> {
        let Some((min, max)) = bounding_box(polygon) else {
            return Vec::new();
        };
        let last = self.cells_per_side.saturating_sub(1);
        let clamp = |x: f64, y: f64| -> (usize, usize) {
            let corner = self.min_corner();
            let fx = ((x - corner.x) / self.resolution).floor().max(0.0) as usize;
            let fy = ((y - corner.y) / self.resolution).floor().max(0.0) as usize;
            (fx.min(last), fy.min(last))
        };
        let (x0, y0) = clamp(min.x, min.y);
        let (x1, y1) = clamp(max.x, max.y);
        itertools::iproduct!(y0..=y1, x0..=x1)
            .filter_map(|(iy, ix)| self.cell_height(ix, iy).map(|z| (ix, iy, z)))
            .filter(|&(ix, iy, _)| self.cell_polygon(ix, iy).intersection(polygon).area() > 0.0)
            .collect()
    }

    pub fn has_known_cell(&self) -> bool {
        self.heights.iter().any(|z| z.is_finite())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(PlannerError::InvalidTerrain(
                "height map resolution must be positive".to_string(),
            ));
        }
        if !(self.center.x.is_finite() && self.center.y.is_finite()) {
            return Err(PlannerError::InvalidTerrain(
                "height map center is not finite".to_string(),
            ));
        }
        if !self.has_known_cell() {
            return Err(PlannerError::EmptyTerrain);
        }
        Ok(())
    }
}

fn bounding_box(polygon: &ConvexPolygon2D) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = polygon.vertices().first()?;
    Some(polygon.vertices().iter().fold((*first, *first), |(min, max), p| {
        (
            Point2::new(min.x.min(p.x), min.y.min(p.y)),
            Point2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}
