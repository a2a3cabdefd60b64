use itertools::Itertools;
use nalgebra::{Isometry2, Isometry3, Point2, Translation3, UnitQuaternion, Vector2, Vector3};

const EPSILON: f64 = 1e-12;

/// A convex polygon with counter-clockwise vertices. An empty vertex list is the empty polygon.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexPolygon2D {
    vertices: Vec<Point2<f64>>,
}

fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

impl ConvexPolygon2D {
    /// Convex hull of the given points (Andrew's monotone chain). Collinear points are dropped.
    pub fn from_points<I>(points: I) -> ConvexPolygon2D
    where
        I: IntoIterator<Item = Point2<f64>>,
    {
        let mut points: Vec<Point2<f64>> = points
            .into_iter()
            .sorted_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
            .dedup_by(|a, b| (a - b).norm() < EPSILON)
            .collect();
        if points.len() < 3 {
            return ConvexPolygon2D { vertices: points };
        }
        let mut hull: Vec<Point2<f64>> = Vec::with_capacity(points.len() * 2);
        for p in points.iter() {
            while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= EPSILON {
                hull.pop();
            }
            hull.push(*p);
        }
        let lower_len = hull.len() + 1;
        points.pop();
        for p in points.iter().rev() {
            while hull.len() >= lower_len
                && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= EPSILON
            {
                hull.pop();
            }
            hull.push(*p);
        }
        // The last point equals the first one.
        hull.pop();
        ConvexPolygon2D { vertices: hull }
    }

    /// Axis aligned rectangle centered on the origin.
    pub fn centered_rectangle(length: f64, width: f64) -> ConvexPolygon2D {
        let (hl, hw) = (length / 2.0, width / 2.0);
        ConvexPolygon2D {
            vertices: vec![
                Point2::new(-hl, -hw),
                Point2::new(hl, -hw),
                Point2::new(hl, hw),
                Point2::new(-hl, hw),
            ],
        }
    }

    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> ConvexPolygon2D {
        ConvexPolygon2D::from_points([
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ])
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when the polygon encloses no area.
    pub fn is_empty(&self) -> bool {
        self.vertices.len() < 3
    }

    /// Shoelace area.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let twice_area: f64 = self
            .vertices
            .iter()
            .circular_tuple_windows()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        twice_area.abs() / 2.0
    }

    /// Vertex average, which is enough for the convex footholds this is used on.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / self.vertices.len() as f64))
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        !self.is_empty()
            && self
                .vertices
                .iter()
                .circular_tuple_windows()
                .all(|(a, b)| cross(a, b, point) >= -1e-9)
    }

    /// Intersection of two convex polygons by clipping `self` against every edge of `clip`.
    pub fn intersection(&self, clip: &ConvexPolygon2D) -> ConvexPolygon2D {
        if self.is_empty() || clip.is_empty() {
            return ConvexPolygon2D::default();
        }
        let mut output = self.vertices.clone();
        for (a, b) in clip.vertices.iter().circular_tuple_windows() {
            if output.is_empty() {
                break;
            }
            let input = std::mem::take(&mut output);
            for (p, q) in input.iter().circular_tuple_windows() {
                let p_inside = cross(a, b, p) >= 0.0;
                let q_inside = cross(a, b, q) >= 0.0;
                if p_inside {
                    output.push(*p);
                }
                if p_inside != q_inside {
                    let dp = cross(a, b, p);
                    let dq = cross(a, b, q);
                    let t = dp / (dp - dq);
                    output.push(p + (q - p) * t);
                }
            }
        }
        ConvexPolygon2D::from_points(output)
    }

    pub fn transformed(&self, transform: &Isometry2<f64>) -> ConvexPolygon2D {
        ConvexPolygon2D {
            vertices: self.vertices.iter().map(|p| transform * p).collect(),
        }
    }

    /// Checks whether the segment from `start` to `end` touches the polygon.
    pub fn intersects_segment(&self, start: &Point2<f64>, end: &Point2<f64>) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.contains(start) || self.contains(end) {
            return true;
        }
        self.vertices
            .iter()
            .circular_tuple_windows()
            .any(|(a, b)| segments_intersect(start, end, a, b))
    }
}

/// The frame co-located with `pose` whose z axis points up, keeping only the pose's heading.
pub fn z_up_frame(pose: &Isometry3<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(pose.translation.vector),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), crate::node::yaw_of(pose)),
    )
}

fn segments_intersect(p1: &Point2<f64>, p2: &Point2<f64>, q1: &Point2<f64>, q2: &Point2<f64>) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hull_drops_interior_points() {
        let polygon = ConvexPolygon2D::from_points([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 0.5),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.0),
        ]);
        assert_eq!(polygon.len(), 4);
        assert!((polygon.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hull_is_counter_clockwise() {
        let polygon = ConvexPolygon2D::centered_rectangle(2.0, 1.0);
        let rebuilt = ConvexPolygon2D::from_points(polygon.vertices().iter().rev().copied());
        let v = rebuilt.vertices();
        assert!(cross(&v[0], &v[1], &v[2]) > 0.0);
    }

    #[test]
    fn intersection_of_overlapping_squares() {
        let a = ConvexPolygon2D::rectangle(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0));
        let b = ConvexPolygon2D::rectangle(Point2::new(1.0, 1.0), Point2::new(3.0, 3.0));
        let overlap = a.intersection(&b);
        assert!((overlap.area() - 1.0).abs() < 1e-12);
        assert!(overlap.contains(&Point2::new(1.5, 1.5)));
        assert!(!overlap.contains(&Point2::new(0.5, 0.5)));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = ConvexPolygon2D::rectangle(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = ConvexPolygon2D::rectangle(Point2::new(2.0, 2.0), Point2::new(3.0, 3.0));
        assert!(a.intersection(&b).is_empty());
        assert_eq!(a.intersection(&b).area(), 0.0);
    }

    #[test]
    fn transform_keeps_area() {
        let foot = ConvexPolygon2D::centered_rectangle(0.22, 0.11);
        let moved = foot.transformed(&Isometry2::new(Vector2::new(1.0, -2.0), 0.3));
        assert!((moved.area() - foot.area()).abs() < 1e-12);
        assert!(moved.contains(&Point2::new(1.0, -2.0)));
    }

    #[test]
    fn z_up_frame_keeps_heading() {
        let tilted = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 0.3),
            UnitQuaternion::from_euler_angles(0.2, 0.1, 0.5),
        );
        let level = z_up_frame(&tilted);
        let up = level.rotation * Vector3::z();
        assert!((up - Vector3::z()).norm() < 1e-12);
        assert!((crate::node::yaw_of(&level) - 0.5).abs() < 1e-12);
        assert!((crate::node::yaw_of(&tilted) - 0.5).abs() < 1e-12);
        assert_eq!(level.translation.vector, tilted.translation.vector);
    }

    #[test]
    fn segment_crossing() {
        let square = ConvexPolygon2D::rectangle(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        assert!(square.intersects_segment(&Point2::new(-1.0, 0.5), &Point2::new(2.0, 0.5)));
        assert!(!square.intersects_segment(&Point2::new(-1.0, 2.0), &Point2::new(2.0, 2.0)));
    }
}
