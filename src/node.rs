use core::fmt;
use nalgebra::{Isometry2, Isometry3, Vector2};
use std::f64::consts::PI;

/// Resolution of the x/y lattice in meters.
pub const GRID_SIZE_XY: f64 = 0.05;
/// Number of discrete yaw values covering a full turn.
pub const YAW_DIVISIONS: i32 = 16;
/// Angular resolution of the yaw lattice in radians.
pub const YAW_RESOLUTION: f64 = 2.0 * PI / YAW_DIVISIONS as f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RobotSide {
    Left,
    Right,
}

impl RobotSide {
    pub const VALUES: [RobotSide; 2] = [RobotSide::Left, RobotSide::Right];

    pub fn opposite(self) -> RobotSide {
        match self {
            RobotSide::Left => RobotSide::Right,
            RobotSide::Right => RobotSide::Left,
        }
    }

    pub fn negate_if_right(self, value: f64) -> f64 {
        match self {
            RobotSide::Left => value,
            RobotSide::Right => -value,
        }
    }
}

impl fmt::Display for RobotSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RobotSide::Left => write!(f, "left"),
            RobotSide::Right => write!(f, "right"),
        }
    }
}

/// A discretized footstep: lattice indices in x, y and yaw plus the side of the foot that
/// is placed there. Two nodes are the same footstep exactly when all four fields match, which
/// is what the graph, the closed set and the snap cache key on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FootstepNode {
    pub x_index: i32,
    pub y_index: i32,
    pub yaw_index: i32,
    pub side: RobotSide,
}

impl FootstepNode {
    /// Builds a node from raw lattice indices. The yaw index is wrapped into
    /// `[-YAW_DIVISIONS / 2, YAW_DIVISIONS / 2)` so that every heading has a single index.
    pub fn new(x_index: i32, y_index: i32, yaw_index: i32, side: RobotSide) -> FootstepNode {
        FootstepNode {
            x_index,
            y_index,
            yaw_index: wrap_yaw_index(yaw_index),
            side,
        }
    }

    /// Rounds a world position and heading to the closest lattice node.
    pub fn from_pose(x: f64, y: f64, yaw: f64, side: RobotSide) -> FootstepNode {
        FootstepNode::new(
            (x / GRID_SIZE_XY).round() as i32,
            (y / GRID_SIZE_XY).round() as i32,
            (yaw / YAW_RESOLUTION).round() as i32,
            side,
        )
    }

    /// Rounds the planar part of a sole pose to the closest lattice node.
    pub fn from_sole_pose(pose: &Isometry3<f64>, side: RobotSide) -> FootstepNode {
        let t = pose.translation.vector;
        FootstepNode::from_pose(t.x, t.y, yaw_of(pose), side)
    }

    pub fn x(&self) -> f64 {
        self.x_index as f64 * GRID_SIZE_XY
    }

    pub fn y(&self) -> f64 {
        self.y_index as f64 * GRID_SIZE_XY
    }

    pub fn yaw(&self) -> f64 {
        self.yaw_index as f64 * YAW_RESOLUTION
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x(), self.y())
    }

    /// Planar pose of the node in the world frame.
    pub fn pose_2d(&self) -> Isometry2<f64> {
        Isometry2::new(self.position(), self.yaw())
    }

    pub fn euclidean_distance(&self, other: &FootstepNode) -> f64 {
        (self.position() - other.position()).norm()
    }
}

impl fmt::Display for FootstepNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.side, self.x_index, self.y_index, self.yaw_index
        )
    }
}

fn wrap_yaw_index(yaw_index: i32) -> i32 {
    let half = YAW_DIVISIONS / 2;
    (yaw_index + half).rem_euclid(YAW_DIVISIONS) - half
}

/// Wraps an angle into `[-pi, pi)`.
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Heading of the projection of the pose's x axis onto the horizontal plane.
pub fn yaw_of(pose: &Isometry3<f64>) -> f64 {
    let heading = pose.rotation * nalgebra::Vector3::x();
    heading.y.atan2(heading.x)
}
