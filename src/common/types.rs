//! Common types used throughout lattice_planner

use std::f64::consts::PI;

/// Wrap an angle into (-pi, pi]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

/// Signed angular difference `a - b`, wrapped into (-pi, pi]
pub fn wrap_diff(a: f64, b: f64) -> f64 {
    wrap_angle(a - b)
}

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 2D pose (position + orientation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    /// Build a pose with yaw wrapped into (-pi, pi]
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            yaw: wrap_angle(yaw),
        }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, yaw: 0.0 }
    }

    /// Straight-line distance from the origin to this pose
    pub fn range(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite()
    }
}

/// Path represented as a sequence of 2D points
#[derive(Debug, Clone)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sampled trajectory starting at the origin
///
/// `x`, `y` and `yaw` always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub yaw: Vec<f64>,
}

impl Trajectory {
    /// Trajectory holding only the origin sample
    pub fn origin() -> Self {
        Self::with_capacity(1)
    }

    /// Origin sample plus room for `steps` more
    pub fn with_capacity(steps: usize) -> Self {
        let mut x = Vec::with_capacity(steps + 1);
        let mut y = Vec::with_capacity(steps + 1);
        let mut yaw = Vec::with_capacity(steps + 1);
        x.push(0.0);
        y.push(0.0);
        yaw.push(0.0);
        Self { x, y, yaw }
    }

    pub fn push(&mut self, pose: Pose2D) {
        self.x.push(pose.x);
        self.y.push(pose.y);
        self.yaw.push(pose.yaw);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Last sample, or the origin for an empty trajectory
    pub fn end_pose(&self) -> Pose2D {
        match (self.x.last(), self.y.last(), self.yaw.last()) {
            (Some(&x), Some(&y), Some(&yaw)) => Pose2D { x, y, yaw },
            _ => Pose2D::origin(),
        }
    }

    pub fn to_path(&self) -> Path2D {
        let points: Vec<Point2D> = self
            .x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Path2D::from_points(points)
    }
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::origin()
    }
}
