//! Motion model for State Lattice Planner
//!
//! Implements a bicycle kinematic model driven by a quadratic curvature
//! profile. The profile passes through `k0` at the start, `km` at half the
//! arc length and `kf` at the end.

use serde::{Deserialize, Serialize};

use crate::common::{MotionModel, PlannerError, PlannerResult, Pose2D, Trajectory};

pub use crate::common::{wrap_angle, wrap_diff};

/// Vehicle state
#[derive(Debug, Clone, Copy)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub v: f64,
}

impl VehicleState {
    pub fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            v: 0.0,
        }
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D {
            x: self.x,
            y: self.y,
            yaw: self.yaw,
        }
    }
}

/// Motion model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionModelConfig {
    /// Wheelbase length [m]
    #[serde(default = "default_wheelbase")]
    pub wheelbase: f64,
    /// Distance step for trajectory generation [m]
    #[serde(default = "default_ds")]
    pub ds: f64,
    /// Default velocity [m/s]
    #[serde(default = "default_velocity")]
    pub default_velocity: f64,
}

fn default_wheelbase() -> f64 {
    1.0
}
fn default_ds() -> f64 {
    0.1
}
fn default_velocity() -> f64 {
    10.0 / 3.6 // ~2.78 m/s
}

impl Default for MotionModelConfig {
    fn default() -> Self {
        Self {
            wheelbase: default_wheelbase(),
            ds: default_ds(),
            default_velocity: default_velocity(),
        }
    }
}

impl MotionModelConfig {
    pub fn validate(&self) -> PlannerResult<()> {
        let positive = [
            ("wheelbase", self.wheelbase),
            ("ds", self.ds),
            ("default_velocity", self.default_velocity),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(PlannerError::InvalidParameter(format!(
                    "motion model {} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Bicycle kinematic motion model
#[derive(Debug, Clone)]
pub struct BicycleModel {
    config: MotionModelConfig,
}

impl BicycleModel {
    pub fn new(config: MotionModelConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MotionModelConfig::default())
    }

    /// Update state using bicycle kinematic model
    ///
    /// # Arguments
    /// * `state` - Current vehicle state
    /// * `v` - Linear velocity [m/s]
    /// * `delta` - Steering angle [rad]
    /// * `dt` - Time step [s]
    ///
    /// # Returns
    /// Updated vehicle state, yaw wrapped into (-pi, pi]
    pub fn update(&self, state: &VehicleState, v: f64, delta: f64, dt: f64) -> VehicleState {
        let l = self.config.wheelbase;

        VehicleState {
            x: state.x + v * state.yaw.cos() * dt,
            y: state.y + v * state.yaw.sin() * dt,
            yaw: wrap_angle(state.yaw + v / l * delta.tan() * dt),
            v,
        }
    }

    /// Number of integration steps for arc length `s`
    ///
    /// Zero for a non-positive (or NaN) arc length, otherwise at least one.
    pub fn step_count(&self, s: f64) -> usize {
        if !(s > 0.0) || !s.is_finite() {
            return 0;
        }
        ((s / self.config.ds).floor() as usize).max(1)
    }

    /// Interpolate curvature using quadratic polynomial
    /// k(t) = a*t^2 + b*t + c where t in [0, 1]
    /// Boundary conditions: k(0)=k0, k(0.5)=km, k(1)=kf
    fn interpolate_curvature(&self, t: f64, k0: f64, km: f64, kf: f64) -> f64 {
        // c = k0
        // a + b = kf - k0
        // 0.25*a + 0.5*b = km - k0
        let a = 2.0 * (kf + k0 - 2.0 * km);
        let b = -kf - 3.0 * k0 + 4.0 * km;
        let c = k0;

        a * t * t + b * t + c
    }

    /// Integrate from the origin, calling `visit` after every step
    fn integrate<F>(&self, s: f64, km: f64, kf: f64, k0: f64, mut visit: F) -> VehicleState
    where
        F: FnMut(&VehicleState),
    {
        let mut state = VehicleState::origin();
        let n = self.step_count(s);
        if n == 0 {
            return state;
        }

        let v = self.config.default_velocity;
        let dt = s / n as f64 / v;

        for i in 0..n {
            let t = i as f64 / n as f64;
            let k = self.interpolate_curvature(t, k0, km, kf);

            // Convert curvature to steering angle: delta = atan(L * k)
            let delta = (self.config.wheelbase * k).atan();

            state = self.update(&state, v, delta, dt);
            visit(&state);
        }

        state
    }
}

impl Default for BicycleModel {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MotionModel for BicycleModel {
    fn generate_trajectory(&self, s: f64, km: f64, kf: f64, k0: f64) -> Trajectory {
        let mut trajectory = Trajectory::with_capacity(self.step_count(s));
        self.integrate(s, km, kf, k0, |state| trajectory.push(state.pose()));
        trajectory
    }

    fn generate_last_state(&self, s: f64, km: f64, kf: f64, k0: f64) -> Pose2D {
        self.integrate(s, km, kf, k0, |_| {}).pose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_motion_model_update() {
        let model = BicycleModel::with_defaults();
        let state = VehicleState::origin();
        let next = model.update(&state, 1.0, 0.0, 0.1);

        // Moving straight at 1 m/s for 0.1s should move 0.1m forward
        assert_abs_diff_eq!(next.x, 0.1, epsilon = 1e-10);
        assert_abs_diff_eq!(next.y, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(next.yaw, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_curvature_interpolation() {
        let model = BicycleModel::with_defaults();
        let (k0, km, kf) = (0.0, 0.1, 0.2);

        assert_abs_diff_eq!(model.interpolate_curvature(0.0, k0, km, kf), k0, epsilon = 1e-10);
        assert_abs_diff_eq!(model.interpolate_curvature(0.5, k0, km, kf), km, epsilon = 1e-10);
        assert_abs_diff_eq!(model.interpolate_curvature(1.0, k0, km, kf), kf, epsilon = 1e-10);
    }

    #[test]
    fn test_generate_trajectory_straight() {
        let model = BicycleModel::with_defaults();
        let traj = model.generate_trajectory(5.0, 0.0, 0.0, 0.0);

        assert!(traj.len() > 1);
        for yi in &traj.y {
            assert!(yi.abs() < 1e-9);
        }
        // Step length is s / n, so the straight path covers exactly s
        assert_abs_diff_eq!(traj.end_pose().x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_generate_trajectory_turn() {
        let model = BicycleModel::with_defaults();
        let traj = model.generate_trajectory(2.0, 0.1, 0.1, 0.1);

        // Constant positive curvature should turn left (positive y)
        assert!(traj.len() > 1);
        assert!(traj.end_pose().y > 0.0);
        // Constant curvature k over arc length s turns by k * s
        assert_abs_diff_eq!(traj.end_pose().yaw, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_last_state_matches_trajectory_end() {
        let model = BicycleModel::with_defaults();
        let traj = model.generate_trajectory(12.3, 0.05, -0.1, 0.02);
        let last = model.generate_last_state(12.3, 0.05, -0.1, 0.02);
        assert_eq!(traj.end_pose(), last);
    }

    #[test]
    fn test_non_positive_arc_length_stays_at_origin() {
        let model = BicycleModel::with_defaults();
        for &s in &[0.0, -1.0, f64::NAN] {
            let traj = model.generate_trajectory(s, 0.1, 0.1, 0.0);
            assert_eq!(traj.len(), 1);
            assert_eq!(model.generate_last_state(s, 0.1, 0.1, 0.0), Pose2D::origin());
        }
    }

    #[test]
    fn test_short_arc_takes_single_step() {
        let model = BicycleModel::with_defaults();
        assert_eq!(model.step_count(0.05), 1);
        let last = model.generate_last_state(0.05, 0.0, 0.0, 0.0);
        assert_abs_diff_eq!(last.x, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_yaw_stays_wrapped() {
        let model = BicycleModel::with_defaults();
        // Tight circle: turns well past pi
        let traj = model.generate_trajectory(20.0, 0.5, 0.5, 0.5);
        assert!(traj.yaw.iter().all(|&yaw| yaw > -PI && yaw <= PI));
    }

    #[test]
    fn test_config_validation() {
        assert!(MotionModelConfig::default().validate().is_ok());

        let mut config = MotionModelConfig::default();
        config.ds = 0.0;
        assert!(matches!(config.validate(), Err(PlannerError::InvalidParameter(_))));
    }
}
