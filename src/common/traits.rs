//! Common traits defining the seams between the planner and its collaborators

use crate::common::types::*;

/// Forward model integrating curvature parameters into a path from the origin
///
/// Implementations must be deterministic: identical arguments always yield
/// identical output. The optimizer relies on this for its finite differences.
pub trait MotionModel: Send + Sync {
    /// Integrate the full trajectory for arc length `s`, middle curvature
    /// `km`, final curvature `kf` and initial curvature `k0`
    fn generate_trajectory(&self, s: f64, km: f64, kf: f64, k0: f64) -> Trajectory;

    /// Terminal pose only, without collecting the intermediate samples
    fn generate_last_state(&self, s: f64, km: f64, kf: f64, k0: f64) -> Pose2D {
        self.generate_trajectory(s, km, kf, k0).end_pose()
    }
}

/// Consumer of generated trajectories (plotting, logging, export, ...)
pub trait TrajectorySink {
    fn accept(&mut self, target: &Pose2D, trajectory: &Trajectory);
}

impl TrajectorySink for Vec<Trajectory> {
    fn accept(&mut self, _target: &Pose2D, trajectory: &Trajectory) {
        self.push(trajectory.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Moves straight ahead regardless of curvature
    struct StraightModel;

    impl MotionModel for StraightModel {
        fn generate_trajectory(&self, s: f64, _km: f64, _kf: f64, _k0: f64) -> Trajectory {
            let mut traj = Trajectory::origin();
            traj.push(Pose2D::new(s, 0.0, 0.0));
            traj
        }
    }

    #[test]
    fn test_default_last_state_uses_trajectory_end() {
        let model = StraightModel;
        let last = model.generate_last_state(3.0, 0.1, 0.2, 0.0);
        assert_eq!(last, Pose2D::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_vec_sink_collects_trajectories() {
        let model = StraightModel;
        let mut sink: Vec<Trajectory> = Vec::new();
        let target = Pose2D::new(2.0, 0.0, 0.0);
        sink.accept(&target, &model.generate_trajectory(2.0, 0.0, 0.0, 0.0));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].end_pose(), target);
    }
}
