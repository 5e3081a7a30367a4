//! Model Predictive Trajectory Generator
//!
//! Finds the curvature parameters `[s, km, kf]` that steer the motion model
//! from the origin onto a target pose. Gauss-Newton on the terminal residual,
//! with a central finite-difference Jacobian and a coarse step-size search.
//!
//! The Jacobian is fully re-estimated every iteration (six extra terminal
//! evaluations) and carries an `O(h^2)` truncation error. Arc-length
//! perturbations smaller than the model's `ds` can leave the step count
//! unchanged, so keep `h[0]` well above it.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::{wrap_diff, MotionModel, PlannerError, PlannerResult, Pose2D, Trajectory};

use super::motion_model::BicycleModel;

/// Trajectory parameters: [s, km, kf]
/// - s: arc length
/// - km: middle curvature
/// - kf: final curvature
pub type TrajectoryParams = Vector3<f64>;

/// Trajectory generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryGeneratorConfig {
    /// Maximum optimization iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Convergence threshold on the residual norm
    #[serde(default = "default_cost_threshold")]
    pub cost_threshold: f64,
    /// Finite difference step for the Jacobian [ds, dkm, dkf].
    /// Tuned together with `cost_threshold`.
    #[serde(default = "default_h")]
    pub h: [f64; 3],
    /// Lower bound applied to the arc length after each update [m]
    #[serde(default = "default_min_arc_length")]
    pub min_arc_length: f64,
    /// Jacobians with |det| at or below this are treated as singular
    #[serde(default = "default_singular_epsilon")]
    pub singular_epsilon: f64,
    /// Smallest step-size candidate
    #[serde(default = "default_step_min")]
    pub step_min: f64,
    /// Exclusive upper bound of the step-size candidates
    #[serde(default = "default_step_max")]
    pub step_max: f64,
    /// Spacing between step-size candidates
    #[serde(default = "default_step_increment")]
    pub step_increment: f64,
}

fn default_max_iterations() -> usize {
    100
}
fn default_cost_threshold() -> f64 {
    0.1
}
fn default_h() -> [f64; 3] {
    [0.5, 0.02, 0.02]
}
fn default_min_arc_length() -> f64 {
    0.1
}
fn default_singular_epsilon() -> f64 {
    1e-9
}
fn default_step_min() -> f64 {
    1.0
}
fn default_step_max() -> f64 {
    2.0
}
fn default_step_increment() -> f64 {
    0.5
}

impl Default for TrajectoryGeneratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            cost_threshold: default_cost_threshold(),
            h: default_h(),
            min_arc_length: default_min_arc_length(),
            singular_epsilon: default_singular_epsilon(),
            step_min: default_step_min(),
            step_max: default_step_max(),
            step_increment: default_step_increment(),
        }
    }
}

impl TrajectoryGeneratorConfig {
    /// Finite difference steps as a vector
    pub fn perturbation(&self) -> Vector3<f64> {
        Vector3::from(self.h)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if self.max_iterations == 0 {
            return Err(PlannerError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.cost_threshold.is_finite() && self.cost_threshold > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "cost_threshold must be positive, got {}",
                self.cost_threshold
            )));
        }
        if self.h.iter().any(|h| !(h.is_finite() && *h > 0.0)) {
            return Err(PlannerError::InvalidParameter(format!(
                "finite difference steps must be positive, got {:?}",
                self.h
            )));
        }
        if !(self.min_arc_length.is_finite() && self.min_arc_length > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "min_arc_length must be positive, got {}",
                self.min_arc_length
            )));
        }
        if !(self.singular_epsilon >= 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "singular_epsilon must be non-negative, got {}",
                self.singular_epsilon
            )));
        }
        GridStepSelector::new(self.step_min, self.step_max, self.step_increment).map(|_| ())
    }
}

/// Terminal residual `target - reached`, yaw term wrapped
pub fn calc_diff(target: &Pose2D, reached: &Pose2D) -> Vector3<f64> {
    Vector3::new(
        target.x - reached.x,
        target.y - reached.y,
        wrap_diff(target.yaw, reached.yaw),
    )
}

/// Residual at the terminal state reached with `params`
pub fn terminal_residual(
    model: &dyn MotionModel,
    target: &Pose2D,
    params: &TrajectoryParams,
    k0: f64,
) -> Vector3<f64> {
    let last = model.generate_last_state(params[0], params[1], params[2], k0);
    calc_diff(target, &last)
}

/// Jacobian of the terminal residual w.r.t. `[s, km, kf]`
///
/// Central differences: column `i` is `(D(p + h_i) - D(p - h_i)) / (2 h_i)`,
/// each parameter perturbed on its own. `params` is taken by reference and
/// never modified.
pub fn calc_jacobian(
    model: &dyn MotionModel,
    target: &Pose2D,
    params: &TrajectoryParams,
    h: &Vector3<f64>,
    k0: f64,
) -> Matrix3<f64> {
    let mut jacobian = Matrix3::zeros();

    for i in 0..3 {
        let mut params_plus = *params;
        params_plus[i] += h[i];
        let mut params_minus = *params;
        params_minus[i] -= h[i];

        let diff_plus = terminal_residual(model, target, &params_plus, k0);
        let diff_minus = terminal_residual(model, target, &params_minus, k0);

        jacobian.set_column(i, &((diff_plus - diff_minus) / (2.0 * h[i])));
    }

    jacobian
}

/// Strategy choosing how far to move along a Gauss-Newton direction
pub trait StepSizeSelector: Send + Sync {
    /// Scale `alpha` for the update `params + alpha * delta`
    fn select(
        &self,
        model: &dyn MotionModel,
        target: &Pose2D,
        params: &TrajectoryParams,
        delta: &Vector3<f64>,
        k0: f64,
    ) -> f64;
}

/// Upper bound on the number of step-size candidates in a grid
pub const MAX_STEP_CANDIDATES: usize = 1024;

/// Greedy search over a small fixed grid of step sizes
///
/// Candidates are `min, min + increment, ...` strictly below `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridStepSelector {
    candidates: Vec<f64>,
}

impl GridStepSelector {
    pub fn new(min: f64, max: f64, increment: f64) -> PlannerResult<Self> {
        if !(min.is_finite() && max.is_finite() && increment.is_finite()) {
            return Err(PlannerError::InvalidParameter(
                "step-size grid bounds must be finite".to_string(),
            ));
        }
        if !(increment > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "step increment must be positive, got {}",
                increment
            )));
        }
        let span = ((max - min) / increment).ceil().max(0.0);
        if !(span <= MAX_STEP_CANDIDATES as f64) {
            return Err(PlannerError::InvalidParameter(format!(
                "step-size grid [{}, {}) by {} exceeds {} candidates",
                min, max, increment, MAX_STEP_CANDIDATES
            )));
        }
        let count = span as usize;
        let candidates: Vec<f64> = (0..count)
            .map(|i| min + i as f64 * increment)
            .filter(|&alpha| alpha != 0.0)
            .collect();
        if candidates.is_empty() {
            return Err(PlannerError::InvalidParameter(format!(
                "step-size grid [{}, {}) by {} has no non-zero candidate",
                min, max, increment
            )));
        }
        Ok(Self { candidates })
    }

    pub fn from_config(config: &TrajectoryGeneratorConfig) -> PlannerResult<Self> {
        Self::new(config.step_min, config.step_max, config.step_increment)
    }

    pub fn candidates(&self) -> &[f64] {
        &self.candidates
    }
}

impl Default for GridStepSelector {
    fn default() -> Self {
        Self {
            candidates: vec![1.0, 1.5],
        }
    }
}

impl StepSizeSelector for GridStepSelector {
    fn select(
        &self,
        model: &dyn MotionModel,
        target: &Pose2D,
        params: &TrajectoryParams,
        delta: &Vector3<f64>,
        k0: f64,
    ) -> f64 {
        let mut best_alpha = self.candidates[0];
        let mut min_cost = f64::INFINITY;

        for &alpha in &self.candidates {
            let trial = params + alpha * delta;
            let cost = terminal_residual(model, target, &trial, k0).norm();
            // Strict comparison keeps the first candidate on ties
            if cost < min_cost {
                min_cost = cost;
                best_alpha = alpha;
            }
        }

        best_alpha
    }
}

/// Result of a successful optimization
#[derive(Debug, Clone)]
pub struct Optimized {
    /// Trajectory integrated from the converged parameters
    pub trajectory: Trajectory,
    /// Converged parameters
    pub params: TrajectoryParams,
    /// Number of parameter updates applied
    pub iterations: usize,
    /// Residual norm at convergence
    pub cost: f64,
}

/// Model Predictive Trajectory Generator
pub struct TrajectoryGenerator<M = BicycleModel, S = GridStepSelector> {
    motion_model: M,
    selector: S,
    config: TrajectoryGeneratorConfig,
}

impl TrajectoryGenerator {
    pub fn with_defaults() -> Self {
        Self::new(
            BicycleModel::with_defaults(),
            GridStepSelector::default(),
            TrajectoryGeneratorConfig::default(),
        )
    }
}

impl<M: MotionModel, S: StepSizeSelector> TrajectoryGenerator<M, S> {
    pub fn new(motion_model: M, selector: S, config: TrajectoryGeneratorConfig) -> Self {
        Self {
            motion_model,
            selector,
            config,
        }
    }

    pub fn config(&self) -> &TrajectoryGeneratorConfig {
        &self.config
    }

    pub fn motion_model(&self) -> &M {
        &self.motion_model
    }

    /// Generate trajectory with given parameters
    pub fn generate(&self, params: &TrajectoryParams, k0: f64) -> Trajectory {
        self.motion_model
            .generate_trajectory(params[0], params[1], params[2], k0)
    }

    /// Calculate cost (L2 norm of the terminal residual)
    pub fn calc_cost(&self, target: &Pose2D, params: &TrajectoryParams, k0: f64) -> f64 {
        terminal_residual(&self.motion_model, target, params, k0).norm()
    }

    /// Optimize trajectory to reach target state
    ///
    /// # Arguments
    /// * `target` - Target pose
    /// * `k0` - Initial curvature
    /// * `init_params` - Seed parameters [s, km, kf], s > 0
    ///
    /// # Returns
    /// Converged trajectory and parameters, or why the run failed
    pub fn optimize(
        &self,
        target: &Pose2D,
        k0: f64,
        init_params: TrajectoryParams,
    ) -> PlannerResult<Optimized> {
        if !target.is_finite() || !k0.is_finite() {
            return Err(PlannerError::InvalidParameter(format!(
                "target {:?} / k0 {} must be finite",
                target, k0
            )));
        }
        if !init_params.iter().all(|p| p.is_finite()) || !(init_params[0] > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "seed parameters must be finite with s > 0, got [{}, {}, {}]",
                init_params[0], init_params[1], init_params[2]
            )));
        }

        let h = self.config.perturbation();
        let mut params = init_params;

        for iteration in 0..self.config.max_iterations {
            let trajectory = self.generate(&params, k0);
            let diff = calc_diff(target, &trajectory.end_pose());
            let cost = diff.norm();
            trace!(
                iteration,
                cost,
                s = params[0],
                km = params[1],
                kf = params[2],
                "optimizer step"
            );

            if cost <= self.config.cost_threshold {
                debug!(iteration, cost, "trajectory converged");
                return Ok(Optimized {
                    trajectory,
                    params,
                    iterations: iteration,
                    cost,
                });
            }
            if !cost.is_finite() {
                return Err(PlannerError::NoConvergence {
                    iterations: iteration,
                    cost,
                });
            }

            let jacobian = calc_jacobian(&self.motion_model, target, &params, &h, k0);
            let delta = solve_step(&jacobian, &diff, self.config.singular_epsilon)
                .ok_or(PlannerError::NonInvertibleJacobian { iteration })?;

            let alpha = self
                .selector
                .select(&self.motion_model, target, &params, &delta, k0);
            params += alpha * delta;

            if params[0] < self.config.min_arc_length {
                params[0] = self.config.min_arc_length;
            }
        }

        let cost = self.calc_cost(target, &params, k0);
        debug!(cost, "trajectory optimization exhausted its iteration budget");
        Err(PlannerError::NoConvergence {
            iterations: self.config.max_iterations,
            cost,
        })
    }
}

/// Solve `J * delta = -diff`
fn solve_step(
    jacobian: &Matrix3<f64>,
    diff: &Vector3<f64>,
    singular_epsilon: f64,
) -> Option<Vector3<f64>> {
    let det = jacobian.determinant();
    if !(det.is_finite() && det.abs() > singular_epsilon) {
        return None;
    }
    let rhs = -*diff;
    let delta = jacobian.lu().solve(&rhs)?;
    if delta.iter().all(|d| d.is_finite()) {
        Some(delta)
    } else {
        None
    }
}
