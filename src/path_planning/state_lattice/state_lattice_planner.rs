//! State Lattice Planner
//!
//! Samples terminal states, seeds each from the nearest lookup table entry
//! and optimizes a trajectory toward it. Targets the optimizer cannot reach
//! are logged and dropped; a batch never fails because of one target.
//!
//! Based on:
//! - PythonRobotics State Lattice Planner by Atsushi Sakai
//! - "State Space Sampling of Feasible Motions for High-Performance Mobile Robot Navigation"

use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::{
    MotionModel, PlannerError, PlannerResult, Pose2D, Trajectory, TrajectorySink,
};

use super::lookup_table::{LookupTable, LookupTableEntry};
use super::motion_model::{BicycleModel, MotionModelConfig};
use super::sampling::{
    calc_biased_polar_states, calc_lane_states, calc_uniform_polar_states, BiasedSamplingConfig,
    LaneSamplingConfig, PolarSamplingConfig,
};
use super::trajectory_generator::{
    GridStepSelector, StepSizeSelector, TrajectoryGenerator, TrajectoryGeneratorConfig,
    TrajectoryParams,
};

/// Configuration for State Lattice Planner
///
/// Every section is optional in TOML; missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateLatticeConfig {
    /// Initial curvature of every generated trajectory [1/m]
    #[serde(default)]
    pub k0: f64,
    /// Motion model configuration
    #[serde(default)]
    pub motion: MotionModelConfig,
    /// Trajectory generator configuration
    #[serde(default)]
    pub optimizer: TrajectoryGeneratorConfig,
    /// Uniform polar sampling parameters
    #[serde(default)]
    pub uniform: PolarSamplingConfig,
    /// Biased polar sampling parameters
    #[serde(default)]
    pub biased: BiasedSamplingConfig,
    /// Lane sampling parameters
    #[serde(default)]
    pub lane: LaneSamplingConfig,
}

impl StateLatticeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> PlannerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PlannerResult<Self> {
        let config: StateLatticeConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> PlannerResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check the parameters the planner needs up front
    ///
    /// Sampling sections are checked when a strategy runs.
    pub fn validate(&self) -> PlannerResult<()> {
        if !self.k0.is_finite() {
            return Err(PlannerError::InvalidParameter(format!(
                "k0 must be finite, got {}",
                self.k0
            )));
        }
        self.motion.validate()?;
        self.optimizer.validate()
    }
}

/// One converged lattice trajectory
#[derive(Debug, Clone)]
pub struct LatticePath {
    /// Sampled target pose
    pub target: Pose2D,
    /// Pose actually reached
    pub end_pose: Pose2D,
    /// Converged parameters [s, km, kf]
    pub params: TrajectoryParams,
    /// Gauss-Newton updates applied
    pub iterations: usize,
    /// Terminal residual norm
    pub cost: f64,
    pub trajectory: Trajectory,
}

impl LatticePath {
    /// Row for a lookup table built from planner output
    pub fn to_lookup_entry(&self) -> LookupTableEntry {
        LookupTableEntry::new(
            self.end_pose.x,
            self.end_pose.y,
            self.end_pose.yaw,
            self.params[0],
            self.params[1],
            self.params[2],
        )
    }
}

/// Seed parameters for `target`
///
/// Curvatures come from the nearest table entry; the arc length is the
/// straight-line distance to the target, at least `min_arc_length`.
pub fn seed_params(
    target: &Pose2D,
    lookup_table: &LookupTable,
    min_arc_length: f64,
) -> TrajectoryParams {
    let s = target.range().max(min_arc_length);
    match lookup_table.find_nearest(target) {
        Some((nearest, _)) => Vector3::new(s, nearest.km, nearest.kf),
        None => Vector3::new(s, 0.0, 0.0),
    }
}

/// Generate paths to target states
///
/// # Arguments
/// * `generator` - Trajectory optimizer
/// * `targets` - Sampled target poses
/// * `k0` - Initial curvature
/// * `lookup_table` - Seed table
///
/// # Returns
/// Converged paths in target order; failed targets are skipped
pub fn generate_paths<M, S>(
    generator: &TrajectoryGenerator<M, S>,
    targets: &[Pose2D],
    k0: f64,
    lookup_table: &LookupTable,
) -> Vec<LatticePath>
where
    M: MotionModel,
    S: StepSizeSelector,
{
    let min_arc_length = generator.config().min_arc_length;
    let mut paths = Vec::with_capacity(targets.len());

    for target in targets {
        let init_params = seed_params(target, lookup_table, min_arc_length);

        match generator.optimize(target, k0, init_params) {
            Ok(result) => {
                debug!(
                    x = target.x,
                    y = target.y,
                    yaw = target.yaw,
                    iterations = result.iterations,
                    "found path"
                );
                paths.push(LatticePath {
                    target: *target,
                    end_pose: result.trajectory.end_pose(),
                    params: result.params,
                    iterations: result.iterations,
                    cost: result.cost,
                    trajectory: result.trajectory,
                });
            }
            Err(e) => {
                warn!(x = target.x, y = target.y, yaw = target.yaw, "skipping target: {}", e);
            }
        }
    }

    paths
}

/// State Lattice Planner
pub struct StateLattice {
    config: StateLatticeConfig,
    trajectory_generator: TrajectoryGenerator<BicycleModel, GridStepSelector>,
    lookup_table: LookupTable,
}

impl StateLattice {
    /// Build a planner seeded from the default generated lookup table
    pub fn new(config: StateLatticeConfig) -> PlannerResult<Self> {
        config.validate()?;

        let motion_model = BicycleModel::new(config.motion.clone());
        let lookup_table = LookupTable::generate_default_for(&motion_model);
        let selector = GridStepSelector::from_config(&config.optimizer)?;
        let trajectory_generator =
            TrajectoryGenerator::new(motion_model, selector, config.optimizer.clone());

        Ok(Self {
            config,
            trajectory_generator,
            lookup_table,
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: StateLatticeConfig::default(),
            trajectory_generator: TrajectoryGenerator::with_defaults(),
            lookup_table: LookupTable::generate_default(),
        }
    }

    /// Replace the seed table
    pub fn with_lookup_table(mut self, lookup_table: LookupTable) -> Self {
        self.lookup_table = lookup_table;
        self
    }

    /// Set lookup table from CSV data
    pub fn set_lookup_table_from_csv(&mut self, csv_data: &str) -> PlannerResult<()> {
        self.lookup_table = LookupTable::from_csv(csv_data)?;
        Ok(())
    }

    /// Set initial curvature
    pub fn set_initial_curvature(&mut self, k0: f64) {
        self.config.k0 = k0;
    }

    /// Get configuration
    pub fn config(&self) -> &StateLatticeConfig {
        &self.config
    }

    pub fn lookup_table(&self) -> &LookupTable {
        &self.lookup_table
    }

    pub fn trajectory_generator(&self) -> &TrajectoryGenerator<BicycleModel, GridStepSelector> {
        &self.trajectory_generator
    }

    // ========================================================================
    // State Sampling Methods
    // ========================================================================

    pub fn calc_uniform_polar_states(&self) -> PlannerResult<Vec<Pose2D>> {
        calc_uniform_polar_states(&self.config.uniform)
    }

    pub fn calc_biased_polar_states(&self, goal_angle: f64) -> PlannerResult<Vec<Pose2D>> {
        calc_biased_polar_states(goal_angle, &self.config.biased)
    }

    pub fn calc_lane_states(&self) -> PlannerResult<Vec<Pose2D>> {
        calc_lane_states(&self.config.lane)
    }

    // ========================================================================
    // Path Generation Methods
    // ========================================================================

    /// Generate paths to target states with the configured k0
    pub fn generate_paths(&self, targets: &[Pose2D]) -> Vec<LatticePath> {
        let paths = generate_paths(
            &self.trajectory_generator,
            targets,
            self.config.k0,
            &self.lookup_table,
        );
        info!("generated {} of {} lattice paths", paths.len(), targets.len());
        paths
    }

    /// Generate paths using uniform polar sampling
    pub fn plan_uniform_polar(&self) -> PlannerResult<Vec<LatticePath>> {
        let targets = self.calc_uniform_polar_states()?;
        Ok(self.generate_paths(&targets))
    }

    /// Generate paths using biased polar sampling
    pub fn plan_biased_polar(&self, goal_angle: f64) -> PlannerResult<Vec<LatticePath>> {
        let targets = self.calc_biased_polar_states(goal_angle)?;
        Ok(self.generate_paths(&targets))
    }

    /// Generate paths using lane sampling
    pub fn plan_lane_states(&self) -> PlannerResult<Vec<LatticePath>> {
        let targets = self.calc_lane_states()?;
        Ok(self.generate_paths(&targets))
    }

    /// Hand every path's trajectory to `sink`
    pub fn render<T: TrajectorySink + ?Sized>(&self, paths: &[LatticePath], sink: &mut T) {
        for path in paths {
            sink.accept(&path.target, &path.trajectory);
        }
    }
}

impl Default for StateLattice {
    fn default() -> Self {
        Self::with_defaults()
    }
}
