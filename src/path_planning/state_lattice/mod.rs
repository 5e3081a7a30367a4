//! State Lattice Planner Module
//!
//! State lattice planning samples terminal states around the vehicle and
//! uses model predictive trajectory generation to connect the origin to each
//! of them with a smooth, kinematically feasible path.
//!
//! # Components
//!
//! - `motion_model`: Bicycle kinematic model with a quadratic curvature profile
//! - `trajectory_generator`: Gauss-Newton trajectory optimization
//! - `lookup_table`: Precomputed seeds and nearest-match search
//! - `sampling`: Uniform polar, biased polar and lane terminal state sampling
//! - `state_lattice_planner`: Batch path generation and configuration
//!
//! # Example
//!
//! ```no_run
//! use lattice_planner::path_planning::state_lattice::StateLattice;
//!
//! let planner = StateLattice::with_defaults();
//!
//! // Generate paths using uniform polar sampling
//! let paths = planner.plan_uniform_polar().unwrap();
//!
//! // Or steer toward a goal direction
//! let biased = planner.plan_biased_polar(30.0_f64.to_radians()).unwrap();
//! println!("{} + {} paths", paths.len(), biased.len());
//! ```
//!
//! # References
//!
//! - PythonRobotics State Lattice Planner by Atsushi Sakai
//! - "State Space Sampling of Feasible Motions for High-Performance Mobile Robot Navigation"

pub mod motion_model;
pub mod trajectory_generator;
pub mod lookup_table;
pub mod sampling;
pub mod state_lattice_planner;

// Re-exports
pub use motion_model::{wrap_angle, wrap_diff, BicycleModel, MotionModelConfig, VehicleState};
pub use trajectory_generator::{
    calc_diff, calc_jacobian, GridStepSelector, Optimized, StepSizeSelector, TrajectoryGenerator,
    TrajectoryGeneratorConfig, TrajectoryParams,
};
pub use lookup_table::{CsvRows, LookupRowSource, LookupTable, LookupTableEntry};
pub use sampling::{
    calc_biased_polar_states, calc_lane_states, calc_uniform_polar_states, BiasedSamplingConfig,
    LaneSamplingConfig, PolarSamplingConfig,
};
pub use state_lattice_planner::{
    generate_paths, seed_params, LatticePath, StateLattice, StateLatticeConfig,
};
