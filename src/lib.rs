//! lattice_planner - State lattice planning with model predictive trajectory generation
//!
//! Samples candidate terminal poses around a vehicle and optimizes bicycle
//! model trajectories toward each of them.

// Core modules
pub mod common;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{Point2D, Pose2D, Path2D, Trajectory};
pub use common::{MotionModel, TrajectorySink};
pub use common::{PlannerError, PlannerResult};
