//! Common types, traits, and error definitions for lattice_planner
//!
//! This module provides the foundational building blocks shared by the
//! trajectory optimizer and the lattice planner.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
