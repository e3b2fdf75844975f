//! Finite element solution of the Lamé problem: a thick-walled annulus under
//! inner and outer pressure, discretized with constant strain triangles and
//! checked against the closed-form stresses.
//!
//! The pipeline is [`mesher::build_mesh`] → [`mesher::assemble_task`] →
//! [`solver::run`] → [`solution::Solution::query`] → [`validator::validate`].

pub mod config;
pub mod datatypes;
pub mod element;
pub mod error;
pub mod ingest;
pub mod mesher;
pub mod post_processor;
pub mod solution;
pub mod solver;
pub mod validator;

pub use config::Config;
pub use datatypes::{Axis, BoundaryCondition, Material, Mesh, Task};
pub use error::{AnnulusError, Result};
pub use solution::{FieldValue, GridLocator, LinearScan, PointLocator, Solution};
