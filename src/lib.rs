//! # hyperparam-rs
//!
//! `hyperparam-rs` is a Rust implementation of hierarchical hyperparameter
//! containers for composable probabilistic models such as Gaussian-process
//! covariance functions.
//!
//! The library provides:
//! - Named, array-valued parameters with intrinsic domains and optional priors
//! - Bijective reparameterization into an unconstrained space with chain-rule gradient factors
//! - A flattened vector view of a whole tree of parameters for optimizers and samplers
//! - Owners that are notified once after every mutation, and identity-preserving deep copies
//!
//! ## Basic Usage
//!
//! ```
//! use hyperparam_rs::parameters::{Domain, ParameterContainer, Space};
//!
//! let mut params = ParameterContainer::new();
//! params.declare("sn2", 0.1, Domain::Positive, &[]).unwrap();
//! params.declare("bias", 0.0, Domain::Real, &[]).unwrap();
//!
//! let bounds = params.get_bounds(Space::Natural);
//! assert_eq!(bounds.shape(), &[2, 2]);
//! assert_eq!(params.names(), vec!["sn2", "bias"]);
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

// Re-exports for convenience
pub use error::{HyperParamError, Result};
pub use parameters::{Domain, ParameterContainer, Parameterized, Space};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
