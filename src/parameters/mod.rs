//! # Parameter System
//!
//! This module provides hierarchical hyperparameter containers for composable
//! probabilistic models such as Gaussian-process kernels, likelihoods and mean
//! functions. Parameters are named numeric arrays with an intrinsic domain, an
//! optional prior and a block tag, and a model's parameters can be flattened
//! into one ordered vector for optimizers and samplers.
//!
//! ## Key Features
//!
//! - **Domains and Transforms**: every parameter lives in a [`Domain`] whose transform
//!   maps it into an unconstrained space, with chain-rule gradient factors
//! - **Priors**: attach a named distribution from a [`PriorRegistry`]; the effective
//!   bounds are the intersection of the domain and the prior's support
//! - **Flattening**: concatenate values, bounds, gradient factors and log-prior
//!   gradients of a whole tree of parameters in a stable order
//! - **Composition**: embed a parameterized sub-object under a namespace, sharing
//!   its leaves with the parent
//! - **Update hooks**: owners are notified once after every successful mutation
//! - **Serialization Support**: export and restore parameter records with serde
//!
//! ## Core Components
//!
//! - [`Parameter`]: a single named array with its domain, prior, bounds and block
//! - [`ParameterContainer`]: an ordered map of names to shared leaves ([`ParamRef`])
//! - [`Parameterized`] and [`Params`]: the owner trait and its notifying handle
//! - [`DeepCopy`] and [`CopyMemo`]: identity-preserving copies of whole models
//!
//! ## Example Usage
//!
//! ```rust
//! use hyperparam_rs::parameters::{
//!     CopyMemo, DeepCopy, Dim, Domain, ParamRef, ParameterContainer, Parameterized, Space,
//! };
//!
//! struct SquaredExponential {
//!     params: ParameterContainer,
//!     rho: ParamRef,
//!     ell: ParamRef,
//! }
//!
//! impl SquaredExponential {
//!     fn new(rho: f64, ell: Vec<f64>) -> Self {
//!         let mut params = ParameterContainer::new();
//!         let rho = params.declare("rho", rho, Domain::Positive, &[]).unwrap();
//!         let ell = params.declare("ell", ell, Domain::Positive, &[Dim::Label("d")]).unwrap();
//!         Self { params, rho, ell }
//!     }
//! }
//!
//! impl Parameterized for SquaredExponential {
//!     fn container(&self) -> &ParameterContainer {
//!         &self.params
//!     }
//! }
//!
//! impl DeepCopy for SquaredExponential {
//!     fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
//!         Self {
//!             params: self.params.deep_copy(memo),
//!             rho: self.rho.deep_copy(memo),
//!             ell: self.ell.deep_copy(memo),
//!         }
//!     }
//! }
//!
//! let mut kernel = SquaredExponential::new(1.0, vec![0.5, 2.0]);
//! assert_eq!(kernel.container().names(), vec!["rho", "ell[0]", "ell[1]"]);
//!
//! // Attach a prior to one parameter
//! kernel.params().select(&["rho"]).unwrap().set_prior(Some("lognormal"), &[0.0, 1.0]).unwrap();
//!
//! // Move the whole model in unconstrained space
//! let theta = kernel.container().get_value(Space::Transformed);
//! kernel.params().set_value(&(theta + 0.1), Space::Transformed).unwrap();
//! assert!(kernel.rho.scalar() > 1.0);
//! ```

pub mod bounds;
pub mod container;
pub mod domain;
pub mod parameter;
pub mod parameterized;
pub mod priors;
pub mod table;


// Re-export key types
pub use bounds::{Bounds, BoundsError};
pub use container::{ParamRef, ParameterContainer, ParameterRecord, SerializationError};
pub use domain::{Domain, Transform, EPSILON};
pub use parameter::{Parameter, ParameterError, Space};
pub use parameterized::{CopyMemo, DeepCopy, Dim, IntoValue, Parameterized, Params};
pub use priors::{registry, Prior, PriorError, PriorFactory, PriorRegistry};
