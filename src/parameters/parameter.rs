//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the leaf of the parameter system:
//! a fixed-shape array of scalars sharing one domain, an optional prior and a
//! block tag. Its effective bounds are derived from the domain and the prior and
//! are never set directly, so every mutation point keeps the value inside them.

use crate::parameters::bounds::{Bounds, BoundsError};
use crate::parameters::domain::{Domain, Transform};
use crate::parameters::priors::{self, Prior, PriorError, PriorRegistry};
use ndarray::{Array1, ArrayD, ArrayView1};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Value {value} at index {index} lies outside the parameter's bounds [{min}, {max}]")]
    DomainViolation {
        index: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Support of prior {prior} lies outside of the {domain} domain")]
    DomainMismatch { domain: Domain, prior: String },

    #[error("Parameter '{name}' has already been registered")]
    DuplicateName { name: String },

    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("Unknown key: {key}")]
    UnknownKey { key: String },

    #[error("Priors can only be set on exactly one parameter at a time, got {count}")]
    AmbiguousTarget { count: usize },

    #[error("Shape mismatch for '{name}': {message}")]
    ShapeMismatch { name: String, message: String },

    #[error("'{name}' must be of type {expected}")]
    TypeMismatch { name: String, expected: String },

    #[error("Invalid block assignment: expected {expected} entries, got {got}")]
    InvalidBlockAssignment { expected: usize, got: usize },

    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Prior error: {0}")]
    PriorError(#[from] PriorError),
}

/// The space a flattened parameter vector is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Space {
    /// The parameter's own values.
    #[default]
    Natural,
    /// The unconstrained image of the values under the domain transform.
    Transformed,
}

/// An array of continuous-valued parameters
///
/// All components share a domain, an optional prior and a block identifier.
/// Parameters are owned by a [`ParameterContainer`](crate::parameters::ParameterContainer)
/// and are not usually manipulated directly.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Current value; its shape is fixed at creation
    value: ArrayD<f64>,

    /// Intrinsic domain, which also selects the transform
    domain: Domain,

    /// Optional prior over the natural-space value
    prior: Option<Rc<dyn Prior>>,

    /// Effective bounds: a single box shared by all components, or one per component
    bounds: Vec<Bounds>,

    /// Block tag used to group parameters
    block: usize,
}

impl Parameter {
    /// Create a new parameter with the given value and domain
    ///
    /// # Arguments
    ///
    /// * `value` - Initial value, which also fixes the parameter's shape
    /// * `domain` - Intrinsic domain of every component
    ///
    /// # Returns
    ///
    /// A new parameter without a prior in block 0, or a domain violation if any
    /// component lies outside the domain's bounds
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::{Domain, Parameter};
    /// use ndarray::arr0;
    ///
    /// let param = Parameter::new(arr0(0.5).into_dyn(), Domain::Positive).unwrap();
    /// assert_eq!(param.size(), 1);
    /// assert!(Parameter::new(arr0(-0.5).into_dyn(), Domain::Positive).is_err());
    /// ```
    pub fn new(value: ArrayD<f64>, domain: Domain) -> Result<Self, ParameterError> {
        let param = Self {
            value,
            domain,
            prior: None,
            bounds: vec![domain.bounds()],
            block: 0,
        };
        param.check_bounds(param.value.iter().copied())?;
        Ok(param)
    }

    /// Get the current value in its original shape
    pub fn value(&self) -> &ArrayD<f64> {
        &self.value
    }

    /// Number of scalar components
    pub fn size(&self) -> usize {
        self.value.len()
    }

    /// Shape fixed at creation
    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// Intrinsic domain of the parameter
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Transform selected by the domain
    pub fn transform(&self) -> &'static dyn Transform {
        self.domain.transform()
    }

    /// The prior, if one is set
    pub fn prior(&self) -> Option<&Rc<dyn Prior>> {
        self.prior.as_ref()
    }

    /// Block tag of the parameter
    pub fn block(&self) -> usize {
        self.block
    }

    /// Set the block tag of the parameter
    pub fn set_block(&mut self, block: usize) {
        self.block = block;
    }

    /// Effective bounds of the component at flat index `index`
    pub fn bound(&self, index: usize) -> Bounds {
        if self.bounds.len() == 1 {
            self.bounds[0]
        } else {
            self.bounds[index]
        }
    }

    /// Effective bounds of every component, in flattened order
    pub fn bounds(&self) -> Vec<Bounds> {
        (0..self.size()).map(|i| self.bound(i)).collect()
    }

    /// Return the value flattened into a vector, in natural or transformed space
    pub fn get_value(&self, space: Space) -> Array1<f64> {
        match space {
            Space::Natural => self.value.iter().copied().collect(),
            Space::Transformed => {
                let transform = self.transform();
                self.value.iter().map(|&x| transform.to_transformed(x)).collect()
            }
        }
    }

    /// Map `theta` into natural space and validate it without writing anything
    ///
    /// # Returns
    ///
    /// The natural-space values `set_value` would store, or an error if the
    /// length is wrong or a component lies outside the bounds
    pub fn check_value(
        &self,
        theta: ArrayView1<f64>,
        space: Space,
    ) -> Result<Array1<f64>, ParameterError> {
        if theta.len() != self.size() {
            return Err(ParameterError::ShapeMismatch {
                name: "value".to_string(),
                message: format!("expected {} elements, got {}", self.size(), theta.len()),
            });
        }
        let natural: Array1<f64> = match space {
            Space::Natural => theta.to_owned(),
            Space::Transformed => {
                let transform = self.transform();
                theta.mapv(|y| transform.to_natural(y))
            }
        };
        self.check_bounds(natural.iter().copied())?;
        Ok(natural)
    }

    /// Set the value from a flattened vector
    ///
    /// If `space` is [`Space::Transformed`] the vector is first mapped back to
    /// natural space. Nothing is written unless every component lies within the
    /// parameter's bounds; the shape of the value is preserved.
    pub fn set_value(&mut self, theta: ArrayView1<f64>, space: Space) -> Result<(), ParameterError> {
        let natural = self.check_value(theta, space)?;
        self.write_flat(natural.iter().copied());
        Ok(())
    }

    /// Factor converting a natural-space gradient into a transformed-space one
    ///
    /// This is the chain-rule derivative `dx/dy` of the transform evaluated at
    /// the current value, one entry per component.
    pub fn gradfactor(&self) -> Array1<f64> {
        let transform = self.transform();
        self.value.iter().map(|&x| transform.gradfactor(x)).collect()
    }

    /// Set the prior by name from the built-in registry
    ///
    /// Passing `None` clears the prior. See [`Parameter::set_prior_object`] for the
    /// bounds and clipping behaviour.
    pub fn set_prior(&mut self, prior: Option<&str>, args: &[f64]) -> Result<bool, ParameterError> {
        self.set_prior_from(priors::registry(), prior, args)
    }

    /// Set the prior by name from the given registry
    pub fn set_prior_from(
        &mut self,
        registry: &PriorRegistry,
        prior: Option<&str>,
        args: &[f64],
    ) -> Result<bool, ParameterError> {
        let prior = match prior {
            Some(name) => Some(registry.create(name, args)?),
            None => None,
        };
        self.set_prior_object(prior)
    }

    /// Attach a prior object, or clear the prior with `None`
    ///
    /// The bounds become the component-wise intersection of the domain box and
    /// the prior's support. If that intersection is empty the call fails with a
    /// domain mismatch and nothing changes. If the current value falls outside
    /// the new bounds it is clipped into them and a warning is logged.
    ///
    /// # Returns
    ///
    /// `true` if the value had to be clipped
    pub fn set_prior_object(&mut self, prior: Option<Rc<dyn Prior>>) -> Result<bool, ParameterError> {
        let prior = match prior {
            Some(prior) => prior,
            None => {
                self.prior = None;
                self.bounds = vec![self.domain.bounds()];
                return Ok(false);
            }
        };

        let support = prior.support();
        if support.len() != 1 && support.len() != self.size() {
            return Err(ParameterError::ShapeMismatch {
                name: prior.to_string(),
                message: format!(
                    "prior support has {} components, parameter has {}",
                    support.len(),
                    self.size()
                ),
            });
        }

        let domain_bounds = self.domain.bounds();
        let mut bounds = Vec::with_capacity(support.len());
        for pbounds in &support {
            let b = domain_bounds
                .intersect(pbounds)
                .map_err(|_| ParameterError::DomainMismatch {
                    domain: self.domain,
                    prior: prior.to_string(),
                })?;
            bounds.push(b);
        }

        self.prior = Some(prior);
        self.bounds = bounds;

        let clipped = self.check_bounds(self.value.iter().copied()).is_err();
        if clipped {
            log::warn!("clipping parameter value outside prior support");
            let value: Vec<f64> = self
                .value
                .iter()
                .enumerate()
                .map(|(i, &x)| self.bound(i).clamp(x))
                .collect();
            self.write_flat(value.into_iter());
        }
        Ok(clipped)
    }

    /// Log-density of the current value under the prior; `0.0` without a prior
    pub fn get_logprior(&self) -> f64 {
        match &self.prior {
            None => 0.0,
            Some(prior) => prior.log_density(self.get_value(Space::Natural).view()),
        }
    }

    /// Log-density of the current value and its gradient; zeros without a prior
    pub fn get_logprior_grad(&self) -> (f64, Array1<f64>) {
        match &self.prior {
            None => (0.0, Array1::zeros(self.size())),
            Some(prior) => prior.log_density_grad(self.get_value(Space::Natural).view()),
        }
    }

    fn check_bounds(&self, values: impl Iterator<Item = f64>) -> Result<(), ParameterError> {
        for (index, value) in values.enumerate() {
            let b = self.bound(index);
            if !b.is_within_bounds(value) {
                return Err(ParameterError::DomainViolation {
                    index,
                    value,
                    min: b.min,
                    max: b.max,
                });
            }
        }
        Ok(())
    }

    fn write_flat(&mut self, values: impl Iterator<Item = f64>) {
        for (dst, src) in self.value.iter_mut().zip(values) {
            *dst = src;
        }
    }
}
