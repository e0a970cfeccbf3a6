//! Parameter domains and their reparameterizations
//!
//! A [`Domain`] selects both the intrinsic box a parameter must live in and the
//! bijection used to move it into an unconstrained space for optimizers and
//! samplers. The set of domains is closed; each one maps to a fixed transform.

use crate::parameters::bounds::Bounds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest admissible distance from an open boundary.
pub const EPSILON: f64 = 1e-15;

/// A bijection between natural parameter space and an unconstrained space.
pub trait Transform: Sync {
    /// Map a natural-space value into the transformed space.
    fn to_transformed(&self, x: f64) -> f64;

    /// Map a transformed-space value back into natural space.
    fn to_natural(&self, y: f64) -> f64;

    /// `dx/dy` evaluated at the natural-space value `x`.
    ///
    /// Multiplying a natural-space gradient by this factor yields the gradient
    /// with respect to the transformed coordinate.
    fn gradfactor(&self, x: f64) -> f64;
}

/// Identity: `(-inf, inf) -> (-inf, inf)`.
pub struct Identity;

impl Transform for Identity {
    #[inline]
    fn to_transformed(&self, x: f64) -> f64 {
        x
    }
    #[inline]
    fn to_natural(&self, y: f64) -> f64 {
        y
    }
    #[inline]
    fn gradfactor(&self, _x: f64) -> f64 {
        1.0
    }
}

/// Log: `[EPSILON, inf) -> (-inf, inf)`, `y = ln(x)`.
pub struct Log;

impl Transform for Log {
    #[inline]
    fn to_transformed(&self, x: f64) -> f64 {
        x.ln()
    }
    #[inline]
    fn to_natural(&self, y: f64) -> f64 {
        // exp underflows to zero long before y reaches -inf. NaN must reach the
        // bounds check, and f64::max would swallow it
        if y.is_nan() {
            return y;
        }
        y.exp().max(EPSILON)
    }
    #[inline]
    fn gradfactor(&self, x: f64) -> f64 {
        x
    }
}

/// Logit: `[EPSILON, 1 - EPSILON] -> (-inf, inf)`, `y = ln(x / (1 - x))`.
pub struct Logit;

impl Transform for Logit {
    #[inline]
    fn to_transformed(&self, x: f64) -> f64 {
        (x / (1.0 - x)).ln()
    }
    #[inline]
    fn to_natural(&self, y: f64) -> f64 {
        let x = if y >= 0.0 {
            1.0 / (1.0 + (-y).exp())
        } else {
            let e = y.exp();
            e / (1.0 + e)
        };
        x.clamp(EPSILON, 1.0 - EPSILON)
    }
    #[inline]
    fn gradfactor(&self, x: f64) -> f64 {
        x * (1.0 - x)
    }
}

/// The intrinsic domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Any real number, identity transform.
    #[default]
    Real,
    /// Strictly positive numbers, log transform.
    Positive,
    /// The open unit interval, logit transform.
    Unit,
}

impl Domain {
    /// The box every value in this domain must lie in.
    pub fn bounds(&self) -> Bounds {
        match self {
            Domain::Real => Bounds::unbounded(),
            Domain::Positive => Bounds::min_only(EPSILON),
            Domain::Unit => Bounds {
                min: EPSILON,
                max: 1.0 - EPSILON,
            },
        }
    }

    /// The canonical transform of this domain.
    pub fn transform(&self) -> &'static dyn Transform {
        match self {
            Domain::Real => &Identity,
            Domain::Positive => &Log,
            Domain::Unit => &Logit,
        }
    }

    /// Short lowercase identifier of the domain.
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Real => "real",
            Domain::Positive => "positive",
            Domain::Unit => "unit",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
