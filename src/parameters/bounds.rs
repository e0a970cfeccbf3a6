//! Parameter bounds implementation
//!
//! This module provides the closed box `[min, max]` used for both the intrinsic
//! bounds of a domain and the support of a prior. The effective bounds of a
//! parameter are always derived by intersecting these two boxes.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Bounds [{a_min}, {a_max}] and [{b_min}, {b_max}] do not overlap")]
    Disjoint {
        a_min: f64,
        a_max: f64,
        b_min: f64,
        b_max: f64,
    },
}

/// Represents a closed box constraint on a single scalar component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value
    pub min: f64,

    /// Maximum allowed value
    pub max: f64,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;

        // JSON has no infinities, so open ends are written as null
        if self.min.is_infinite() && self.min.is_sign_negative() {
            state.serialize_field("min", &Option::<f64>::None)?;
        } else {
            state.serialize_field("min", &self.min)?;
        }

        if self.max.is_infinite() && self.max.is_sign_positive() {
            state.serialize_field("max", &Option::<f64>::None)?;
        } else {
            state.serialize_field("max", &self.max)?;
        }

        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;

        let min = helper.min.unwrap_or(NEG_INFINITY);
        let max = helper.max.unwrap_or(INFINITY);

        Bounds::new(min, max).map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

impl Bounds {
    /// Create a new box with min and max values
    ///
    /// # Arguments
    ///
    /// * `min` - Minimum allowed value
    /// * `max` - Maximum allowed value
    ///
    /// # Returns
    ///
    /// A new `Bounds` object if min <= max, or an error otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        // NaN endpoints fail this comparison too
        if !(min <= max) {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded box (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a box with only a minimum value
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Check if a value is within the bounds
    ///
    /// Both ends are inclusive; only values strictly outside are rejected.
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Component-wise intersection `[max(a.min, b.min), min(a.max, b.max)]`
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::bounds::Bounds;
    ///
    /// let a = Bounds::min_only(1e-15);
    /// let b = Bounds::new(-1.0, 2.0).unwrap();
    /// let c = a.intersect(&b).unwrap();
    /// assert_eq!(c.min, 1e-15);
    /// assert_eq!(c.max, 2.0);
    ///
    /// assert!(a.intersect(&Bounds::new(-2.0, -1.0).unwrap()).is_err());
    /// ```
    pub fn intersect(&self, other: &Bounds) -> Result<Bounds, BoundsError> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min > max {
            return Err(BoundsError::Disjoint {
                a_min: self.min,
                a_max: self.max,
                b_min: other.min,
                b_max: other.max,
            });
        }
        Ok(Bounds { min, max })
    }
}
