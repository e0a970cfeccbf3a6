//! Integration tests for the Parameter struct
//!
//! These tests verify that the Parameter struct behaves correctly in various scenarios.

use approx::assert_relative_eq;
use hyperparam_rs::parameters::{
    registry, Bounds, Domain, Parameter, ParameterError, PriorError, Space, EPSILON,
};
use ndarray::{arr0, array, Array2};
use std::f64::{INFINITY, NEG_INFINITY};

#[test]
fn test_parameter_lifecycle() {
    // Create a parameter
    let mut param = Parameter::new(array![0.2, 0.7].into_dyn(), Domain::Unit).unwrap();

    // Check initial state
    assert_eq!(param.size(), 2);
    assert_eq!(param.domain(), Domain::Unit);
    assert!(param.prior().is_none());
    assert_eq!(param.block(), 0);
    assert_eq!(param.bound(0), Bounds::new(EPSILON, 1.0 - EPSILON).unwrap());

    // Change value
    param.set_value(array![0.3, 0.4].view(), Space::Natural).unwrap();
    assert_eq!(param.get_value(Space::Natural), array![0.3, 0.4]);

    // Set value outside the domain (should fail)
    assert!(param.set_value(array![0.3, 1.0].view(), Space::Natural).is_err());
    assert!(param.set_value(array![0.0, 0.4].view(), Space::Natural).is_err());
    assert_eq!(param.get_value(Space::Natural), array![0.3, 0.4]);

    // Transformed space round trip
    let theta = param.get_value(Space::Transformed);
    param.set_value(theta.view(), Space::Transformed).unwrap();
    assert_relative_eq!(param.get_value(Space::Natural)[0], 0.3, epsilon = 1e-12);
    assert_relative_eq!(param.get_value(Space::Natural)[1], 0.4, epsilon = 1e-12);

    // Attach a prior that excludes part of the current value
    let clipped = param.set_prior(Some("uniform"), &[0.35, 0.9]).unwrap();
    assert!(clipped);
    assert_eq!(param.get_value(Space::Natural), array![0.35, 0.4]);
    assert_eq!(param.bound(1), Bounds::new(0.35, 0.9).unwrap());

    // Tag for block-structured algorithms
    param.set_block(3);
    assert_eq!(param.block(), 3);
}

#[test]
fn test_parameter_nan_step_fails() {
    // A diverged optimizer step in transformed space must not become a valid value
    let mut ell = Parameter::new(array![2.0, 3.0].into_dyn(), Domain::Positive).unwrap();
    let before = ell.get_value(Space::Transformed);
    let err = ell.set_value(array![0.0, f64::NAN].view(), Space::Transformed).unwrap_err();
    assert!(matches!(err, ParameterError::DomainViolation { index: 1, .. }));
    assert_eq!(ell.get_value(Space::Transformed), before);
    assert_eq!(ell.get_value(Space::Natural), array![2.0, 3.0]);
}

#[test]
fn test_parameter_matrix_value() {
    let value = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let mut param = Parameter::new(value.into_dyn(), Domain::Real).unwrap();
    assert_eq!(param.shape(), &[2, 2]);
    assert_eq!(param.get_value(Space::Natural), array![1.0, 2.0, 3.0, 4.0]);

    // Flat writes keep the shape
    param.set_value(array![4.0, 3.0, 2.0, 1.0].view(), Space::Natural).unwrap();
    assert_eq!(param.shape(), &[2, 2]);
    assert_eq!(param.value()[[0, 1]], 3.0);
}

#[test]
fn test_parameter_default_bounds() {
    let param = Parameter::new(arr0(1.0).into_dyn(), Domain::Real).unwrap();
    assert_eq!(param.bound(0).min, NEG_INFINITY);
    assert_eq!(param.bound(0).max, INFINITY);

    let param = Parameter::new(arr0(1.0).into_dyn(), Domain::Positive).unwrap();
    assert_eq!(param.bound(0).min, EPSILON);
    assert_eq!(param.bound(0).max, INFINITY);
}

#[test]
fn test_parameter_prior_errors() {
    let mut param = Parameter::new(arr0(1.0).into_dyn(), Domain::Positive).unwrap();

    assert!(matches!(
        param.set_prior(Some("uniform"), &[1.0]),
        Err(ParameterError::PriorError(PriorError::Arity { got: 1, .. }))
    ));
    assert!(matches!(
        param.set_prior(Some("uniform"), &[2.0, 1.0]),
        Err(ParameterError::PriorError(PriorError::InvalidHyperparameter { .. }))
    ));
    assert!(matches!(
        param.set_prior(Some("normal"), &[0.0, 1.0]).map(|_| param.bound(0).min),
        Ok(min) if min == EPSILON
    ));
}

#[test]
fn test_builtin_registry() {
    assert_eq!(registry().names(), vec!["lognormal", "normal", "uniform"]);

    let prior = registry().create("lognormal", &[]).unwrap();
    assert_eq!(prior.to_string(), "LogNormal(mu=0, sigma=1)");
    assert_eq!(prior.support(), vec![Bounds::min_only(EPSILON)]);
    assert_relative_eq!(
        prior.log_density(array![1.0].view()),
        -0.5 * (2.0 * std::f64::consts::PI).ln()
    );
}

#[test]
fn test_bounds_serialization() {
    let bounds = Bounds::min_only(0.5);
    let json = serde_json::to_string(&bounds).unwrap();
    assert_eq!(json, r#"{"min":0.5,"max":null}"#);
    let back: Bounds = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bounds);

    assert!(serde_json::from_str::<Bounds>(r#"{"min":2.0,"max":1.0}"#).is_err());
}
