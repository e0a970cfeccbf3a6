//! Integration tests for parameterized owners, embedding and copies

use crate::test_helpers::{values, Bag, Model, Noise, SquaredExponential};
use approx::assert_relative_eq;
use hyperparam_rs::parameters::{ParameterContainer, ParameterError, Parameterized, Space};
use hyperparam_rs::HyperParamError;
use ndarray::array;

fn model() -> Model<SquaredExponential, Noise> {
    let kernel = SquaredExponential::new(1.5, vec![0.5, 2.0]);
    let noise = Noise::new(0.1);
    Model::new(&kernel, &noise, -0.3)
}

#[test]
fn test_update_hook_refreshes_cache() {
    let mut kernel = SquaredExponential::new(1.0, vec![1.0, 2.0]);
    assert_eq!(kernel.inv_ell2, array![1.0, 0.25]);

    kernel.params().set_value(&[2.0, 0.5, 4.0], Space::Natural).unwrap();
    assert_eq!(kernel.updates, 1);
    assert_eq!(kernel.inv_ell2, array![4.0, 1.0 / 16.0]);

    let x = array![0.0, 0.0];
    assert_relative_eq!(kernel.cov(x.view(), x.view()), 2.0);
}

#[test]
fn test_embed_registers_namespace() {
    let model = model();
    let keys: Vec<&str> = model.container().keys().collect();
    assert_eq!(keys, vec!["like.sn2", "kern.rho", "kern.ell", "mean"]);
    assert_eq!(
        model.container().names(),
        vec!["like.sn2", "kern.rho", "kern.ell[0]", "kern.ell[1]", "mean"]
    );
    assert_eq!(values(&model), vec![0.1, 1.5, 0.5, 2.0, -0.3]);

    // The embedded instance shares its leaves with the parent
    assert!(model.container().get("kern.rho").unwrap().ptr_eq(&model.kernel.rho));
    assert!(model.container().get("like.sn2").unwrap().ptr_eq(&model.noise.sn2));
}

#[test]
fn test_embed_copies_the_child() {
    let kernel = SquaredExponential::new(1.5, vec![0.5, 2.0]);
    let noise = Noise::new(0.1);
    let mut model = Model::new(&kernel, &noise, 0.0);
    assert!(!model.kernel.rho.ptr_eq(&kernel.rho));

    model.params().set_value(&[0.2, 3.0, 1.0, 1.0, 0.0], Space::Natural).unwrap();
    assert_eq!(values(&kernel), vec![1.5, 0.5, 2.0]);
    assert_eq!(values(&noise), vec![0.1]);
    assert_eq!(kernel.updates, 0);
}

#[test]
fn test_parent_set_value_updates_embedded_child() {
    let mut model = model();
    model
        .params()
        .set_value(&[0.2, 3.0, 1.0, 4.0, 1.0], Space::Natural)
        .unwrap();

    assert_eq!(model.updates, 1);
    assert_eq!(model.kernel.rho.scalar(), 3.0);
    assert_eq!(values(&model.kernel), vec![3.0, 1.0, 4.0]);
    assert_eq!(model.noise.sn2.scalar(), 0.2);
    assert_eq!(model.mean.scalar(), 1.0);

    // The parent's hook refreshed the child's derived state
    assert_eq!(model.kernel.updates, 1);
    assert_eq!(model.kernel.inv_ell2, array![1.0, 1.0 / 16.0]);
}

#[test]
fn test_embed_duplicate_namespace() {
    let kernel = SquaredExponential::new(1.0, vec![1.0]);
    let mut params = ParameterContainer::new();
    params.embed("k", &kernel).unwrap();
    let err = params.embed("k", &kernel).unwrap_err();
    assert!(matches!(err, ParameterError::DuplicateName { .. }));
    assert_eq!(params.len(), 2);
}

#[test]
fn test_embed_any_checks_type() {
    let noise = Noise::new(0.5);
    let mut params = ParameterContainer::new();
    let err = params.embed_any::<SquaredExponential>("k", &noise).unwrap_err();
    assert!(matches!(err, ParameterError::TypeMismatch { .. }));
    assert!(params.is_empty());

    let embedded: Noise = params.embed_any("like", &noise).unwrap();
    assert_eq!(embedded.sn2.scalar(), 0.5);
    assert_eq!(params.names(), vec!["like.sn2"]);
}

#[test]
fn test_copy_is_independent_of_original() {
    let original = model();
    let before = values(&original);

    let mut copy = original.copy();
    copy.params().set_value(&[1.0, 1.0, 1.0, 1.0, 1.0], Space::Natural).unwrap();
    copy.params().select(&["mean"]).unwrap().set_prior(Some("uniform"), &[-1.0, 0.5]).unwrap();

    assert_eq!(values(&original), before);
    assert_eq!(original.updates, 0);
    assert!(original.container().get("mean").unwrap().borrow().prior().is_none());
    assert_eq!(copy.updates, 2);
    assert_eq!(copy.mean.scalar(), 0.5);
}

#[test]
fn test_copy_rebinds_to_new_owner() {
    let original = model();
    let mut copy = original.copy();

    // Every handle the copy holds points into the copy's own container
    let params = copy.container();
    assert!(params.get("kern.rho").unwrap().ptr_eq(&copy.kernel.rho));
    assert!(params.get("kern.ell").unwrap().ptr_eq(&copy.kernel.ell));
    assert!(copy.kernel.container().get("rho").unwrap().ptr_eq(&copy.kernel.rho));
    assert!(params.get("like.sn2").unwrap().ptr_eq(&copy.noise.sn2));
    assert!(params.get("mean").unwrap().ptr_eq(&copy.mean));
    assert!(!copy.mean.ptr_eq(&original.mean));

    // Mutations through the copy notify the copy
    copy.params().set_value(&[0.5, 2.0, 2.0, 2.0, 0.0], Space::Natural).unwrap();
    assert_eq!(copy.updates, 1);
    assert_eq!(copy.kernel.inv_ell2, array![0.25, 0.25]);
    assert_eq!(original.kernel.inv_ell2, array![4.0, 0.25]);
}

#[test]
fn test_copy_with_sets_values() {
    let original = model();
    let theta = original.container().get_value(Space::Transformed);
    let copy = original.copy_with(&(theta.clone() + 1.0), Space::Transformed).unwrap();

    assert_relative_eq!(copy.kernel.rho.scalar(), 1.5 * 1.0f64.exp(), max_relative = 1e-12);
    assert_relative_eq!(copy.mean.scalar(), 0.7, epsilon = 1e-12);
    assert_eq!(copy.updates, 1);
    assert_eq!(original.container().get_value(Space::Transformed), theta);

    let err = original.copy_with(&[0.0], Space::Transformed).unwrap_err();
    assert!(matches!(
        err,
        HyperParamError::Parameter(ParameterError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_copy_preserves_block_tags_and_priors() {
    let mut bag = {
        let mut params = ParameterContainer::new();
        params.embed("k", &SquaredExponential::new(1.0, vec![1.0, 1.0])).unwrap();
        Bag::new(params)
    };
    bag.container().set_blocks(&[0, 1]).unwrap();
    bag.params().select(&["k.rho"]).unwrap().set_prior(Some("lognormal"), &[]).unwrap();

    let copy = bag.copy();
    assert_eq!(copy.container().block(), vec![0, 1]);
    assert_eq!(copy.container().describe(), bag.container().describe());

    // Block tags are per copy
    copy.container().set_block(5);
    assert_eq!(bag.container().block(), vec![0, 1]);
}
