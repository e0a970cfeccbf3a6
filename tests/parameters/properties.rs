//! Randomized checks of the numeric invariants
//!
//! Every test draws from a fixed-seed ChaCha generator so failures reproduce.

use crate::test_helpers::{values, Bag};
use approx::assert_relative_eq;
use hyperparam_rs::parameters::{Dim, Domain, ParameterContainer, Parameterized, Space};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DOMAINS: [Domain; 3] = [Domain::Real, Domain::Positive, Domain::Unit];

/// A value strictly inside the domain
fn draw(rng: &mut ChaCha8Rng, domain: Domain) -> f64 {
    match domain {
        Domain::Real => rng.gen_range(-10.0..10.0),
        Domain::Positive => rng.gen_range(1e-3..50.0),
        Domain::Unit => rng.gen_range(1e-3..0.999),
    }
}

/// A container of randomly sized leaves over every domain
fn random_bag(rng: &mut ChaCha8Rng) -> Bag {
    let mut params = ParameterContainer::new();
    for i in 0..rng.gen_range(1..6) {
        let domain = DOMAINS[rng.gen_range(0..DOMAINS.len())];
        let n = rng.gen_range(1..4);
        let value: Vec<f64> = (0..n).map(|_| draw(rng, domain)).collect();
        params
            .declare(&format!("p{}", i), value, domain, &[Dim::Fixed(n)])
            .unwrap();
    }
    Bag::new(params)
}

#[test]
fn test_set_get_idempotent() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let mut bag = random_bag(&mut rng);
        let before = values(&bag);

        let x = bag.container().get_value(Space::Natural);
        bag.params().set_value(&x, Space::Natural).unwrap();
        assert_eq!(values(&bag), before);

        let theta = bag.container().get_value(Space::Transformed);
        bag.params().set_value(&theta, Space::Transformed).unwrap();
        for (after, expected) in values(&bag).iter().zip(&before) {
            assert_relative_eq!(*after, *expected, max_relative = 1e-9);
        }
    }
}

#[test]
fn test_transform_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for domain in DOMAINS {
        let transform = domain.transform();
        for _ in 0..200 {
            let x = draw(&mut rng, domain);
            let y = transform.to_transformed(x);
            assert_relative_eq!(transform.to_natural(y), x, max_relative = 1e-9);
        }
    }
}

#[test]
fn test_gradfactor_matches_finite_difference() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let h = 1e-6;
    for _ in 0..20 {
        let bag = random_bag(&mut rng);
        let params = bag.container();
        let gf = params.gradfactor();
        let theta = params.get_value(Space::Transformed);

        // dx/dy, one leaf at a time through its own transform
        let mut i = 0;
        for (_, leaf) in params.iter() {
            let leaf = leaf.borrow();
            let transform = leaf.transform();
            for _ in 0..leaf.size() {
                let fd = (transform.to_natural(theta[i] + h) - transform.to_natural(theta[i] - h))
                    / (2.0 * h);
                assert_relative_eq!(gf[i], fd, max_relative = 1e-5, epsilon = 1e-9);
                i += 1;
            }
        }
        assert_eq!(i, gf.len());
    }
}

#[test]
fn test_values_stay_in_bounds() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    for _ in 0..50 {
        let mut bag = random_bag(&mut rng);
        let keys: Vec<String> = bag.container().keys().map(str::to_string).collect();

        for key in &keys {
            let lo = rng.gen_range(0.05..0.5);
            let hi = rng.gen_range(0.5..0.95);
            bag.params()
                .select(&[key.as_str()])
                .unwrap()
                .set_prior(Some("uniform"), &[lo, hi])
                .unwrap();
        }
        assert_in_bounds(&bag);

        // Random transformed vectors always land inside the bounds or are rejected
        for _ in 0..10 {
            let n = bag.container().size();
            let theta: Vec<f64> = (0..n).map(|_| rng.gen_range(-5.0..5.0)).collect();
            let before = values(&bag);
            if bag.params().set_value(&theta, Space::Transformed).is_err() {
                assert_eq!(values(&bag), before);
            }
            assert_in_bounds(&bag);
        }
    }
}

fn assert_in_bounds(bag: &Bag) {
    let bounds = bag.container().get_bounds(Space::Natural);
    for (i, x) in values(bag).into_iter().enumerate() {
        assert!(
            bounds[[i, 0]] <= x && x <= bounds[[i, 1]],
            "{} outside [{}, {}]",
            x,
            bounds[[i, 0]],
            bounds[[i, 1]]
        );
    }
}
