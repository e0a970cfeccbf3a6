//! Example composing a covariance function from parameterized parts
//!
//! This example builds a sum of two squared-exponential kernels, attaches
//! priors to their hyperparameters and climbs the log-prior in transformed
//! space, the way an optimizer would drive the flattened parameter vector.

use hyperparam_rs::error::Result;
use hyperparam_rs::parameters::{
    CopyMemo, DeepCopy, Dim, Domain, ParamRef, ParameterContainer, Parameterized, Space,
};
use ndarray::{array, Array1, ArrayView1};

/// Squared-exponential kernel: rho * exp(-0.5 * sum(((x - y) / ell)^2))
struct SquaredExponential {
    params: ParameterContainer,
    rho: ParamRef,
    ell: ParamRef,
}

impl SquaredExponential {
    fn new(rho: f64, ell: Vec<f64>) -> Result<Self> {
        let mut params = ParameterContainer::new();
        let rho = params.declare("rho", rho, Domain::Positive, &[])?;
        let ell = params.declare("ell", ell, Domain::Positive, &[Dim::Label("d")])?;
        Ok(Self { params, rho, ell })
    }

    fn cov(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        let ell = self.ell.value();
        let d: f64 = x
            .iter()
            .zip(y.iter())
            .zip(ell.iter())
            .map(|((a, b), l)| ((a - b) / l).powi(2))
            .sum();
        self.rho.scalar() * (-0.5 * d).exp()
    }
}

impl Parameterized for SquaredExponential {
    fn container(&self) -> &ParameterContainer {
        &self.params
    }
}

impl DeepCopy for SquaredExponential {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        Self {
            params: self.params.deep_copy(memo),
            rho: self.rho.deep_copy(memo),
            ell: self.ell.deep_copy(memo),
        }
    }
}

/// Sum of two kernels, each embedded under its own namespace
struct SumKernel {
    params: ParameterContainer,
    k1: SquaredExponential,
    k2: SquaredExponential,
    evaluations: usize,
}

impl SumKernel {
    fn new(k1: &SquaredExponential, k2: &SquaredExponential) -> Result<Self> {
        let mut params = ParameterContainer::new();
        let k1 = params.embed("k1", k1)?;
        let k2 = params.embed("k2", k2)?;
        Ok(Self {
            params,
            k1,
            k2,
            evaluations: 0,
        })
    }

    fn cov(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        self.k1.cov(x, y) + self.k2.cov(x, y)
    }
}

impl Parameterized for SumKernel {
    fn container(&self) -> &ParameterContainer {
        &self.params
    }

    fn update(&mut self) {
        self.evaluations += 1;
    }
}

impl DeepCopy for SumKernel {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        Self {
            params: self.params.deep_copy(memo),
            k1: self.k1.deep_copy(memo),
            k2: self.k2.deep_copy(memo),
            evaluations: self.evaluations,
        }
    }
}

fn main() -> Result<()> {
    // Short and long lengthscale components over two input dimensions
    let short = SquaredExponential::new(1.0, vec![0.3, 0.3])?;
    let long = SquaredExponential::new(0.5, vec![5.0, 5.0])?;
    let mut kernel = SumKernel::new(&short, &long)?;

    for name in ["k1.rho", "k2.rho"] {
        kernel.params().select(&[name])?.set_prior(Some("lognormal"), &[0.0, 1.0])?;
    }
    for name in ["k1.ell", "k2.ell"] {
        let clipped = kernel.params().select(&[name])?.set_prior(Some("uniform"), &[0.5, 3.0])?;
        if clipped {
            println!("{} was clipped into the prior support", name);
        }
    }
    kernel.container().select(&["k2.rho", "k2.ell"])?.set_block(1);

    println!("Parameters:");
    println!("{}", kernel.container().describe());
    println!();

    // Gradient ascent on the log-prior in the unconstrained space
    let step = 0.1;
    for _ in 0..50 {
        let params = kernel.container();
        let (_, dlogp) = params.get_logprior_grad();
        let theta: Array1<f64> = params.get_value(Space::Transformed) + step * (&dlogp * &params.gradfactor());
        kernel.params().set_value(&theta, Space::Transformed)?;
    }

    println!("After {} updates:", kernel.evaluations);
    for (name, value) in kernel
        .container()
        .names()
        .iter()
        .zip(kernel.container().get_value(Space::Natural).iter())
    {
        println!("  {:<10} {:.4}", name, value);
    }
    println!("  log-prior  {:.4}", kernel.container().get_logprior());
    for (block, indices) in kernel.container().blocks() {
        println!("  block {}: {:?}", block, indices);
    }

    let x = array![0.0, 0.0];
    let y = array![0.5, -0.5];
    println!("k(x, y) = {:.4}", kernel.cov(x.view(), y.view()));

    // A copy moves independently of the kernel it came from
    let moved = kernel.copy_with(&Array1::<f64>::zeros(kernel.container().size()), Space::Transformed)?;
    println!("copy k(x, y) = {:.4}", moved.cov(x.view(), y.view()));
    println!("orig k(x, y) = {:.4}", kernel.cov(x.view(), y.view()));

    println!();
    println!("{}", kernel.container().to_json()?);

    Ok(())
}
