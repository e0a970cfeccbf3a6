//! Prior distributions over parameter values
//!
//! A prior is consulted for two things: the box its support covers, which
//! narrows a parameter's bounds, and its log-density (with gradient), which is
//! summed into a container's log-prior. Priors are looked up by name in a
//! [`PriorRegistry`]; the built-in table is immutable and created on first use.
//!
//! Hyperparameters are vectors that either hold a single entry, broadcast to
//! every component, or one entry per component of the parameter.

use crate::parameters::bounds::Bounds;
use crate::parameters::domain::EPSILON;
use ndarray::{Array1, ArrayView1};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur when constructing priors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriorError {
    #[error("Unknown prior '{name}'")]
    UnknownPrior { name: String },

    #[error("Prior '{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Invalid hyperparameter for prior '{name}': {message}")]
    InvalidHyperparameter { name: String, message: String },
}

/// A distribution over the natural-space value of a parameter.
pub trait Prior: fmt::Debug + fmt::Display {
    /// Support box: either one box shared by all components, or one per component.
    fn support(&self) -> Vec<Bounds>;

    /// Log-density of the flattened value `x`.
    fn log_density(&self, x: ArrayView1<f64>) -> f64;

    /// Log-density of `x` and its gradient with respect to `x`.
    fn log_density_grad(&self, x: ArrayView1<f64>) -> (f64, Array1<f64>);
}

/// Factory building a prior from scalar hyperparameters.
pub type PriorFactory = fn(&[f64]) -> Result<Rc<dyn Prior>, PriorError>;

#[inline]
fn at(a: &Array1<f64>, i: usize) -> f64 {
    if a.len() == 1 {
        a[0]
    } else {
        a[i]
    }
}

fn broadcast_len(name: &str, a: &Array1<f64>, b: &Array1<f64>) -> Result<usize, PriorError> {
    match (a.len(), b.len()) {
        (0, _) | (_, 0) => Err(PriorError::InvalidHyperparameter {
            name: name.to_string(),
            message: "hyperparameters must not be empty".to_string(),
        }),
        (n, m) if n == m || m == 1 => Ok(n),
        (1, m) => Ok(m),
        (n, m) => Err(PriorError::InvalidHyperparameter {
            name: name.to_string(),
            message: format!("hyperparameter lengths {} and {} do not broadcast", n, m),
        }),
    }
}

fn fmt_hyper(a: &Array1<f64>) -> String {
    if a.len() == 1 {
        format!("{}", a[0])
    } else {
        let parts: Vec<String> = a.iter().map(|v| format!("{}", v)).collect();
        format!("[{}]", parts.join(", "))
    }
}

/// Uniform distribution on `[a, b]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    a: Array1<f64>,
    b: Array1<f64>,
    n: usize,
}

impl Uniform {
    /// Create a uniform prior, component-wise `a < b`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::priors::{Prior, Uniform};
    /// use ndarray::array;
    ///
    /// let prior = Uniform::new(array![0.0], array![2.0]).unwrap();
    /// assert_eq!(prior.support()[0].max, 2.0);
    /// assert!((prior.log_density(array![1.0, 1.5].view()) - 2.0 * 0.5f64.ln()).abs() < 1e-12);
    /// ```
    pub fn new(a: Array1<f64>, b: Array1<f64>) -> Result<Self, PriorError> {
        let n = broadcast_len("uniform", &a, &b)?;
        for i in 0..n {
            if !(at(&a, i) < at(&b, i)) {
                return Err(PriorError::InvalidHyperparameter {
                    name: "uniform".to_string(),
                    message: format!("a ({}) must be less than b ({})", at(&a, i), at(&b, i)),
                });
            }
        }
        Ok(Self { a, b, n })
    }
}

impl Prior for Uniform {
    fn support(&self) -> Vec<Bounds> {
        (0..self.n)
            .map(|i| Bounds {
                min: at(&self.a, i),
                max: at(&self.b, i),
            })
            .collect()
    }

    fn log_density(&self, x: ArrayView1<f64>) -> f64 {
        x.iter()
            .enumerate()
            .map(|(i, &xi)| {
                let (a, b) = (at(&self.a, i), at(&self.b, i));
                if xi < a || xi > b {
                    f64::NEG_INFINITY
                } else {
                    -(b - a).ln()
                }
            })
            .sum()
    }

    fn log_density_grad(&self, x: ArrayView1<f64>) -> (f64, Array1<f64>) {
        (self.log_density(x), Array1::zeros(x.len()))
    }
}

impl fmt::Display for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uniform(a={}, b={})", fmt_hyper(&self.a), fmt_hyper(&self.b))
    }
}

/// Normal distribution with mean `mu` and variance `s2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normal {
    mu: Array1<f64>,
    s2: Array1<f64>,
    n: usize,
}

impl Normal {
    /// Create a normal prior; every variance must be positive and finite.
    pub fn new(mu: Array1<f64>, s2: Array1<f64>) -> Result<Self, PriorError> {
        let n = broadcast_len("normal", &mu, &s2)?;
        if s2.iter().any(|&v| !v.is_finite() || v <= 0.0) {
            return Err(PriorError::InvalidHyperparameter {
                name: "normal".to_string(),
                message: format!("variance must be finite and > 0, got {}", fmt_hyper(&s2)),
            });
        }
        Ok(Self { mu, s2, n })
    }
}

impl Prior for Normal {
    fn support(&self) -> Vec<Bounds> {
        vec![Bounds::unbounded(); self.n]
    }

    fn log_density(&self, x: ArrayView1<f64>) -> f64 {
        self.log_density_grad(x).0
    }

    fn log_density_grad(&self, x: ArrayView1<f64>) -> (f64, Array1<f64>) {
        let mut logp = 0.0;
        let mut dlogp = Array1::zeros(x.len());
        for (i, &xi) in x.iter().enumerate() {
            let (mu, s2) = (at(&self.mu, i), at(&self.s2, i));
            let r = xi - mu;
            logp += -0.5 * r * r / s2 - 0.5 * (2.0 * PI * s2).ln();
            dlogp[i] = -r / s2;
        }
        (logp, dlogp)
    }
}

impl fmt::Display for Normal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Normal(mu={}, s2={})", fmt_hyper(&self.mu), fmt_hyper(&self.s2))
    }
}

/// Log-normal distribution: `ln(x) ~ Normal(mu, sigma^2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogNormal {
    mu: Array1<f64>,
    sigma: Array1<f64>,
    n: usize,
}

impl LogNormal {
    /// Create a log-normal prior; every `sigma` must be positive and finite.
    pub fn new(mu: Array1<f64>, sigma: Array1<f64>) -> Result<Self, PriorError> {
        let n = broadcast_len("lognormal", &mu, &sigma)?;
        if sigma.iter().any(|&v| !v.is_finite() || v <= 0.0) {
            return Err(PriorError::InvalidHyperparameter {
                name: "lognormal".to_string(),
                message: format!("sigma must be finite and > 0, got {}", fmt_hyper(&sigma)),
            });
        }
        Ok(Self { mu, sigma, n })
    }
}

impl Prior for LogNormal {
    fn support(&self) -> Vec<Bounds> {
        vec![Bounds::min_only(EPSILON); self.n]
    }

    fn log_density(&self, x: ArrayView1<f64>) -> f64 {
        self.log_density_grad(x).0
    }

    fn log_density_grad(&self, x: ArrayView1<f64>) -> (f64, Array1<f64>) {
        let mut logp = 0.0;
        let mut dlogp = Array1::zeros(x.len());
        for (i, &xi) in x.iter().enumerate() {
            let (mu, sigma) = (at(&self.mu, i), at(&self.sigma, i));
            let s2 = sigma * sigma;
            let r = xi.ln() - mu;
            logp += -0.5 * r * r / s2 - xi.ln() - (sigma * (2.0 * PI).sqrt()).ln();
            dlogp[i] = -(r / s2 + 1.0) / xi;
        }
        (logp, dlogp)
    }
}

impl fmt::Display for LogNormal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogNormal(mu={}, sigma={})",
            fmt_hyper(&self.mu),
            fmt_hyper(&self.sigma)
        )
    }
}

fn check_arity(name: &str, args: &[f64], allowed: &[usize]) -> Result<(), PriorError> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    let expected: Vec<String> = allowed.iter().map(|n| n.to_string()).collect();
    Err(PriorError::Arity {
        name: name.to_string(),
        expected: expected.join(" or "),
        got: args.len(),
    })
}

fn uniform_factory(args: &[f64]) -> Result<Rc<dyn Prior>, PriorError> {
    check_arity("uniform", args, &[2])?;
    Ok(Rc::new(Uniform::new(
        Array1::from_elem(1, args[0]),
        Array1::from_elem(1, args[1]),
    )?))
}

fn normal_factory(args: &[f64]) -> Result<Rc<dyn Prior>, PriorError> {
    check_arity("normal", args, &[2])?;
    Ok(Rc::new(Normal::new(
        Array1::from_elem(1, args[0]),
        Array1::from_elem(1, args[1]),
    )?))
}

fn lognormal_factory(args: &[f64]) -> Result<Rc<dyn Prior>, PriorError> {
    check_arity("lognormal", args, &[0, 2])?;
    let (mu, sigma) = if args.is_empty() {
        (0.0, 1.0)
    } else {
        (args[0], args[1])
    };
    Ok(Rc::new(LogNormal::new(
        Array1::from_elem(1, mu),
        Array1::from_elem(1, sigma),
    )?))
}

/// Name-keyed table of prior factories.
#[derive(Clone)]
pub struct PriorRegistry {
    factories: HashMap<String, PriorFactory>,
}

impl fmt::Debug for PriorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl PriorRegistry {
    /// A registry holding only the built-in priors:
    /// `uniform(a, b)`, `normal(mu, s2)` and `lognormal([mu, sigma])`.
    pub fn builtin() -> Self {
        let mut factories: HashMap<String, PriorFactory> = HashMap::new();
        factories.insert("uniform".to_string(), uniform_factory);
        factories.insert("normal".to_string(), normal_factory);
        factories.insert("lognormal".to_string(), lognormal_factory);
        Self { factories }
    }

    /// Return a copy of this registry extended with `factory` under `name`.
    pub fn with(mut self, name: &str, factory: PriorFactory) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }

    /// Construct the prior registered under `name`.
    pub fn create(&self, name: &str, args: &[f64]) -> Result<Rc<dyn Prior>, PriorError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PriorError::UnknownPrior {
                name: name.to_string(),
            })?;
        factory(args)
    }

    /// Sorted names of the registered priors.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for PriorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The process-wide built-in registry.
pub fn registry() -> &'static PriorRegistry {
    static REGISTRY: OnceLock<PriorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(PriorRegistry::builtin)
}
