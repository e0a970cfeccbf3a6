//! Parameter container implementation
//!
//! This module provides the ParameterContainer struct, an ordered, name-keyed
//! collection of leaf parameters. Nested containers are flattened when they are
//! registered, with dotted names (`outer.inner`), and the registration order is
//! the single source of truth for how the flattened vector is sliced.
//!
//! Leaves are shared handles. A container obtained through [`ParameterContainer::select`]
//! or [`ParameterContainer::view`] aliases the same leaves as the container it came
//! from, so writing through a view writes the shared leaf.

use crate::parameters::bounds::Bounds;
use crate::parameters::domain::Domain;
use crate::parameters::parameter::{Parameter, ParameterError, Space};
use crate::parameters::parameterized::{CopyMemo, DeepCopy};
use crate::parameters::priors::Prior;
use crate::parameters::table;
use ndarray::{Array1, Array2, ArrayD, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

/// Errors that can occur when exporting or restoring parameter state
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

/// Shared handle to a leaf parameter
///
/// Cloning a `ParamRef` produces another handle to the same leaf. Use
/// [`DeepCopy`] to obtain an independent leaf.
#[derive(Debug, Clone)]
pub struct ParamRef(Rc<RefCell<Parameter>>);

impl ParamRef {
    pub(crate) fn new(param: Parameter) -> Self {
        Self(Rc::new(RefCell::new(param)))
    }

    /// Borrow the leaf
    pub fn borrow(&self) -> Ref<'_, Parameter> {
        self.0.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, Parameter> {
        self.0.borrow_mut()
    }

    /// Borrow the current value in its original shape
    pub fn value(&self) -> Ref<'_, ArrayD<f64>> {
        Ref::map(self.0.borrow(), |p| p.value())
    }

    /// First component of the value, which is the whole value for scalar parameters
    pub fn scalar(&self) -> f64 {
        self.0.borrow().value().iter().next().copied().unwrap_or(f64::NAN)
    }

    /// Whether two handles refer to the same leaf
    pub fn ptr_eq(&self, other: &ParamRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn as_ptr(&self) -> *const RefCell<Parameter> {
        Rc::as_ptr(&self.0)
    }
}

impl DeepCopy for ParamRef {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        memo.leaf(self, |param| ParamRef::new(param.clone()))
    }
}

/// Serializable snapshot of one leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Dotted name within the container
    pub name: String,

    /// Intrinsic domain
    pub domain: Domain,

    /// Description of the prior, if any
    pub prior: Option<String>,

    /// Shape of the value
    pub shape: Vec<usize>,

    /// Flattened value
    pub value: Vec<f64>,

    /// Effective bounds of every component
    pub bounds: Vec<Bounds>,

    /// Block tag
    pub block: usize,
}

/// An ordered, name-keyed aggregate of leaf parameters
#[derive(Debug, Default)]
pub struct ParameterContainer {
    entries: Vec<(String, ParamRef)>,
}

impl ParameterContainer {
    /// Create a new empty container
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::ParameterContainer;
    ///
    /// let params = ParameterContainer::new();
    /// assert_eq!(params.len(), 0);
    /// assert_eq!(params.size(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Another container aliasing every leaf of this one
    pub fn view(&self) -> ParameterContainer {
        Self {
            entries: self.entries.clone(),
        }
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the container holds no leaves
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a leaf with the given name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get the leaf registered under `name`
    pub fn get(&self, name: &str) -> Option<&ParamRef> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, param)| param)
    }

    /// Iterate over `(name, leaf)` pairs in flattening order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamRef)> {
        self.entries.iter().map(|(name, param)| (name.as_str(), param))
    }

    /// Leaf names in flattening order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Register a leaf parameter under `name`
    ///
    /// # Returns
    ///
    /// A handle to the registered leaf, or a duplicate-name error if `name` is taken
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::{Domain, Parameter, ParameterContainer};
    /// use ndarray::arr0;
    ///
    /// let mut params = ParameterContainer::new();
    /// let leaf = Parameter::new(arr0(1.0).into_dyn(), Domain::Real).unwrap();
    /// params.register("bias", leaf.clone()).unwrap();
    /// assert!(params.register("bias", leaf).is_err());
    /// ```
    pub fn register(&mut self, name: &str, param: Parameter) -> Result<ParamRef, ParameterError> {
        if self.contains(name) {
            return Err(ParameterError::DuplicateName {
                name: name.to_string(),
            });
        }
        log::debug!("registering parameter '{}' ({} elements)", name, param.size());
        let handle = ParamRef::new(param);
        self.entries.push((name.to_string(), handle.clone()));
        Ok(handle)
    }

    /// Register every leaf of `other`, aliasing them
    ///
    /// Each entry is inserted as `prefix.subname`, or as `subname` when `prefix`
    /// is `None`. Either every entry is inserted or, on a duplicate name, none is.
    pub fn register_nested(
        &mut self,
        prefix: Option<&str>,
        other: &ParameterContainer,
    ) -> Result<(), ParameterError> {
        let renamed: Vec<(String, ParamRef)> = other
            .entries
            .iter()
            .map(|(name, param)| {
                let name = match prefix {
                    Some(prefix) => format!("{}.{}", prefix, name),
                    None => name.clone(),
                };
                (name, param.clone())
            })
            .collect();

        let mut seen = HashSet::new();
        for (name, _) in &renamed {
            if self.contains(name) || !seen.insert(name.as_str()) {
                return Err(ParameterError::DuplicateName { name: name.clone() });
            }
        }

        self.entries.extend(renamed);
        Ok(())
    }

    /// Return a container aliasing the named leaves, in the requested order
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::{Domain, Parameter, ParameterContainer};
    /// use ndarray::arr0;
    ///
    /// let mut params = ParameterContainer::new();
    /// for name in ["a", "b"] {
    ///     params.register(name, Parameter::new(arr0(1.0).into_dyn(), Domain::Real).unwrap()).unwrap();
    /// }
    /// let view = params.select(&["b"]).unwrap();
    /// assert!(view.get("b").unwrap().ptr_eq(params.get("b").unwrap()));
    /// assert!(params.select(&["a", "a"]).is_err());
    /// assert!(params.select(&["c"]).is_err());
    /// ```
    pub fn select(&self, names: &[&str]) -> Result<ParameterContainer, ParameterError> {
        let mut entries: Vec<(String, ParamRef)> = Vec::with_capacity(names.len());
        for &key in names {
            if entries.iter().any(|(n, _)| n == key) {
                return Err(ParameterError::DuplicateKey {
                    key: key.to_string(),
                });
            }
            let param = self.get(key).ok_or_else(|| ParameterError::UnknownKey {
                key: key.to_string(),
            })?;
            entries.push((key.to_string(), param.clone()));
        }
        Ok(Self { entries })
    }

    /// Total number of scalar components
    pub fn size(&self) -> usize {
        self.entries.iter().map(|(_, p)| p.borrow().size()).sum()
    }

    /// One name per scalar component
    ///
    /// Multi-element leaves expand to `name[i]` over the flat index.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.size());
        for (name, param) in &self.entries {
            let size = param.borrow().size();
            if size == 1 {
                names.push(name.clone());
            } else {
                names.extend((0..size).map(|i| format!("{}[{}]", name, i)));
            }
        }
        names
    }

    /// Block tag of every leaf
    pub fn block(&self) -> Vec<usize> {
        self.entries.iter().map(|(_, p)| p.borrow().block()).collect()
    }

    /// Assign the same block tag to every leaf
    pub fn set_block(&self, block: usize) {
        for (_, param) in &self.entries {
            param.borrow_mut().set_block(block);
        }
    }

    /// Assign one block tag per leaf
    pub fn set_blocks(&self, blocks: &[usize]) -> Result<(), ParameterError> {
        if blocks.len() != self.entries.len() {
            return Err(ParameterError::InvalidBlockAssignment {
                expected: self.entries.len(),
                got: blocks.len(),
            });
        }
        for ((_, param), &block) in self.entries.iter().zip(blocks) {
            param.borrow_mut().set_block(block);
        }
        Ok(())
    }

    /// Flattened indices grouped by block tag, in first-seen tag order
    pub fn blocks(&self) -> Vec<(usize, Vec<usize>)> {
        let mut blocks: Vec<(usize, Vec<usize>)> = Vec::new();
        let mut a = 0;
        for (_, param) in &self.entries {
            let param = param.borrow();
            let b = a + param.size();
            match blocks.iter_mut().find(|(tag, _)| *tag == param.block()) {
                Some((_, indices)) => indices.extend(a..b),
                None => blocks.push((param.block(), (a..b).collect())),
            }
            a = b;
        }
        blocks
    }

    /// Gradient factors of every leaf, concatenated in flattening order
    pub fn gradfactor(&self) -> Array1<f64> {
        self.concat(|param| param.gradfactor())
    }

    /// Flattened values, in natural or transformed space
    pub fn get_value(&self, space: Space) -> Array1<f64> {
        self.concat(|param| param.get_value(space))
    }

    /// Bounds as a `size x 2` matrix of `[min, max]` rows
    ///
    /// In transformed space each endpoint is mapped through its own leaf's transform.
    pub fn get_bounds(&self, space: Space) -> Array2<f64> {
        let mut bounds = Array2::zeros((self.size(), 2));
        let mut row = 0;
        for (_, param) in &self.entries {
            let param = param.borrow();
            let transform = param.transform();
            for b in param.bounds() {
                let (lo, hi) = match space {
                    Space::Natural => (b.min, b.max),
                    Space::Transformed => (transform.to_transformed(b.min), transform.to_transformed(b.max)),
                };
                bounds[[row, 0]] = lo;
                bounds[[row, 1]] = hi;
                row += 1;
            }
        }
        bounds
    }

    /// Sum of the leaves' log-priors
    pub fn get_logprior(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p.borrow().get_logprior()).sum()
    }

    /// Sum of the leaves' log-priors and the concatenated gradient
    pub fn get_logprior_grad(&self) -> (f64, Array1<f64>) {
        if self.size() == 0 {
            return (0.0, Array1::zeros(0));
        }
        let mut logp = 0.0;
        let mut dlogp = Vec::with_capacity(self.size());
        for (_, param) in &self.entries {
            let (lp, grad) = param.borrow().get_logprior_grad();
            logp += lp;
            dlogp.extend(grad.iter().copied());
        }
        (logp, Array1::from(dlogp))
    }

    /// Write a flattened vector across the leaves without notifying any owner
    ///
    /// The length is checked first, then every leaf's slice is validated, and only
    /// then is anything written.
    pub(crate) fn assign(&self, theta: ArrayView1<f64>, space: Space) -> Result<(), ParameterError> {
        let size = self.size();
        if theta.len() != size {
            return Err(ParameterError::ShapeMismatch {
                name: "parameters".to_string(),
                message: format!("incorrect number of parameters: expected {}, got {}", size, theta.len()),
            });
        }

        let mut staged = Vec::with_capacity(self.entries.len());
        let mut a = 0;
        for (_, param) in &self.entries {
            let param_ref = param.borrow();
            let b = a + param_ref.size();
            staged.push(param_ref.check_value(theta.slice(ndarray::s![a..b]), space)?);
            a = b;
        }

        for ((_, param), natural) in self.entries.iter().zip(staged) {
            param.borrow_mut().set_value(natural.view(), Space::Natural)?;
        }
        Ok(())
    }

    /// Attach a prior to the single leaf of this container
    pub(crate) fn assign_prior(&self, prior: Option<Rc<dyn Prior>>) -> Result<bool, ParameterError> {
        match self.entries.as_slice() {
            [(_, param)] => param.borrow_mut().set_prior_object(prior),
            _ => Err(ParameterError::AmbiguousTarget {
                count: self.entries.len(),
            }),
        }
    }

    /// Restore values and block tags from records, matched by name
    ///
    /// Every record is validated before anything is written.
    pub(crate) fn assign_records(&self, records: &[ParameterRecord]) -> Result<(), SerializationError> {
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.name.as_str()) {
                return Err(ParameterError::DuplicateKey {
                    key: record.name.clone(),
                }
                .into());
            }
            let param = self.get(&record.name).ok_or_else(|| ParameterError::UnknownKey {
                key: record.name.clone(),
            })?;
            let value = Array1::from(record.value.clone());
            let natural = param
                .borrow()
                .check_value(value.view(), Space::Natural)
                .map_err(|err| match err {
                    ParameterError::ShapeMismatch { message, .. } => ParameterError::ShapeMismatch {
                        name: record.name.clone(),
                        message,
                    },
                    other => other,
                })?;
            staged.push((param, natural, record.block));
        }

        for (param, natural, block) in staged {
            let mut param = param.borrow_mut();
            param.set_value(natural.view(), Space::Natural)?;
            param.set_block(block);
        }
        Ok(())
    }

    /// Snapshot every leaf in flattening order
    pub fn records(&self) -> Vec<ParameterRecord> {
        self.entries
            .iter()
            .map(|(name, param)| {
                let param = param.borrow();
                ParameterRecord {
                    name: name.clone(),
                    domain: param.domain(),
                    prior: param.prior().map(|p| p.to_string()),
                    shape: param.shape().to_vec(),
                    value: param.value().iter().copied().collect(),
                    bounds: param.bounds(),
                    block: param.block(),
                }
            })
            .collect()
    }

    /// Serialize the records of every leaf to JSON
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }

    /// Human-readable table of name, domain, prior, size and block
    pub fn describe(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .entries
            .iter()
            .map(|(name, param)| {
                let param = param.borrow();
                vec![
                    name.clone(),
                    param.domain().to_string(),
                    param.prior().map_or_else(|| "-".to_string(), |p| p.to_string()),
                    param.size().to_string(),
                    param.block().to_string(),
                ]
            })
            .collect();
        table::render(&["name", "domain", "prior", "size", "block"], &rows)
    }

    fn concat(&self, f: impl Fn(&Parameter) -> Array1<f64>) -> Array1<f64> {
        let mut out = Vec::with_capacity(self.size());
        for (_, param) in &self.entries {
            out.extend(f(&param.borrow()).iter().copied());
        }
        Array1::from(out)
    }
}

impl DeepCopy for ParameterContainer {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(name, param)| (name.clone(), param.deep_copy(memo)))
                .collect(),
        }
    }
}
