//! Parameterized objects
//!
//! A parameterized object owns exactly one [`ParameterContainer`] and reacts to
//! changes of its values through [`Parameterized::update`]. Its lifecycle has two
//! states. While it is being constructed, the container is a plain local value
//! and parameters are added with [`ParameterContainer::declare`] and
//! [`ParameterContainer::embed`]. Once the object exists, the container is only
//! reachable through [`Parameterized::container`] (read-only) and
//! [`Parameterized::params`], a handle that borrows the owner and calls its
//! update hook after every successful mutation.
//!
//! Copies are made with [`DeepCopy`], which threads a [`CopyMemo`] identity map
//! through the copy so that leaves shared between an owner's container, its
//! embedded sub-objects and any leaf handles it keeps are copied exactly once.

use crate::error::Result;
use crate::parameters::container::{ParamRef, ParameterContainer, ParameterRecord};
use crate::parameters::domain::Domain;
use crate::parameters::parameter::{Parameter, ParameterError, Space};
use crate::parameters::priors::{self, Prior, PriorRegistry};
use ndarray::{arr0, Array, ArrayD, ArrayView1, Axis, Dimension};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Identity map used while deep-copying an object graph
#[derive(Debug, Default)]
pub struct CopyMemo {
    leaves: HashMap<*const RefCell<Parameter>, ParamRef>,
}

impl CopyMemo {
    /// Create an empty memo
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of `src`, created with `make` the first time `src` is seen
    pub(crate) fn leaf(&mut self, src: &ParamRef, make: impl FnOnce(&Parameter) -> ParamRef) -> ParamRef {
        self.leaves
            .entry(src.as_ptr())
            .or_insert_with(|| make(&src.borrow()))
            .clone()
    }

    /// Number of distinct leaves copied so far
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Check if nothing has been copied yet
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

/// Identity-preserving deep copy
///
/// Implementations copy every field, passing the same memo to every nested
/// copy, so that aliased leaves stay aliased in the copy and value arrays are
/// never shared with the original.
pub trait DeepCopy: Sized {
    /// Copy `self`, consulting and extending `memo`
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self;
}

impl<T: DeepCopy> DeepCopy for Vec<T> {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.iter().map(|item| item.deep_copy(memo)).collect()
    }
}

impl<T: DeepCopy> DeepCopy for Option<T> {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.as_ref().map(|item| item.deep_copy(memo))
    }
}

impl<T: DeepCopy> DeepCopy for Box<T> {
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        Box::new((**self).deep_copy(memo))
    }
}

/// An object that owns a parameter container
pub trait Parameterized {
    /// The container holding this object's parameters
    fn container(&self) -> &ParameterContainer;

    /// Refresh any state derived from the parameter values
    ///
    /// Called once after every successful mutation made through [`Parameterized::params`].
    fn update(&mut self) {}

    /// Handle to the parameters that notifies this object of changes
    fn params(&mut self) -> Params<'_, Self>
    where
        Self: Sized,
    {
        Params::new(self)
    }

    /// Independent copy of this object and all of its parameters
    fn copy(&self) -> Self
    where
        Self: DeepCopy,
    {
        self.deep_copy(&mut CopyMemo::new())
    }

    /// Independent copy with its parameters set to `theta`
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::{
    ///     CopyMemo, DeepCopy, Domain, ParamRef, ParameterContainer, Parameterized, Space,
    /// };
    ///
    /// struct Scale {
    ///     params: ParameterContainer,
    ///     factor: ParamRef,
    /// }
    ///
    /// impl Parameterized for Scale {
    ///     fn container(&self) -> &ParameterContainer {
    ///         &self.params
    ///     }
    /// }
    ///
    /// impl DeepCopy for Scale {
    ///     fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
    ///         Self {
    ///             params: self.params.deep_copy(memo),
    ///             factor: self.factor.deep_copy(memo),
    ///         }
    ///     }
    /// }
    ///
    /// let mut params = ParameterContainer::new();
    /// let factor = params.declare("factor", 2.0, Domain::Positive, &[]).unwrap();
    /// let scale = Scale { params, factor };
    ///
    /// let copy = scale.copy_with(&[0.0], Space::Transformed).unwrap();
    /// assert_eq!(copy.factor.scalar(), 1.0);
    /// assert_eq!(scale.factor.scalar(), 2.0);
    /// ```
    fn copy_with<'b>(&self, theta: impl Into<ArrayView1<'b, f64>>, space: Space) -> Result<Self>
    where
        Self: DeepCopy,
    {
        let mut obj = self.copy();
        obj.params().set_value(theta, space)?;
        Ok(obj)
    }
}

/// Container handle bound to its owner
///
/// Dereferences to the (possibly narrowed) container for read access. Every
/// successful mutation calls the owner's [`Parameterized::update`] exactly once,
/// after all leaves have been written.
pub struct Params<'a, O: Parameterized + ?Sized> {
    owner: &'a mut O,
    view: ParameterContainer,
}

impl<'a, O: Parameterized + ?Sized> Params<'a, O> {
    /// Handle to every parameter of `owner`
    pub fn new(owner: &'a mut O) -> Self {
        let view = owner.container().view();
        Self { owner, view }
    }

    /// The owner this handle notifies
    pub fn owner(&self) -> &O {
        &*self.owner
    }

    /// Narrow the handle to the named parameters
    ///
    /// The narrowed handle aliases the owner's leaves and still notifies the owner.
    pub fn select(self, names: &[&str]) -> std::result::Result<Params<'a, O>, ParameterError> {
        let view = self.view.select(names)?;
        Ok(Params {
            owner: self.owner,
            view,
        })
    }

    /// Set every parameter in scope from a flattened vector
    ///
    /// Fails with a shape mismatch unless `theta` has exactly `size()` elements,
    /// and with a domain violation if any component falls outside its bounds. On
    /// failure nothing is written and the owner is not notified.
    pub fn set_value<'b>(
        &mut self,
        theta: impl Into<ArrayView1<'b, f64>>,
        space: Space,
    ) -> std::result::Result<(), ParameterError> {
        self.view.assign(theta.into(), space)?;
        self.owner.update();
        Ok(())
    }

    /// Set the prior of the single parameter in scope from the built-in registry
    ///
    /// # Returns
    ///
    /// `true` if the parameter's value had to be clipped into the new support
    pub fn set_prior(&mut self, prior: Option<&str>, args: &[f64]) -> std::result::Result<bool, ParameterError> {
        self.set_prior_from(priors::registry(), prior, args)
    }

    /// Set the prior of the single parameter in scope from `registry`
    pub fn set_prior_from(
        &mut self,
        registry: &PriorRegistry,
        prior: Option<&str>,
        args: &[f64],
    ) -> std::result::Result<bool, ParameterError> {
        if self.view.len() != 1 {
            return Err(ParameterError::AmbiguousTarget {
                count: self.view.len(),
            });
        }
        let prior = match prior {
            Some(name) => Some(registry.create(name, args)?),
            None => None,
        };
        self.set_prior_object(prior)
    }

    /// Attach a prior object to the single parameter in scope
    pub fn set_prior_object(&mut self, prior: Option<Rc<dyn Prior>>) -> std::result::Result<bool, ParameterError> {
        let clipped = self.view.assign_prior(prior)?;
        self.owner.update();
        Ok(clipped)
    }

    /// Restore values and block tags of the named parameters in scope
    pub fn set_records(&mut self, records: &[ParameterRecord]) -> Result<()> {
        self.view.assign_records(records)?;
        self.owner.update();
        Ok(())
    }

    /// Restore values and block tags from JSON produced by [`ParameterContainer::to_json`]
    pub fn set_json(&mut self, json: &str) -> Result<()> {
        let records: Vec<ParameterRecord> = serde_json::from_str(json)?;
        self.set_records(&records)
    }
}

impl<'a, O: Parameterized + ?Sized> Deref for Params<'a, O> {
    type Target = ParameterContainer;

    fn deref(&self) -> &ParameterContainer {
        &self.view
    }
}

/// One entry of a declared shape
///
/// Labels bind to the size first seen for them within the same declaration and
/// every later use of the label must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// A concrete size
    Fixed(usize),
    /// A symbolic size
    Label(&'static str),
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Dim::Fixed(n)
    }
}

impl From<&'static str> for Dim {
    fn from(label: &'static str) -> Self {
        Dim::Label(label)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{}", n),
            Dim::Label(label) => f.write_str(label),
        }
    }
}

/// Values that can initialise a parameter array
pub trait IntoValue {
    /// Convert into an owned dynamic-dimensional array
    fn into_value(self) -> ArrayD<f64>;
}

impl IntoValue for f64 {
    fn into_value(self) -> ArrayD<f64> {
        arr0(self).into_dyn()
    }
}

impl IntoValue for Vec<f64> {
    fn into_value(self) -> ArrayD<f64> {
        Array::from(self).into_dyn()
    }
}

impl IntoValue for &[f64] {
    fn into_value(self) -> ArrayD<f64> {
        Array::from(self.to_vec()).into_dyn()
    }
}

impl<const N: usize> IntoValue for [f64; N] {
    fn into_value(self) -> ArrayD<f64> {
        Array::from(self.to_vec()).into_dyn()
    }
}

impl<D: Dimension> IntoValue for Array<f64, D> {
    fn into_value(self) -> ArrayD<f64> {
        // Standard layout so flat iteration matches logical order
        self.as_standard_layout().into_owned().into_dyn()
    }
}

fn shape_string(shape: &[Dim]) -> String {
    let parts: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("({})", parts.join(", "))
}

impl ParameterContainer {
    /// Declare a real-valued parameter array and register it under `name`
    ///
    /// Values with fewer dimensions than `shape` gain leading axes of length one.
    /// Each entry of `shape` is either a fixed size or a label; a label takes the
    /// first size seen for it and all other uses of it must match.
    ///
    /// # Returns
    ///
    /// A handle to the new leaf, or a shape mismatch, domain violation or
    /// duplicate-name error
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperparam_rs::parameters::{Dim, Domain, ParameterContainer};
    ///
    /// let mut params = ParameterContainer::new();
    /// let ell = params.declare("ell", vec![0.3, 0.4], Domain::Positive, &[Dim::Label("d")]).unwrap();
    /// assert_eq!(ell.value().shape(), &[2]);
    ///
    /// // A scalar is promoted to the declared number of axes
    /// let sf = params.declare("sf", 0.8, Domain::Positive, &[Dim::Label("d")]).unwrap();
    /// assert_eq!(sf.value().shape(), &[1]);
    ///
    /// // Repeated labels must agree
    /// assert!(params
    ///     .declare("w", vec![1.0, 2.0], Domain::Real, &[Dim::Label("d"), Dim::Label("d")])
    ///     .is_err());
    /// ```
    pub fn declare(
        &mut self,
        name: &str,
        value: impl IntoValue,
        domain: Domain,
        shape: &[Dim],
    ) -> std::result::Result<ParamRef, ParameterError> {
        let mut value = value.into_value();
        while value.ndim() < shape.len() {
            value = value.insert_axis(Axis(0));
        }

        let mismatch = || ParameterError::ShapeMismatch {
            name: name.to_string(),
            message: format!("does not have shape {}", shape_string(shape)),
        };

        if value.ndim() != shape.len() {
            return Err(mismatch());
        }
        let mut labels: HashMap<&str, usize> = HashMap::new();
        for (dim, &actual) in shape.iter().zip(value.shape()) {
            let expected = match *dim {
                Dim::Fixed(n) => n,
                Dim::Label(label) => *labels.entry(label).or_insert(actual),
            };
            if expected != actual {
                return Err(mismatch());
            }
        }

        self.register(name, Parameter::new(value, domain)?)
    }

    /// Embed an independent copy of `sub` under `name`
    ///
    /// The copy's parameters are registered as `name.<leaf>`. The returned copy is
    /// the embedded instance and shares its leaves with this container; the
    /// original `sub` is left untouched.
    pub fn embed<K>(&mut self, name: &str, sub: &K) -> std::result::Result<K, ParameterError>
    where
        K: Parameterized + DeepCopy,
    {
        let copy = sub.copy();
        self.register_nested(Some(name), copy.container())?;
        log::debug!("embedded '{}' with {} parameters", name, copy.container().size());
        Ok(copy)
    }

    /// Embed a dynamically typed object that must be a `K`
    ///
    /// Fails with a type mismatch if `sub` is not a `K`.
    pub fn embed_any<K>(&mut self, name: &str, sub: &dyn Any) -> std::result::Result<K, ParameterError>
    where
        K: Parameterized + DeepCopy + 'static,
    {
        let sub = sub
            .downcast_ref::<K>()
            .ok_or_else(|| ParameterError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<K>().to_string(),
            })?;
        self.embed(name, sub)
    }
}
