//! The result object a computed quantity is finalized into.
//!
//! A [`Value`] holds one scalar, its partial derivatives with respect to the
//! upstream degrees of freedom, and the force an upstream consumer wants
//! applied to it. Derivative `j` corresponds to global degree of freedom `j`
//! unless the owning accumulator remaps it.

use std::fmt::{self, Display};

use crate::Float;

/// A scalar with a dense derivative vector and an optional input force.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Value<F: Float> {
    value: F,
    derivatives: Vec<F>,
    input_force: F,
    has_force: bool,
}

impl<F: Float> Default for Value<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Value<F> {
    /// A zero value with no derivatives.
    pub fn new() -> Self {
        Value {
            value: F::zero(),
            derivatives: Vec::new(),
            input_force: F::zero(),
            has_force: false,
        }
    }

    /// A zero value with `n` zeroed derivative slots.
    pub fn with_derivatives(n: usize) -> Self {
        Value {
            derivatives: vec![F::zero(); n],
            ..Self::new()
        }
    }

    /// Overwrite the scalar value. Derivatives are untouched.
    #[inline]
    pub fn set(&mut self, value: F) {
        self.value = value;
    }

    /// The scalar value.
    #[inline]
    pub fn get(&self) -> F {
        self.value
    }

    /// Length of the derivative vector.
    #[inline]
    pub fn number_of_derivatives(&self) -> usize {
        self.derivatives.len()
    }

    /// Resize the derivative vector. Newly created slots are zero.
    pub fn resize_derivatives(&mut self, n: usize) {
        self.derivatives.resize(n, F::zero());
    }

    /// Zero every derivative, keeping the current length.
    pub fn clear_derivatives(&mut self) {
        self.derivatives.fill(F::zero());
    }

    /// Add `d` to derivative `j`.
    #[inline]
    pub fn add_derivative(&mut self, j: usize, d: F) {
        let n = self.derivatives.len();
        assert!(j < n, "derivative index {j} out of range ({n} derivatives)");
        self.derivatives[j] = self.derivatives[j] + d;
    }

    /// Overwrite derivative `j` with `d`.
    #[inline]
    pub fn set_derivative(&mut self, j: usize, d: F) {
        let n = self.derivatives.len();
        assert!(j < n, "derivative index {j} out of range ({n} derivatives)");
        self.derivatives[j] = d;
    }

    /// Derivative `j`.
    #[inline]
    pub fn derivative(&self, j: usize) -> F {
        let n = self.derivatives.len();
        assert!(j < n, "derivative index {j} out of range ({n} derivatives)");
        self.derivatives[j]
    }

    /// All derivatives in index order.
    #[inline]
    pub fn derivatives(&self) -> &[F] {
        &self.derivatives
    }

    // ── Forces ──

    /// Accumulate an upstream force on this value.
    pub fn add_force(&mut self, f: F) {
        self.has_force = true;
        self.input_force = self.input_force + f;
    }

    /// Drop any force added since the last clear.
    pub fn clear_input_force(&mut self) {
        self.has_force = false;
        self.input_force = F::zero();
    }

    /// Whether a force was added since the last clear.
    #[inline]
    pub fn has_force(&self) -> bool {
        self.has_force
    }

    /// The accumulated input force, zero when none was added.
    #[inline]
    pub fn input_force(&self) -> F {
        if self.has_force {
            self.input_force
        } else {
            F::zero()
        }
    }

    /// Add `input_force * d_j` into `forces[j]` for every derivative.
    ///
    /// Returns `false`, leaving `forces` untouched, when no force was added
    /// or the accumulated force is exactly zero.
    ///
    /// # Panics
    ///
    /// Panics if `forces` is shorter than the derivative vector.
    pub fn apply_force(&self, forces: &mut [F]) -> bool {
        let f = self.input_force();
        if f == F::zero() {
            return false;
        }
        assert!(
            forces.len() >= self.derivatives.len(),
            "force array has {} slots but value has {} derivatives",
            forces.len(),
            self.derivatives.len()
        );
        for (slot, &d) in forces.iter_mut().zip(&self.derivatives) {
            *slot = *slot + f * d;
        }
        true
    }
}

impl<F: Float> Display for Value<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
