//! Host-owned storage for result objects.
//!
//! Accumulators never own the values they finalize into. They hold a
//! [`ValueHandle`], a plain index into a [`ValueRegistry`], and every read or
//! write goes through the registry the host passes in.

use std::collections::HashMap;

use crate::Float;
use crate::error::{Result, VesselError};
use crate::value::Value;

/// Non-owning reference to a value inside a [`ValueRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueHandle(usize);

impl ValueHandle {
    /// Position of the value in its registry.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Labelled collection of [`Value`]s owned by the host.
pub struct ValueRegistry<F: Float> {
    values: Vec<Value<F>>,
    labels: Vec<String>,
    by_label: HashMap<String, ValueHandle>,
}

impl<F: Float> Default for ValueRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ValueRegistry<F> {
    /// An empty registry.
    pub fn new() -> Self {
        ValueRegistry {
            values: Vec::new(),
            labels: Vec::new(),
            by_label: HashMap::new(),
        }
    }

    /// Register a fresh zero value under `label`.
    pub fn add(&mut self, label: &str) -> Result<ValueHandle> {
        if label.is_empty() {
            return Err(VesselError::EmptyLabel);
        }
        if self.by_label.contains_key(label) {
            return Err(VesselError::DuplicateLabel(label.to_owned()));
        }
        let handle = ValueHandle(self.values.len());
        self.values.push(Value::new());
        self.labels.push(label.to_owned());
        self.by_label.insert(label.to_owned(), handle);
        Ok(handle)
    }

    /// The value behind `handle`.
    #[inline]
    pub fn get(&self, handle: ValueHandle) -> &Value<F> {
        self.check(handle);
        &self.values[handle.0]
    }

    /// Mutable access to the value behind `handle`.
    #[inline]
    pub fn get_mut(&mut self, handle: ValueHandle) -> &mut Value<F> {
        self.check(handle);
        &mut self.values[handle.0]
    }

    /// The label `handle` was registered under.
    pub fn label(&self, handle: ValueHandle) -> &str {
        self.check(handle);
        &self.labels[handle.0]
    }

    /// Look a value up by its full label.
    pub fn find(&self, label: &str) -> Option<ValueHandle> {
        self.by_label.get(label).copied()
    }

    /// Number of registered values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(handle, label, value)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ValueHandle, &str, &Value<F>)> {
        self.labels
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(i, (label, value))| (ValueHandle(i), label.as_str(), value))
    }

    fn check(&self, handle: ValueHandle) {
        assert!(
            handle.0 < self.values.len(),
            "value handle {} out of range ({} registered values)",
            handle.0,
            self.values.len()
        );
    }
}
