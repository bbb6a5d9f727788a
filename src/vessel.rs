//! Accumulation policies.
//!
//! A vessel receives each computed quantity once per evaluation cycle through
//! [`Vessel::calculate`] and decides what to keep. [`StoreAllValues`] keeps
//! everything: every quantity's value and full derivative set are written to
//! its segment of a [`ValueBuffer`].

use log::debug;

use crate::Float;
use crate::buffer::ValueBuffer;
use crate::options::VesselOptions;
use crate::value::Value;

/// A per-cycle accumulation policy.
pub trait Vessel<F: Float> {
    /// The label outputs of this vessel are registered under.
    fn label(&self) -> &str;

    /// Human-readable summary of what the vessel stores.
    fn description(&self) -> String;

    /// Take quantity `index` into the vessel.
    ///
    /// Returns whether the caller should keep working on this quantity.
    /// Policies that filter (e.g. by a threshold) return `false` to let the
    /// caller skip further work.
    fn calculate(&mut self, index: usize, value: &Value<F>) -> bool;
}

/// Notified after a vessel has rebuilt its buffer layout.
///
/// Whatever is composed with a [`StoreAllValues`] implements this to size its
/// own storage from the new layout.
pub trait ResizeListener<F: Float> {
    /// Called once per rebuild with the finished layout.
    fn local_resizing(&mut self, layout: &ValueBuffer<F>);
}

impl<F: Float, T: FnMut(&ValueBuffer<F>)> ResizeListener<F> for T {
    fn local_resizing(&mut self, layout: &ValueBuffer<F>) {
        self(layout)
    }
}

/// Stores the value and every derivative of each quantity, unfiltered.
pub struct StoreAllValues<F: Float, L: ResizeListener<F>> {
    options: VesselOptions,
    buffer: ValueBuffer<F>,
    listener: L,
}

impl<F: Float, L: ResizeListener<F>> StoreAllValues<F, L> {
    /// An empty store; nothing is laid out until [`resize`](Self::resize).
    pub fn new(options: VesselOptions, listener: L) -> Self {
        StoreAllValues {
            options,
            buffer: ValueBuffer::new(),
            listener,
        }
    }

    /// Rebuild the layout for quantities with the given derivative counts,
    /// then notify the listener.
    ///
    /// The listener always sees the finished layout.
    pub fn resize(&mut self, derivative_counts: &[usize]) {
        let sizes: Vec<usize> = derivative_counts.iter().map(|&n| n + 1).collect();
        self.buffer.set_number_of_values(sizes.len());
        self.buffer.set_value_sizes(&sizes);
        debug!(
            "{}: stored {} values in {} buffer elements",
            self.options.label,
            self.buffer.number_of_values(),
            self.buffer.len()
        );
        self.listener.local_resizing(&self.buffer);
    }

    /// Segment `i` as a value, staged through the buffer's scratch value.
    pub fn value(&mut self, i: usize) -> &Value<F> {
        self.buffer.stage(i)
    }

    /// Read-only view of the stored segments.
    pub fn buffer(&self) -> &ValueBuffer<F> {
        &self.buffer
    }

    /// The options the store was constructed with.
    pub fn options(&self) -> &VesselOptions {
        &self.options
    }

    /// The composed resize listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Mutable access to the composed resize listener.
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}

impl<F: Float, L: ResizeListener<F>> Vessel<F> for StoreAllValues<F, L> {
    fn label(&self) -> &str {
        &self.options.label
    }

    fn description(&self) -> String {
        format!(
            "stores all {} values and their derivatives",
            self.buffer.number_of_values()
        )
    }

    /// Overwrite segment `index` with `value`. Never filters.
    ///
    /// # Panics
    ///
    /// Panics if `value` carries more derivatives than the segment holds.
    fn calculate(&mut self, index: usize, value: &Value<F>) -> bool {
        let nder = self.buffer.number_of_derivatives(index);
        assert!(
            value.number_of_derivatives() <= nder,
            "value has {} derivatives but segment {} holds {}",
            value.number_of_derivatives(),
            index,
            nder
        );
        self.buffer.set_value(index, value.get());
        for j in 0..nder {
            let d = if j < value.number_of_derivatives() {
                value.derivative(j)
            } else {
                F::zero()
            };
            self.buffer.set_derivative(index, j, d);
        }
        true
    }
}
