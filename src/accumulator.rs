//! Accumulation into a fixed set of host-owned outputs, and the reverse pass
//! that turns output forces into forces on the underlying degrees of freedom.
//!
//! An evaluation cycle runs
//!
//! ```text
//! add_output* / add_buffered_value*   Uninitialized -> Bound
//! resize                              Bound | LaidOut | Ready -> LaidOut
//! accumulate*                         LaidOut | Accumulated -> Accumulated
//! finish                              LaidOut | Accumulated -> Ready
//! apply_force*                        Ready
//! clear                               LaidOut | Accumulated | Ready -> LaidOut
//! ```
//!
//! Calling an operation from any other phase panics.

use log::{debug, trace};

use crate::Float;
use crate::buffer::ValueBuffer;
use crate::error::Result;
use crate::options::VesselOptions;
use crate::registry::{ValueHandle, ValueRegistry};
use crate::value::Value;
use crate::vessel::Vessel;

/// Lifecycle of an [`Accumulator`] within one evaluation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing registered yet.
    Uninitialized,
    /// Outputs and buffered values registered, no layout yet.
    Bound,
    /// Buffer laid out and zeroed.
    LaidOut,
    /// At least one contribution accumulated this cycle.
    Accumulated,
    /// Outputs hold this cycle's values; forces may be applied.
    Ready,
}

/// Accumulates values and derivatives for a fixed set of outputs.
///
/// The buffer holds one segment per output followed by one segment per
/// buffered value. Buffered values are internal sums (normalizations and the
/// like) that are never copied to an output.
pub struct Accumulator<F: Float> {
    options: VesselOptions,
    buffer: ValueBuffer<F>,
    outputs: Vec<ValueHandle>,
    buffered: Vec<usize>,
    derivative_indices: Vec<Option<Vec<usize>>>,
    phase: Phase,
}

impl<F: Float> Accumulator<F> {
    /// An accumulator with no outputs, registering under `options.label`.
    pub fn new(options: VesselOptions) -> Self {
        Accumulator {
            options,
            buffer: ValueBuffer::new(),
            outputs: Vec::new(),
            buffered: Vec::new(),
            derivative_indices: Vec::new(),
            phase: Phase::Uninitialized,
        }
    }

    /// Where the accumulator is in the evaluation cycle.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The options the accumulator was constructed with.
    pub fn options(&self) -> &VesselOptions {
        &self.options
    }

    /// Read-only view of the packed storage.
    pub fn buffer(&self) -> &ValueBuffer<F> {
        &self.buffer
    }

    // ── Setup ──

    /// Register a new output in `registry` under this vessel's label and bind
    /// it as the next output.
    pub fn add_output(
        &mut self,
        registry: &mut ValueRegistry<F>,
        name: &str,
    ) -> Result<ValueHandle> {
        self.expect_setup("add_output");
        let handle = registry.add(&self.options.output_label(name))?;
        self.outputs.push(handle);
        self.derivative_indices.push(None);
        self.phase = Phase::Bound;
        Ok(handle)
    }

    /// Reserve a buffer segment with `nderivatives` derivatives that is not
    /// exposed as an output. Returns its index among the buffered values.
    pub fn add_buffered_value(&mut self, nderivatives: usize) -> usize {
        self.expect_setup("add_buffered_value");
        self.buffered.push(nderivatives);
        self.phase = Phase::Bound;
        self.buffered.len() - 1
    }

    /// Number of registered outputs, excluding buffered values.
    #[inline]
    pub fn number_of_values(&self) -> usize {
        self.outputs.len()
    }

    /// Number of buffered values.
    #[inline]
    pub fn number_of_buffered_values(&self) -> usize {
        self.buffered.len()
    }

    /// Handle of the value output `i` is finalized into.
    ///
    /// # Panics
    ///
    /// Panics before [`resize`](Self::resize) or if `i` is out of range.
    pub fn output(&self, i: usize) -> ValueHandle {
        assert!(
            !matches!(self.phase, Phase::Uninitialized | Phase::Bound),
            "output read before resize"
        );
        assert!(
            i < self.outputs.len(),
            "output index {i} out of range ({} outputs)",
            self.outputs.len()
        );
        self.outputs[i]
    }

    /// Buffer segment holding buffered value `k`.
    pub fn buffered_segment(&self, k: usize) -> usize {
        assert!(
            k < self.buffered.len(),
            "buffered value {k} out of range ({} buffered values)",
            self.buffered.len()
        );
        self.outputs.len() + k
    }

    /// Map derivative `j` of output `i` to global force slot `indices[j]`.
    ///
    /// Outputs without a map use `j` itself.
    pub fn set_derivative_indices(&mut self, i: usize, indices: Vec<usize>) {
        assert!(
            i < self.outputs.len(),
            "output index {i} out of range ({} outputs)",
            self.outputs.len()
        );
        self.derivative_indices[i] = Some(indices);
    }

    /// Lay the buffer out to match the derivative count of every bound output
    /// and buffered value. Zeroes all accumulated data.
    pub fn resize(&mut self, registry: &ValueRegistry<F>) {
        assert!(
            matches!(self.phase, Phase::Bound | Phase::LaidOut | Phase::Ready),
            "resize called in phase {:?}",
            self.phase
        );
        let sizes: Vec<usize> = self
            .outputs
            .iter()
            .map(|&h| registry.get(h).number_of_derivatives() + 1)
            .chain(self.buffered.iter().map(|&n| n + 1))
            .collect();
        self.buffer.set_number_of_values(sizes.len());
        self.buffer.set_value_sizes(&sizes);
        debug!(
            "{}: {} outputs and {} buffered values in {} buffer elements",
            self.options.label,
            self.outputs.len(),
            self.buffered.len(),
            self.buffer.len()
        );
        self.phase = Phase::LaidOut;
    }

    // ── Accumulation ──

    /// Start a new cycle: zero the buffer, keep the layout.
    pub fn clear(&mut self) {
        assert!(
            matches!(self.phase, Phase::LaidOut | Phase::Accumulated | Phase::Ready),
            "clear called in phase {:?}",
            self.phase
        );
        self.buffer.clear();
        self.phase = Phase::LaidOut;
    }

    /// Add `value` and its derivatives into segment `i`.
    ///
    /// # Panics
    ///
    /// Panics if `value` has more derivatives than the segment.
    pub fn accumulate(&mut self, i: usize, value: &Value<F>) {
        self.expect_accumulating("accumulate");
        let nder = self.buffer.number_of_derivatives(i);
        assert!(
            value.number_of_derivatives() <= nder,
            "contribution has {} derivatives but segment {} holds {}",
            value.number_of_derivatives(),
            i,
            nder
        );
        self.buffer.add_to_value(i, value.get());
        for (j, &d) in value.derivatives().iter().enumerate() {
            self.buffer.add_to_derivative(i, j, d);
        }
        self.phase = Phase::Accumulated;
    }

    /// Add `v` to the value of segment `i`.
    pub fn add_to_value(&mut self, i: usize, v: F) {
        self.expect_accumulating("add_to_value");
        self.buffer.add_to_value(i, v);
        self.phase = Phase::Accumulated;
    }

    /// Add `d` to derivative `j` of segment `i`.
    pub fn add_to_derivative(&mut self, i: usize, j: usize, d: F) {
        self.expect_accumulating("add_to_derivative");
        self.buffer.add_to_derivative(i, j, d);
        self.phase = Phase::Accumulated;
    }

    /// Current value of buffered value `k`.
    pub fn buffered_value(&self, k: usize) -> F {
        assert!(
            !matches!(self.phase, Phase::Uninitialized | Phase::Bound),
            "buffered_value read before resize"
        );
        self.buffer.get_value(self.buffered_segment(k))
    }

    /// Copy every output segment into its bound value.
    pub fn finish(&mut self, registry: &mut ValueRegistry<F>) {
        assert!(
            matches!(self.phase, Phase::LaidOut | Phase::Accumulated),
            "finish called in phase {:?}",
            self.phase
        );
        for (i, &h) in self.outputs.iter().enumerate() {
            self.buffer.get_value_into(i, registry.get_mut(h));
        }
        trace!("{}: finalized {} outputs", self.options.label, self.outputs.len());
        self.phase = Phase::Ready;
    }

    // ── Reverse pass ──

    /// Scatter the input force of every output through its derivatives into
    /// `forces`.
    ///
    /// Returns `false`, leaving `forces` untouched, when every output force is
    /// zero.
    pub fn apply_force(&self, registry: &ValueRegistry<F>, forces: &mut [F]) -> bool {
        self.apply_with(|i| registry.get(self.outputs[i]).input_force(), forces)
    }

    /// Like [`apply_force`](Self::apply_force), with the per-output force
    /// scalars given explicitly.
    pub fn apply_force_weights(&self, weights: &[F], forces: &mut [F]) -> bool {
        assert_eq!(
            weights.len(),
            self.outputs.len(),
            "expected {} output forces, got {}",
            self.outputs.len(),
            weights.len()
        );
        self.apply_with(|i| weights[i], forces)
    }

    fn apply_with(&self, weight: impl Fn(usize) -> F, forces: &mut [F]) -> bool {
        assert_eq!(self.phase, Phase::Ready, "forces applied before finish");
        let mut applied = false;
        for i in 0..self.outputs.len() {
            let w = weight(i);
            if w == F::zero() {
                continue;
            }
            self.for_each_contribution(i, w, forces.len(), |g, df| {
                forces[g] = forces[g] + df;
            });
            applied = true;
        }
        trace!("{}: forces applied: {}", self.options.label, applied);
        applied
    }

    /// Call `sink(g, w * d_j)` for every derivative `d_j` of output `i`, where
    /// `g` is the derivative's global slot.
    fn for_each_contribution(
        &self,
        i: usize,
        w: F,
        nslots: usize,
        mut sink: impl FnMut(usize, F),
    ) {
        let derivatives = self.buffer.derivatives(i);
        match &self.derivative_indices[i] {
            Some(indices) => {
                assert_eq!(
                    indices.len(),
                    derivatives.len(),
                    "output {} has {} derivatives but {} global indices",
                    i,
                    derivatives.len(),
                    indices.len()
                );
                for (&g, &d) in indices.iter().zip(derivatives) {
                    assert!(g < nslots, "global index {g} out of range ({nslots} force slots)");
                    sink(g, w * d);
                }
            }
            None => {
                assert!(
                    derivatives.len() <= nslots,
                    "output {} has {} derivatives but only {} force slots",
                    i,
                    derivatives.len(),
                    nslots
                );
                for (g, &d) in derivatives.iter().enumerate() {
                    sink(g, w * d);
                }
            }
        }
    }

    fn expect_setup(&self, op: &str) {
        assert!(
            matches!(self.phase, Phase::Uninitialized | Phase::Bound),
            "{op} called after resize (phase {:?})",
            self.phase
        );
    }

    fn expect_accumulating(&self, op: &str) {
        assert!(
            matches!(self.phase, Phase::LaidOut | Phase::Accumulated),
            "{op} called in phase {:?}",
            self.phase
        );
    }
}

#[cfg(feature = "parallel")]
impl<F: Float> Accumulator<F> {
    /// Parallel [`apply_force`](Self::apply_force).
    ///
    /// Products are computed per output in parallel and added into `forces`
    /// in output order, so the result matches the serial version exactly.
    pub fn apply_force_par(&self, registry: &ValueRegistry<F>, forces: &mut [F]) -> bool {
        use rayon::prelude::*;

        assert_eq!(self.phase, Phase::Ready, "forces applied before finish");
        let nslots = forces.len();
        let contributions: Vec<Vec<(usize, F)>> = self
            .outputs
            .par_iter()
            .enumerate()
            .map(|(i, &h)| {
                let w = registry.get(h).input_force();
                let mut out = Vec::new();
                if w != F::zero() {
                    self.for_each_contribution(i, w, nslots, |g, df| out.push((g, df)));
                }
                out
            })
            .collect();

        let mut applied = false;
        for (i, contribution) in contributions.iter().enumerate() {
            if registry.get(self.outputs[i]).input_force() == F::zero() {
                continue;
            }
            for &(g, df) in contribution {
                forces[g] = forces[g] + df;
            }
            applied = true;
        }
        applied
    }
}

impl<F: Float> Vessel<F> for Accumulator<F> {
    fn label(&self) -> &str {
        &self.options.label
    }

    fn description(&self) -> String {
        format!(
            "accumulates {} outputs and {} buffered values",
            self.outputs.len(),
            self.buffered.len()
        )
    }

    /// Add `value` into segment `index`. Never filters.
    fn calculate(&mut self, index: usize, value: &Value<F>) -> bool {
        self.accumulate(index, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Accumulator<f64>, ValueRegistry<f64>) {
        let mut registry = ValueRegistry::new();
        let mut acc = Accumulator::new(VesselOptions::new("SUM", "cv"));
        let h = acc.add_output(&mut registry, "sum").unwrap();
        registry.get_mut(h).resize_derivatives(2);
        (acc, registry)
    }

    #[test]
    fn phases_follow_cycle() {
        let (mut acc, mut registry) = setup();
        assert_eq!(acc.phase(), Phase::Bound);
        acc.resize(&registry);
        assert_eq!(acc.phase(), Phase::LaidOut);
        acc.add_to_value(0, 1.0);
        assert_eq!(acc.phase(), Phase::Accumulated);
        acc.finish(&mut registry);
        assert_eq!(acc.phase(), Phase::Ready);
        acc.clear();
        assert_eq!(acc.phase(), Phase::LaidOut);
    }

    #[test]
    #[should_panic(expected = "after resize")]
    fn add_output_after_resize() {
        let (mut acc, mut registry) = setup();
        acc.resize(&registry);
        let _ = acc.add_output(&mut registry, "late");
    }

    #[test]
    #[should_panic(expected = "resize called in phase Accumulated")]
    fn resize_mid_accumulation() {
        let (mut acc, registry) = setup();
        acc.resize(&registry);
        acc.add_to_value(0, 1.0);
        acc.resize(&registry);
    }

    #[test]
    #[should_panic(expected = "before finish")]
    fn force_before_finish() {
        let (mut acc, registry) = setup();
        acc.resize(&registry);
        let mut forces = vec![0.0; 2];
        acc.apply_force_weights(&[1.0], &mut forces);
    }

    #[test]
    fn duplicate_output_name_is_an_error() {
        let (mut acc, mut registry) = setup();
        assert!(acc.add_output(&mut registry, "sum").is_err());
        assert_eq!(acc.number_of_values(), 1);
    }
}
