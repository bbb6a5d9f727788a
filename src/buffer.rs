//! Packed value/derivative storage.
//!
//! A [`ValueBuffer`] stores any number of quantities in one flat array. Each
//! quantity owns a contiguous segment `[value, d_0, d_1, ..., d_{k-1}]`, and
//! `value_starts` is the exclusive prefix sum of the segment sizes:
//!
//! ```text
//! sizes        = [3, 2]
//! value_starts = [0, 3, 5]
//! data         = [v0, d00, d01, v1, d10]
//! ```
//!
//! Callers address the buffer by `(quantity, derivative)` pairs only. Raw
//! offsets never leave this module.

use crate::Float;
use crate::value::Value;

/// Flat buffer partitioned into variable-length value/derivative segments.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValueBuffer<F: Float> {
    value_starts: Vec<usize>,
    data: Vec<F>,
    laid_out: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    scratch: Value<F>,
}

impl<F: Float> Default for ValueBuffer<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ValueBuffer<F> {
    /// An empty buffer with no declared quantities.
    pub fn new() -> Self {
        ValueBuffer {
            value_starts: vec![0],
            data: Vec::new(),
            laid_out: false,
            scratch: Value::new(),
        }
    }

    /// Declare `n` quantities. The layout is unknown until
    /// [`set_value_sizes`](Self::set_value_sizes) is called.
    pub fn set_number_of_values(&mut self, n: usize) {
        self.value_starts.clear();
        self.value_starts.resize(n + 1, 0);
        self.data.clear();
        self.laid_out = false;
    }

    /// Lay out the segments. `sizes[i]` is one (the value) plus the number of
    /// derivatives of quantity `i`. All elements are zeroed.
    ///
    /// # Panics
    ///
    /// Panics if `sizes` does not have one entry per declared quantity, or if
    /// any size is zero.
    pub fn set_value_sizes(&mut self, sizes: &[usize]) {
        let n = self.value_starts.len() - 1;
        assert_eq!(
            sizes.len(),
            n,
            "expected {} segment sizes, got {}",
            n,
            sizes.len()
        );
        self.value_starts[0] = 0;
        for (i, &size) in sizes.iter().enumerate() {
            assert!(size >= 1, "segment {i} has size 0; every segment needs a value slot");
            self.value_starts[i + 1] = self.value_starts[i] + size;
        }
        self.data.clear();
        self.data.resize(self.value_starts[n], F::zero());
        self.laid_out = true;
    }

    /// Number of declared quantities.
    #[inline]
    pub fn number_of_values(&self) -> usize {
        self.value_starts.len() - 1
    }

    /// Total number of stored elements across all segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The segment index: `value_starts[i]..value_starts[i + 1]` is segment `i`.
    #[inline]
    pub fn value_starts(&self) -> &[usize] {
        &self.value_starts
    }

    /// Zero every element, keeping the layout.
    pub fn clear(&mut self) {
        self.data.fill(F::zero());
    }

    /// Number of derivative slots in segment `i`.
    #[inline]
    pub fn number_of_derivatives(&self, i: usize) -> usize {
        self.check(i);
        self.value_starts[i + 1] - self.value_starts[i] - 1
    }

    /// Segment `i` as `[value, d_0, ..., d_{k-1}]`.
    #[inline]
    pub fn segment(&self, i: usize) -> &[F] {
        self.check(i);
        &self.data[self.value_starts[i]..self.value_starts[i + 1]]
    }

    /// The derivative part of segment `i`.
    #[inline]
    pub fn derivatives(&self, i: usize) -> &[F] {
        &self.segment(i)[1..]
    }

    /// Copy segment `i` into `out`.
    ///
    /// `out` is resized to the segment's derivative count if needed, its
    /// derivatives are zeroed, and then the value and each derivative are
    /// copied in ascending order.
    pub fn get_value_into(&self, i: usize, out: &mut Value<F>) {
        self.check(i);
        let nder = self.value_starts[i + 1] - self.value_starts[i] - 1;
        if out.number_of_derivatives() != nder {
            out.resize_derivatives(nder);
        }
        out.clear_derivatives();

        let mut k = self.value_starts[i];
        out.set(self.data[k]);
        k += 1;
        for j in 0..nder {
            out.add_derivative(j, self.data[k]);
            k += 1;
        }
    }

    /// The value component of segment `i`, ignoring its derivatives.
    #[inline]
    pub fn get_value(&self, i: usize) -> F {
        self.check(i);
        self.data[self.value_starts[i]]
    }

    /// Read segment `i` into the internal scratch value and return it.
    ///
    /// The scratch value is overwritten by the next call.
    pub fn stage(&mut self, i: usize) -> &Value<F> {
        let mut scratch = std::mem::take(&mut self.scratch);
        self.get_value_into(i, &mut scratch);
        self.scratch = scratch;
        &self.scratch
    }

    // ── Element writes ──

    /// Overwrite the value of segment `i`.
    #[inline]
    pub fn set_value(&mut self, i: usize, v: F) {
        self.check(i);
        self.data[self.value_starts[i]] = v;
    }

    /// Add `v` to the value of segment `i`.
    #[inline]
    pub fn add_to_value(&mut self, i: usize, v: F) {
        self.check(i);
        let k = self.value_starts[i];
        self.data[k] = self.data[k] + v;
    }

    /// Overwrite derivative `j` of segment `i`.
    #[inline]
    pub fn set_derivative(&mut self, i: usize, j: usize, d: F) {
        let k = self.derivative_offset(i, j);
        self.data[k] = d;
    }

    /// Add `d` to derivative `j` of segment `i`.
    #[inline]
    pub fn add_to_derivative(&mut self, i: usize, j: usize, d: F) {
        let k = self.derivative_offset(i, j);
        self.data[k] = self.data[k] + d;
    }

    fn derivative_offset(&self, i: usize, j: usize) -> usize {
        let nder = self.number_of_derivatives(i);
        assert!(
            j < nder,
            "derivative {j} out of range for segment {i} ({nder} derivatives)"
        );
        self.value_starts[i] + 1 + j
    }

    fn check(&self, i: usize) {
        assert!(
            self.laid_out,
            "buffer layout not built; call set_value_sizes first"
        );
        let n = self.number_of_values();
        assert!(i < n, "segment index {i} out of range ({n} segments)");
    }
}

#[cfg(feature = "serde")]
mod buffer_serde {
    use serde::{Deserialize, Deserializer};

    use super::ValueBuffer;
    use crate::Float;
    use crate::value::Value;

    impl<'de, F: Float + Deserialize<'de>> Deserialize<'de> for ValueBuffer<F> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            #[derive(Deserialize)]
            struct BufferData<F> {
                value_starts: Vec<usize>,
                data: Vec<F>,
                laid_out: bool,
            }

            let raw = BufferData::<F>::deserialize(deserializer)?;
            check_layout(&raw.value_starts, raw.data.len(), raw.laid_out)
                .map_err(serde::de::Error::custom)?;
            Ok(ValueBuffer {
                value_starts: raw.value_starts,
                data: raw.data,
                laid_out: raw.laid_out,
                scratch: Value::new(),
            })
        }
    }

    /// The segment index must be a prefix sum starting at 0 with every
    /// segment at least one wide, covering `data` exactly. A buffer that was
    /// never laid out has only zero offsets and no data.
    fn check_layout(starts: &[usize], len: usize, laid_out: bool) -> Result<(), String> {
        match starts.first() {
            None => return Err("value_starts must have at least one entry".into()),
            Some(&first) if first != 0 => {
                return Err(format!("value_starts must start at 0, found {first}"));
            }
            Some(_) => {}
        }
        if !laid_out {
            if len != 0 || starts.iter().any(|&s| s != 0) {
                return Err("buffer without a layout must have zero offsets and no data".into());
            }
            return Ok(());
        }
        for (i, w) in starts.windows(2).enumerate() {
            if w[1] <= w[0] {
                return Err(format!(
                    "segment {i} spans {}..{}; every segment needs a value slot",
                    w[0], w[1]
                ));
            }
        }
        let end = starts[starts.len() - 1];
        if len != end {
            return Err(format!("data has {len} elements but the layout covers {end}"));
        }
        Ok(())
    }
}
