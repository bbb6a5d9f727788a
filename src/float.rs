use std::fmt::{Debug, Display};

use num_traits::Float as NumFloat;

/// Element type of value buffers, derivatives and force arrays.
///
/// Segments only ever hold plain numbers that are added, multiplied and
/// compared against zero, so `f32` and `f64` are the only implementors.
/// `f64` is the usual choice; see [`crate::Value64`] and friends.
pub trait Float: NumFloat + Copy + Send + Sync + Default + Debug + Display + 'static {}

impl Float for f32 {}
impl Float for f64 {}
