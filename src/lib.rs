//! Packed value/derivative buffers for collective variables.
//!
//! A collective variable is computed from many sub-calculations, each
//! contributing to a handful of output quantities and their derivatives with
//! respect to the atomic degrees of freedom. This crate provides the storage
//! those contributions accumulate into and the reverse pass that turns forces
//! on the outputs into forces on the degrees of freedom.
//!
//! - [`ValueBuffer`]: one flat array split into `[value, d_0, ..., d_{k-1}]`
//!   segments.
//! - [`StoreAllValues`]: a [`Vessel`] that keeps every quantity and notifies a
//!   [`ResizeListener`] when its layout changes.
//! - [`Accumulator`]: sums contributions for a fixed set of outputs, copies
//!   them into host-owned [`Value`]s and applies forces.
//!
//! ```
//! use cv_vessel::{Accumulator, Value, ValueRegistry, VesselOptions};
//!
//! let mut registry = ValueRegistry::<f64>::new();
//! let mut acc = Accumulator::new(VesselOptions::new("SUM", "cv"));
//! let out = acc.add_output(&mut registry, "sum").unwrap();
//! registry.get_mut(out).resize_derivatives(2);
//! acc.resize(&registry);
//!
//! let mut contribution = Value::with_derivatives(2);
//! contribution.set(1.5);
//! contribution.set_derivative(0, 0.5);
//! acc.accumulate(0, &contribution);
//! acc.accumulate(0, &contribution);
//! acc.finish(&mut registry);
//! assert_eq!(registry.get(out).get(), 3.0);
//!
//! registry.get_mut(out).add_force(2.0);
//! let mut forces = vec![0.0; 2];
//! assert!(acc.apply_force(&registry, &mut forces));
//! assert_eq!(forces, vec![2.0, 0.0]);
//! ```

pub mod accumulator;
pub mod buffer;
pub mod error;
pub mod float;
pub mod options;
pub mod registry;
pub mod value;
pub mod vessel;

pub use accumulator::{Accumulator, Phase};
pub use buffer::ValueBuffer;
pub use error::{Result, VesselError};
pub use float::Float;
pub use options::VesselOptions;
pub use registry::{ValueHandle, ValueRegistry};
pub use value::Value;
pub use vessel::{ResizeListener, StoreAllValues, Vessel};

/// Type alias for a value over `f64`.
pub type Value64 = Value<f64>;
/// Type alias for a value buffer over `f64`.
pub type ValueBuffer64 = ValueBuffer<f64>;
/// Type alias for an accumulator over `f64`.
pub type Accumulator64 = Accumulator<f64>;
