//! Conversions between the wire, flat and dense forms of epoch duties.
//!
//! Dimensions of the dense form are inferred from the largest index observed at every level.
//! Input that leaves a hole inside those dimensions is rejected rather than padded.

pub use crate::{
    error::Error,
    flat::{dense_to_flat, flat_to_dense},
    wire::wire_to_dense,
};

mod error;
mod flat;
mod wire;
