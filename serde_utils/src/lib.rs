//! `serde` adapters for the Eth Beacon Node API.
//!
//! The API encodes integers as decimal strings and byte strings as `0x`-prefixed hex.
//! The same types are also cached with `bincode`, which is not self-describing.
//! Every adapter here switches on [`serde::Serializer::is_human_readable`] so that the
//! binary encoding stays compact and natively typed.

pub mod prefixed_hex_or_bytes_array;
pub mod prefixed_hex_or_bytes_vec;
pub mod string_or_native;
pub mod string_or_native_sequence;

mod shared;
