//! High-throughput secp256k1 hash160 search engine.
//!
//! The public surface is organized bottom-up: raw integer and field
//! arithmetic, curve group law over a genuinely-computed generator table,
//! the hash160 pipeline, a bloom filter with a fixed probe schedule, an
//! 8-lane batched PRNG, a bounded work queue, and the search pipeline that
//! wires all of it into a worker pool.

pub mod bloom;
pub mod curve;
pub mod error;
pub mod field;
pub mod generator_table;
pub mod hash;
pub mod pipeline;
pub mod prng;
pub mod queue;
pub mod scalar;
pub mod u256;

pub use error::{Error, Result};
