//! # Range Coding with Adaptive Frequency Models
//!
//! *Arithmetic-coding compression at byte-at-a-time speed.*
//!
//! ## Intuition First
//!
//! Think of the message as a single number between 0 and 1. Each symbol picks
//! a slice of the current interval sized by its probability: likely symbols
//! take wide slices and cost few digits, rare ones take narrow slices and cost
//! many. A range coder does this in fixed-width integers and writes out the
//! leading byte as soon as it can no longer change.
//!
//! ## The Problem
//!
//! The coder only turns probabilities into bytes. Someone still has to supply
//! the probabilities, and for adaptive compression they change after every
//! symbol:
//! - **Fenwick tables** keep exact counts with O(log n) update and lookup.
//! - **Quasistatic models** batch updates and republish a power-of-two table
//!   now and then, making update O(1) and lookup nearly so.
//!
//! ## Historical Context
//!
//! ```text
//! 1976  Rissanen    Arithmetic coding
//! 1979  Martin      Range encoding: byte-oriented arithmetic coding
//! 1994  Fenwick     Binary indexed trees for cumulative frequencies
//! 1998  Schindler   Carry-less renormalisation with a held-back byte
//! ```
//!
//! ## Mathematical Formulation
//!
//! With interval `[low, low + range)` and a symbol occupying
//! `[cum, cum + freq)` of `total`:
//!
//! ```text
//! r     = range / total
//! low'  = low + r * cum
//! range'= r * freq
//! ```
//!
//! Whenever `range <= 2^23` the top byte of `low` is shifted out. The
//! truncation in `r` costs at most `total / range` of the code space, which
//! is why totals stay below `2^23`.
//!
//! ## Complexity Analysis
//!
//! - **Coder**: O(1) per symbol, at most a few bytes of state.
//! - **Fenwick table**: O(log n) query, resolve and update; O(n) rescale.
//! - **Quasistatic model**: O(1) query and update; O(n) rescale.
//!
//! ## Failure Modes
//!
//! 1. **Desynchronisation**: encoder and decoder must apply identical model
//!    updates in identical order. Any divergence corrupts the rest of the
//!    stream.
//! 2. **Carry runs**: a long run of ambiguous bytes is counted, not stored.
//!    [`CarryPolicy::Strict`] bounds it, [`CarryPolicy::Tolerant`] does not.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - [`RangeEncoder`] / [`RangeDecoder`] over pluggable byte sinks and sources.
//! - [`FrequencyTable`], generic over counter width and symbol exclusion.
//! - [`QuasistaticModel`] with a bucketed search index for decoding.
//! - [`framing`] helpers that recover block starts from the trailing count.
//!
//! ## References
//!
//! - Martin, G. N. N. (1979). "Range encoding: an algorithm for removing redundancy from a digitised message."
//! - Fenwick, P. (1994). "A New Data Structure for Cumulative Frequency Tables."
//! - Schindler, M. (1998). "A Fast Renormalisation for Arithmetic Coding."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod fenwick;
pub mod framing;
pub mod global;
pub mod io;
pub mod model;
pub mod quasistatic;
pub mod range_coder;

pub use config::{CarryPolicy, CoderConfig, Narrowing};
pub use error::{Error, Result};
pub use fenwick::{
    Counter, Exclusion, ExclusionTable, Excluding, FrequencyTable, NonExcluding, WideTable,
};
pub use global::GlobalEncoder;
pub use io::{ByteSink, ByteSource, ReadSource, SliceSource, WriteSink};
pub use model::{decode_symbol, encode_symbol, AdaptiveModel, Mode, RunCoder, SymbolRange};
pub use quasistatic::{QuasistaticModel, Side};
pub use range_coder::{DecoderStart, RangeDecoder, RangeEncoder};
