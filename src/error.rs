//! Error types for range coding and frequency modelling.

use thiserror::Error;

/// Error variants for coder and model operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A `(freq, cum_freq, total)` triple that cannot describe a sub-interval.
    #[error("invalid frequency triple: freq={freq}, cum_freq={cum_freq}, total={total}")]
    InvalidFrequency {
        /// Frequency of the symbol.
        freq: u32,
        /// Cumulative frequency of all smaller symbols.
        cum_freq: u32,
        /// Total frequency.
        total: u32,
    },

    /// Shift amount outside the supported power-of-two totals.
    #[error("invalid shift: {0}")]
    InvalidShift(u32),

    /// Construction parameters rejected up front.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Symbol index not below the alphabet size.
    #[error("symbol {symbol} out of range for alphabet of {count}")]
    SymbolOutOfRange {
        /// Offending symbol.
        symbol: usize,
        /// Alphabet size.
        count: usize,
    },

    /// Cumulative target not below the model total.
    #[error("cumulative target {target} out of range for total {total}")]
    TargetOutOfRange {
        /// Offending target.
        target: u32,
        /// Model total.
        total: u32,
    },

    /// Operation requires an active symbol.
    #[error("symbol {0} is excluded")]
    SymbolExcluded(usize),

    /// Rescale did not reproduce the fixed total. The model is corrupt and
    /// must not be used again.
    #[error("rescale left {actual} where {expected} was expected")]
    RescaleInconsistency {
        /// Baseline of symbol 0.
        expected: u32,
        /// Cumulative value left after filling the table.
        actual: u32,
    },

    /// Too many carry-pending bytes under the strict carry policy.
    #[error("too many bytes outstanding: stream too large")]
    StreamTooLarge,

    /// The byte source ran dry in the middle of a stream.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// `decode_commit` called without a preceding `decode_target`.
    #[error("decode_commit without decode_target")]
    CommitWithoutTarget,

    /// The global encoder already has an open session.
    #[error("global coder is busy")]
    CoderBusy,

    /// The global encoder has no open session.
    #[error("global coder is idle")]
    CoderIdle,

    /// An I/O error occurred during encoding or decoding.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for coder and model operations.
pub type Result<T> = std::result::Result<T, Error>;
