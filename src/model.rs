//! The seam between frequency models and the range coder.
//!
//! A model only ever hands the coder a `(freq, cum_freq, total)` triple.
//! Encoding is query, encode, update; decoding is target, resolve, commit,
//! update. Both sides must apply the same updates in the same order or the
//! streams desynchronize for good.

use crate::error::Result;
use crate::io::{ByteSink, ByteSource};
use crate::quasistatic::Side;
use crate::range_coder::{RangeDecoder, RangeEncoder};

/// A symbol's sub-interval of the model total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SymbolRange {
    /// Frequency of the symbol.
    pub freq: u32,
    /// Sum of the frequencies of all smaller symbols.
    pub cum_freq: u32,
}

/// A frequency model that adapts as symbols are coded.
pub trait AdaptiveModel {
    /// Alphabet size.
    fn symbol_count(&self) -> usize;

    /// Current total frequency.
    fn total(&self) -> u32;

    /// `Some(k)` when the total is always `1 << k`, letting the coder shift
    /// instead of divide.
    fn lg_total(&self) -> Option<u32> {
        None
    }

    /// Interval of `symbol`.
    fn query(&self, symbol: usize) -> Result<SymbolRange>;

    /// Symbol whose interval contains `target`.
    fn resolve(&self, target: u32) -> Result<usize>;

    /// Record one occurrence of `symbol`.
    fn update(&mut self, symbol: usize) -> Result<()>;
}

/// Encode `symbol` under `model`, then update the model.
pub fn encode_symbol<W, M>(
    encoder: &mut RangeEncoder<W>,
    model: &mut M,
    symbol: usize,
) -> Result<()>
where
    W: ByteSink,
    M: AdaptiveModel + ?Sized,
{
    let range = model.query(symbol)?;
    match model.lg_total() {
        Some(shift) => encoder.encode_shift(range.freq, range.cum_freq, shift)?,
        None => encoder.encode(range.freq, range.cum_freq, model.total())?,
    }
    model.update(symbol)
}

/// Decode one symbol under `model`, then update the model.
pub fn decode_symbol<R, M>(decoder: &mut RangeDecoder<R>, model: &mut M) -> Result<usize>
where
    R: ByteSource,
    M: AdaptiveModel + ?Sized,
{
    let symbol = match model.lg_total() {
        Some(shift) => {
            let target = decoder.decode_target_shift(shift)?;
            let symbol = model.resolve(target)?;
            let range = model.query(symbol)?;
            decoder.decode_commit_shift(range.freq, range.cum_freq, shift)?;
            symbol
        }
        None => {
            let total = model.total();
            let target = decoder.decode_target(total)?;
            let symbol = model.resolve(target)?;
            let range = model.query(symbol)?;
            decoder.decode_commit(range.freq, range.cum_freq, total)?;
            symbol
        }
    };
    model.update(symbol)?;
    Ok(symbol)
}

/// Direction a [`RunCoder`] was opened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Producing a stream.
    Compress,
    /// Consuming a stream.
    Decompress,
}

impl From<Mode> for Side {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Compress => Side::Compress,
            Mode::Decompress => Side::Decompress,
        }
    }
}

/// What a higher-level run-length model offers its caller.
///
/// Implementations own their models and one coder. They are opened for a
/// [`Mode`]; the operations of the other direction fail.
pub trait RunCoder {
    /// Code `run_length` repetitions of `symbol`.
    fn encode_run(&mut self, symbol: u8, run_length: u32) -> Result<()>;

    /// Next `(symbol, run_length)` pair.
    fn decode_run(&mut self) -> Result<(u8, u32)>;

    /// Close the stream. Returns the byte count when compressing and 0 when
    /// decompressing.
    fn finalize(&mut self) -> Result<u32>;
}
