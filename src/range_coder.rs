//! Byte-oriented range coder.
//!
//! The coder keeps an interval `[low, low + range)` in 32-bit registers and
//! narrows it by `range / total` per symbol. Whenever `range` drops to
//! [`BOTTOM`] or below, one byte is shifted out (encoder) or in (decoder).
//!
//! The encoder holds back one byte (`buffer`) plus a run of pending filler
//! bytes so that a carry out of `low` can still be added to output that has
//! logically been committed. The run is flushed as `0xFF`s when it becomes
//! clear no carry will come, or as `0x00`s after `buffer + 1` when it does.
//!
//! # Stream layout
//!
//! ```text
//! header | payload ... | flush byte | count (3 bytes, big-endian)
//! ```
//!
//! The trailing count is the number of bytes written since
//! [`RangeEncoder::new`] (plus the caller's initial count). The decoder reads
//! it as the last low-order bits of the code value and consumes the whole
//! stream; [`crate::framing`] reads it back for block recovery.

use tracing::{debug, warn};

use crate::config::{CarryPolicy, CoderConfig};
use crate::error::{Error, Result};
use crate::io::{ByteSink, ByteSource};

/// Width of `low` and `range`.
pub const CODE_BITS: u32 = 32;

/// Initial range; bit 31 of `low` is the carry bit.
pub const TOP: u32 = 1 << (CODE_BITS - 1);

/// Shift that extracts the byte to emit from `low`.
pub const SHIFT_BITS: u32 = CODE_BITS - 9;

/// Precision bits seeded into the decoder from its first byte.
pub const EXTRA_BITS: u32 = (CODE_BITS - 2) % 8 + 1;

/// Renormalisation threshold.
pub const BOTTOM: u32 = TOP >> 8;

/// Largest accepted total frequency. Totals below `1 << 19` keep the
/// rounding loss negligible.
pub const MAX_TOTAL: u32 = BOTTOM - 1;

/// Largest accepted shift for the power-of-two variants.
pub const MAX_SHIFT: u32 = 22;

const STRICT_PENDING_LIMIT: u64 = u32::MAX as u64;

/// Mask for the 24 bits of the byte count that make it into the trailer.
const TRAILER_MASK: u32 = 0x00FF_FFFF;

#[inline]
fn check_triple(freq: u32, cum_freq: u32, total: u32) -> Result<()> {
    let fits = cum_freq.checked_add(freq).map_or(false, |end| end <= total);
    if freq == 0 || total == 0 || total > MAX_TOTAL || !fits {
        return Err(Error::InvalidFrequency {
            freq,
            cum_freq,
            total,
        });
    }
    Ok(())
}

#[inline]
fn check_shift(shift: u32) -> Result<()> {
    if shift > MAX_SHIFT {
        return Err(Error::InvalidShift(shift));
    }
    Ok(())
}

/// Range encoder writing into a [`ByteSink`].
#[derive(Debug)]
pub struct RangeEncoder<W: ByteSink> {
    sink: W,
    low: u32,
    range: u32,
    /// Filler bytes waiting for carry resolution.
    pending: u64,
    buffer: u8,
    byte_count: u32,
    config: CoderConfig,
}

impl<W: ByteSink> RangeEncoder<W> {
    /// Start encoding.
    ///
    /// `header` is the first byte of the stream; it doubles as the initial
    /// carry buffer. `initial_byte_count` is added to the trailing count, for
    /// callers that wrote framing bytes of their own before the coder.
    pub fn new(sink: W, header: u8, initial_byte_count: u32, config: CoderConfig) -> Self {
        Self {
            sink,
            low: 0,
            range: TOP,
            pending: 0,
            buffer: header,
            byte_count: initial_byte_count,
            config,
        }
    }

    /// Start encoding with the default configuration and no initial count.
    pub fn with_header(sink: W, header: u8) -> Self {
        Self::new(sink, header, 0, CoderConfig::default())
    }

    /// Configuration chosen at construction.
    pub fn config(&self) -> CoderConfig {
        self.config
    }

    /// Bytes shifted out so far, including the initial count.
    pub fn byte_count(&self) -> u32 {
        self.byte_count
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &W {
        &self.sink
    }

    fn defer_carry(&mut self) -> Result<()> {
        if self.config.carry_policy == CarryPolicy::Strict && self.pending >= STRICT_PENDING_LIMIT
        {
            warn!(pending = self.pending, "carry run exceeds strict limit");
            return Err(Error::StreamTooLarge);
        }
        self.pending += 1;
        Ok(())
    }

    /// Normalise before narrowing, so start and finish need no special case.
    fn normalize(&mut self) -> Result<()> {
        while self.range <= BOTTOM {
            if self.low < 0xFF << SHIFT_BITS {
                // no carry possible
                self.sink.put(self.buffer)?;
                self.sink.put_run(0xFF, self.pending)?;
                self.pending = 0;
                self.buffer = (self.low >> SHIFT_BITS) as u8;
            } else if self.low & TOP != 0 {
                // carry now, none later
                self.sink.put(self.buffer.wrapping_add(1))?;
                self.sink.put_run(0x00, self.pending)?;
                self.pending = 0;
                self.buffer = (self.low >> SHIFT_BITS) as u8;
            } else {
                self.defer_carry()?;
            }
            self.range <<= 8;
            self.low = (self.low << 8) & (TOP - 1);
            self.byte_count = self.byte_count.wrapping_add(1);
        }
        Ok(())
    }

    #[inline]
    fn narrow(&mut self, r: u32, freq: u32, cum_freq: u32, is_last: bool) {
        let offset = r * cum_freq;
        self.low += offset;
        if self.config.is_exact() && is_last {
            self.range -= offset;
        } else {
            self.range = r * freq;
        }
    }

    /// Encode a symbol occupying `[cum_freq, cum_freq + freq)` of `total`.
    ///
    /// # Errors
    /// Returns `Error::InvalidFrequency` unless `freq > 0`,
    /// `cum_freq + freq <= total` and `total <= MAX_TOTAL`.
    pub fn encode(&mut self, freq: u32, cum_freq: u32, total: u32) -> Result<()> {
        check_triple(freq, cum_freq, total)?;
        self.normalize()?;
        let r = self.range / total;
        self.narrow(r, freq, cum_freq, cum_freq + freq >= total);
        Ok(())
    }

    /// Encode against a total of `1 << shift`, replacing the division by a
    /// shift.
    pub fn encode_shift(&mut self, freq: u32, cum_freq: u32, shift: u32) -> Result<()> {
        check_shift(shift)?;
        let total = 1u32 << shift;
        check_triple(freq, cum_freq, total)?;
        self.normalize()?;
        let r = self.range >> shift;
        self.narrow(r, freq, cum_freq, (cum_freq + freq) >> shift != 0);
        Ok(())
    }

    /// Encode a byte without a model.
    pub fn encode_byte(&mut self, byte: u8) -> Result<()> {
        self.encode_shift(1, u32::from(byte), 8)
    }

    /// Encode a 16-bit value without a model.
    pub fn encode_short(&mut self, value: u16) -> Result<()> {
        self.encode_shift(1, u32::from(value), 16)
    }

    /// Flush the interval and the trailing byte count.
    ///
    /// Returns the total byte count (as written into the trailer, modulo
    /// 2^24 there) and the sink.
    pub fn finish(mut self) -> Result<(u32, W)> {
        self.normalize()?;
        self.byte_count = self.byte_count.wrapping_add(5);

        // The decoder reads the trailer as the low bits after the flush byte;
        // round so that value still lands inside the interval.
        let trailer_low = (self.byte_count & TRAILER_MASK) >> 1;
        let mut tail = self.low >> SHIFT_BITS;
        if self.low & (BOTTOM - 1) >= trailer_low {
            tail += 1;
        }

        if tail > 0xFF {
            self.sink.put(self.buffer.wrapping_add(1))?;
            self.sink.put_run(0x00, self.pending)?;
        } else {
            self.sink.put(self.buffer)?;
            self.sink.put_run(0xFF, self.pending)?;
        }
        self.pending = 0;
        self.sink.put(tail as u8)?;

        let [_, hi, mid, lo] = self.byte_count.to_be_bytes();
        self.sink.put(hi)?;
        self.sink.put(mid)?;
        self.sink.put(lo)?;

        debug!(bytes = self.byte_count, "range encoder finished");
        Ok((self.byte_count, self.sink))
    }
}

/// Outcome of [`RangeDecoder::start`].
#[derive(Debug)]
pub enum DecoderStart<R: ByteSource> {
    /// A stream is present.
    Ready {
        /// Header byte given to the encoder.
        header: u8,
        /// Decoder positioned after the header.
        decoder: RangeDecoder<R>,
    },
    /// The source was empty; it is handed back untouched.
    EndOfStream(R),
}

/// Range decoder reading from a [`ByteSource`].
#[derive(Debug)]
pub struct RangeDecoder<R: ByteSource> {
    source: R,
    low: u32,
    range: u32,
    buffer: u8,
    /// `range / total` from the last `decode_target`, 0 when none is pending.
    scale: u32,
    target_total: u32,
    config: CoderConfig,
}

impl<R: ByteSource> RangeDecoder<R> {
    /// Start decoding.
    ///
    /// Reads the header and the first code byte. An empty source is not an
    /// error: it yields [`DecoderStart::EndOfStream`].
    ///
    /// # Errors
    /// Returns `Error::UnexpectedEof` if the header is present but nothing
    /// follows it.
    pub fn start(mut source: R, config: CoderConfig) -> Result<DecoderStart<R>> {
        let header = match source.next_byte()? {
            Some(b) => b,
            None => return Ok(DecoderStart::EndOfStream(source)),
        };
        let buffer = source.next_byte()?.ok_or(Error::UnexpectedEof)?;
        let decoder = Self {
            source,
            low: u32::from(buffer) >> (8 - EXTRA_BITS),
            range: 1 << EXTRA_BITS,
            buffer,
            scale: 0,
            target_total: 0,
            config,
        };
        Ok(DecoderStart::Ready { header, decoder })
    }

    /// Configuration chosen at construction.
    pub fn config(&self) -> CoderConfig {
        self.config
    }

    fn normalize(&mut self) -> Result<()> {
        while self.range <= BOTTOM {
            self.low = (self.low << 8) | ((u32::from(self.buffer) << EXTRA_BITS) & 0xFF);
            self.buffer = self.source.next_byte()?.ok_or(Error::UnexpectedEof)?;
            self.low |= u32::from(self.buffer) >> (8 - EXTRA_BITS);
            self.range <<= 8;
        }
        Ok(())
    }

    /// Cumulative frequency of the next symbol, out of `total`.
    ///
    /// Does not consume the symbol; follow with [`Self::decode_commit`].
    /// Repeated calls return the same value.
    pub fn decode_target(&mut self, total: u32) -> Result<u32> {
        if total == 0 || total > MAX_TOTAL {
            return Err(Error::InvalidFrequency {
                freq: 0,
                cum_freq: 0,
                total,
            });
        }
        self.normalize()?;
        self.scale = self.range / total;
        self.target_total = total;
        let target = self.low / self.scale;
        if self.config.is_exact() {
            Ok(target.min(total - 1))
        } else {
            Ok(target)
        }
    }

    /// [`Self::decode_target`] for a total of `1 << shift`.
    pub fn decode_target_shift(&mut self, shift: u32) -> Result<u32> {
        check_shift(shift)?;
        self.normalize()?;
        self.scale = self.range >> shift;
        self.target_total = 1 << shift;
        let target = self.low / self.scale;
        if self.config.is_exact() && target >> shift != 0 {
            Ok((1 << shift) - 1)
        } else {
            Ok(target)
        }
    }

    fn take_scale(&mut self, total: u32) -> Result<u32> {
        if self.scale == 0 {
            return Err(Error::CommitWithoutTarget);
        }
        if total != self.target_total {
            return Err(Error::InvalidFrequency {
                freq: 0,
                cum_freq: 0,
                total,
            });
        }
        Ok(std::mem::replace(&mut self.scale, 0))
    }

    #[inline]
    fn narrow(&mut self, scale: u32, freq: u32, cum_freq: u32, is_last: bool) {
        let offset = scale * cum_freq;
        self.low = self.low.wrapping_sub(offset);
        if self.config.is_exact() && is_last {
            self.range -= offset;
        } else {
            self.range = scale * freq;
        }
    }

    /// Consume the symbol `[cum_freq, cum_freq + freq)` found for the last
    /// target.
    ///
    /// # Errors
    /// Returns `Error::CommitWithoutTarget` if no target is pending, and
    /// `Error::InvalidFrequency` for a bad triple or a `total` different from
    /// the one given to `decode_target`.
    pub fn decode_commit(&mut self, freq: u32, cum_freq: u32, total: u32) -> Result<()> {
        check_triple(freq, cum_freq, total)?;
        let scale = self.take_scale(total)?;
        self.narrow(scale, freq, cum_freq, cum_freq + freq >= total);
        Ok(())
    }

    /// [`Self::decode_commit`] for a total of `1 << shift`.
    pub fn decode_commit_shift(&mut self, freq: u32, cum_freq: u32, shift: u32) -> Result<()> {
        check_shift(shift)?;
        let total = 1u32 << shift;
        check_triple(freq, cum_freq, total)?;
        let scale = self.take_scale(total)?;
        self.narrow(scale, freq, cum_freq, (cum_freq + freq) >> shift != 0);
        Ok(())
    }

    /// Decode a byte written by [`RangeEncoder::encode_byte`].
    pub fn decode_byte(&mut self) -> Result<u8> {
        let value = self.decode_target_shift(8)?;
        self.decode_commit_shift(1, value, 8)?;
        Ok(value as u8)
    }

    /// Decode a value written by [`RangeEncoder::encode_short`].
    pub fn decode_short(&mut self) -> Result<u16> {
        let value = self.decode_target_shift(16)?;
        self.decode_commit_shift(1, value, 16)?;
        Ok(value as u16)
    }

    /// Consume the flush and trailer bytes and hand back the source,
    /// positioned at the next stream segment.
    pub fn finish(mut self) -> Result<R> {
        self.normalize()?;
        debug!("range decoder finished");
        Ok(self.source)
    }
}
