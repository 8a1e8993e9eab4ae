//! Opt-in process-wide encoder.
//!
//! For callers that cannot thread an encoder through their code. There is
//! exactly one session slot per process: a second [`GlobalEncoder::start`]
//! before [`GlobalEncoder::finish`] fails with `Error::CoderBusy`. Prefer an
//! owned [`RangeEncoder`] everywhere else.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::config::CoderConfig;
use crate::error::{Error, Result};
use crate::model::{self, AdaptiveModel};
use crate::range_coder::RangeEncoder;

static INSTANCE: OnceLock<GlobalEncoder> = OnceLock::new();

/// The single shared encoder, writing into a `Vec<u8>`.
#[derive(Debug, Default)]
pub struct GlobalEncoder {
    session: Mutex<Option<RangeEncoder<Vec<u8>>>>,
}

impl GlobalEncoder {
    /// The process-wide instance, created idle on first use.
    pub fn instance() -> &'static GlobalEncoder {
        INSTANCE.get_or_init(GlobalEncoder::default)
    }

    fn lock(&self) -> MutexGuard<'_, Option<RangeEncoder<Vec<u8>>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a session.
    pub fn start(&self, header: u8, initial_byte_count: u32, config: CoderConfig) -> Result<()> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(Error::CoderBusy);
        }
        *slot = Some(RangeEncoder::new(Vec::new(), header, initial_byte_count, config));
        Ok(())
    }

    /// Whether a session is open.
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `f` against the open encoder.
    pub fn with<T>(&self, f: impl FnOnce(&mut RangeEncoder<Vec<u8>>) -> Result<T>) -> Result<T> {
        let mut slot = self.lock();
        let encoder = slot.as_mut().ok_or(Error::CoderIdle)?;
        f(encoder)
    }

    /// [`RangeEncoder::encode`] on the open session.
    pub fn encode(&self, freq: u32, cum_freq: u32, total: u32) -> Result<()> {
        self.with(|e| e.encode(freq, cum_freq, total))
    }

    /// [`RangeEncoder::encode_shift`] on the open session.
    pub fn encode_shift(&self, freq: u32, cum_freq: u32, shift: u32) -> Result<()> {
        self.with(|e| e.encode_shift(freq, cum_freq, shift))
    }

    /// [`model::encode_symbol`] on the open session.
    pub fn encode_symbol<M>(&self, model: &mut M, symbol: usize) -> Result<()>
    where
        M: AdaptiveModel + ?Sized,
    {
        self.with(|e| model::encode_symbol(e, model, symbol))
    }

    /// Close the session, returning the byte count and the stream.
    pub fn finish(&self) -> Result<(u32, Vec<u8>)> {
        let encoder = self.lock().take().ok_or(Error::CoderIdle)?;
        encoder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceSource;
    use crate::range_coder::{DecoderStart, RangeDecoder};

    // One test drives the whole lifecycle; the instance is shared by every
    // test thread in this binary.
    #[test]
    fn test_global_lifecycle() {
        let global = GlobalEncoder::instance();
        assert!(std::ptr::eq(global, GlobalEncoder::instance()));
        assert!(!global.is_active());
        assert!(matches!(global.encode(1, 0, 2), Err(Error::CoderIdle)));
        assert!(matches!(global.finish(), Err(Error::CoderIdle)));

        global.start(0x5A, 0, CoderConfig::default()).unwrap();
        assert!(matches!(
            global.start(0, 0, CoderConfig::default()),
            Err(Error::CoderBusy)
        ));
        global.encode(1, 2, 5).unwrap();
        global.encode_shift(3, 4, 4).unwrap();
        let (count, bytes) = global.finish().unwrap();
        assert_eq!(count as usize, bytes.len());
        assert!(!global.is_active());

        let mut src = SliceSource::new(&bytes);
        let DecoderStart::Ready {
            header,
            mut decoder,
        } = RangeDecoder::start(&mut src, CoderConfig::default()).unwrap()
        else {
            panic!("stream should not be empty");
        };
        assert_eq!(header, 0x5A);
        assert_eq!(decoder.decode_target(5).unwrap(), 2);
        decoder.decode_commit(1, 2, 5).unwrap();
        let t = decoder.decode_target_shift(4).unwrap();
        assert!((4..7).contains(&t));
        decoder.decode_commit_shift(3, 4, 4).unwrap();
        decoder.finish().unwrap();
        assert!(src.remaining().is_empty());

        // a fresh session may follow
        global.start(0, 0, CoderConfig::FAST).unwrap();
        global.finish().unwrap();
    }
}
