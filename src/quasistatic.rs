//! Quasistatic frequency model with a power-of-two total.
//!
//! Observations accumulate in a shadow buffer (`pending`) and only reach the
//! served cumulative table (`cum`) at rescale boundaries, so `update` is O(1)
//! and `query` is a subtraction. The rescale interval starts short and doubles
//! up to a target, which makes a fresh model adapt quickly before settling.
//!
//! After each rescale the pending counts restart from half their old values
//! (never below 1). The frequency still missing from the fixed total is
//! handed out over the next interval: `increment` per update, plus one extra
//! for the last `remainder` updates. A full interval therefore brings the
//! pending sum back to exactly the total, which is what the next rescale
//! checks.
//!
//! The decompression side keeps a 129-bucket index from `target >> shift` to
//! the lowest symbol in that bucket, so `resolve` binary-searches only a
//! handful of entries.

use tracing::trace;

use crate::error::{Error, Result};
use crate::model::{AdaptiveModel, SymbolRange};
use crate::range_coder::MAX_SHIFT;

/// log2 of the number of search buckets.
const INDEX_BITS: u32 = 7;

/// Which end of the stream a model serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Encoding only queries by symbol; no search index.
    Compress,
    /// Decoding resolves targets; the search index is kept.
    Decompress,
}

/// Quasistatic model over symbols `0..n` with total `1 << lg_total`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuasistaticModel {
    /// `cum[0] = 0`, `cum[n] = total`; non-decreasing in between.
    cum: Vec<u32>,
    pending: Vec<u32>,
    /// Updates before the next rescale.
    left: u32,
    /// Updates that still get `increment + 1` after `left` runs out.
    remainder: u32,
    increment: u32,
    interval: u32,
    target_interval: u32,
    lg_total: u32,
    search_shift: u32,
    search: Option<Vec<usize>>,
    /// Set once a rescale fails its consistency check.
    fault: Option<(u32, u32)>,
}

impl QuasistaticModel {
    /// Create a model and run the first rescale.
    ///
    /// `init`, if given, must hold `n` non-zero counts summing to
    /// `1 << lg_total`; otherwise the total is split evenly.
    ///
    /// # Errors
    /// Returns `Error::InvalidParameter` unless `n >= 1`,
    /// `1 <= lg_total <= 22`, `2 * n <= 1 << lg_total` and
    /// `target_interval >= 1`.
    pub fn new(
        n: usize,
        lg_total: u32,
        target_interval: u32,
        init: Option<&[u32]>,
        side: Side,
    ) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidParameter("alphabet must not be empty"));
        }
        if lg_total == 0 || lg_total > MAX_SHIFT {
            return Err(Error::InvalidParameter("lg_total must be in 1..=22"));
        }
        let total = 1u32 << lg_total;
        if n > (total / 2) as usize {
            return Err(Error::InvalidParameter(
                "total must be at least twice the alphabet",
            ));
        }
        if target_interval == 0 {
            return Err(Error::InvalidParameter("rescale interval must be positive"));
        }

        let mut cum = vec![0; n + 1];
        cum[n] = total;
        let search = match side {
            Side::Compress => None,
            Side::Decompress => Some(vec![n - 1; (1 << INDEX_BITS) + 1]),
        };
        let mut model = Self {
            cum,
            pending: vec![0; n],
            left: 0,
            remainder: 0,
            increment: 0,
            interval: 0,
            target_interval,
            lg_total,
            search_shift: lg_total.saturating_sub(INDEX_BITS),
            search,
            fault: None,
        };
        model.reset(init)?;
        Ok(model)
    }

    /// Restart adaptation from `init` (or an even split), keeping the
    /// alphabet, total and side.
    pub fn reset(&mut self, init: Option<&[u32]>) -> Result<()> {
        let n = self.pending.len();
        let total = self.total();
        match init {
            None => {
                let base = total / n as u32;
                let extra = (total % n as u32) as usize;
                for (i, slot) in self.pending.iter_mut().enumerate() {
                    *slot = if i < extra { base + 1 } else { base };
                }
            }
            Some(init) => {
                if init.len() != n {
                    return Err(Error::InvalidParameter(
                        "initial counts must cover the alphabet",
                    ));
                }
                if init.contains(&0) {
                    return Err(Error::InvalidParameter("initial counts must be non-zero"));
                }
                if init.iter().map(|&c| u64::from(c)).sum::<u64>() != u64::from(total) {
                    return Err(Error::InvalidParameter(
                        "initial counts must sum to the total",
                    ));
                }
                self.pending.copy_from_slice(init);
            }
        }
        self.interval = (n as u32 >> 4) | 2;
        self.remainder = 0;
        self.fault = None;
        self.rescale()
    }

    /// Publish the pending counts, or start the remainder run if one is due.
    ///
    /// Called automatically by [`Self::update`]; the pending counts only sum
    /// to the total at the end of an interval.
    ///
    /// # Errors
    /// Returns `Error::RescaleInconsistency` if the counts do not add up. The
    /// model is unusable afterwards and keeps returning the same error until
    /// [`Self::reset`].
    pub fn rescale(&mut self) -> Result<()> {
        self.check_fault()?;
        if self.remainder > 0 {
            self.increment += 1;
            self.left = self.remainder;
            self.remainder = 0;
            return Ok(());
        }
        if self.interval < self.target_interval {
            self.interval = (self.interval << 1).min(self.target_interval);
        }

        let n = self.pending.len();
        let mut cf = self.total();
        let mut missing = cf;
        for i in (1..n).rev() {
            cf = cf.wrapping_sub(self.pending[i]);
            self.cum[i] = cf;
            self.pending[i] = self.pending[i] >> 1 | 1;
            missing = missing.wrapping_sub(self.pending[i]);
        }
        if cf != self.pending[0] {
            self.fault = Some((self.pending[0], cf));
            return self.check_fault();
        }
        self.pending[0] = self.pending[0] >> 1 | 1;
        missing -= self.pending[0];

        self.increment = missing / self.interval;
        self.remainder = missing % self.interval;
        self.left = self.interval - self.remainder;
        self.rebuild_index();
        trace!(
            interval = self.interval,
            increment = self.increment,
            remainder = self.remainder,
            "quasistatic rescale"
        );
        Ok(())
    }

    fn check_fault(&self) -> Result<()> {
        match self.fault {
            Some((expected, actual)) => Err(Error::RescaleInconsistency { expected, actual }),
            None => Ok(()),
        }
    }

    fn rebuild_index(&mut self) {
        let shift = self.search_shift;
        let Some(search) = self.search.as_mut() else {
            return;
        };
        for i in (1..self.cum.len()).rev() {
            let end = ((self.cum[i] - 1) >> shift) as usize;
            let start = (self.cum[i - 1] >> shift) as usize;
            for bucket in &mut search[start..=end] {
                *bucket = i - 1;
            }
        }
    }

    /// Count one occurrence of `symbol`, rescaling first if the interval is
    /// used up.
    pub fn update(&mut self, symbol: usize) -> Result<()> {
        self.check_symbol(symbol)?;
        self.check_fault()?;
        if self.left == 0 {
            self.rescale()?;
        }
        self.left -= 1;
        self.pending[symbol] += self.increment;
        Ok(())
    }

    #[inline]
    fn check_symbol(&self, symbol: usize) -> Result<()> {
        if symbol >= self.pending.len() {
            return Err(Error::SymbolOutOfRange {
                symbol,
                count: self.pending.len(),
            });
        }
        Ok(())
    }

    /// Frequency of `symbol` and of all symbols below it.
    #[inline]
    pub fn query(&self, symbol: usize) -> Result<SymbolRange> {
        self.check_symbol(symbol)?;
        let cum_freq = self.cum[symbol];
        Ok(SymbolRange {
            freq: self.cum[symbol + 1] - cum_freq,
            cum_freq,
        })
    }

    /// Symbol whose interval contains `target`.
    ///
    /// Without a search index (compression side) this falls back to a binary
    /// search over the whole table.
    pub fn resolve(&self, target: u32) -> Result<usize> {
        let total = self.total();
        if target >= total {
            return Err(Error::TargetOutOfRange { target, total });
        }
        let (mut lo, mut hi) = match &self.search {
            Some(search) => {
                let bucket = (target >> self.search_shift) as usize;
                (search[bucket], search[bucket + 1] + 1)
            }
            None => (0, self.pending.len()),
        };
        while lo + 1 < hi {
            let mid = (lo + hi) >> 1;
            if target < self.cum[mid] {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        Ok(lo)
    }

    /// Fixed total frequency.
    #[inline]
    pub fn total(&self) -> u32 {
        1 << self.lg_total
    }

    /// log2 of the total.
    pub fn lg_total(&self) -> u32 {
        self.lg_total
    }

    /// Alphabet size.
    pub fn symbol_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether this model carries the search index.
    pub fn side(&self) -> Side {
        if self.search.is_some() {
            Side::Decompress
        } else {
            Side::Compress
        }
    }
}

impl AdaptiveModel for QuasistaticModel {
    fn symbol_count(&self) -> usize {
        self.pending.len()
    }

    fn total(&self) -> u32 {
        QuasistaticModel::total(self)
    }

    fn lg_total(&self) -> Option<u32> {
        Some(self.lg_total)
    }

    fn query(&self, symbol: usize) -> Result<SymbolRange> {
        QuasistaticModel::query(self, symbol)
    }

    fn resolve(&self, target: u32) -> Result<usize> {
        QuasistaticModel::resolve(self, target)
    }

    fn update(&mut self, symbol: usize) -> Result<()> {
        QuasistaticModel::update(self, symbol)
    }
}
