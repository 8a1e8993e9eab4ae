//! Bit-indexed (Fenwick) cumulative frequency tables.
//!
//! Per-symbol counts live in `counts`; `tree[j]` (1-based) holds the sum of
//! counts over `(j - lowbit(j), j]`. Prefix sums, symbol lookup and point
//! updates are O(log n). Rescaling halves every count and rebuilds the tree
//! in one O(n) pass instead of repairing it node by node, which is simpler
//! and no slower in the worst case.
//!
//! The table is generic over the counter width ([`Counter`]: `u16` or `u32`)
//! and over whether symbols can be excluded ([`Exclusion`]). With
//! [`Excluding`] the top bit of each stored count marks an excluded symbol:
//! it keeps its count but contributes nothing to the tree or the total until
//! it is reactivated.
//!
//! # Complexity
//!
//! | Operation | Time |
//! |-----------|------|
//! | `query` / `resolve` / `update` | O(log n) |
//! | `rescale` / `reset` | O(n) |
//!
//! Reference: P. Fenwick, "A New Data Structure for Cumulative Probability
//! Tables", Tech. Report 88, University of Auckland (1993).

use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

use crate::error::{Error, Result};
use crate::model::{AdaptiveModel, SymbolRange};

mod sealed {
    pub trait Sealed {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for super::Excluding {}
    impl Sealed for super::NonExcluding {}
}

/// Storage width of counts and tree nodes.
pub trait Counter: Copy + Default + Eq + fmt::Debug + sealed::Sealed {
    /// Width in bits.
    const BITS: u32;

    /// Truncating conversion; callers keep values in range.
    fn from_u32(value: u32) -> Self;

    /// Widening conversion.
    fn to_u32(self) -> u32;
}

impl Counter for u16 {
    const BITS: u32 = 16;

    #[inline]
    fn from_u32(value: u32) -> Self {
        value as u16
    }

    #[inline]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Counter for u32 {
    const BITS: u32 = 32;

    #[inline]
    fn from_u32(value: u32) -> Self {
        value
    }

    #[inline]
    fn to_u32(self) -> u32 {
        self
    }
}

/// Whether a table can exclude symbols.
pub trait Exclusion: Copy + Default + fmt::Debug + sealed::Sealed {
    /// Reserve the counter's top bit as the excluded flag.
    const ENABLED: bool;
}

/// Symbols can be excluded and reactivated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Excluding;

/// Every symbol is always active; the full counter width holds counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NonExcluding;

impl Exclusion for Excluding {
    const ENABLED: bool = true;
}

impl Exclusion for NonExcluding {
    const ENABLED: bool = false;
}

/// Narrow counters with exclusion, as used for move-to-front suppression.
pub type ExclusionTable = FrequencyTable<u16, Excluding>;

/// Wide counters without exclusion.
pub type WideTable = FrequencyTable<u32, NonExcluding>;

/// Adaptive frequency table over symbols `0..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyTable<C: Counter = u32, E: Exclusion = NonExcluding> {
    /// Raw counts; top bit is the excluded flag when `E::ENABLED`.
    counts: Vec<C>,
    /// 1-based Fenwick nodes; `tree[0]` is unused.
    tree: Vec<C>,
    total: u32,
    max_total: u32,
    increment: u32,
    /// Highest power of two <= n, where `resolve` starts descending.
    mask: usize,
    _exclusion: PhantomData<E>,
}

impl<C: Counter, E: Exclusion> FrequencyTable<C, E> {
    /// Largest count a slot can hold.
    fn limit() -> u32 {
        let all = u32::MAX >> (32 - C::BITS);
        if E::ENABLED {
            all >> 1
        } else {
            all
        }
    }

    /// Excluded flag, 0 when exclusion is disabled.
    fn flag() -> u32 {
        if E::ENABLED {
            Self::limit() + 1
        } else {
            0
        }
    }

    #[inline]
    fn raw(&self, symbol: usize) -> u32 {
        self.counts[symbol].to_u32()
    }

    #[inline]
    fn flagged(raw: u32) -> bool {
        raw & Self::flag() != 0
    }

    /// Table with every count set to 1.
    ///
    /// `max_total` is raised to at least `2 * n`. Updates add
    /// `max_total / 2 / rescale_interval` (at least 1), so roughly
    /// `rescale_interval` updates fit between rescales.
    pub fn new(n: usize, max_total: u32, rescale_interval: u32) -> Result<Self> {
        Self::with_counts(n, max_total, rescale_interval, None)
    }

    /// Table with every count set to `value`.
    pub fn uniform(n: usize, value: u32, max_total: u32, rescale_interval: u32) -> Result<Self> {
        let counts = vec![value; n];
        Self::with_counts(n, max_total, rescale_interval, Some(&counts))
    }

    /// Table seeded from `counts` (all ones when `None`).
    ///
    /// # Errors
    /// Returns `Error::InvalidParameter` for an empty alphabet, a zero
    /// interval, a `max_total` the counter width cannot hold, or counts of
    /// the wrong length or width.
    pub fn with_counts(
        n: usize,
        max_total: u32,
        rescale_interval: u32,
        counts: Option<&[u32]>,
    ) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidParameter("alphabet must not be empty"));
        }
        if rescale_interval == 0 {
            return Err(Error::InvalidParameter("rescale interval must be positive"));
        }
        let n32 = u32::try_from(n)
            .ok()
            .filter(|&v| v <= Self::limit() / 2)
            .ok_or(Error::InvalidParameter("alphabet too large for counter width"))?;
        let max_total = max_total.max(n32 << 1);
        let increment = (max_total / 2 / rescale_interval).max(1);
        if max_total
            .checked_add(increment)
            .map_or(true, |v| v > Self::limit())
        {
            return Err(Error::InvalidParameter(
                "maximum total does not fit counter width",
            ));
        }

        let mut mask = 1usize;
        let mut m = n;
        while m > 1 {
            m >>= 1;
            mask <<= 1;
        }

        let mut table = Self {
            counts: vec![C::default(); n],
            tree: vec![C::default(); n + 1],
            total: 0,
            max_total,
            increment,
            mask,
            _exclusion: PhantomData,
        };
        table.reset(counts)?;
        Ok(table)
    }

    /// Re-seed counts without reallocating. Exclusions are cleared.
    ///
    /// Counts summing above the maximum are halved until they fit.
    pub fn reset(&mut self, counts: Option<&[u32]>) -> Result<()> {
        match counts {
            None => self.counts.fill(C::from_u32(1)),
            Some(init) => {
                if init.len() != self.counts.len() {
                    return Err(Error::InvalidParameter(
                        "initial counts must cover the alphabet",
                    ));
                }
                if init.iter().any(|&c| c > Self::limit()) {
                    return Err(Error::InvalidParameter(
                        "initial count does not fit counter width",
                    ));
                }
                let mut scaled = init.to_vec();
                while scaled.iter().map(|&c| u64::from(c)).sum::<u64>() > u64::from(self.max_total)
                {
                    for c in &mut scaled {
                        *c = *c / 2 + (*c & 1);
                    }
                }
                for (slot, &c) in self.counts.iter_mut().zip(&scaled) {
                    *slot = C::from_u32(c);
                }
            }
        }
        self.build();
        Ok(())
    }

    /// Rebuild every tree node from the counts, stride by stride.
    fn build(&mut self) {
        let n = self.counts.len();
        let mut total = 0u64;
        let mut stride = 1;
        while stride <= n {
            let mut j = stride;
            while j <= n {
                let raw = self.raw(j - 1);
                let mut node = if Self::flagged(raw) {
                    0
                } else {
                    total += u64::from(raw);
                    raw
                };
                let mut k = stride >> 1;
                while k > 0 {
                    node = node.wrapping_add(self.tree[j - k].to_u32());
                    k >>= 1;
                }
                self.tree[j] = C::from_u32(node);
                j += stride << 1;
            }
            stride <<= 1;
        }
        self.total = u32::try_from(total).unwrap_or(u32::MAX);
    }

    /// Halve every count (rounding up, so nothing nonzero reaches zero) and
    /// rebuild. Repeats while the total still exceeds the maximum.
    pub fn rescale(&mut self) {
        let flag = Self::flag();
        loop {
            for slot in &mut self.counts {
                let raw = slot.to_u32();
                let count = raw & !flag;
                *slot = C::from_u32((count / 2 + (count & 1)) | (raw & flag));
            }
            self.build();
            if self.total <= self.max_total {
                break;
            }
        }
        trace!(
            total = self.total,
            max_total = self.max_total,
            "frequency table rescaled"
        );
    }

    /// Apply `delta` to the total and to every node covering `symbol`, or
    /// rescale if the total would pass the maximum. The count itself must
    /// already be updated.
    fn propagate(&mut self, symbol: usize, delta: i64) {
        let total = i64::from(self.total) + delta;
        debug_assert!(total >= 0, "total frequency went negative");
        if total > i64::from(self.max_total) {
            self.rescale();
            return;
        }
        self.total = total as u32;

        let step = delta as u32;
        let n = self.counts.len();
        let mut i = symbol + 1;
        while i <= n {
            self.tree[i] = C::from_u32(self.tree[i].to_u32().wrapping_add(step));
            i = (i | (i - 1)) + 1;
        }
    }

    #[inline]
    fn check_symbol(&self, symbol: usize) -> Result<()> {
        if symbol >= self.counts.len() {
            return Err(Error::SymbolOutOfRange {
                symbol,
                count: self.counts.len(),
            });
        }
        Ok(())
    }

    /// Frequency of `symbol` and of all symbols below it.
    ///
    /// Excluded symbols report a frequency of 0.
    pub fn query(&self, symbol: usize) -> Result<SymbolRange> {
        self.check_symbol(symbol)?;
        let raw = self.raw(symbol);
        let freq = if Self::flagged(raw) { 0 } else { raw };

        let mut i = symbol + 1;
        let mut sum = self.tree[i].to_u32();
        loop {
            i &= i - 1;
            if i == 0 {
                break;
            }
            sum += self.tree[i].to_u32();
        }
        Ok(SymbolRange {
            freq,
            cum_freq: sum - freq,
        })
    }

    /// Symbol whose interval contains `target`.
    pub fn resolve(&self, target: u32) -> Result<usize> {
        if target >= self.total {
            return Err(Error::TargetOutOfRange {
                target,
                total: self.total,
            });
        }
        let n = self.counts.len();
        let mut remaining = target;
        let mut symbol = 0;
        let mut bit = self.mask;
        while bit > 0 {
            let x = symbol | bit;
            if x <= n {
                let node = self.tree[x].to_u32();
                if remaining >= node {
                    remaining -= node;
                    symbol = x;
                }
            }
            bit >>= 1;
        }
        Ok(symbol)
    }

    /// Add the configured increment to `symbol`.
    pub fn update(&mut self, symbol: usize) -> Result<()> {
        self.update_by(symbol, self.increment)
    }

    /// Add `delta` to `symbol`.
    ///
    /// # Errors
    /// Returns `Error::SymbolExcluded` for an excluded symbol, and
    /// `Error::InvalidParameter` if `delta` exceeds the headroom between the
    /// maximum total and the counter width.
    pub fn update_by(&mut self, symbol: usize, delta: u32) -> Result<()> {
        self.check_symbol(symbol)?;
        if delta > Self::limit() - self.max_total {
            return Err(Error::InvalidParameter(
                "update delta exceeds counter headroom",
            ));
        }
        let raw = self.raw(symbol);
        if Self::flagged(raw) {
            return Err(Error::SymbolExcluded(symbol));
        }
        self.counts[symbol] = C::from_u32(raw + delta);
        self.propagate(symbol, i64::from(delta));
        Ok(())
    }

    /// Stored count of `symbol`, excluded or not.
    pub fn count(&self, symbol: usize) -> Result<u32> {
        self.check_symbol(symbol)?;
        Ok(self.raw(symbol) & !Self::flag())
    }

    /// Sum of all active counts.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Ceiling that triggers a rescale.
    pub fn max_total(&self) -> u32 {
        self.max_total
    }

    /// Amount added by [`Self::update`].
    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// Alphabet size.
    pub fn symbol_count(&self) -> usize {
        self.counts.len()
    }
}

impl<C: Counter> FrequencyTable<C, Excluding> {
    /// Whether `symbol` is currently excluded.
    pub fn is_excluded(&self, symbol: usize) -> Result<bool> {
        self.check_symbol(symbol)?;
        Ok(Self::flagged(self.raw(symbol)))
    }

    /// Count an occurrence of `symbol`, then exclude it.
    pub fn update_and_exclude(&mut self, symbol: usize) -> Result<()> {
        self.check_symbol(symbol)?;
        let raw = self.raw(symbol);
        if Self::flagged(raw) {
            return Err(Error::SymbolExcluded(symbol));
        }
        self.counts[symbol] = C::from_u32((raw + self.increment) | Self::flag());
        self.propagate(symbol, -i64::from(raw));
        Ok(())
    }

    /// Remove `symbol` from the distribution, keeping its count.
    pub fn deactivate(&mut self, symbol: usize) -> Result<()> {
        self.check_symbol(symbol)?;
        let raw = self.raw(symbol);
        if Self::flagged(raw) {
            return Ok(());
        }
        self.counts[symbol] = C::from_u32(raw | Self::flag());
        self.propagate(symbol, -i64::from(raw));
        Ok(())
    }

    /// Put an excluded `symbol` back with its stored count. May rescale.
    pub fn reactivate(&mut self, symbol: usize) -> Result<()> {
        self.check_symbol(symbol)?;
        let raw = self.raw(symbol);
        if !Self::flagged(raw) {
            return Ok(());
        }
        let count = raw & !Self::flag();
        self.counts[symbol] = C::from_u32(count);
        self.propagate(symbol, i64::from(count));
        Ok(())
    }
}

impl<C: Counter, E: Exclusion> AdaptiveModel for FrequencyTable<C, E> {
    fn symbol_count(&self) -> usize {
        self.counts.len()
    }

    fn total(&self) -> u32 {
        self.total
    }

    fn query(&self, symbol: usize) -> Result<SymbolRange> {
        FrequencyTable::query(self, symbol)
    }

    fn resolve(&self, target: u32) -> Result<usize> {
        FrequencyTable::resolve(self, target)
    }

    fn update(&mut self, symbol: usize) -> Result<()> {
        FrequencyTable::update(self, symbol)
    }
}
