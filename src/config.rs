//! Coder configuration.
//!
//! Both axes are fixed when a coder is constructed. Encoder and decoder must
//! agree on [`Narrowing`]; [`CarryPolicy`] only affects the encoder.

/// How the interval is narrowed for the last symbol of the alphabet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Narrowing {
    /// The top symbol takes the rounding slack (`range -= r * cum_freq`).
    /// Decoded targets are clamped below the total.
    #[default]
    Exact,
    /// Always `range = r * freq`. One branch cheaper per symbol, loses the
    /// slack, and produces streams that differ from [`Narrowing::Exact`].
    Fast,
}

/// What happens when the run of carry-pending bytes grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CarryPolicy {
    /// Fail with [`crate::Error::StreamTooLarge`] once more than `u32::MAX`
    /// bytes are pending.
    Strict,
    /// Count pending bytes in a `u64`. A single run would need 2^64
    /// consecutive ambiguous bytes to overflow.
    #[default]
    Tolerant,
}

/// Construction-time options for [`crate::RangeEncoder`] and
/// [`crate::RangeDecoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CoderConfig {
    /// Interval narrowing mode.
    pub narrowing: Narrowing,
    /// Carry-run overflow handling.
    pub carry_policy: CarryPolicy,
}

impl CoderConfig {
    /// Exact narrowing, tolerant carry counting.
    pub const EXACT: Self = Self {
        narrowing: Narrowing::Exact,
        carry_policy: CarryPolicy::Tolerant,
    };

    /// Fast narrowing, tolerant carry counting.
    pub const FAST: Self = Self {
        narrowing: Narrowing::Fast,
        carry_policy: CarryPolicy::Tolerant,
    };

    /// Replace the narrowing mode.
    pub const fn with_narrowing(mut self, narrowing: Narrowing) -> Self {
        self.narrowing = narrowing;
        self
    }

    /// Replace the carry policy.
    pub const fn with_carry_policy(mut self, carry_policy: CarryPolicy) -> Self {
        self.carry_policy = carry_policy;
        self
    }

    pub(crate) fn is_exact(&self) -> bool {
        self.narrowing == Narrowing::Exact
    }
}
