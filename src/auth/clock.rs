//! Time and randomness sources used while signing

use chrono::{DateTime, Utc};
use rand::Rng;

/// Exclusive upper bound of the signature nonce `r`
pub const MAX_NONCE: u32 = 99999;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of the random nonce carried by resource signatures
pub trait NonceSource: Send + Sync {
    fn nonce(&self) -> u32;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at the given unix timestamp (seconds)
    pub fn at_unix(seconds: i64) -> Self {
        FixedClock(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Thread-local RNG nonce in `0..MAX_NONCE`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn nonce(&self) -> u32 {
        rand::thread_rng().gen_range(0..MAX_NONCE)
    }
}

/// Always yields the same nonce
#[derive(Debug, Clone, Copy)]
pub struct FixedNonce(pub u32);

impl NonceSource for FixedNonce {
    fn nonce(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_nonce_range() {
        let source = RandomNonce;
        for _ in 0..1000 {
            assert!(source.nonce() < MAX_NONCE);
        }
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::at_unix(1_700_000_000);
        assert_eq!(clock.now().timestamp(), 1_700_000_000);
        assert_eq!(clock.now(), clock.now());
    }
}
