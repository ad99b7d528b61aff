use std::ops::{Add, Sub};

use jiff::Timestamp;
use num::Integer;
use serde::{Deserialize, Serialize};

pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i128 = 100;

/// A signed span of time counted in 100ns ticks.
///
/// Every duration and every position the schedule engine works with is a
/// `Ticks`. Timestamps are mapped onto ticks since the Unix epoch, rounding
/// towards negative infinity so that instants before 1970 stay ordered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticks(i64);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn from_seconds(seconds: i64) -> Self {
        Self(seconds * TICKS_PER_SECOND)
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes * 60)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn since_epoch(ts: Timestamp) -> Self {
        let ticks = Integer::div_floor(&ts.as_nanosecond(), &NANOS_PER_TICK);
        // jiff caps timestamps at year 9999, which is well inside i64 ticks
        Self(ticks as i64)
    }

    /// Like [`Ticks::since_epoch`] but rounds up to the next whole tick.
    pub fn since_epoch_ceil(ts: Timestamp) -> Self {
        let ticks = Integer::div_ceil(&ts.as_nanosecond(), &NANOS_PER_TICK);
        Self(ticks as i64)
    }

    pub fn between(from: Timestamp, to: Timestamp) -> Self {
        Self::since_epoch(to) - Self::since_epoch(from)
    }

    pub fn to_timestamp(self) -> Result<Timestamp, jiff::Error> {
        Timestamp::from_nanosecond(i128::from(self.0) * NANOS_PER_TICK)
    }

    /// Floor division by `base`, returning the quotient and a remainder in `[0, base)`.
    #[must_use]
    pub fn modulo(self, base: Ticks) -> (i64, Ticks) {
        let (quotient, remainder) = self.0.div_mod_floor(&base.0);
        (quotient, Ticks(remainder))
    }

    pub fn checked_add(self, other: Ticks) -> Option<Ticks> {
        self.0.checked_add(other.0).map(Ticks)
    }

    pub fn checked_sub(self, other: Ticks) -> Option<Ticks> {
        self.0.checked_sub(other.0).map(Ticks)
    }
}

impl Add for Ticks {
    type Output = Ticks;

    fn add(self, other: Ticks) -> Ticks {
        Ticks(self.0 + other.0)
    }
}

impl Sub for Ticks {
    type Output = Ticks;

    fn sub(self, other: Ticks) -> Ticks {
        Ticks(self.0 - other.0)
    }
}
