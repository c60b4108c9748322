use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

/// Ticks per second; one tick is 100 nanoseconds.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

const NANOS_PER_TICK: i64 = 100;

/// A point in time encoded as signed 100 ns ticks since 0001-01-01T00:00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Tick zero: midnight, January 1st of year 1, UTC.
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        // Saturates only for dates ~29,000 years out.
        Self::from_datetime(Utc::now()).unwrap_or(Timestamp(i64::MAX))
    }

    /// Convert from a chrono timestamp, truncating below tick resolution.
    ///
    /// Returns `None` if the instant does not fit in 64 bits of ticks.
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        let since = dt.signed_duration_since(epoch());
        let secs = since.num_seconds();
        let sub_nanos = since.subsec_nanos() as i64;
        secs.checked_mul(TICKS_PER_SECOND)?
            .checked_add(sub_nanos / NANOS_PER_TICK)
            .map(Self)
    }

    /// Convert to a chrono timestamp, or `None` if outside chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = self.0.div_euclid(TICKS_PER_SECOND);
        let nanos = self.0.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
        let delta = TimeDelta::try_seconds(secs)? + TimeDelta::nanoseconds(nanos);
        epoch().checked_add_signed(delta)
    }
}

impl From<i64> for Timestamp {
    fn from(ticks: i64) -> Self {
        Self(ticks)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{} ticks", self.0),
        }
    }
}

fn epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
