//! Time types for sampled scene data.
//!
//! Nodes track the authored time range of their prim and the previously
//! sampled time. "Invalid" is an explicit sentinel: a node with no
//! time-varying authored data has an invalid range.

/// Scene time in seconds.
pub type Time = f64;

/// Sentinel for "no time" / "no authored samples".
pub const INVALID_TIME: Time = f64::NAN;

/// Check whether a time value is valid (not the sentinel).
#[inline]
pub fn is_valid_time(t: Time) -> bool {
    !t.is_nan()
}

/// Authored time range of a prim, synchronized from the store's sample times.
#[derive(Clone, Copy, Debug)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
}

impl TimeRange {
    /// Invalid range (no authored samples).
    pub const INVALID: Self = Self {
        start: INVALID_TIME,
        end: INVALID_TIME,
    };

    /// Both endpoints valid and ordered.
    #[inline]
    pub fn is_valid(&self) -> bool {
        is_valid_time(self.start) && is_valid_time(self.end) && self.start <= self.end
    }

    /// True if `t` falls inside the range. Invalid ranges contain nothing.
    pub fn contains(&self, t: Time) -> bool {
        self.is_valid() && t >= self.start && t <= self.end
    }

    /// Derive a range from authored sample times. Empty input gives the
    /// invalid range.
    pub fn from_samples(times: &[Time]) -> Self {
        let mut start = INVALID_TIME;
        let mut end = INVALID_TIME;
        for &t in times {
            if !is_valid_time(start) || t < start {
                start = t;
            }
            if !is_valid_time(end) || t > end {
                end = t;
            }
        }
        Self { start, end }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::INVALID
    }
}

/// True when advancing from `prev` to `t` crosses an authored sample.
///
/// An invalid `prev` means no sample has been pulled yet, so any authored
/// data counts as a crossing. The interval test is symmetric so reverse
/// playback also detects crossings; hold/extrapolation outside the range
/// is the store's concern.
pub fn samples_crossed(times: &[Time], prev: Time, t: Time) -> bool {
    if times.is_empty() {
        return false;
    }
    if !is_valid_time(prev) {
        return true;
    }
    if prev == t {
        return false;
    }
    let (lo, hi) = if prev < t { (prev, t) } else { (t, prev) };
    times.iter().any(|&s| s > lo && s <= hi)
}
