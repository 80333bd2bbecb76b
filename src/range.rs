//! `lastUpdated` search ranges.
//!
//! Each side of a [`DateRange`] is an independent [`Bound`]: inclusive,
//! exclusive, or absent. A missing lower bound extends to the beginning
//! of time and a missing upper bound to +infinity.
use crate::error::{FilterError, Result};
use std::ops::Bound;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub lower: Bound<SystemTime>,
    pub upper: Bound<SystemTime>,
}

impl DateRange {
    pub fn new(lower: Bound<SystemTime>, upper: Bound<SystemTime>) -> Self {
        Self { lower, upper }
    }

    /// Like [`DateRange::new`], but refuses ranges that contain no instant.
    pub fn try_new(
        lower: Bound<SystemTime>,
        upper: Bound<SystemTime>,
    ) -> Result<Self> {
        let range = Self::new(lower, upper);
        if range.is_empty() {
            return Err(FilterError::InvalidRange(format!(
                "{lower:?} .. {upper:?} contains no instant"
            )));
        }
        Ok(range)
    }

    pub fn unbounded() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// `[lower, upper]`
    pub fn closed(lower: SystemTime, upper: SystemTime) -> Self {
        Self::new(Bound::Included(lower), Bound::Included(upper))
    }

    /// `(lower, upper)`
    pub fn open(lower: SystemTime, upper: SystemTime) -> Self {
        Self::new(Bound::Excluded(lower), Bound::Excluded(upper))
    }

    /// `[lower, +inf)`
    pub fn since(lower: SystemTime) -> Self {
        Self::new(Bound::Included(lower), Bound::Unbounded)
    }

    /// `(-inf, upper]`
    pub fn until(upper: SystemTime) -> Self {
        Self::new(Bound::Unbounded, Bound::Included(upper))
    }

    pub fn lower_instant(&self) -> Option<SystemTime> {
        bound_instant(self.lower)
    }

    pub fn upper_instant(&self) -> Option<SystemTime> {
        bound_instant(self.upper)
    }

    /// True when no instant satisfies both bounds.
    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Bound::Included(l), Bound::Included(u)) => l > u,
            (Bound::Included(l), Bound::Excluded(u))
            | (Bound::Excluded(l), Bound::Included(u))
            | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
            _ => false,
        }
    }

    pub fn contains(&self, instant: SystemTime) -> bool {
        !self.starts_after(instant) && !self.ends_before(instant)
    }

    /// True when every instant of the range lies strictly after `instant`.
    pub fn starts_after(&self, instant: SystemTime) -> bool {
        match self.lower {
            Bound::Included(l) => l > instant,
            Bound::Excluded(l) => l >= instant,
            Bound::Unbounded => false,
        }
    }

    /// True when every instant of the range lies strictly before `instant`.
    pub fn ends_before(&self, instant: SystemTime) -> bool {
        match self.upper {
            Bound::Included(u) => u < instant,
            Bound::Excluded(u) => u <= instant,
            Bound::Unbounded => false,
        }
    }

    /// Whether the range shares at least one instant with the closed
    /// interval `[lower, upper]`.
    pub fn overlaps(&self, lower: SystemTime, upper: SystemTime) -> bool {
        lower <= upper
            && !self.is_empty()
            && !self.starts_after(upper)
            && !self.ends_before(lower)
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

fn bound_instant(bound: Bound<SystemTime>) -> Option<SystemTime> {
    match bound {
        Bound::Included(t) | Bound::Excluded(t) => Some(t),
        Bound::Unbounded => None,
    }
}
