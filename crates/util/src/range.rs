//! Inclusive numeric bounds used by the typed cursor readers.

use std::fmt;
use std::ops::{RangeFrom, RangeFull, RangeInclusive, RangeToInclusive};

/// Numbers that carry their own representable bounds.
pub trait RangedNumber: Copy + PartialOrd + fmt::Display {
    const MIN_VALUE: Self;
    const MAX_VALUE: Self;
}

macro_rules! ranged_number {
    ($($ty:ty),*) => {
        $(
            impl RangedNumber for $ty {
                const MIN_VALUE: Self = <$ty>::MIN;
                const MAX_VALUE: Self = <$ty>::MAX;
            }
        )*
    };
}

ranged_number!(i8, i16, i32, i64, f32, f64);

/// An inclusive `[min, max]` interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumericRange<T> {
    min: T,
    max: T,
}

impl<T: RangedNumber> NumericRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// The full representable range of `T`.
    pub fn full() -> Self {
        Self {
            min: T::MIN_VALUE,
            max: T::MAX_VALUE,
        }
    }

    /// Bounded below only.
    pub fn at_least(min: T) -> Self {
        Self {
            min,
            max: T::MAX_VALUE,
        }
    }

    /// Bounded above only.
    pub fn at_most(max: T) -> Self {
        Self {
            min: T::MIN_VALUE,
            max,
        }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    /// Whether the range spans every representable value of `T`.
    pub fn is_full(&self) -> bool {
        self.min <= T::MIN_VALUE && self.max >= T::MAX_VALUE
    }
}

impl<T: RangedNumber> Default for NumericRange<T> {
    fn default() -> Self {
        Self::full()
    }
}

impl<T: RangedNumber> From<RangeInclusive<T>> for NumericRange<T> {
    fn from(range: RangeInclusive<T>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

impl<T: RangedNumber> From<RangeFrom<T>> for NumericRange<T> {
    fn from(range: RangeFrom<T>) -> Self {
        Self::at_least(range.start)
    }
}

impl<T: RangedNumber> From<RangeToInclusive<T>> for NumericRange<T> {
    fn from(range: RangeToInclusive<T>) -> Self {
        Self::at_most(range.end)
    }
}

impl<T: RangedNumber> From<RangeFull> for NumericRange<T> {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let range = NumericRange::new(0, 10);
        assert!(range.contains(0));
        assert!(range.contains(10));
        assert!(!range.contains(-1));
        assert!(!range.contains(11));
    }

    #[test]
    fn test_range_conversions() {
        assert_eq!(NumericRange::from(1..=5), NumericRange::new(1, 5));
        assert_eq!(NumericRange::from(1..), NumericRange::new(1, i32::MAX));
        assert_eq!(NumericRange::from(..=5), NumericRange::new(i32::MIN, 5));
        assert_eq!(NumericRange::<i32>::from(..), NumericRange::full());
    }

    #[test]
    fn test_is_full() {
        assert!(NumericRange::<i64>::full().is_full());
        assert!(!NumericRange::new(0i64, 10).is_full());
    }
}
