use crate::{Error, Result};
use core::fmt;

/// The inclusive upper limit of a prime search.
///
/// A `Bound` can only be obtained through [`Bound::new`], which rejects values
/// outside `1..=max`. Holding one is proof that the value was validated
/// against the configured maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bound(u32);

impl Bound {
    /// Validates `value` against `1..=max`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBound`] if `value <= 0` or `value > max`.
    ///
    /// # Example
    ///
    /// ```
    /// use primegate::Bound;
    ///
    /// assert_eq!(Bound::new(10, 999_999).unwrap().get(), 10);
    /// assert!(Bound::new(0, 999_999).is_err());
    /// assert!(Bound::new(1_000_000, 999_999).is_err());
    /// ```
    pub fn new(value: i64, max: u32) -> Result<Self> {
        if value <= 0 || value > i64::from(max) {
            return Err(Error::InvalidBound { value, max });
        }
        Ok(Self(value as u32))
    }

    /// Returns the raw bound.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
