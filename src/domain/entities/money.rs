use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Minor units per major unit (kobo per naira, cents per dollar).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Monetary amount stored as an integer count of minor currency units.
///
/// JSON carries the major-unit decimal (`1000.5`), persistence and gateway
/// wire formats carry the integer (`100050`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor_units(minor: i64) -> Self {
        Amount(minor)
    }

    /// Converts a major-unit decimal, rounding to the nearest minor unit.
    /// Returns `None` for NaN, infinities and values outside the i64 range.
    pub fn from_major(major: f64) -> Option<Self> {
        if !major.is_finite() {
            return None;
        }
        let minor = (major * MINOR_UNITS_PER_MAJOR as f64).round();
        if minor < i64::MIN as f64 || minor > i64::MAX as f64 {
            return None;
        }
        Some(Amount(minor as i64))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn to_major(&self) -> f64 {
        self.0 as f64 / MINOR_UNITS_PER_MAJOR as f64
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per_major, abs % per_major)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let major = f64::deserialize(deserializer)?;
        Amount::from_major(major)
            .ok_or_else(|| serde::de::Error::custom("amount must be a finite number"))
    }
}
