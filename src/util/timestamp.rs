//! Timestamp handling for packets and frames

use std::fmt;

/// A presentation or decoding timestamp in stream time-base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub value: i64,
}

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Timestamp { value }
    }

    /// No timestamp / unknown timestamp
    pub fn none() -> Self {
        Timestamp { value: i64::MIN }
    }

    pub fn is_valid(&self) -> bool {
        self.value != i64::MIN
    }

    /// Advance by a number of ticks; unknown stays unknown
    pub fn offset(&self, ticks: i64) -> Self {
        if !self.is_valid() {
            return *self;
        }
        Timestamp {
            value: self.value.saturating_add(ticks),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::none()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "NOPTS")
        }
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Timestamp::new(value)
    }
}
