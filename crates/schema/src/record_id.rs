//! Log ordering key
//!
//! The log assigns every record an id of the form `<millis>-<seq>`: the
//! append time in epoch milliseconds, then a counter that disambiguates
//! records appended within the same millisecond.

use std::fmt;
use std::str::FromStr;

use crate::codec::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RecordId {
    pub millis: u64,
    pub seq: u64,
}

impl RecordId {
    /// Sorts before every id the log can assign
    pub const ZERO: RecordId = RecordId { millis: 0, seq: 0 };

    pub const fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    /// Millisecond prefix as a signed epoch timestamp
    pub fn timestamp_millis(&self) -> i64 {
        i64::try_from(self.millis).unwrap_or(i64::MAX)
    }

    /// Next id the log would assign at `now_millis`, given `self` is the last one.
    ///
    /// Stays on the current millisecond (bumping `seq`) when the clock has
    /// not advanced or went backwards, so ids never decrease.
    pub fn successor_at(&self, now_millis: u64) -> RecordId {
        if now_millis > self.millis {
            RecordId::new(now_millis, 0)
        } else {
            RecordId::new(self.millis, self.seq + 1)
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for RecordId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecodeError::InvalidRecordId(s.to_string());
        match s.split_once('-') {
            Some((millis, seq)) => Ok(RecordId {
                millis: millis.parse().map_err(|_| invalid())?,
                seq: seq.parse().map_err(|_| invalid())?,
            }),
            None => Ok(RecordId {
                millis: s.parse().map_err(|_| invalid())?,
                seq: 0,
            }),
        }
    }
}
