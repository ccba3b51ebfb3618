use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::{fractional_digits, format_fractional, NANOS_PER_SECOND};

/// A point in time, counted as signed seconds and nanoseconds since the
/// Unix epoch. Mirrors `google.protobuf.Timestamp`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    /// Brings `nanos` back into `[0, 999_999_999]`, carrying the remainder
    /// into `seconds`.
    pub fn normalize(&mut self) {
        if self.nanos <= -(NANOS_PER_SECOND as i32) || self.nanos >= NANOS_PER_SECOND as i32 {
            self.seconds += (self.nanos as i64) / NANOS_PER_SECOND;
            self.nanos = ((self.nanos as i64) % NANOS_PER_SECOND) as i32;
        }
        if self.nanos < 0 {
            self.seconds -= 1;
            self.nanos += NANOS_PER_SECOND as i32;
        }
    }

    /// Renders the RFC 3339 form the proto3 JSON mapping requires, e.g.
    /// `"1970-01-01T00:00:00Z"` or `"1970-01-01T00:00:00.250Z"`.
    pub fn to_json(&self) -> String {
        let dt = self.to_datetime();
        let digits = fractional_digits(self.nanos as i64);
        format!(
            "{}{}Z",
            dt.format("%Y-%m-%dT%H:%M:%S"),
            format_fractional(self.nanos as i64, digits)
        )
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.seconds, self.nanos.max(0) as u32)
            .single()
            .unwrap_or_else(|| Utc.timestamp_opt(self.seconds, 0).unwrap())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() as i32,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_overflowed_nanos() {
        let mut ts = Timestamp {
            seconds: 0,
            nanos: 1_500_000_000,
        };
        ts.normalize();
        assert_eq!(ts, Timestamp { seconds: 1, nanos: 500_000_000 });
    }

    #[test]
    fn json_omits_fraction_on_whole_seconds() {
        let ts = Timestamp { seconds: 0, nanos: 0 };
        assert_eq!(ts.to_json(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn json_uses_millisecond_precision_when_exact() {
        let ts = Timestamp { seconds: 0, nanos: 250_000_000 };
        assert_eq!(ts.to_json(), "1970-01-01T00:00:00.250Z");
    }
}
