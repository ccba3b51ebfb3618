use std::fmt;

use crate::{fractional_digits, format_fractional, NANOS_PER_SECOND};

/// A signed, fixed-length span of time, counted as seconds and nanoseconds.
/// Mirrors `google.protobuf.Duration`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: i32,
}

impl Duration {
    /// Brings `nanos` into `[-999_999_999, 999_999_999]` and gives `seconds`
    /// and `nanos` the same sign, carrying the remainder into `seconds`.
    pub fn normalize(&mut self) {
        if self.nanos <= -(NANOS_PER_SECOND as i32) || self.nanos >= NANOS_PER_SECOND as i32 {
            self.seconds += (self.nanos as i64) / NANOS_PER_SECOND;
            self.nanos = ((self.nanos as i64) % NANOS_PER_SECOND) as i32;
        }
        if self.seconds > 0 && self.nanos < 0 {
            self.seconds -= 1;
            self.nanos += NANOS_PER_SECOND as i32;
        } else if self.seconds < 0 && self.nanos > 0 {
            self.seconds += 1;
            self.nanos -= NANOS_PER_SECOND as i32;
        }
    }

    /// Renders the proto3 JSON mapping's `"<seconds>.<fraction>s"` string,
    /// e.g. `"1.250s"` or `"-1s"`.
    pub fn to_json(&self) -> String {
        let negative = self.seconds < 0 || self.nanos < 0;
        let digits = fractional_digits(self.nanos.unsigned_abs() as i64);
        format!(
            "{}{}{}s",
            if negative { "-" } else { "" },
            self.seconds.unsigned_abs(),
            format_fractional(self.nanos.unsigned_abs() as i64, digits)
        )
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Duration {
            seconds: value.as_secs() as i64,
            nanos: value.subsec_nanos() as i32,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_matches_signs() {
        let mut d = Duration { seconds: 1, nanos: -500_000_000 };
        d.normalize();
        assert_eq!(d, Duration { seconds: 0, nanos: 500_000_000 });
    }

    #[test]
    fn json_renders_negative_values() {
        let d = Duration { seconds: -1, nanos: 0 };
        assert_eq!(d.to_json(), "-1s");
    }

    #[test]
    fn json_renders_fractional_values() {
        let d = Duration { seconds: 1, nanos: 250_000_000 };
        assert_eq!(d.to_json(), "1.250s");
    }
}
