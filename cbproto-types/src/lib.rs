//! Well-known-type conversions for `cbproto`-generated messages: `Timestamp`,
//! `Duration`, the Google wrapper types and one local extension (`EnumValue`).
//!
//! These are plain Rust values, not `cbproto::Message`s themselves; the
//! generator treats all of them as unwrap targets, so a field typed as a
//! wrapper or `Timestamp`/`Duration` becomes a native, optional value in the
//! emitted dataclass rather than a nested message.

mod duration;
mod timestamp;
mod wrappers;

pub use duration::Duration;
pub use timestamp::Timestamp;
pub use wrappers::{EnumValue, Wrapper};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Picks the number of fractional-second digits the JSON mapping uses for a
/// `Timestamp`/`Duration`: 0 for a whole second, otherwise the smallest of
/// 3, 6 or 9 digits that loses no precision.
fn fractional_digits(nanos: i64) -> usize {
    if nanos == 0 {
        0
    } else if nanos % 1_000_000 == 0 {
        3
    } else if nanos % 1_000 == 0 {
        6
    } else {
        9
    }
}

fn format_fractional(nanos: i64, digits: usize) -> String {
    match digits {
        0 => String::new(),
        3 => format!(".{:03}", nanos / 1_000_000),
        6 => format!(".{:06}", nanos / 1_000),
        _ => format!(".{:09}", nanos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_digit_selection() {
        assert_eq!(fractional_digits(0), 0);
        assert_eq!(fractional_digits(500_000_000), 3);
        assert_eq!(fractional_digits(500_000), 6);
        assert_eq!(fractional_digits(123), 9);
    }
}
