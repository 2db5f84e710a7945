//! # Duration Parsing
//!
//! Parses Go-style duration strings as used by Gitea's `mirror_interval`:
//! "8h", "30m", "1h30m", "1.5h", "90s", "8h0m0s".

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

// Anchored per segment; the whole string must be consumed by repeated matches
#[allow(clippy::unwrap_used, reason = "pattern is a literal")]
static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<whole>\d+)(?:\.(?P<frac>\d*))?|\.(?P<frac_only>\d+))(?P<unit>ms|h|m|s)").unwrap()
});

// Digits beyond nanosecond precision of an hour are dropped
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a Go-style duration string into a `Duration`
///
/// Accepts one or more `<number><unit>` segments with units `h`, `m`, `s`
/// and `ms`. Numbers may carry a decimal fraction ("1.5h", ".5m"). Signs are
/// not accepted.
pub fn parse_go_duration(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration cannot be empty".to_string());
    }
    let too_large = || format!("duration {trimmed:?} is too large");

    let mut rest = trimmed;
    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let captures = SEGMENT.captures(rest).ok_or_else(|| {
            format!("invalid duration {trimmed:?}: expected segments like \"8h\", \"30m\" or \"1h30m\"")
        })?;
        let unit_nanos: u128 = match &captures["unit"] {
            "h" => 3_600_000_000_000,
            "m" => 60_000_000_000,
            "s" => 1_000_000_000,
            _ => 1_000_000,
        };

        let whole: u128 = match captures.name("whole") {
            Some(digits) => digits
                .as_str()
                .parse()
                .map_err(|e| format!("invalid number in duration {trimmed:?}: {e}"))?,
            None => 0,
        };
        let mut nanos = whole.checked_mul(unit_nanos).ok_or_else(too_large)?;

        let fraction = captures
            .name("frac")
            .or_else(|| captures.name("frac_only"))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        if !fraction.is_empty() {
            let digits: u128 = fraction
                .parse()
                .map_err(|e| format!("invalid fraction in duration {trimmed:?}: {e}"))?;
            let scale = 10u128.pow(fraction.len() as u32);
            nanos = nanos
                .checked_add(digits * unit_nanos / scale)
                .ok_or_else(too_large)?;
        }

        total_nanos = total_nanos.checked_add(nanos).ok_or_else(too_large)?;
        rest = &rest[captures[0].len()..];
    }

    u64::try_from(total_nanos)
        .map(Duration::from_nanos)
        .map_err(|_| too_large())
}

/// Parse a duration that must be strictly positive
pub fn parse_positive_duration(input: &str) -> Result<Duration, String> {
    let duration = parse_go_duration(input)?;
    if duration.is_zero() {
        return Err(format!("duration {:?} must be greater than zero", input.trim()));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segments() {
        assert_eq!(parse_go_duration("8h").unwrap(), Duration::from_secs(8 * 3600));
        assert_eq!(parse_go_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_go_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_go_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_compound_and_gitea_format_match() {
        assert_eq!(parse_go_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_go_duration("8h0m0s").unwrap(), parse_go_duration("8h").unwrap());
        assert_eq!(parse_go_duration(" 10m0s ").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn test_fractional_segments() {
        assert_eq!(parse_go_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_go_duration(".5m").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_go_duration("2.h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_go_duration("1h0.25m").unwrap(), Duration::from_secs(3615));
        assert_eq!(parse_go_duration("1.5ms").unwrap(), Duration::from_micros(1500));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_go_duration("").is_err());
        assert!(parse_go_duration("8").is_err());
        assert!(parse_go_duration("h").is_err());
        assert!(parse_go_duration("8d").is_err());
        assert!(parse_go_duration("-8h").is_err());
        assert!(parse_go_duration(".h").is_err());
        assert!(parse_go_duration("1..5h").is_err());
        assert!(parse_go_duration("8h garbage").is_err());
    }

    #[test]
    fn test_positive_duration() {
        assert!(parse_positive_duration("0s").is_err());
        assert!(parse_positive_duration("0h0m").is_err());
        assert_eq!(parse_positive_duration("1s").unwrap(), Duration::from_secs(1));
    }
}
