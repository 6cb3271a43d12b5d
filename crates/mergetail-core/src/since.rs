//! Parsing of the `--since` look-back window.
//!
//! Grammar: `all`, `any`, `everything`, `infinite` or `inf` disable the
//! cutoff; otherwise `<digits>[s|m|h|d]` with hours as the default unit. A
//! value of zero also disables the cutoff.

use chrono::{DateTime, Duration, Utc};

/// A resolved look-back window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinceWindow {
    /// Entries strictly before this instant are dropped. `None` keeps everything.
    pub cutoff: Option<DateTime<Utc>>,
    /// Human-readable description for the header line (`last 2h`).
    pub label: String,
}

impl SinceWindow {
    pub fn unbounded() -> Self {
        Self {
            cutoff: None,
            label: "all available logs".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SinceError {
    #[error("invalid --since value '{0}': use formats like '30m', '2h', '1d', or 'all'")]
    Invalid(String),
    #[error("invalid --since value '{0}': window is too large")]
    OutOfRange(String),
}

/// Resolve `spec` relative to `now`.
pub fn parse_since(spec: &str, now: DateTime<Utc>) -> Result<SinceWindow, SinceError> {
    let normalized = spec.trim().to_ascii_lowercase();
    if matches!(
        normalized.as_str(),
        "all" | "any" | "everything" | "infinite" | "inf"
    ) {
        return Ok(SinceWindow::unbounded());
    }

    let split = normalized
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (digits, unit) = normalized.split_at(split);
    if digits.is_empty() {
        return Err(SinceError::Invalid(spec.to_string()));
    }

    let unit_secs: i64 = match unit {
        "s" => 1,
        "m" => 60,
        "" | "h" => 3_600,
        "d" => 86_400,
        _ => return Err(SinceError::Invalid(spec.to_string())),
    };
    let value: i64 = digits
        .parse()
        .map_err(|_| SinceError::OutOfRange(spec.to_string()))?;
    if value == 0 {
        return Ok(SinceWindow::unbounded());
    }

    let secs = value
        .checked_mul(unit_secs)
        .ok_or_else(|| SinceError::OutOfRange(spec.to_string()))?;
    let window =
        Duration::try_seconds(secs).ok_or_else(|| SinceError::OutOfRange(spec.to_string()))?;
    let cutoff = now
        .checked_sub_signed(window)
        .ok_or_else(|| SinceError::OutOfRange(spec.to_string()))?;

    Ok(SinceWindow {
        cutoff: Some(cutoff),
        label: format!("last {value}{}", if unit.is_empty() { "h" } else { unit }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case("30m", Duration::minutes(30), "last 30m")]
    #[case("2h", Duration::hours(2), "last 2h")]
    #[case("2", Duration::hours(2), "last 2h")]
    #[case("1d", Duration::days(1), "last 1d")]
    #[case("45s", Duration::seconds(45), "last 45s")]
    #[case(" 3H ", Duration::hours(3), "last 3h")]
    fn relative_windows(#[case] spec: &str, #[case] back: Duration, #[case] label: &str) {
        let window = parse_since(spec, now()).unwrap();
        assert_eq!(window.cutoff, Some(now() - back));
        assert_eq!(window.label, label);
    }

    #[rstest]
    #[case("all")]
    #[case("ANY")]
    #[case("everything")]
    #[case("inf")]
    #[case("infinite")]
    #[case("0")]
    #[case("0m")]
    fn unbounded_windows(#[case] spec: &str) {
        assert_eq!(parse_since(spec, now()).unwrap(), SinceWindow::unbounded());
    }

    #[rstest]
    #[case("")]
    #[case("h")]
    #[case("1w")]
    #[case("-1h")]
    #[case("1.5h")]
    #[case("yesterday")]
    fn invalid_windows(#[case] spec: &str) {
        assert_eq!(
            parse_since(spec, now()),
            Err(SinceError::Invalid(spec.to_string()))
        );
    }

    #[test]
    fn huge_window_is_out_of_range() {
        assert!(matches!(
            parse_since("99999999999999999999d", now()),
            Err(SinceError::OutOfRange(_))
        ));
    }
}
