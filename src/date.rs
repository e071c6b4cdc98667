//! Date normalization for extracted entries.
//!
//! The completion service flags dates it could not pin down. Flagged, missing
//! and malformed dates are all replaced with today's date in the request's zone;
//! a well-formed, unflagged date is left alone.

use crate::defaults;
use crate::entry::ExtractedEntry;
use crate::timezone::CivilClock;
use chrono::{DateTime, NaiveDate, Utc};

/// What the resolver did to the `date` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateResolution {
    /// Well-formed and unflagged; untouched.
    Kept,
    /// `needs_confirmation.date` was set; replaced with today.
    ConfirmationRequested,
    /// Absent, blank or not a string; replaced with today.
    Missing,
    /// Present but not a `YYYY-MM-DD` calendar date; replaced with today.
    Malformed,
}

impl DateResolution {
    /// Whether the entry was changed and must be re-encoded.
    pub fn mutated(self) -> bool {
        !matches!(self, DateResolution::Kept)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateResolution::Kept => "kept",
            DateResolution::ConfirmationRequested => "confirmation_requested",
            DateResolution::Missing => "missing",
            DateResolution::Malformed => "malformed",
        }
    }
}

/// Strict `YYYY-MM-DD` check: fixed widths and a real calendar day.
pub fn is_calendar_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    digits_ok && NaiveDate::parse_from_str(value, defaults::DATE_FORMAT).is_ok()
}

/// Ensure the entry carries a usable date, using the current instant.
pub fn ensure_date(entry: &mut ExtractedEntry, clock: &CivilClock) -> DateResolution {
    ensure_date_at(entry, clock, Utc::now())
}

/// Ensure the entry carries a usable date, treating `now` as the current instant.
pub fn ensure_date_at(
    entry: &mut ExtractedEntry,
    clock: &CivilClock,
    now: DateTime<Utc>,
) -> DateResolution {
    let resolution = if entry.date_needs_confirmation() {
        DateResolution::ConfirmationRequested
    } else {
        match entry.date.as_deref().map(str::trim) {
            None | Some("") => DateResolution::Missing,
            Some(date) if is_calendar_date(date) => DateResolution::Kept,
            Some(_) => DateResolution::Malformed,
        }
    };

    if resolution.mutated() {
        let today = clock.date_at(now).format(defaults::DATE_FORMAT).to_string();
        entry.date = Some(today);
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::NeedsConfirmation;
    use chrono::TimeZone;

    fn kolkata() -> CivilClock {
        CivilClock::Zone(chrono_tz::Asia::Kolkata)
    }

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn entry(date: Option<&str>, confirm: Option<bool>) -> ExtractedEntry {
        ExtractedEntry {
            date: date.map(str::to_string),
            needs_confirmation: confirm.map(|flag| NeedsConfirmation {
                date: Some(flag),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn confirmation_overwrites_even_valid_date() {
        let mut e = entry(Some("2020-01-01"), Some(true));
        let outcome = ensure_date_at(&mut e, &kolkata(), noon_utc());
        assert_eq!(outcome, DateResolution::ConfirmationRequested);
        assert_eq!(e.date.as_deref(), Some("2025-06-15"));
    }

    #[test]
    fn missing_date_is_filled() {
        let mut e = entry(None, Some(false));
        assert_eq!(
            ensure_date_at(&mut e, &kolkata(), noon_utc()),
            DateResolution::Missing
        );
        assert_eq!(e.date.as_deref(), Some("2025-06-15"));

        let mut blank = entry(Some("   "), None);
        assert_eq!(
            ensure_date_at(&mut blank, &kolkata(), noon_utc()),
            DateResolution::Missing
        );
    }

    #[test]
    fn malformed_date_is_replaced() {
        for bad in ["yesterday", "2025-6-1", "15/06/2025", "2025-02-30", "+2025-06-15"] {
            let mut e = entry(Some(bad), None);
            assert_eq!(
                ensure_date_at(&mut e, &kolkata(), noon_utc()),
                DateResolution::Malformed,
                "input {bad:?}"
            );
            assert_eq!(e.date.as_deref(), Some("2025-06-15"));
        }
    }

    #[test]
    fn well_formed_unflagged_date_is_kept() {
        let mut e = entry(Some("2024-12-31"), Some(false));
        let before = e.clone();
        assert_eq!(
            ensure_date_at(&mut e, &kolkata(), noon_utc()),
            DateResolution::Kept
        );
        assert_eq!(e, before);
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let mut e = entry(Some("garbage"), Some(false));
        assert!(ensure_date_at(&mut e, &kolkata(), noon_utc()).mutated());
        let resolved = e.clone();

        let second = ensure_date_at(&mut e, &kolkata(), noon_utc());
        assert_eq!(second, DateResolution::Kept);
        assert!(!second.mutated());
        assert_eq!(e, resolved);
    }

    #[test]
    fn today_follows_the_zone() {
        // 22:00 UTC on the 15th is the 16th in Kolkata, still the 15th in New York.
        let late = Utc.with_ymd_and_hms(2025, 6, 15, 22, 0, 0).unwrap();

        let mut e = entry(None, Some(true));
        ensure_date_at(&mut e, &kolkata(), late);
        assert_eq!(e.date.as_deref(), Some("2025-06-16"));

        let mut e = entry(None, Some(true));
        ensure_date_at(&mut e, &CivilClock::Zone(chrono_tz::America::New_York), late);
        assert_eq!(e.date.as_deref(), Some("2025-06-15"));

        let mut e = entry(None, Some(true));
        ensure_date_at(&mut e, &CivilClock::fixed_ist(), late);
        assert_eq!(e.date.as_deref(), Some("2025-06-16"));
    }

    #[test]
    fn calendar_date_check() {
        assert!(is_calendar_date("2024-02-29"));
        assert!(!is_calendar_date("2023-02-29"));
        assert!(!is_calendar_date("2024-1-01"));
        assert!(!is_calendar_date("20240101"));
        assert!(!is_calendar_date(""));
    }

    #[test]
    fn resolution_labels() {
        assert_eq!(DateResolution::Kept.as_str(), "kept");
        assert!(DateResolution::Malformed.mutated());
        assert!(!DateResolution::Kept.mutated());
    }
}
