//! Timezone resolution with a fixed fallback chain.
//!
//! Resolution never fails: a requested zone, then the configured default,
//! then `Asia/Kolkata`, then a fixed +05:30 offset.

use crate::defaults;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use chrono_tz::Tz;
use std::borrow::Cow;

/// A civil calendar that can answer "what day is it here".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CivilClock {
    /// An IANA zone from the tz database.
    Zone(Tz),
    /// A bare UTC offset, used only when no named zone loads.
    Fixed(FixedOffset),
}

impl CivilClock {
    /// Last-resort clock: IST as a fixed offset.
    pub fn fixed_ist() -> Self {
        let offset = FixedOffset::east_opt(defaults::FALLBACK_OFFSET_SECS)
            .unwrap_or_else(|| Utc.fix());
        CivilClock::Fixed(offset)
    }

    /// Zone name as shown to the completion service.
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            CivilClock::Zone(tz) => Cow::Borrowed(tz.name()),
            CivilClock::Fixed(offset) => Cow::Owned(format!("UTC{offset}")),
        }
    }

    /// Calendar date of `instant` in this zone.
    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            CivilClock::Zone(tz) => instant.with_timezone(tz).date_naive(),
            CivilClock::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// Today's calendar date in this zone.
    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

/// Load a zone by IANA name. Blank or unknown names yield `None`.
pub fn load(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>().ok()
}

/// Resolve the zone for one request.
pub fn resolve(requested: &str, configured_default: &str) -> CivilClock {
    if let Some(tz) = load(requested) {
        return CivilClock::Zone(tz);
    }
    if !requested.trim().is_empty() {
        tracing::debug!(requested, "requested timezone did not load, trying default");
    }
    if let Some(tz) = load(configured_default) {
        return CivilClock::Zone(tz);
    }
    match load(defaults::FALLBACK_TIMEZONE) {
        Some(tz) => CivilClock::Zone(tz),
        None => CivilClock::fixed_ist(),
    }
}
