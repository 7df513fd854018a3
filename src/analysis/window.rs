//! Reporting date windows.
//!
//! All windows end yesterday: the census views are refreshed overnight,
//! so today's rows are never complete.

use chrono::{Datelike, Duration, Local, NaiveDate};

use crate::models::DateRange;

/// Named date-range preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// First day of the current month through yesterday
    MonthToDate,
    /// The week ending yesterday
    #[value(name = "last-7-days")]
    Last7Days,
}

/// Today's local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}

/// Default window: seven days ago through yesterday.
pub fn default_range(today: NaiveDate) -> DateRange {
    DateRange::new(today - Duration::days(7), yesterday(today))
}

/// First day of yesterday's month through yesterday.
///
/// Anchored on yesterday so the window is never inverted on the 1st.
pub fn month_to_date(today: NaiveDate) -> DateRange {
    let end = yesterday(today);
    let start = end.with_day(1).unwrap_or(end);
    DateRange::new(start, end)
}

/// Eight days ago through yesterday.
pub fn last_seven_days(today: NaiveDate) -> DateRange {
    DateRange::new(today - Duration::days(8), yesterday(today))
}

impl Preset {
    pub fn range(self, today: NaiveDate) -> DateRange {
        match self {
            Preset::MonthToDate => month_to_date(today),
            Preset::Last7Days => last_seven_days(today),
        }
    }
}

/// Resolve a range from an optional preset and optional explicit bounds.
///
/// Explicit bounds win over the preset; missing bounds fall back to the
/// preset (or the default window).
pub fn resolve_range(
    today: NaiveDate,
    preset: Option<Preset>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> DateRange {
    let base = preset.map_or_else(|| default_range(today), |p| p.range(today));
    DateRange::new(start.unwrap_or(base.start), end.unwrap_or(base.end))
}
