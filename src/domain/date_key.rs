/// Canonical day keys and the normalizer that produces them
///
/// Completion dates arrive from the store in several encodings: bare
/// `YYYY-MM-DD` dates, full RFC 3339 timestamps with or without an offset,
/// and space-separated SQL timestamps. All of that tolerance lives here.
/// The calendar date written at the front of the input is authoritative;
/// any time-of-day or offset suffix is discarded rather than converted,
/// so the result never depends on the zone the process runs in.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Textual form of a `DateKey`
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Error produced when a raw date cannot be turned into a `DateKey`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("'{0}' does not start with a YYYY-MM-DD date")]
    Malformed(String),

    #[error("'{0}' is not a real calendar date")]
    NotACalendarDate(String),
}

impl ParseError {
    /// The raw input that failed to parse
    pub fn input(&self) -> &str {
        match self {
            ParseError::Malformed(input) | ParseError::NotACalendarDate(input) => input,
        }
    }
}

/// A calendar day with no time-of-day and no timezone
///
/// Ordering is chronological. The textual form is always zero-padded
/// `YYYY-MM-DD`, which is also what it serializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wrap an already-resolved calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from its components, `None` if they don't form a real date
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Today's date on the local calendar
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// The underlying chrono date
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// The key `days` calendar days later, `None` past the representable range
    pub fn checked_add_days(&self, days: u64) -> Option<Self> {
        self.0.checked_add_days(Days::new(days)).map(Self)
    }

    /// The key `days` calendar days earlier, `None` past the representable range
    pub fn checked_sub_days(&self, days: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(days)).map(Self)
    }

    /// The following calendar day
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    /// Signed number of days from `earlier` to `self`
    pub fn days_since(&self, earlier: DateKey) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    /// Monday of the ISO week containing this day
    pub fn week_start(&self) -> Self {
        let back = self.0.weekday().num_days_from_monday() as u64;
        // Going back at most six days from a valid date stays in range
        self.checked_sub_days(back).unwrap_or(*self)
    }

    /// First day of the month containing this day
    pub fn month_start(&self) -> Self {
        self.0.with_day(1).map(Self).unwrap_or(*self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for DateKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        normalize(&raw).map_err(serde::de::Error::custom)
    }
}

/// Canonicalize a raw date encoding into a `DateKey`
///
/// Accepts `2024-06-05`, `2024-06-05T23:59:00-07:00`, `2024-06-05T00:00:00Z`,
/// `2024-06-05 10:00:00` and already-canonical keys. Month and day may be
/// unpadded. Whatever follows the date must start with a `T` or a space.
///
/// `normalize(&normalize(x)?.to_string())` always equals `normalize(x)`.
pub fn normalize(raw: &str) -> Result<DateKey, ParseError> {
    let input = raw.trim();
    let malformed = || ParseError::Malformed(raw.to_string());

    let (year, rest) = split_digits(input, 4, 4).ok_or_else(malformed)?;
    let rest = rest.strip_prefix('-').ok_or_else(malformed)?;
    let (month, rest) = split_digits(rest, 1, 2).ok_or_else(malformed)?;
    let rest = rest.strip_prefix('-').ok_or_else(malformed)?;
    let (day, rest) = split_digits(rest, 1, 2).ok_or_else(malformed)?;

    if !(rest.is_empty() || rest.starts_with(['T', 't', ' '])) {
        return Err(malformed());
    }

    DateKey::from_ymd(year as i32, month, day)
        .ok_or_else(|| ParseError::NotACalendarDate(raw.to_string()))
}

/// Split a leading run of `min..=max` ASCII digits off `s`
fn split_digits(s: &str, min: usize, max: usize) -> Option<(u32, &str)> {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    if len < min || len > max {
        return None;
    }
    let value = s[..len].parse().ok()?;
    Some((value, &s[len..]))
}
