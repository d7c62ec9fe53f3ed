//! Canonical reporting periods.
//!
//! Report headers label the same month or week in many ways ("Jan-26",
//! "January 2026", a first-of-month date, "Jan 12-16, 2026"). Everything that
//! compares periods goes through [`Period`], whose equality is defined by its
//! canonical key alone.

pub(crate) mod calendar;

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Monthly,
    Weekly,
}

impl Cadence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Month { year: i32, month: u32 },
    /// A Monday-anchored ISO week.
    Week { monday: NaiveDate },
}

/// What a label denotes before a cadence is applied. A bare date is a day, not
/// yet a month or a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsedLabel {
    Period(Period),
    Date(NaiveDate),
}

impl Period {
    pub fn month(year: i32, month: u32) -> ClientResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(ClientError::invalid_period_format(&format!(
                "{year}-{month:02}"
            )));
        }
        Ok(Self::Month { year, month })
    }

    pub fn week_containing(date: NaiveDate) -> Self {
        Self::Week {
            monday: calendar::monday_of(date),
        }
    }

    pub fn from_date(date: NaiveDate, cadence: Cadence) -> Self {
        match cadence {
            Cadence::Monthly => Self::Month {
                year: date.year(),
                month: date.month(),
            },
            Cadence::Weekly => Self::week_containing(date),
        }
    }

    /// Parses a free-form period label. Bare dates denote the ISO week that
    /// contains them.
    pub fn parse(input: &str) -> ClientResult<Self> {
        Self::parse_for(input, Cadence::Weekly)
    }

    /// Parses a label the way a report of `cadence` reads its headers: a bare
    /// date names the month (monthly) or week (weekly) that contains it.
    pub fn parse_for(input: &str, cadence: Cadence) -> ClientResult<Self> {
        match parse_label(input) {
            Some(ParsedLabel::Period(period)) => Ok(period),
            Some(ParsedLabel::Date(date)) => Ok(Self::from_date(date, cadence)),
            None => Err(ClientError::invalid_period_format(input)),
        }
    }

    pub fn cadence(&self) -> Cadence {
        match self {
            Self::Month { .. } => Cadence::Monthly,
            Self::Week { .. } => Cadence::Weekly,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Month { year, month } => format!("{year:04}-{month:02}"),
            Self::Week { monday } => {
                let iso = monday.iso_week();
                format!("{:04}-W{:02}", iso.year(), iso.week())
            }
        }
    }

    /// Short human label used in file names and messages.
    pub fn label(&self) -> String {
        match self {
            Self::Month { year, month } => format!(
                "{}-{:02}",
                calendar::short_month_name(*month),
                year.rem_euclid(100)
            ),
            Self::Week { monday } => monday.format("%Y-%m-%d").to_string(),
        }
    }

    /// Every textual form this period is accepted under.
    pub fn variants(&self) -> Vec<String> {
        match self {
            Self::Month { year, month } => vec![
                self.key(),
                self.label(),
                format!("{} {year}", calendar::long_month_name(*month)),
            ],
            Self::Week { monday } => vec![
                self.key(),
                self.label(),
                week_range_label(*monday),
            ],
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        match self {
            Self::Month { year, month } => {
                calendar::first_of_month(*year, *month).unwrap_or(NaiveDate::MIN)
            }
            Self::Week { monday } => *monday,
        }
    }

    /// Last reported day: month end, or the Friday of a work week.
    pub fn end_date(&self) -> NaiveDate {
        match self {
            Self::Month { year, month } => {
                calendar::last_of_month(*year, *month).unwrap_or(NaiveDate::MAX)
            }
            Self::Week { monday } => calendar::friday_of(*monday),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            Self::Month { year, month } => date.year() == *year && date.month() == *month,
            Self::Week { monday } => date >= *monday && date < *monday + Duration::days(7),
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Self::Month { year, month } => {
                if *month == 1 {
                    Self::Month {
                        year: year - 1,
                        month: 12,
                    }
                } else {
                    Self::Month {
                        year: *year,
                        month: month - 1,
                    }
                }
            }
            Self::Week { monday } => Self::Week {
                monday: *monday - Duration::days(7),
            },
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Month { year, month } => {
                if *month == 12 {
                    Self::Month {
                        year: year + 1,
                        month: 1,
                    }
                } else {
                    Self::Month {
                        year: *year,
                        month: month + 1,
                    }
                }
            }
            Self::Week { monday } => Self::Week {
                monday: *monday + Duration::days(7),
            },
        }
    }

    /// Work weeks belonging to a month period; empty for weeks.
    pub fn work_weeks(&self) -> Vec<Period> {
        match self {
            Self::Month { year, month } => calendar::work_week_mondays(*year, *month)
                .into_iter()
                .map(|monday| Self::Week { monday })
                .collect(),
            Self::Week { .. } => Vec::new(),
        }
    }

    /// Inclusive range walk in increasing order. Mixed cadences yield nothing.
    pub fn range_inclusive(from: Period, to: Period) -> Vec<Period> {
        if from.cadence() != to.cadence() {
            return Vec::new();
        }
        let mut periods = Vec::new();
        let mut current = from;
        while current <= to {
            periods.push(current);
            current = current.next();
        }
        periods
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.key()
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value).map_err(|error| error.message)
    }
}

fn week_range_label(monday: NaiveDate) -> String {
    let friday = calendar::friday_of(monday);
    let start_month = calendar::short_month_name(monday.month());
    if monday.month() == friday.month() {
        format!(
            "{start_month} {}-{}, {}",
            monday.day(),
            friday.day(),
            monday.year()
        )
    } else {
        format!(
            "{start_month} {}-{} {}, {}",
            monday.day(),
            calendar::short_month_name(friday.month()),
            friday.day(),
            monday.year()
        )
    }
}

fn parse_label(input: &str) -> Option<ParsedLabel> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    parse_iso_month(trimmed)
        .or_else(|| parse_iso_week(trimmed))
        .or_else(|| parse_short_month_year(trimmed))
        .or_else(|| parse_long_month_year(trimmed))
        .or_else(|| parse_week_range(trimmed))
        .or_else(|| parse_iso_date(trimmed).map(ParsedLabel::Date))
}

fn parse_iso_month(value: &str) -> Option<ParsedLabel> {
    let (year, month) = value.split_once('-')?;
    if year.len() != 4 || month.len() != 2 || !all_digits(year) || !all_digits(month) {
        return None;
    }
    let month = month.parse::<u32>().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(ParsedLabel::Period(Period::Month {
        year: year.parse().ok()?,
        month,
    }))
}

fn parse_iso_week(value: &str) -> Option<ParsedLabel> {
    let (year, week) = value.split_once("-W").or_else(|| value.split_once("-w"))?;
    if year.len() != 4 || week.len() != 2 || !all_digits(year) || !all_digits(week) {
        return None;
    }
    let monday = calendar::iso_week_monday(year.parse().ok()?, week.parse().ok()?)?;
    Some(ParsedLabel::Period(Period::Week { monday }))
}

/// `Jan-26`: two-digit years are in the 2000s.
fn parse_short_month_year(value: &str) -> Option<ParsedLabel> {
    let (name, year) = value.split_once('-')?;
    if year.len() != 2 || !all_digits(year) {
        return None;
    }
    let month = calendar::month_from_name(name)?;
    let year = 2000 + year.parse::<i32>().ok()?;
    Some(ParsedLabel::Period(Period::Month { year, month }))
}

fn parse_long_month_year(value: &str) -> Option<ParsedLabel> {
    let tokens = value.split_whitespace().collect::<Vec<&str>>();
    let [name, year] = tokens.as_slice() else {
        return None;
    };
    if year.len() != 4 || !all_digits(year) {
        return None;
    }
    let month = calendar::month_from_name(name)?;
    Some(ParsedLabel::Period(Period::Month {
        year: year.parse().ok()?,
        month,
    }))
}

/// `Jan 12-16, 2026` or `Dec 29-Jan 2, 2025`; the year belongs to the start day.
fn parse_week_range(value: &str) -> Option<ParsedLabel> {
    let cleaned = value.replace(',', " ");
    let tokens = cleaned.split_whitespace().collect::<Vec<&str>>();
    let (year_token, body) = tokens.split_last()?;
    if year_token.len() != 4 || !all_digits(year_token) || body.len() < 2 {
        return None;
    }
    let year = year_token.parse::<i32>().ok()?;
    let start_month = calendar::month_from_name(body[0])?;
    let span = body[1..].join(" ");
    let (start_day, end_part) = span.split_once('-')?;
    let start_day = start_day.trim().parse::<u32>().ok()?;
    let start = NaiveDate::from_ymd_opt(year, start_month, start_day)?;

    let end_tokens = end_part.split_whitespace().collect::<Vec<&str>>();
    let end = match end_tokens.as_slice() {
        [day] => NaiveDate::from_ymd_opt(year, start_month, day.parse().ok()?)?,
        [name, day] => {
            let end_month = calendar::month_from_name(name)?;
            let end_year = if end_month < start_month { year + 1 } else { year };
            NaiveDate::from_ymd_opt(end_year, end_month, day.parse().ok()?)?
        }
        _ => return None,
    };

    let span_days = (end - start).num_days();
    if !(0..=6).contains(&span_days) {
        return None;
    }
    Some(ParsedLabel::Period(Period::week_containing(start)))
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if value.len() == 10 {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    }
    // Spreadsheet exports render date headers as midnight timestamps.
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|timestamp| timestamp.date())
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}
