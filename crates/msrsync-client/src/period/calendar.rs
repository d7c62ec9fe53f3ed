use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub(crate) const MONTH_NAMES: [(&str, &str); 12] = [
    ("Jan", "January"),
    ("Feb", "February"),
    ("Mar", "March"),
    ("Apr", "April"),
    ("May", "May"),
    ("Jun", "June"),
    ("Jul", "July"),
    ("Aug", "August"),
    ("Sep", "September"),
    ("Oct", "October"),
    ("Nov", "November"),
    ("Dec", "December"),
];

pub(crate) fn month_from_name(value: &str) -> Option<u32> {
    let lowered = value.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|(short, long)| {
            lowered == short.to_ascii_lowercase() || lowered == long.to_ascii_lowercase()
        })
        .and_then(|index| u32::try_from(index + 1).ok())
}

pub(crate) fn short_month_name(month: u32) -> &'static str {
    month_names(month).0
}

pub(crate) fn long_month_name(month: u32) -> &'static str {
    month_names(month).1
}

fn month_names(month: u32) -> (&'static str, &'static str) {
    let index = usize::try_from(month.clamp(1, 12) - 1).unwrap_or(0);
    MONTH_NAMES[index]
}

pub(crate) fn monday_of(date: NaiveDate) -> NaiveDate {
    let offset = i64::from(date.weekday().num_days_from_monday());
    date - Duration::days(offset)
}

pub(crate) fn friday_of(monday: NaiveDate) -> NaiveDate {
    monday + Duration::days(4)
}

pub(crate) fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub(crate) fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
}

/// Mondays of the work weeks owned by the month. A week that straddles two
/// months belongs to the one holding its Thursday, so every week lands in
/// exactly one month.
pub(crate) fn work_week_mondays(year: i32, month: u32) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (first_of_month(year, month), last_of_month(year, month))
    else {
        return Vec::new();
    };

    let mut mondays = Vec::new();
    let mut current = monday_of(first);
    while current <= last {
        let thursday = current + Duration::days(3);
        if thursday.month() == month {
            mondays.push(current);
        }
        current += Duration::days(7);
    }
    mondays
}

pub(crate) fn iso_week_monday(year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

pub(crate) fn quarter_of(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, NaiveDate};

    use super::{month_from_name, monday_of, work_week_mondays};

    #[test]
    fn month_names_match_short_and_long_forms_case_insensitively() {
        assert_eq!(month_from_name("jan"), Some(1));
        assert_eq!(month_from_name("SEPTEMBER"), Some(9));
        assert_eq!(month_from_name("Sept"), None);
        assert_eq!(month_from_name(""), None);
    }

    #[test]
    fn monday_of_normalizes_every_weekday() {
        let monday = NaiveDate::from_ymd_opt(2026, 1, 12);
        assert!(monday.is_some());
        for day in 12..=18 {
            let date = NaiveDate::from_ymd_opt(2026, 1, day);
            assert!(date.is_some());
            if let Some(value) = date {
                assert_eq!(Some(monday_of(value)), monday);
            }
        }
    }

    #[test]
    fn january_2026_has_five_work_weeks() {
        let mondays = work_week_mondays(2026, 1)
            .iter()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect::<Vec<String>>();
        assert_eq!(
            mondays,
            vec![
                "2025-12-29",
                "2026-01-05",
                "2026-01-12",
                "2026-01-19",
                "2026-01-26"
            ]
        );
    }

    #[test]
    fn weeks_ending_before_the_month_are_excluded() {
        // March 2026 starts on a Sunday, so the week of Feb 23 is not a March week.
        let mondays = work_week_mondays(2026, 3);
        assert_eq!(
            mondays.first().map(|date| date.format("%Y-%m-%d").to_string()),
            Some("2026-03-02".to_string())
        );
        // The week of Mar 30 has its Thursday in April.
        assert_eq!(
            mondays.last().map(|date| date.format("%Y-%m-%d").to_string()),
            Some("2026-03-23".to_string())
        );
    }

    #[test]
    fn every_week_of_the_year_belongs_to_exactly_one_month() {
        let mondays = (1..=12)
            .flat_map(|month| work_week_mondays(2026, month))
            .collect::<Vec<NaiveDate>>();
        assert_eq!(mondays.len(), 53);
        assert_eq!(mondays.first().copied(), NaiveDate::from_ymd_opt(2025, 12, 29));
        assert_eq!(mondays.last().copied(), NaiveDate::from_ymd_opt(2026, 12, 28));
        for pair in mondays.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(7));
        }
        assert!(work_week_mondays(2025, 12).iter().all(|monday| monday.month() == 12));
    }
}
