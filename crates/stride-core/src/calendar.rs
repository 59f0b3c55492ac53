//! Weekday and date arithmetic shared by publishing and recurring generation.
//!
//! Weekdays are indexed `0 = Sunday` through `6 = Saturday` everywhere in
//! the engine and in storage.

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

const WEEKDAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Weekday index of `date`, `0 = Sunday`.
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always in 0..7.
    date.weekday().num_days_from_sunday() as u8
}

/// Lowercase full name for a weekday index, or `"?"` when out of range.
pub fn weekday_name(index: u8) -> &'static str {
    WEEKDAY_NAMES.get(usize::from(index)).copied().unwrap_or("?")
}

/// Parse a weekday name, case-insensitively.
///
/// Accepts full names and three-letter abbreviations, plus the common
/// `tues`, `thur` and `thurs` spellings.
pub fn parse_weekday_name(name: &str) -> Option<u8> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    if let Some(pos) = WEEKDAY_NAMES.iter().position(|full| *full == name) {
        return Some(pos as u8);
    }
    match name.as_str() {
        "sun" => Some(0),
        "mon" => Some(1),
        "tue" | "tues" => Some(2),
        "wed" => Some(3),
        "thu" | "thur" | "thurs" => Some(4),
        "fri" => Some(5),
        "sat" => Some(6),
        _ => None,
    }
}

/// Date of the session on weekday `day_of_week` in the week anchored at
/// `week_start`.
///
/// The result is the first date on or after `week_start` that falls on
/// `day_of_week`, so it always lies within `week_start + 0..=6` days even
/// when the anchor is not a Sunday.
pub fn project_session_date(week_start: NaiveDate, day_of_week: u8) -> NaiveDate {
    let offset = (u64::from(day_of_week % 7) + 7 - u64::from(weekday_index(week_start))) % 7;
    week_start + Days::new(offset)
}

/// Every date in `today..=today + weeks_ahead * 7` (capped at `end_date`)
/// whose weekday is in `weekdays`, in ascending order.
///
/// Returns an empty list when `end_date` is before `today`.
pub fn recurring_dates(
    today: NaiveDate,
    weeks_ahead: u32,
    end_date: Option<NaiveDate>,
    weekdays: &[u8],
) -> Vec<NaiveDate> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(weeks_ahead) * 7))
        .unwrap_or(NaiveDate::MAX);
    let last = match end_date {
        Some(end) if end < horizon => end,
        _ => horizon,
    };

    today
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| weekdays.contains(&weekday_index(*d)))
        .collect()
}

/// Parse a clock time as written by coaches or emitted by the plan parser.
///
/// Accepts `15:30`, `15:30:00`, `3:30pm`, `3:30 PM`, `3pm` and `7 am`.
/// Returns `None` for anything else.
pub fn parse_clock_time(input: &str) -> Option<NaiveTime> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }

    let (body, meridiem) = if let Some(rest) = s.strip_suffix("am") {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = s.strip_suffix("pm") {
        (rest.trim_end(), Some(true))
    } else {
        (s.as_str(), None)
    };

    match meridiem {
        None => NaiveTime::parse_from_str(body, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(body, "%H:%M"))
            .ok(),
        Some(pm) => {
            let (hour, minute) = match body.split_once(':') {
                Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
                None => (body.parse::<u32>().ok()?, 0),
            };
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            NaiveTime::from_hms_opt(hour, minute, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekday_index_starts_on_sunday() {
        assert_eq!(weekday_index(date(2024, 6, 2)), 0);
        assert_eq!(weekday_index(date(2024, 6, 5)), 3);
        assert_eq!(weekday_index(date(2024, 6, 8)), 6);
    }

    #[test]
    fn projection_lands_on_requested_weekday_within_week() {
        let start = date(2024, 5, 1);
        for offset in 0..14u64 {
            let anchor = start + Days::new(offset);
            for day in 0..7u8 {
                let projected = project_session_date(anchor, day);
                assert_eq!(weekday_index(projected), day, "anchor {anchor} day {day}");
                let delta = (projected - anchor).num_days();
                assert!((0..7).contains(&delta), "anchor {anchor} day {day}");
            }
        }
    }

    #[test]
    fn wednesday_of_week_starting_june_second() {
        assert_eq!(project_session_date(date(2024, 6, 2), 3), date(2024, 6, 5));
        assert_eq!(project_session_date(date(2024, 6, 2), 0), date(2024, 6, 2));
    }

    #[test]
    fn projection_from_non_sunday_anchor_wraps_forward() {
        // Wednesday anchor: Monday is five days later, not two days earlier.
        assert_eq!(project_session_date(date(2024, 6, 5), 1), date(2024, 6, 10));
    }

    #[test]
    fn parses_weekday_names_case_insensitively() {
        assert_eq!(parse_weekday_name("Wednesday"), Some(3));
        assert_eq!(parse_weekday_name("  SAT "), Some(6));
        assert_eq!(parse_weekday_name("thurs"), Some(4));
        assert_eq!(parse_weekday_name("sun"), Some(0));
        assert_eq!(parse_weekday_name("funday"), None);
        assert_eq!(parse_weekday_name(""), None);
    }

    #[test]
    fn weekday_name_round_trips_index() {
        for i in 0..7u8 {
            assert_eq!(parse_weekday_name(weekday_name(i)), Some(i));
        }
        assert_eq!(weekday_name(9), "?");
    }

    #[test]
    fn recurring_dates_from_a_tuesday() {
        // 2024-06-04 is a Tuesday.
        let dates = recurring_dates(date(2024, 6, 4), 2, None, &[1, 3, 5]);
        assert_eq!(
            dates,
            vec![
                date(2024, 6, 5),
                date(2024, 6, 7),
                date(2024, 6, 10),
                date(2024, 6, 12),
                date(2024, 6, 14),
                date(2024, 6, 17),
            ]
        );
    }

    #[test]
    fn recurring_dates_include_today_and_respect_end_date() {
        let today = date(2024, 6, 5);
        let dates = recurring_dates(today, 4, Some(date(2024, 6, 12)), &[3]);
        assert_eq!(dates, vec![date(2024, 6, 5), date(2024, 6, 12)]);
    }

    #[test]
    fn recurring_dates_empty_when_end_date_passed() {
        let dates = recurring_dates(date(2024, 6, 5), 4, Some(date(2024, 6, 1)), &[0, 1, 2, 3]);
        assert!(dates.is_empty());
    }

    #[test]
    fn recurring_dates_match_weekday_filter() {
        let today = date(2024, 1, 1);
        let weekdays = [0, 6];
        let dates = recurring_dates(today, 8, None, &weekdays);
        assert_eq!(dates.len(), 16);
        assert!(dates.iter().all(|d| weekdays.contains(&weekday_index(*d))));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn parses_clock_times_leniently() {
        assert_eq!(parse_clock_time("15:30"), Some(hm(15, 30)));
        assert_eq!(parse_clock_time("07:05:00"), Some(hm(7, 5)));
        assert_eq!(parse_clock_time("3:30pm"), Some(hm(15, 30)));
        assert_eq!(parse_clock_time("3:30 PM"), Some(hm(15, 30)));
        assert_eq!(parse_clock_time("7 am"), Some(hm(7, 0)));
        assert_eq!(parse_clock_time("12am"), Some(hm(0, 0)));
        assert_eq!(parse_clock_time("12pm"), Some(hm(12, 0)));
    }

    #[test]
    fn rejects_unparseable_clock_times() {
        assert_eq!(parse_clock_time("after school"), None);
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("13pm"), None);
        assert_eq!(parse_clock_time(""), None);
    }
}
