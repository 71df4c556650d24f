use chrono::{Datelike, Duration, NaiveDate};

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_month_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_day_of_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1)?;
    let last_day_of_current_month = first_day_of_next_month - Duration::days(1);
    Some(last_day_of_current_month.day())
}

/// Last calendar day of the month `date` falls in.
pub(crate) fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let day = days_in_month(date.year(), date.month())?;
    NaiveDate::from_ymd_opt(date.year(), date.month(), day)
}

/// Number of leap years in `[start_year, end_year)`.
pub(crate) fn leap_days_between(start_year: i32, end_year: i32) -> i64 {
    if end_year <= start_year {
        return 0;
    }
    // Leap years up to and including `y`, for the proleptic Gregorian calendar.
    let leaps_through = |y: i64| y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400);
    leaps_through(end_year as i64 - 1) - leaps_through(start_year as i64 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_leap_year(year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    #[test]
    fn test_days_in_month_handles_february() {
        assert_eq!(days_in_month(2020, 2), Some(29));
        assert_eq!(days_in_month(2021, 2), Some(28));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2021, 13), None);
    }

    #[test]
    fn test_leap_days_between_matches_per_year_count() {
        for start in 1890..1910 {
            for end in start..1930 {
                let expected = (start..end).filter(|y| is_leap_year(*y)).count() as i64;
                assert_eq!(leap_days_between(start, end), expected, "{start}..{end}");
            }
        }
        assert_eq!(leap_days_between(2020, 2024), 1);
        assert_eq!(leap_days_between(2021, 2024), 0);
        assert_eq!(leap_days_between(2024, 2020), 0);
    }

    #[test]
    fn test_month_boundaries() {
        let date = NaiveDate::from_ymd_opt(2021, 12, 15).unwrap();
        assert_eq!(
            last_day_of_month(date),
            NaiveDate::from_ymd_opt(2021, 12, 31)
        );
        let leap = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        assert_eq!(last_day_of_month(leap), NaiveDate::from_ymd_opt(2024, 2, 29));
    }
}
