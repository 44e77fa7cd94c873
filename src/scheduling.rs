// tutor-calendar/src/scheduling.rs
//! Lesson rules shared by the lesson handlers and the calendar client.

use crate::error_handler::ServiceError;
use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

pub const DAYS_IN_WEEK: i64 = 7;

/// The seven calendar days starting at `start`, as a half-open timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub start: NaiveDateTime,
    pub end_exclusive: NaiveDateTime,
}

impl WeekRange {
    /// Fails when the week runs past the last representable date.
    pub fn starting(week_start: NaiveDate) -> Result<Self, ServiceError> {
        let start = week_start.and_time(NaiveTime::MIN);
        let end_exclusive = start
            .checked_add_signed(Duration::days(DAYS_IN_WEEK))
            .ok_or_else(|| {
                ServiceError::BadRequest(format!("Week starting {} is out of range", week_start))
            })?;
        Ok(WeekRange {
            start,
            end_exclusive,
        })
    }

    pub fn contains(&self, instant: &NaiveDateTime) -> bool {
        *instant >= self.start && *instant < self.end_exclusive
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end_exclusive
            .date()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.first_day().iter_days().take(DAYS_IN_WEEK as usize)
    }
}

/// Monday of the ISO week containing `date`, `None` before the first representable Monday.
pub fn monday_of(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// Moves a date by whole weeks, `None` when the result is not representable.
pub fn shift_weeks(date: NaiveDate, weeks: i64) -> Option<NaiveDate> {
    let days = weeks.checked_mul(DAYS_IN_WEEK)?;
    let delta = Duration::try_days(days)?;
    date.checked_add_signed(delta)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonTiming {
    pub end_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
}

/// Fills in whichever of end time / duration is missing.
pub fn resolve_timing(
    start: NaiveDateTime,
    end_time: Option<NaiveDateTime>,
    duration_minutes: Option<i32>,
) -> Result<LessonTiming, ServiceError> {
    if let Some(minutes) = duration_minutes {
        if minutes <= 0 {
            return Err(ServiceError::BadRequest(format!(
                "durationMinutes must be positive, got {}",
                minutes
            )));
        }
    }

    match (end_time, duration_minutes) {
        (Some(end), _) if end < start => Err(ServiceError::BadRequest(
            "endTime cannot be before startTime".to_string(),
        )),
        (Some(end), None) => {
            let minutes = (end - start).num_minutes();
            Ok(LessonTiming {
                end_time: Some(end),
                duration_minutes: i32::try_from(minutes).ok().filter(|m| *m > 0),
            })
        }
        (None, Some(minutes)) => {
            let end = start
                .checked_add_signed(Duration::minutes(i64::from(minutes)))
                .ok_or_else(|| {
                    ServiceError::BadRequest(format!(
                        "startTime plus {} minutes is out of range",
                        minutes
                    ))
                })?;
            Ok(LessonTiming {
                end_time: Some(end),
                duration_minutes: Some(minutes),
            })
        }
        (end, duration) => Ok(LessonTiming {
            end_time: end,
            duration_minutes: duration,
        }),
    }
}

/// Explicit value when present and non-blank, stored default otherwise.
pub fn timezone_or_default(explicit: Option<&str>, stored: &str) -> String {
    match explicit.map(str::trim) {
        Some(tz) if !tz.is_empty() => tz.to_string(),
        _ => stored.to_string(),
    }
}

/// Keeps the requested label ids the user owns, de-duplicated, in request order.
pub fn retain_owned_labels(requested: &[Uuid], owned: &[Uuid]) -> Vec<Uuid> {
    let mut kept: Vec<Uuid> = Vec::with_capacity(requested.len());
    for label_id in requested {
        if owned.contains(label_id) && !kept.contains(label_id) {
            kept.push(*label_id);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_range_is_inclusive_of_last_day() {
        let week = WeekRange::starting(date(2025, 1, 6)).unwrap();
        assert!(week.contains(&date(2025, 1, 6).and_hms_opt(0, 0, 0).unwrap()));
        assert!(week.contains(&date(2025, 1, 12).and_hms_milli_opt(23, 59, 59, 999).unwrap()));
        assert!(!week.contains(&date(2025, 1, 13).and_hms_opt(0, 0, 0).unwrap()));
        assert!(!week.contains(&date(2025, 1, 5).and_hms_opt(23, 59, 59).unwrap()));
        assert_eq!(week.last_day(), date(2025, 1, 12));
    }

    #[test]
    fn week_days_span_seven_dates() {
        let days: Vec<_> = WeekRange::starting(date(2024, 12, 30)).unwrap().days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date(2024, 12, 30));
        assert_eq!(days[6], date(2025, 1, 5));
    }

    #[test]
    fn monday_of_handles_every_weekday() {
        assert_eq!(monday_of(date(2025, 1, 6)), Some(date(2025, 1, 6)));
        assert_eq!(monday_of(date(2025, 1, 9)), Some(date(2025, 1, 6)));
        assert_eq!(monday_of(date(2025, 1, 12)), Some(date(2025, 1, 6)));
    }

    #[test]
    fn week_at_the_end_of_the_calendar_is_rejected() {
        let last_week = NaiveDate::MAX - Duration::days(3);
        assert!(matches!(
            WeekRange::starting(last_week),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(WeekRange::starting(NaiveDate::MAX - Duration::days(7)).is_ok());
    }

    #[test]
    fn extended_year_week_start_is_rejected() {
        let query: crate::dto::WeekQuery =
            serde_json::from_value(serde_json::json!({ "weekStart": "+262142-12-31" })).unwrap();
        assert!(matches!(
            WeekRange::starting(query.week_start),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn monday_of_first_representable_dates() {
        assert_eq!(monday_of(NaiveDate::MIN), None);
    }

    #[test]
    fn shifting_weeks_stays_in_range() {
        assert_eq!(shift_weeks(date(2025, 1, 6), -1), Some(date(2024, 12, 30)));
        assert_eq!(shift_weeks(date(2025, 1, 6), 2), Some(date(2025, 1, 20)));
        assert_eq!(shift_weeks(date(2025, 1, 6), i64::MAX), None);
        assert_eq!(shift_weeks(date(2025, 1, 6), 1_000_000_000_000), None);
    }

    #[test]
    fn end_time_derived_from_duration() {
        let start = date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap();
        let timing = resolve_timing(start, None, Some(90)).unwrap();
        assert_eq!(timing.end_time, Some(date(2025, 1, 6).and_hms_opt(11, 30, 0).unwrap()));
        assert_eq!(timing.duration_minutes, Some(90));
    }

    #[test]
    fn duration_derived_from_end_time() {
        let start = date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap();
        let end = date(2025, 1, 6).and_hms_opt(10, 45, 0).unwrap();
        let timing = resolve_timing(start, Some(end), None).unwrap();
        assert_eq!(timing.duration_minutes, Some(45));
    }

    #[test]
    fn explicit_end_wins_over_duration() {
        let start = date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap();
        let end = date(2025, 1, 6).and_hms_opt(11, 0, 0).unwrap();
        let timing = resolve_timing(start, Some(end), Some(30)).unwrap();
        assert_eq!(timing.end_time, Some(end));
        assert_eq!(timing.duration_minutes, Some(30));
    }

    #[test]
    fn neither_end_nor_duration_stays_open() {
        let start = date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap();
        let timing = resolve_timing(start, None, None).unwrap();
        assert_eq!(timing, LessonTiming { end_time: None, duration_minutes: None });
    }

    #[test]
    fn invalid_timing_is_rejected() {
        let start = date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap();
        let before = date(2025, 1, 6).and_hms_opt(9, 0, 0).unwrap();
        assert!(matches!(
            resolve_timing(start, Some(before), None),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_timing(start, None, Some(0)),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn duration_past_the_calendar_end_is_rejected() {
        let start = NaiveDate::MAX.and_hms_opt(10, 0, 0).unwrap();
        assert!(matches!(
            resolve_timing(start, None, Some(i32::MAX)),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn timezone_falls_back_to_stored_value() {
        assert_eq!(timezone_or_default(None, "Europe/Moscow"), "Europe/Moscow");
        assert_eq!(timezone_or_default(Some("  "), "Europe/Samara"), "Europe/Samara");
        assert_eq!(timezone_or_default(Some("Asia/Tokyo"), "Europe/Moscow"), "Asia/Tokyo");
    }

    #[test]
    fn foreign_and_duplicate_labels_are_dropped() {
        let mine_a = Uuid::new_v4();
        let mine_b = Uuid::new_v4();
        let foreign = Uuid::new_v4();
        let kept = retain_owned_labels(&[mine_b, foreign, mine_a, mine_b], &[mine_a, mine_b]);
        assert_eq!(kept, vec![mine_b, mine_a]);
    }
}
