// tutor-calendar/src/client/calendar.rs
//! Week grid and lesson form used by the terminal client.

use crate::dto::{LessonPayload, LessonResponse, MAX_DESCRIPTION_LEN};
use crate::scheduling::{monday_of, shift_weeks, WeekRange};
use chrono::{Duration, NaiveDate, NaiveTime};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_LESSON_MINUTES: i32 = 60;
const DEFAULT_START_HOUR: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub lessons: Vec<LessonResponse>,
}

/// Seven day columns with lessons bucketed by the calendar date of their start time.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekView {
    range: WeekRange,
    days: Vec<DayColumn>,
}

impl WeekView {
    /// Lessons starting outside the week are dropped. `None` when the week
    /// runs past the last representable date.
    pub fn new(week_start: NaiveDate, lessons: Vec<LessonResponse>) -> Option<Self> {
        let range = WeekRange::starting(week_start).ok()?;
        let mut days: Vec<DayColumn> = range
            .days()
            .map(|date| DayColumn {
                date,
                lessons: Vec::new(),
            })
            .collect();

        for lesson in lessons {
            if !range.contains(&lesson.start_time) {
                log::debug!("Lesson {} is outside week {}", lesson.id, week_start);
                continue;
            }
            let offset = (lesson.start_time.date() - range.first_day()).num_days();
            if let Some(column) = usize::try_from(offset).ok().and_then(|i| days.get_mut(i)) {
                column.lessons.push(lesson);
            }
        }

        for column in &mut days {
            column.lessons.sort_by_key(|lesson| lesson.start_time);
        }

        Some(WeekView { range, days })
    }

    /// Empty view of the Monday-based week containing `date`.
    pub fn containing(date: NaiveDate) -> Option<Self> {
        Self::new(monday_of(date)?, Vec::new())
    }

    pub fn week_start(&self) -> NaiveDate {
        self.range.first_day()
    }

    pub fn week_end(&self) -> NaiveDate {
        self.range.last_day()
    }

    pub fn previous_week_start(&self) -> Option<NaiveDate> {
        shift_weeks(self.week_start(), -1)
    }

    pub fn next_week_start(&self) -> Option<NaiveDate> {
        shift_weeks(self.week_start(), 1)
    }

    pub fn days(&self) -> &[DayColumn] {
        &self.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayColumn> {
        self.days.iter().find(|column| column.date == date)
    }

    pub fn lesson_count(&self) -> usize {
        self.days.iter().map(|column| column.lessons.len()).sum()
    }

    pub fn unpaid_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|column| column.lessons.iter())
            .filter(|lesson| !lesson.is_paid)
            .count()
    }
}

fn lesson_end(lesson: &LessonResponse) -> Option<chrono::NaiveDateTime> {
    lesson.end_time.or_else(|| {
        lesson
            .duration_minutes
            .and_then(|minutes| {
                lesson
                    .start_time
                    .checked_add_signed(Duration::minutes(i64::from(minutes)))
            })
    })
}

fn status_flags(lesson: &LessonResponse) -> Vec<&'static str> {
    let mut flags = vec![if lesson.is_paid { "paid" } else { "unpaid" }];
    if lesson.is_trial {
        flags.push("trial");
    }
    if lesson.requires_preparation {
        flags.push("prep");
    }
    if lesson.homework_sent {
        flags.push("hw sent");
    }
    flags
}

impl fmt::Display for WeekView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Week of {} - {} ({} lessons, {} unpaid)",
            self.week_start().format("%d.%m.%Y"),
            self.week_end().format("%d.%m.%Y"),
            self.lesson_count(),
            self.unpaid_count()
        )?;

        for column in &self.days {
            writeln!(f, "{}", column.date.format("%a %d.%m"))?;
            if column.lessons.is_empty() {
                writeln!(f, "  (no lessons)")?;
                continue;
            }
            for lesson in &column.lessons {
                let time = match lesson_end(lesson) {
                    Some(end) => format!(
                        "{}-{}",
                        lesson.start_time.format("%H:%M"),
                        end.format("%H:%M")
                    ),
                    None => lesson.start_time.format("%H:%M").to_string(),
                };
                write!(
                    f,
                    "  {}  {} [{}]",
                    time,
                    lesson.client.name,
                    status_flags(lesson).join(", ")
                )?;
                for label in &lesson.labels {
                    match &label.emoji {
                        Some(emoji) => write!(f, " {}", emoji)?,
                        None => write!(f, " #{}", label.name)?,
                    }
                }
                writeln!(f, "  ({})", lesson.id)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("a client must be selected")]
    MissingClient,
    #[error("duration must be positive, got {0}")]
    InvalidDuration(i32),
    #[error("description must be at most {} characters", MAX_DESCRIPTION_LEN)]
    DescriptionTooLong,
    #[error("lesson ends past the last representable date")]
    EndOutOfRange,
}

/// Editable state of a lesson before it is sent as a `LessonPayload`.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonForm {
    pub client_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub description: String,
    pub is_paid: bool,
    pub is_trial: bool,
    pub requires_preparation: bool,
    pub homework_sent: bool,
    pub tutor_timezone: Option<String>,
    pub client_timezone: Option<String>,
    pub label_ids: Vec<Uuid>,
}

impl LessonForm {
    pub fn for_new(date: NaiveDate) -> Self {
        LessonForm {
            client_id: None,
            date,
            time: NaiveTime::from_hms_opt(DEFAULT_START_HOUR, 0, 0).unwrap_or_default(),
            duration_minutes: DEFAULT_LESSON_MINUTES,
            description: String::new(),
            is_paid: false,
            is_trial: false,
            requires_preparation: false,
            homework_sent: false,
            tutor_timezone: None,
            client_timezone: None,
            label_ids: Vec::new(),
        }
    }

    pub fn from_lesson(lesson: &LessonResponse) -> Self {
        let duration_minutes = lesson
            .duration_minutes
            .or_else(|| {
                lesson.end_time.and_then(|end| {
                    i32::try_from((end - lesson.start_time).num_minutes()).ok()
                })
            })
            .unwrap_or(DEFAULT_LESSON_MINUTES);

        LessonForm {
            client_id: Some(lesson.client.id),
            date: lesson.start_time.date(),
            time: lesson.start_time.time(),
            duration_minutes,
            description: lesson.description.clone().unwrap_or_default(),
            is_paid: lesson.is_paid,
            is_trial: lesson.is_trial,
            requires_preparation: lesson.requires_preparation,
            homework_sent: lesson.homework_sent,
            tutor_timezone: Some(lesson.tutor_timezone.clone()),
            client_timezone: Some(lesson.client_timezone.clone()),
            label_ids: lesson.labels.iter().map(|label| label.id).collect(),
        }
    }

    pub fn to_payload(&self) -> Result<LessonPayload, FormError> {
        let client_id = self.client_id.ok_or(FormError::MissingClient)?;
        if self.duration_minutes <= 0 {
            return Err(FormError::InvalidDuration(self.duration_minutes));
        }
        let description = self.description.trim();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(FormError::DescriptionTooLong);
        }

        let start_time = self.date.and_time(self.time);
        let end_time = start_time
            .checked_add_signed(Duration::minutes(i64::from(self.duration_minutes)))
            .ok_or(FormError::EndOutOfRange)?;
        Ok(LessonPayload {
            client_id,
            start_time,
            end_time: Some(end_time),
            duration_minutes: Some(self.duration_minutes),
            description: (!description.is_empty()).then(|| description.to_string()),
            is_paid: self.is_paid,
            is_trial: self.is_trial,
            requires_preparation: self.requires_preparation,
            homework_sent: self.homework_sent,
            tutor_timezone: self.tutor_timezone.clone(),
            client_timezone: self.client_timezone.clone(),
            label_ids: self.label_ids.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{ClientSummary, LabelResponse};
    use chrono::{NaiveDateTime, Utc};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn lesson(start: NaiveDateTime, client_name: &str, is_paid: bool) -> LessonResponse {
        LessonResponse {
            id: Uuid::new_v4(),
            start_time: start,
            end_time: None,
            duration_minutes: Some(60),
            description: None,
            is_paid,
            is_trial: false,
            requires_preparation: false,
            homework_sent: false,
            tutor_timezone: "Europe/Moscow".into(),
            client_timezone: "Europe/Samara".into(),
            client: ClientSummary {
                id: Uuid::new_v4(),
                name: client_name.into(),
                phone: "+79161234567".into(),
                timezone: "Europe/Samara".into(),
            },
            labels: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn lessons_are_bucketed_by_day_and_sorted() {
        let view = WeekView::new(
            monday(),
            vec![
                lesson(at(8, 18, 0), "Petrova", true),
                lesson(at(8, 9, 30), "Ivanov", false),
                lesson(at(12, 23, 59), "Sidorov", false),
            ],
        )
        .unwrap();

        assert_eq!(view.days().len(), 7);
        let wednesday = view.day(at(8, 0, 0).date()).unwrap();
        let names: Vec<&str> = wednesday.lessons.iter().map(|l| l.client.name.as_str()).collect();
        assert_eq!(names, vec!["Ivanov", "Petrova"]);
        assert_eq!(view.day(at(12, 0, 0).date()).unwrap().lessons.len(), 1);
        assert_eq!(view.lesson_count(), 3);
        assert_eq!(view.unpaid_count(), 2);
    }

    #[test]
    fn lessons_outside_the_week_are_dropped() {
        let view = WeekView::new(
            monday(),
            vec![
                lesson(at(5, 23, 59), "Before", false),
                lesson(at(13, 0, 0), "After", false),
                lesson(at(6, 0, 0), "Start", false),
            ],
        )
        .unwrap();
        assert_eq!(view.lesson_count(), 1);
        assert_eq!(view.days()[0].lessons[0].client.name, "Start");
    }

    #[test]
    fn navigation_moves_by_whole_weeks() {
        let view = WeekView::containing(at(9, 12, 0).date()).unwrap();
        assert_eq!(view.week_start(), monday());
        assert_eq!(view.week_end(), NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());
        assert_eq!(view.previous_week_start(), NaiveDate::from_ymd_opt(2024, 12, 30));
        assert_eq!(view.next_week_start(), NaiveDate::from_ymd_opt(2025, 1, 13));
    }

    #[test]
    fn weeks_at_the_calendar_edge_have_no_view() {
        assert!(WeekView::new(NaiveDate::MAX, Vec::new()).is_none());

        let last_week = WeekView::new(NaiveDate::MAX - Duration::days(7), Vec::new()).unwrap();
        assert_eq!(last_week.next_week_start(), Some(NaiveDate::MAX));
        assert!(WeekView::new(last_week.next_week_start().unwrap(), Vec::new()).is_none());
    }

    #[test]
    fn lesson_ending_past_the_calendar_renders_start_only() {
        let mut late = lesson(NaiveDate::MAX.and_hms_opt(23, 30, 0).unwrap(), "Late", false);
        late.duration_minutes = Some(120);
        assert_eq!(lesson_end(&late), None);
    }

    #[test]
    fn display_lists_every_day() {
        let mut labelled = lesson(at(7, 16, 0), "Ivanov", true);
        labelled.labels.push(LabelResponse {
            id: Uuid::new_v4(),
            name: "Hard topic".into(),
            color: "#FF6B6B".into(),
            emoji: Some("🔥".into()),
        });
        let rendered = WeekView::new(monday(), vec![labelled]).unwrap().to_string();

        assert!(rendered.starts_with("Week of 06.01.2025 - 12.01.2025 (1 lessons, 0 unpaid)"));
        assert!(rendered.contains("Tue 07.01"));
        assert!(rendered.contains("16:00-17:00  Ivanov [paid] 🔥"));
        assert_eq!(rendered.matches("(no lessons)").count(), 6);
    }

    #[test]
    fn new_form_defaults_and_requires_client() {
        let form = LessonForm::for_new(monday());
        assert_eq!(form.time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(form.duration_minutes, DEFAULT_LESSON_MINUTES);
        assert_eq!(form.to_payload(), Err(FormError::MissingClient));
    }

    #[test]
    fn form_builds_payload_with_end_time() {
        let mut form = LessonForm::for_new(monday());
        let client_id = Uuid::new_v4();
        form.client_id = Some(client_id);
        form.duration_minutes = 90;
        form.description = "  Quadratic equations ".into();

        let payload = form.to_payload().unwrap();
        assert_eq!(payload.client_id, client_id);
        assert_eq!(payload.start_time, at(6, 10, 0));
        assert_eq!(payload.end_time, Some(at(6, 11, 30)));
        assert_eq!(payload.duration_minutes, Some(90));
        assert_eq!(payload.description.as_deref(), Some("Quadratic equations"));
        assert_eq!(payload.tutor_timezone, None);
    }

    #[test]
    fn form_rejects_bad_duration_and_long_description() {
        let mut form = LessonForm::for_new(monday());
        form.client_id = Some(Uuid::new_v4());
        form.duration_minutes = 0;
        assert_eq!(form.to_payload(), Err(FormError::InvalidDuration(0)));

        form.duration_minutes = 45;
        form.description = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert_eq!(form.to_payload(), Err(FormError::DescriptionTooLong));
    }

    #[test]
    fn form_rejects_end_past_the_calendar() {
        let mut form = LessonForm::for_new(NaiveDate::MAX);
        form.client_id = Some(Uuid::new_v4());
        form.duration_minutes = i32::MAX;
        assert_eq!(form.to_payload(), Err(FormError::EndOutOfRange));
    }

    #[test]
    fn form_round_trips_an_existing_lesson() {
        let mut existing = lesson(at(9, 15, 0), "Petrova", true);
        existing.duration_minutes = None;
        existing.end_time = Some(at(9, 16, 30));
        existing.description = Some("Mock exam".into());

        let form = LessonForm::from_lesson(&existing);
        assert_eq!(form.client_id, Some(existing.client.id));
        assert_eq!(form.duration_minutes, 90);
        assert_eq!(form.client_timezone.as_deref(), Some("Europe/Samara"));

        let payload = form.to_payload().unwrap();
        assert_eq!(payload.start_time, existing.start_time);
        assert_eq!(payload.end_time, existing.end_time);
        assert!(payload.is_paid);
    }
}
