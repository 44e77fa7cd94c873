// tutor-calendar/src/client/mod.rs
//! Client side of the tutor calendar: a typed HTTP client for the `/api`
//! routes and the week view model the terminal client renders.

pub mod api_client;
pub mod calendar;

pub use api_client::{ClientError, TutorApiClient};
pub use calendar::{DayColumn, LessonForm, WeekView};
