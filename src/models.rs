// tutor-calendar/src/models.rs
use crate::schema::{clients, labels, lesson_labels, lessons, users};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

// --- User Model ---
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub timezone: String,
    pub telegram_chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub timezone: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = users)]
pub struct UpdateUserChangeset {
    pub timezone: Option<String>,
    pub telegram_chat_id: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

// --- Client Model ---
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = clients)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub city: Option<String>,
    pub description: Option<String>,
    pub lesson_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub city: Option<String>,
    pub description: Option<String>,
    pub lesson_price: Option<f64>,
}

// Replace-style update: nullable columns are always written, so `None` clears them.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = clients)]
#[diesel(treat_none_as_null = true)]
pub struct ClientChangeset {
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub city: Option<String>,
    pub description: Option<String>,
    pub lesson_price: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

// --- Label Model ---
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = labels)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Label {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = labels)]
pub struct NewLabel {
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub emoji: Option<String>,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = labels)]
#[diesel(treat_none_as_null = true)]
pub struct LabelChangeset {
    pub name: String,
    pub color: String,
    pub emoji: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// --- Lesson Model ---
// Labels live in `lesson_labels`; the API response assembles them separately.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = lessons)]
#[diesel(belongs_to(Client))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Lesson {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
    pub is_paid: bool,
    pub is_trial: bool,
    pub requires_preparation: bool,
    pub homework_sent: bool,
    pub tutor_timezone: String,
    pub client_timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = lessons)]
pub struct NewLesson {
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
    pub is_paid: bool,
    pub is_trial: bool,
    pub requires_preparation: bool,
    pub homework_sent: bool,
    pub tutor_timezone: String,
    pub client_timezone: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = lessons)]
#[diesel(treat_none_as_null = true)]
pub struct LessonChangeset {
    pub client_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
    pub is_paid: bool,
    pub is_trial: bool,
    pub requires_preparation: bool,
    pub homework_sent: bool,
    pub tutor_timezone: String,
    pub client_timezone: String,
    pub updated_at: DateTime<Utc>,
}

// Partial flag update for PATCH /lessons/{id}/status; `None` leaves the column alone.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = lessons)]
pub struct LessonStatusChangeset {
    pub is_paid: Option<bool>,
    pub is_trial: Option<bool>,
    pub requires_preparation: Option<bool>,
    pub homework_sent: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

// --- LessonLabel Model ---
#[derive(Queryable, Selectable, Associations, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = lesson_labels)]
#[diesel(belongs_to(Lesson))]
#[diesel(belongs_to(Label))]
#[diesel(primary_key(lesson_id, label_id))]
pub struct LessonLabel {
    pub lesson_id: Uuid,
    pub label_id: Uuid,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = lesson_labels)]
pub struct NewLessonLabelAssociation {
    pub lesson_id: Uuid,
    pub label_id: Uuid,
}
