// tutor-calendar/src/dto.rs
//! Wire representations and their field-by-field conversions to and from the
//! diesel models. Field names are camelCase on the wire.

use crate::date_utils::{deserialize_local_datetime, deserialize_opt_local_datetime};
use crate::error_handler::ServiceError;
use crate::models::{Client, Label, Lesson, User};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// Distinguishes an absent field (`None`) from an explicit JSON null (`Some(None)`).
fn deserialize_opt_opt_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

// --- Auth / User ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RegisterPayload {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

impl RegisterPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        require_non_blank("username", &self.username)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::BadRequest(format!(
                "password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub telegram_chat_id: Option<Option<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub timezone: String,
    pub telegram_chat_id: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            timezone: user.timezone,
            telegram_chat_id: user.telegram_chat_id,
        }
    }
}

// --- Client ---

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    pub name: String,
    pub phone: String,
    pub timezone: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lesson_price: Option<f64>,
}

impl ClientPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        require_non_blank("name", &self.name)?;
        require_non_blank("phone", &self.phone)?;
        require_non_blank("timezone", &self.timezone)?;
        match self.lesson_price {
            Some(price) if !price.is_finite() || price < 0.0 => Err(ServiceError::BadRequest(
                "lessonPrice must be a non-negative number".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ClientSearchQuery {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub city: Option<String>,
    pub description: Option<String>,
    pub lesson_price: Option<f64>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        ClientResponse {
            id: client.id,
            name: client.name,
            phone: client.phone,
            timezone: client.timezone,
            city: client.city,
            description: client.description,
            lesson_price: client.lesson_price,
        }
    }
}

/// The part of a client embedded in every lesson response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub timezone: String,
}

impl From<&Client> for ClientSummary {
    fn from(client: &Client) -> Self {
        ClientSummary {
            id: client.id,
            name: client.name.clone(),
            phone: client.phone.clone(),
            timezone: client.timezone.clone(),
        }
    }
}

// --- Label ---

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LabelPayload {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

impl LabelPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        require_non_blank("name", &self.name)?;
        if !is_hex_color(&self.color) {
            return Err(ServiceError::BadRequest(format!(
                "color must be a hex value like #FF5733, got '{}'",
                self.color
            )));
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LabelResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub emoji: Option<String>,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        LabelResponse {
            id: label.id,
            name: label.name,
            color: label.color,
            emoji: label.emoji,
        }
    }
}

// --- Lesson ---

/// Body of `POST /lessons` and `PUT /lessons/{id}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonPayload {
    pub client_id: Uuid,
    #[serde(alias = "dateTime", deserialize_with = "deserialize_local_datetime")]
    pub start_time: NaiveDateTime,
    #[serde(default, deserialize_with = "deserialize_opt_local_datetime")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default)]
    pub requires_preparation: bool,
    #[serde(default)]
    pub homework_sent: bool,
    #[serde(default)]
    pub tutor_timezone: Option<String>,
    #[serde(default)]
    pub client_timezone: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<Uuid>,
}

pub const MAX_DESCRIPTION_LEN: usize = 1000;

impl LessonPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        match &self.description {
            Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => Err(ServiceError::BadRequest(
                format!("description must be at most {} characters", MAX_DESCRIPTION_LEN),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonStatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trial: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_preparation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homework_sent: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonLabelsPayload {
    pub label_ids: Vec<Uuid>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub week_start: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
    pub id: Uuid,
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
    pub client: ClientSummary,
    pub labels: Vec<LabelResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LessonResponse {
    pub fn from_parts(lesson: Lesson, client: &Client, labels: Vec<Label>) -> Self {
        LessonResponse {
            id: lesson.id,
            start_time: lesson.start_time,
            end_time: lesson.end_time,
            duration_minutes: lesson.duration_minutes,
            description: lesson.description,
            is_paid: lesson.is_paid,
            is_trial: lesson.is_trial,
            requires_preparation: lesson.requires_preparation,
            homework_sent: lesson.homework_sent,
            tutor_timezone: lesson.tutor_timezone,
            client_timezone: lesson.client_timezone,
            client: ClientSummary::from(client),
            labels: labels.into_iter().map(LabelResponse::from).collect(),
            created_at: lesson.created_at,
            updated_at: lesson.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn sample_client() -> Client {
        Client {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Ivanov Alexey".into(),
            phone: "+79161234567".into(),
            timezone: "Europe/Moscow".into(),
            city: Some("Moscow".into()),
            description: None,
            lesson_price: Some(1500.0),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lesson_payload_accepts_legacy_date_time_field() {
        let client_id = Uuid::new_v4();
        let payload: LessonPayload = serde_json::from_value(json!({
            "clientId": client_id,
            "dateTime": "2025-12-07T17:30:00.782Z",
            "durationMinutes": 60,
            "isPaid": true
        }))
        .unwrap();
        assert_eq!(payload.client_id, client_id);
        assert_eq!(
            payload.start_time.date(),
            NaiveDate::from_ymd_opt(2025, 12, 7).unwrap()
        );
        assert!(payload.is_paid);
        assert!(!payload.is_trial);
        assert!(payload.label_ids.is_empty());
        assert_eq!(payload.tutor_timezone, None);
    }

    #[test]
    fn lesson_payload_rejects_bad_timestamp() {
        let result = serde_json::from_value::<LessonPayload>(json!({
            "clientId": Uuid::new_v4(),
            "startTime": "someday"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn client_response_copies_every_field() {
        let client = sample_client();
        let response = ClientResponse::from(client.clone());
        assert_eq!(response.id, client.id);
        assert_eq!(response.name, client.name);
        assert_eq!(response.phone, client.phone);
        assert_eq!(response.timezone, client.timezone);
        assert_eq!(response.city, client.city);
        assert_eq!(response.description, client.description);
        assert_eq!(response.lesson_price, client.lesson_price);

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["lessonPrice"], json!(1500.0));
    }

    #[test]
    fn lesson_response_embeds_client_and_labels() {
        let client = sample_client();
        let start = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            user_id: client.user_id,
            client_id: client.id,
            start_time: start,
            end_time: None,
            duration_minutes: None,
            description: Some("Trigonometry".into()),
            is_paid: true,
            is_trial: false,
            requires_preparation: true,
            homework_sent: false,
            tutor_timezone: "Europe/Moscow".into(),
            client_timezone: "Europe/Moscow".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let label = Label {
            id: Uuid::new_v4(),
            user_id: client.user_id,
            name: "Important".into(),
            color: "#FFD93D".into(),
            emoji: Some("⭐".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let response = LessonResponse::from_parts(lesson, &client, vec![label.clone()]);
        assert_eq!(response.client.name, client.name);
        assert_eq!(response.labels.len(), 1);
        assert_eq!(response.labels[0].id, label.id);

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["startTime"], "2025-01-06T10:00:00");
        assert_eq!(wire["requiresPreparation"], true);
        assert_eq!(wire["client"]["timezone"], "Europe/Moscow");
    }

    #[test]
    fn label_color_must_be_hex() {
        let mut payload = LabelPayload {
            name: "Hard topic".into(),
            color: "#FF6B6B".into(),
            emoji: Some("🔥".into()),
        };
        assert!(payload.validate().is_ok());
        payload.color = "#abc".into();
        assert!(payload.validate().is_ok());
        payload.color = "red".into();
        assert!(payload.validate().is_err());
        payload.color = "#GGGGGG".into();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn client_payload_validation() {
        let mut payload = ClientPayload {
            name: "Petrova Maria".into(),
            phone: "+79261234568".into(),
            timezone: "Europe/Moscow".into(),
            city: None,
            description: None,
            lesson_price: Some(2000.0),
        };
        assert!(payload.validate().is_ok());
        payload.lesson_price = Some(-1.0);
        assert!(payload.validate().is_err());
        payload.lesson_price = None;
        payload.phone = " ".into();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn register_requires_username_and_password_length() {
        let ok = RegisterPayload {
            username: "tutor".into(),
            password: "password123".into(),
            timezone: None,
        };
        assert!(ok.validate().is_ok());
        let short = RegisterPayload { password: "abc".into(), ..ok.clone() };
        assert!(short.validate().is_err());
        let blank = RegisterPayload { username: "".into(), ..ok };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn update_user_distinguishes_null_from_absent() {
        let absent: UpdateUserPayload = serde_json::from_value(json!({"timezone": "Asia/Tokyo"})).unwrap();
        assert_eq!(absent.telegram_chat_id, None);
        let cleared: UpdateUserPayload = serde_json::from_value(json!({"telegramChatId": null})).unwrap();
        assert_eq!(cleared.telegram_chat_id, Some(None));
        let set: UpdateUserPayload = serde_json::from_value(json!({"telegramChatId": "123"})).unwrap();
        assert_eq!(set.telegram_chat_id, Some(Some("123".into())));
    }
}
