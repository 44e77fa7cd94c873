// tutor-calendar/src/client/api_client.rs
use crate::auth_utils::USER_ID_HEADER;
use crate::dto::{
    ClientPayload, ClientResponse, LabelPayload, LabelResponse, LessonLabelsPayload, LessonPayload,
    LessonResponse, LessonStatusPayload, LoginPayload, RegisterPayload, UpdateUserPayload,
    UserResponse,
};
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not logged in; call login or register first")]
    NotLoggedIn,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::NotLoggedIn => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the tutor calendar API. After `login` or `register` every
/// request carries the user id in the `X-User-Id` header.
#[derive(Debug, Clone)]
pub struct TutorApiClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Option<Uuid>,
}

impl TutorApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        TutorApiClient {
            http,
            base_url,
            user_id: None,
        }
    }

    /// Reuses a user id obtained earlier instead of logging in again.
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn logout(&mut self) {
        self.user_id = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let user_id = self.user_id.ok_or(ClientError::NotLoggedIn)?;
        Ok(self
            .anonymous(method, path)
            .header(USER_ID_HEADER, user_id.to_string()))
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body
                }
            });
        log::debug!("API error {}: {}", status, message);
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_discarding(request: RequestBuilder) -> Result<(), ClientError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    // --- Health / auth / user ---

    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        Self::send_json(self.anonymous(Method::GET, "/health")).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<UserResponse, ClientError> {
        let payload = LoginPayload {
            username: username.to_string(),
            password: password.to_string(),
        };
        let user: UserResponse =
            Self::send_json(self.anonymous(Method::POST, "/auth/login").json(&payload)).await?;
        self.user_id = Some(user.id);
        Ok(user)
    }

    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
        timezone: Option<String>,
    ) -> Result<UserResponse, ClientError> {
        let payload = RegisterPayload {
            username: username.to_string(),
            password: password.to_string(),
            timezone,
        };
        let user: UserResponse =
            Self::send_json(self.anonymous(Method::POST, "/auth/register").json(&payload)).await?;
        self.user_id = Some(user.id);
        Ok(user)
    }

    pub async fn current_user(&self) -> Result<UserResponse, ClientError> {
        Self::send_json(self.authed(Method::GET, "/users/me")?).await
    }

    pub async fn update_current_user(
        &self,
        payload: &UpdateUserPayload,
    ) -> Result<UserResponse, ClientError> {
        Self::send_json(self.authed(Method::PUT, "/users/me")?.json(payload)).await
    }

    // --- Clients ---

    pub async fn list_clients(&self) -> Result<Vec<ClientResponse>, ClientError> {
        Self::send_json(self.authed(Method::GET, "/clients")?).await
    }

    pub async fn search_clients(&self, name: &str) -> Result<Vec<ClientResponse>, ClientError> {
        Self::send_json(
            self.authed(Method::GET, "/clients/search")?
                .query(&[("name", name)]),
        )
        .await
    }

    pub async fn get_client(&self, client_id: Uuid) -> Result<ClientResponse, ClientError> {
        Self::send_json(self.authed(Method::GET, &format!("/clients/{}", client_id))?).await
    }

    pub async fn create_client(&self, payload: &ClientPayload) -> Result<ClientResponse, ClientError> {
        Self::send_json(self.authed(Method::POST, "/clients")?.json(payload)).await
    }

    pub async fn update_client(
        &self,
        client_id: Uuid,
        payload: &ClientPayload,
    ) -> Result<ClientResponse, ClientError> {
        Self::send_json(
            self.authed(Method::PUT, &format!("/clients/{}", client_id))?
                .json(payload),
        )
        .await
    }

    pub async fn delete_client(&self, client_id: Uuid) -> Result<(), ClientError> {
        Self::send_discarding(self.authed(Method::DELETE, &format!("/clients/{}", client_id))?).await
    }

    // --- Labels ---

    pub async fn list_labels(&self) -> Result<Vec<LabelResponse>, ClientError> {
        Self::send_json(self.authed(Method::GET, "/labels")?).await
    }

    pub async fn create_label(&self, payload: &LabelPayload) -> Result<LabelResponse, ClientError> {
        Self::send_json(self.authed(Method::POST, "/labels")?.json(payload)).await
    }

    pub async fn update_label(
        &self,
        label_id: Uuid,
        payload: &LabelPayload,
    ) -> Result<LabelResponse, ClientError> {
        Self::send_json(
            self.authed(Method::PUT, &format!("/labels/{}", label_id))?
                .json(payload),
        )
        .await
    }

    pub async fn delete_label(&self, label_id: Uuid) -> Result<(), ClientError> {
        Self::send_discarding(self.authed(Method::DELETE, &format!("/labels/{}", label_id))?).await
    }

    // --- Lessons ---

    pub async fn list_lessons(&self) -> Result<Vec<LessonResponse>, ClientError> {
        Self::send_json(self.authed(Method::GET, "/lessons")?).await
    }

    pub async fn week_lessons(&self, week_start: NaiveDate) -> Result<Vec<LessonResponse>, ClientError> {
        Self::send_json(
            self.authed(Method::GET, "/lessons/week")?
                .query(&[("weekStart", week_start.format("%Y-%m-%d").to_string())]),
        )
        .await
    }

    pub async fn client_lessons(&self, client_id: Uuid) -> Result<Vec<LessonResponse>, ClientError> {
        Self::send_json(self.authed(Method::GET, &format!("/lessons/client/{}", client_id))?).await
    }

    pub async fn label_lessons(&self, label_id: Uuid) -> Result<Vec<LessonResponse>, ClientError> {
        Self::send_json(self.authed(Method::GET, &format!("/lessons/label/{}", label_id))?).await
    }

    pub async fn get_lesson(&self, lesson_id: Uuid) -> Result<LessonResponse, ClientError> {
        Self::send_json(self.authed(Method::GET, &format!("/lessons/{}", lesson_id))?).await
    }

    pub async fn create_lesson(&self, payload: &LessonPayload) -> Result<LessonResponse, ClientError> {
        Self::send_json(self.authed(Method::POST, "/lessons")?.json(payload)).await
    }

    pub async fn update_lesson(
        &self,
        lesson_id: Uuid,
        payload: &LessonPayload,
    ) -> Result<LessonResponse, ClientError> {
        Self::send_json(
            self.authed(Method::PUT, &format!("/lessons/{}", lesson_id))?
                .json(payload),
        )
        .await
    }

    pub async fn delete_lesson(&self, lesson_id: Uuid) -> Result<(), ClientError> {
        Self::send_discarding(self.authed(Method::DELETE, &format!("/lessons/{}", lesson_id))?).await
    }

    pub async fn update_lesson_status(
        &self,
        lesson_id: Uuid,
        payload: &LessonStatusPayload,
    ) -> Result<LessonResponse, ClientError> {
        Self::send_json(
            self.authed(Method::PATCH, &format!("/lessons/{}/status", lesson_id))?
                .json(payload),
        )
        .await
    }

    pub async fn replace_lesson_labels(
        &self,
        lesson_id: Uuid,
        label_ids: Vec<Uuid>,
    ) -> Result<LessonResponse, ClientError> {
        Self::send_json(
            self.authed(Method::PATCH, &format!("/lessons/{}/labels", lesson_id))?
                .json(&LessonLabelsPayload { label_ids }),
        )
        .await
    }

    pub async fn add_label_to_lesson(
        &self,
        lesson_id: Uuid,
        label_id: Uuid,
    ) -> Result<LessonResponse, ClientError> {
        Self::send_json(self.authed(
            Method::POST,
            &format!("/lessons/{}/labels/{}", lesson_id, label_id),
        )?)
        .await
    }

    pub async fn remove_label_from_lesson(
        &self,
        lesson_id: Uuid,
        label_id: Uuid,
    ) -> Result<LessonResponse, ClientError> {
        Self::send_json(self.authed(
            Method::DELETE,
            &format!("/lessons/{}/labels/{}", lesson_id, label_id),
        )?)
        .await
    }

    pub async fn lesson_labels(&self, lesson_id: Uuid) -> Result<Vec<LabelResponse>, ClientError> {
        Self::send_json(self.authed(Method::GET, &format!("/lessons/{}/labels", lesson_id))?).await
    }
}

impl Default for TutorApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn user_json(id: Uuid) -> serde_json::Value {
        json!({
            "id": id,
            "username": "tutor",
            "timezone": "Europe/Moscow",
            "telegramChatId": null
        })
    }

    fn lesson_json(id: Uuid, start: &str) -> serde_json::Value {
        json!({
            "id": id,
            "startTime": start,
            "endTime": null,
            "durationMinutes": 60,
            "description": null,
            "isPaid": false,
            "isTrial": false,
            "requiresPreparation": false,
            "homeworkSent": false,
            "tutorTimezone": "Europe/Moscow",
            "clientTimezone": "Europe/Moscow",
            "client": {
                "id": Uuid::new_v4(),
                "name": "Ivanov Alexey",
                "phone": "+79161234567",
                "timezone": "Europe/Moscow"
            },
            "labels": [],
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn login_stores_user_id_for_later_calls() {
        let server = MockServer::start_async().await;
        let user_id = Uuid::new_v4();

        let login = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .json_body(json!({"username": "tutor", "password": "password123"}));
                then.status(200).json_body(user_json(user_id));
            })
            .await;
        let labels = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/labels")
                    .header("X-User-Id", user_id.to_string());
                then.status(200).json_body(json!([]));
            })
            .await;

        let mut client = TutorApiClient::new(server.url("/api/"));
        let user = client.login("tutor", "password123").await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(client.user_id(), Some(user_id));

        let listed = client.list_labels().await.unwrap();
        assert!(listed.is_empty());

        login.assert_async().await;
        labels.assert_async().await;
    }

    #[tokio::test]
    async fn calls_before_login_fail_locally() {
        let client = TutorApiClient::new("http://127.0.0.1:9/api");
        let err = client.list_clients().await.unwrap_err();
        assert!(matches!(err, ClientError::NotLoggedIn));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn week_query_sends_week_start() {
        let server = MockServer::start_async().await;
        let user_id = Uuid::new_v4();
        let lesson_id = Uuid::new_v4();

        let week = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/lessons/week")
                    .query_param("weekStart", "2025-01-06")
                    .header("X-User-Id", user_id.to_string());
                then.status(200)
                    .json_body(json!([lesson_json(lesson_id, "2025-01-08T16:00:00")]));
            })
            .await;

        let client = TutorApiClient::new(server.url("/api")).with_user_id(user_id);
        let lessons = client
            .week_lessons(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
            .await
            .unwrap();

        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id, lesson_id);
        assert_eq!(lessons[0].client.name, "Ivanov Alexey");
        week.assert_async().await;
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let server = MockServer::start_async().await;
        let lesson_id = Uuid::new_v4();

        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("/api/lessons/{}", lesson_id));
                then.status(404).json_body(json!({
                    "status": "error",
                    "statusCode": 404,
                    "message": "Not Found: Lesson not found"
                }));
            })
            .await;

        let client = TutorApiClient::new(server.url("/api")).with_user_id(Uuid::new_v4());
        let err = client.delete_lesson(lesson_id).await.unwrap_err();
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found: Lesson not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_patch_sends_only_given_flags() {
        let server = MockServer::start_async().await;
        let lesson_id = Uuid::new_v4();

        let patch = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path(format!("/api/lessons/{}/status", lesson_id))
                    .json_body(json!({"isPaid": true}));
                then.status(200)
                    .json_body(lesson_json(lesson_id, "2025-01-08T16:00:00"));
            })
            .await;

        let client = TutorApiClient::new(server.url("/api")).with_user_id(Uuid::new_v4());
        let status = LessonStatusPayload {
            is_paid: Some(true),
            ..LessonStatusPayload::default()
        };
        let lesson = client.update_lesson_status(lesson_id, &status).await.unwrap();
        assert_eq!(lesson.id, lesson_id);
        patch.assert_async().await;
    }
}
