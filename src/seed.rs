// tutor-calendar/src/seed.rs
//! Optional demo data, loaded at startup when `SEED_DEMO_DATA=true`.
//! Every step is skipped when its table already holds rows.

use crate::auth_utils::hash_password;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::models::{
    Client, Label, Lesson, NewClient, NewLabel, NewLesson, NewLessonLabelAssociation, NewUser, User,
};
use crate::schema::{clients, labels, lesson_labels, lessons, users};
use chrono::{Duration, NaiveTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

pub const DEMO_USERNAME: &str = "tutor";
pub const DEMO_PASSWORD: &str = "password123";

struct DemoClient {
    name: &'static str,
    phone: &'static str,
    timezone: &'static str,
    city: &'static str,
    description: &'static str,
    price: f64,
}

const DEMO_CLIENTS: [DemoClient; 3] = [
    DemoClient {
        name: "Alexey Ivanov",
        phone: "+79161234567",
        timezone: "Europe/Moscow",
        city: "Moscow",
        description: "8th grade, exam preparation",
        price: 1500.0,
    },
    DemoClient {
        name: "Maria Petrova",
        phone: "+79261234568",
        timezone: "Europe/Moscow",
        city: "Moscow",
        description: "10th grade, final exam preparation",
        price: 2000.0,
    },
    DemoClient {
        name: "Dmitry Sidorov",
        phone: "+79361234569",
        timezone: "Europe/Samara",
        city: "Samara",
        description: "First-year student, calculus",
        price: 1800.0,
    },
];

const DEMO_LABELS: [(&str, &str, &str); 4] = [
    ("Hard topic", "#FF6B6B", "🔥"),
    ("Needs review", "#4ECDC4", "📝"),
    ("Important", "#FFD93D", "⭐"),
    ("Revision", "#6BCF7F", "🔄"),
];

pub async fn seed_demo_data(pool: &DbPool, default_timezone: &str) -> Result<(), ServiceError> {
    log::info!("=== Seeding demo data ===");
    let mut conn = pool.get().await?;

    let tutor = ensure_demo_user(&mut conn, default_timezone).await?;
    let seeded_clients = ensure_demo_clients(&mut conn, &tutor).await?;
    let seeded_labels = ensure_demo_labels(&mut conn, &tutor).await?;
    ensure_demo_lesson(&mut conn, &tutor, &seeded_clients, &seeded_labels).await?;

    let user_count: i64 = users::table.count().get_result(&mut conn).await?;
    let client_count: i64 = clients::table.count().get_result(&mut conn).await?;
    let lesson_count: i64 = lessons::table.count().get_result(&mut conn).await?;
    let label_count: i64 = labels::table.count().get_result(&mut conn).await?;
    log::info!(
        "Demo data ready: {} users, {} clients, {} lessons, {} labels",
        user_count,
        client_count,
        lesson_count,
        label_count
    );
    Ok(())
}

async fn ensure_demo_user(
    conn: &mut AsyncPgConnection,
    default_timezone: &str,
) -> Result<User, ServiceError> {
    let existing = users::table
        .filter(users::username.eq(DEMO_USERNAME))
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?;

    if let Some(user) = existing {
        log::info!("User '{}' already exists", DEMO_USERNAME);
        return Ok(user);
    }

    let new_user = NewUser {
        username: DEMO_USERNAME.to_string(),
        password_hash: hash_password(DEMO_PASSWORD)?,
        timezone: default_timezone.to_string(),
    };
    let created = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result::<User>(conn)
        .await?;
    log::info!("User '{}' created with id {}", DEMO_USERNAME, created.id);
    Ok(created)
}

async fn ensure_demo_clients(
    conn: &mut AsyncPgConnection,
    tutor: &User,
) -> Result<Vec<Client>, ServiceError> {
    let existing = clients::table
        .filter(clients::user_id.eq(tutor.id))
        .order(clients::name.asc())
        .select(Client::as_select())
        .load::<Client>(conn)
        .await?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let rows: Vec<NewClient> = DEMO_CLIENTS
        .iter()
        .map(|demo| NewClient {
            user_id: tutor.id,
            name: demo.name.to_string(),
            phone: demo.phone.to_string(),
            timezone: demo.timezone.to_string(),
            city: Some(demo.city.to_string()),
            description: Some(demo.description.to_string()),
            lesson_price: Some(demo.price),
        })
        .collect();

    let created = diesel::insert_into(clients::table)
        .values(&rows)
        .get_results::<Client>(conn)
        .await?;
    log::info!("Created {} demo clients", created.len());
    Ok(created)
}

async fn ensure_demo_labels(
    conn: &mut AsyncPgConnection,
    tutor: &User,
) -> Result<Vec<Label>, ServiceError> {
    let existing = labels::table
        .filter(labels::user_id.eq(tutor.id))
        .order(labels::name.asc())
        .select(Label::as_select())
        .load::<Label>(conn)
        .await?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let rows: Vec<NewLabel> = DEMO_LABELS
        .iter()
        .map(|(label_name, color, emoji)| NewLabel {
            user_id: tutor.id,
            name: label_name.to_string(),
            color: color.to_string(),
            emoji: Some(emoji.to_string()),
        })
        .collect();

    let created = diesel::insert_into(labels::table)
        .values(&rows)
        .get_results::<Label>(conn)
        .await?;
    log::info!("Created {} demo labels", created.len());
    Ok(created)
}

/// The first demo client when it still exists, else the alphabetically first one.
fn lesson_client(seeded: &[Client]) -> Option<&Client> {
    seeded
        .iter()
        .find(|client| client.name == DEMO_CLIENTS[0].name)
        .or_else(|| seeded.iter().min_by(|a, b| a.name.cmp(&b.name)))
}

fn lesson_label(seeded: &[Label]) -> Option<&Label> {
    seeded
        .iter()
        .find(|label| label.name == DEMO_LABELS[0].0)
        .or_else(|| seeded.iter().min_by(|a, b| a.name.cmp(&b.name)))
}

async fn ensure_demo_lesson(
    conn: &mut AsyncPgConnection,
    tutor: &User,
    seeded_clients: &[Client],
    seeded_labels: &[Label],
) -> Result<(), ServiceError> {
    let lesson_count: i64 = lessons::table
        .filter(lessons::user_id.eq(tutor.id))
        .count()
        .get_result(conn)
        .await?;
    let Some(client) = lesson_client(seeded_clients) else {
        return Ok(());
    };
    if lesson_count > 0 {
        return Ok(());
    }

    let ten_am = NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default();
    let start = (Utc::now().date_naive() + Duration::days(1)).and_time(ten_am);
    let new_lesson = NewLesson {
        user_id: tutor.id,
        client_id: client.id,
        start_time: start,
        end_time: Some(start + Duration::minutes(60)),
        duration_minutes: Some(60),
        description: Some("Trigonometry, solving equations".to_string()),
        is_paid: true,
        is_trial: false,
        requires_preparation: false,
        homework_sent: false,
        tutor_timezone: tutor.timezone.clone(),
        client_timezone: client.timezone.clone(),
    };

    let lesson = diesel::insert_into(lessons::table)
        .values(&new_lesson)
        .get_result::<Lesson>(conn)
        .await?;

    if let Some(label) = lesson_label(seeded_labels) {
        diesel::insert_into(lesson_labels::table)
            .values(&NewLessonLabelAssociation {
                lesson_id: lesson.id,
                label_id: label.id,
            })
            .execute(conn)
            .await?;
    }

    log::info!("Created demo lesson {} for {}", lesson.id, client.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn client(client_name: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: client_name.into(),
            phone: "+79161234567".into(),
            timezone: "Europe/Moscow".into(),
            city: None,
            description: None,
            lesson_price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn label(label_name: &str) -> Label {
        let now = Utc::now();
        Label {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: label_name.into(),
            color: "#FF6B6B".into(),
            emoji: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn demo_lesson_uses_named_client_and_label_regardless_of_order() {
        let clients = vec![client("Maria Petrova"), client("Alexey Ivanov"), client("Dmitry Sidorov")];
        assert_eq!(lesson_client(&clients).map(|c| c.name.as_str()), Some("Alexey Ivanov"));

        let labels = vec![label("Revision"), label("Important"), label("Hard topic")];
        assert_eq!(lesson_label(&labels).map(|l| l.name.as_str()), Some("Hard topic"));
    }

    #[test]
    fn renamed_demo_rows_fall_back_to_alphabetical_order() {
        let clients = vec![client("Zoya"), client("Boris"), client("Maria Petrova")];
        assert_eq!(lesson_client(&clients).map(|c| c.name.as_str()), Some("Boris"));

        let labels = vec![label("Revision"), label("Important")];
        assert_eq!(lesson_label(&labels).map(|l| l.name.as_str()), Some("Important"));
        assert!(lesson_label(&[]).is_none());
    }
}
