// tutor-calendar/src/bin/tutor_cli.rs
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tutor_calendar::client::api_client::DEFAULT_BASE_URL;
use tutor_calendar::client::calendar::FormError;
use tutor_calendar::client::{ClientError, LessonForm, TutorApiClient, WeekView};
use tutor_calendar::dto::LessonStatusPayload;
use tutor_calendar::scheduling::{monday_of, shift_weeks};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ClientError),
    #[error("invalid lesson: {0}")]
    Form(#[from] FormError),
    #[error("{0}")]
    Usage(String),
}

/// Terminal client for the tutor calendar API
#[derive(Parser)]
#[command(name = "tutor-cli")]
#[command(about = "Terminal client for the tutor calendar API")]
#[command(version)]
struct Cli {
    /// Base URL of the API, including the /api prefix
    #[arg(long, env = "TUTOR_API_URL", default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Username used to log in
    #[arg(short, long, env = "TUTOR_USERNAME")]
    username: Option<String>,

    /// Password used to log in
    #[arg(short, long, env = "TUTOR_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip login and act as this user id
    #[arg(long, env = "TUTOR_USER_ID")]
    user_id: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server and its database are reachable
    Health,
    /// Create an account with --username and --password
    Register {
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Show the lessons of one week
    Week {
        /// Any day of the week to show (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Weeks to move from --date, negative for the past
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },
    /// List clients, optionally filtered by name
    Clients {
        #[arg(long)]
        search: Option<String>,
    },
    /// List labels
    Labels,
    /// Schedule a lesson
    AddLesson {
        #[arg(long)]
        client: Uuid,
        #[arg(long)]
        date: NaiveDate,
        /// Start time as HH:MM
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        #[arg(long, default_value_t = 60)]
        duration: i32,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        paid: bool,
        #[arg(long)]
        trial: bool,
        #[arg(long = "label")]
        labels: Vec<Uuid>,
    },
    /// Mark a lesson as paid (or unpaid with --unpaid)
    MarkPaid {
        lesson_id: Uuid,
        #[arg(long)]
        unpaid: bool,
    },
    /// Delete a lesson
    DeleteLesson { lesson_id: Uuid },
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM, got '{}': {}", raw, e))
}

fn target_week_start(anchor: NaiveDate, offset: i64) -> Result<NaiveDate, CliError> {
    monday_of(anchor)
        .and_then(|monday| shift_weeks(monday, offset))
        .ok_or_else(|| {
            CliError::Usage(format!(
                "--offset {} from {} is outside the supported calendar",
                offset, anchor
            ))
        })
}

async fn authenticate(cli: &Cli, client: &mut TutorApiClient) -> Result<(), CliError> {
    if let Some(user_id) = cli.user_id {
        *client = client.clone().with_user_id(user_id);
        return Ok(());
    }
    match (&cli.username, &cli.password) {
        (Some(username), Some(password)) => {
            let user = client.login(username, password).await?;
            log::info!("Logged in as {} ({})", user.username, user.id);
            Ok(())
        }
        _ => Err(CliError::Usage(
            "either --user-id or both --username and --password are required".to_string(),
        )),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut client = TutorApiClient::new(cli.server.clone());

    match &cli.command {
        Commands::Health => {
            let status = client.health().await?;
            println!("{}", status);
            return Ok(());
        }
        Commands::Register { timezone } => {
            let (Some(username), Some(password)) = (&cli.username, &cli.password) else {
                return Err(CliError::Usage(
                    "register needs --username and --password".to_string(),
                ));
            };
            let user = client.register(username, password, timezone.clone()).await?;
            println!("Registered {} ({}), timezone {}", user.username, user.id, user.timezone);
            return Ok(());
        }
        _ => authenticate(&cli, &mut client).await?,
    }

    match cli.command {
        Commands::Health | Commands::Register { .. } => {}
        Commands::Week { date, offset } => {
            let anchor = date.unwrap_or_else(|| Local::now().date_naive());
            let week_start = target_week_start(anchor, offset)?;
            let lessons = client.week_lessons(week_start).await?;
            let view = WeekView::new(week_start, lessons).ok_or_else(|| {
                CliError::Usage(format!("week starting {} is out of range", week_start))
            })?;
            print!("{}", view);
        }
        Commands::Clients { search } => {
            let clients = match search.as_deref() {
                Some(term) => client.search_clients(term).await?,
                None => client.list_clients().await?,
            };
            if clients.is_empty() {
                println!("No clients");
            }
            for entry in clients {
                let price = entry
                    .lesson_price
                    .map(|p| format!("{:.0}", p))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  {}  {}  {}",
                    entry.id, entry.name, entry.phone, entry.timezone, price
                );
            }
        }
        Commands::Labels => {
            let labels = client.list_labels().await?;
            if labels.is_empty() {
                println!("No labels");
            }
            for label in labels {
                println!(
                    "{}  {} {}  {}",
                    label.id,
                    label.emoji.unwrap_or_default(),
                    label.name,
                    label.color
                );
            }
        }
        Commands::AddLesson {
            client: client_id,
            date,
            time,
            duration,
            description,
            paid,
            trial,
            labels,
        } => {
            let mut form = LessonForm::for_new(date);
            form.client_id = Some(client_id);
            form.time = time;
            form.duration_minutes = duration;
            form.description = description.unwrap_or_default();
            form.is_paid = paid;
            form.is_trial = trial;
            form.label_ids = labels;

            let lesson = client.create_lesson(&form.to_payload()?).await?;
            println!(
                "Created lesson {} with {} at {}",
                lesson.id,
                lesson.client.name,
                lesson.start_time.format("%d.%m.%Y %H:%M")
            );
        }
        Commands::MarkPaid { lesson_id, unpaid } => {
            let status = LessonStatusPayload {
                is_paid: Some(!unpaid),
                ..LessonStatusPayload::default()
            };
            let lesson = client.update_lesson_status(lesson_id, &status).await?;
            println!(
                "Lesson {} is now {}",
                lesson.id,
                if lesson.is_paid { "paid" } else { "unpaid" }
            );
        }
        Commands::DeleteLesson { lesson_id } => {
            client.delete_lesson(lesson_id).await?;
            println!("Deleted lesson {}", lesson_id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn offset_moves_from_the_monday_of_the_anchor() {
        assert_eq!(target_week_start(date(2025, 1, 9), 0).unwrap(), date(2025, 1, 6));
        assert_eq!(target_week_start(date(2025, 1, 9), -1).unwrap(), date(2024, 12, 30));
        assert_eq!(target_week_start(date(2025, 1, 9), 3).unwrap(), date(2025, 1, 27));
    }

    #[test]
    fn huge_offset_is_a_usage_error() {
        assert!(matches!(
            target_week_start(date(2025, 1, 9), i64::MAX),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            target_week_start(date(2025, 1, 9), -20_000_000),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn week_command_accepts_negative_offset() {
        let cli = Cli::try_parse_from([
            "tutor-cli",
            "--user-id",
            "00000000-0000-0000-0000-000000000001",
            "week",
            "--offset",
            "-2",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Week { offset: -2, .. }));
    }
}
