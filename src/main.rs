use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eduportal::app::{Portal, PortalError};
use eduportal::config::{ConfigError, PortalConfig};
use eduportal::net::http::{ApiClient, ApiError};
use eduportal::net::identity::HttpIdentityGateway;
use eduportal::net::platform::{FileUpload, PlatformClient};
use eduportal::session::SessionContext;
use eduportal::session::forms::Registration;
use eduportal::session::store::FileStore;
use records::{
    ClassStatus, ClassUpdate, NewAssessment, NewClass, NewMaterial, NewNotification, NotificationKind, ProfileUpdate,
    Role,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::Level;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not build HTTP client: {0}")]
    Client(#[from] ApiError),
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "eduportal", about = "Role-based education portal client")]
struct Cli {
    /// Platform REST root; overrides PORTAL_API_BASE_URL.
    #[arg(long)]
    api_base_url: Option<String>,

    /// Session directory; overrides PORTAL_STATE_DIR.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a page, e.g. `/classes?status=live`.
    Open {
        #[arg(default_value = "/dashboard")]
        path: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value_t = false)]
        remember_me: bool,
        /// Page to open after signing in.
        #[arg(long)]
        from: Option<String>,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<Role>,
        /// Onboarding answer, `question=answer`; repeatable.
        #[arg(long = "survey", value_parser = parse_pair)]
        survey: Vec<(String, String)>,
    },
    Logout,
    Whoami,
    Profile(ProfileCommand),
    Classes(ClassCommand),
    Materials(MaterialCommand),
    Assessments(AssessmentCommand),
    Notifications(NotificationCommand),
    Admin(AdminCommand),
    /// Upcoming session reminders.
    Reminders,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Update {
        #[arg(long)]
        name: Option<String>,
        /// Profile attribute, `key=value`; repeatable.
        #[arg(long = "set", value_parser = parse_pair)]
        attributes: Vec<(String, String)>,
    },
}

#[derive(Args, Debug)]
struct ClassCommand {
    #[command(subcommand)]
    command: ClassSubcommand,
}

#[derive(Subcommand, Debug)]
enum ClassSubcommand {
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        subject: String,
        /// `YYYY-MM-DD`
        #[arg(long)]
        date: String,
        /// `HH:MM`
        #[arg(long)]
        start: String,
        /// `HH:MM`
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value_t = 30)]
        max_students: u32,
        #[arg(long)]
        zoom_link: Option<String>,
    },
    Update {
        class_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, value_parser = parse_wire::<ClassStatus>)]
        status: Option<ClassStatus>,
        #[arg(long)]
        zoom_link: Option<String>,
    },
    Enroll {
        class_id: String,
    },
}

#[derive(Args, Debug)]
struct MaterialCommand {
    #[command(subcommand)]
    command: MaterialSubcommand,
}

#[derive(Subcommand, Debug)]
enum MaterialSubcommand {
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "class")]
        class_id: String,
        #[arg(long)]
        subject: String,
    },
    Download {
        material_id: String,
        /// Directory to save into.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct AssessmentCommand {
    #[command(subcommand)]
    command: AssessmentSubcommand,
}

#[derive(Subcommand, Debug)]
enum AssessmentSubcommand {
    /// Create from a JSON file holding the assessment and its questions.
    Create {
        file: PathBuf,
    },
    Submit {
        assessment_id: String,
        /// `question_id=answer`; JSON values such as `2` or `true` are kept typed.
        #[arg(long = "answer", value_parser = parse_pair)]
        answers: Vec<(String, String)>,
    },
    Submissions {
        assessment_id: String,
    },
}

#[derive(Args, Debug)]
struct NotificationCommand {
    #[command(subcommand)]
    command: NotificationSubcommand,
}

#[derive(Subcommand, Debug)]
enum NotificationSubcommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Read {
        notification_id: String,
    },
    Send {
        #[arg(long = "to")]
        recipient_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        #[arg(long, value_parser = parse_wire::<NotificationKind>, default_value = "system")]
        kind: NotificationKind,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Approve { user_id: String },
    Reject { user_id: String },
}

// =============================================================================
// ENTRY
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_portal(cli: &Cli) -> Result<Portal, CliError> {
    let mut config = PortalConfig::from_env()?;
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = PortalConfig::for_base_url(url, &config.state_dir)?.api_base_url;
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir.clone_from(dir);
    }
    tracing::debug!(api = %config.api_base_url, session = %config.session_file().display(), "portal config");

    let api = ApiClient::new(&config)?;
    let gateway = Arc::new(HttpIdentityGateway::new(api.clone()));
    let store = Arc::new(FileStore::new(config.session_file()));
    let session = SessionContext::new(gateway, store);
    Ok(Portal::new(session, PlatformClient::new(api), OffsetDateTime::now_utc().date()))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut portal = build_portal(&cli)?;

    match cli.command {
        Command::Open { path } => {
            print!("{}", portal.open(&path).await);
        }
        Command::Login { email, password, remember_me, from } => {
            let target = portal
                .login(&email, &password, remember_me, from.as_deref())
                .await?;
            print!("{}", portal.open(&target).await);
        }
        Command::Register { email, password, name, role, survey } => {
            let registration =
                Registration { email, password, full_name: name, role, survey_answers: survey.into_iter().collect() };
            let target = portal.register(registration).await?;
            print!("{}", portal.open(&target).await);
        }
        Command::Logout => {
            portal.logout().await;
            println!("Signed out.");
        }
        Command::Whoami => match portal.whoami().await {
            Some(user) => println!(
                "{} <{}> {} ({}) | id {}",
                user.full_name,
                user.email,
                user.role.label(),
                user.status,
                user.id
            ),
            None => println!("Not signed in."),
        },
        Command::Profile(profile) => run_profile(&mut portal, profile).await?,
        Command::Classes(classes) => run_classes(&mut portal, classes).await?,
        Command::Materials(materials) => run_materials(&mut portal, materials).await?,
        Command::Assessments(assessments) => run_assessments(&mut portal, assessments).await?,
        Command::Notifications(notifications) => run_notifications(&mut portal, notifications).await?,
        Command::Admin(admin) => run_admin(&mut portal, admin).await?,
        Command::Reminders => {
            let now = OffsetDateTime::now_utc();
            let reminders = portal.reminders(PrimitiveDateTime::new(now.date(), now.time())).await?;
            if reminders.is_empty() {
                println!("No upcoming reminders.");
            }
            for r in reminders {
                println!("{} {}: {}", r.at.date(), r.title, r.message());
            }
        }
    }
    Ok(())
}

async fn run_profile(portal: &mut Portal, profile: ProfileCommand) -> Result<(), CliError> {
    let ProfileSubcommand::Update { name, attributes } = profile.command;
    let profile_data = (!attributes.is_empty())
        .then(|| attributes.into_iter().map(|(k, v)| (k, Value::String(v))).collect());
    let user = portal
        .update_profile(&ProfileUpdate { full_name: name, profile_data })
        .await?;
    println!("Profile updated: {} <{}>", user.full_name, user.email);
    Ok(())
}

async fn run_classes(portal: &mut Portal, classes: ClassCommand) -> Result<(), CliError> {
    match classes.command {
        ClassSubcommand::Create { title, description, subject, date, start, end, location, max_students, zoom_link } => {
            let teacher_id = portal.whoami().await.map(|u| u.id.clone()).unwrap_or_default();
            let class = NewClass {
                title,
                description,
                teacher_id,
                subject,
                date,
                start_time: start,
                end_time: end,
                location,
                max_students,
                status: ClassStatus::Scheduled,
                zoom_link,
            };
            let created = portal.create_class(&class).await?;
            println!(
                "Scheduled {} on {} {}-{} | id {}",
                created.title, created.date, created.start_time, created.end_time, created.id
            );
        }
        ClassSubcommand::Update { class_id, title, description, date, start, end, location, status, zoom_link } => {
            let update = ClassUpdate {
                title,
                description,
                date,
                start_time: start,
                end_time: end,
                location,
                status,
                zoom_link,
            };
            let updated = portal.update_class(&class_id, &update).await?;
            println!("Updated {} [{}] | id {}", updated.title, updated.status.as_str(), updated.id);
        }
        ClassSubcommand::Enroll { class_id } => {
            portal.enroll(&class_id).await?;
            println!("Enrolled in {class_id}.");
        }
    }
    Ok(())
}

async fn run_materials(portal: &mut Portal, materials: MaterialCommand) -> Result<(), CliError> {
    match materials.command {
        MaterialSubcommand::Upload { file, title, description, class_id, subject } => {
            let bytes = std::fs::read(&file).map_err(|source| CliError::Io { path: file.clone(), source })?;
            let file_name = file
                .file_name()
                .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());
            let upload = FileUpload { file_name, content_type: None, bytes };
            let material = NewMaterial { title, description, class_id, subject };
            let created = portal.upload_material(&material, upload).await?;
            println!("Uploaded {} ({}) | id {}", created.title, created.file_name, created.id);
        }
        MaterialSubcommand::Download { material_id, output } => {
            let download = portal.download_material(&material_id).await?;
            let name = download
                .file_name
                .as_deref()
                .and_then(|n| Path::new(n).file_name())
                .map_or_else(|| format!("material-{material_id}"), |n| n.to_string_lossy().into_owned());
            let path = output.join(name);
            std::fs::write(&path, &download.bytes).map_err(|source| CliError::Io { path: path.clone(), source })?;
            println!("Saved {} ({} bytes)", path.display(), download.bytes.len());
        }
    }
    Ok(())
}

async fn run_assessments(portal: &mut Portal, assessments: AssessmentCommand) -> Result<(), CliError> {
    match assessments.command {
        AssessmentSubcommand::Create { file } => {
            let raw = std::fs::read_to_string(&file).map_err(|source| CliError::Io { path: file.clone(), source })?;
            let mut assessment: NewAssessment = serde_json::from_str(&raw)?;
            if assessment.teacher_id.is_empty() {
                assessment.teacher_id = portal.whoami().await.map(|u| u.id.clone()).unwrap_or_default();
            }
            let created = portal.create_assessment(&assessment).await?;
            println!("Created {} ({} questions) | id {}", created.title, created.questions.len(), created.id);
        }
        AssessmentSubcommand::Submit { assessment_id, answers } => {
            let answers: BTreeMap<String, Value> = answers
                .into_iter()
                .map(|(question, answer)| {
                    let value = serde_json::from_str(&answer).unwrap_or(Value::String(answer));
                    (question, value)
                })
                .collect();
            let outcome = portal.submit_assessment(&assessment_id, &answers).await?;
            if let Some(score) = outcome.preview {
                println!("Your answers: {score}");
            }
            let s = &outcome.submission;
            println!("Submitted | id {} | recorded score {}/{} ({:.0}%)", s.id, s.score, s.max_score, s.percentage);
        }
        AssessmentSubcommand::Submissions { assessment_id } => {
            let submissions = portal.submissions(&assessment_id).await?;
            if submissions.is_empty() {
                println!("No submissions yet.");
            }
            for s in submissions {
                println!("{} | {}/{} ({:.0}%) | {}", s.student_name, s.score, s.max_score, s.percentage, s.submitted_at);
            }
        }
    }
    Ok(())
}

async fn run_notifications(portal: &mut Portal, notifications: NotificationCommand) -> Result<(), CliError> {
    match notifications.command {
        NotificationSubcommand::List { page, limit } => {
            let listed = portal.notifications(page, limit).await?;
            if listed.data.is_empty() {
                println!("No notifications.");
            }
            for n in listed.data {
                let mark = if n.read { ' ' } else { '*' };
                println!("{mark} {} | {}: {} | id {}", n.created_at, n.title, n.message, n.id);
            }
        }
        NotificationSubcommand::Read { notification_id } => {
            portal.mark_notification_read(&notification_id).await?;
            println!("Marked {notification_id} as read.");
        }
        NotificationSubcommand::Send { recipient_id, title, message, kind } => {
            let notification = NewNotification { title, message, kind, recipient_id, ..NewNotification::default() };
            let sent = portal.create_notification(notification).await?;
            println!("Sent {} | id {}", sent.title, sent.id);
        }
    }
    Ok(())
}

async fn run_admin(portal: &mut Portal, admin: AdminCommand) -> Result<(), CliError> {
    match admin.command {
        AdminSubcommand::Approve { user_id } => {
            let user = portal.approve_user(&user_id).await?;
            println!("Approved {} <{}> ({})", user.full_name, user.email, user.status);
        }
        AdminSubcommand::Reject { user_id } => {
            portal.reject_user(&user_id).await?;
            println!("Rejected {user_id}.");
        }
    }
    Ok(())
}

// =============================================================================
// ARGUMENT PARSERS
// =============================================================================

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key.to_owned(), value.trim().to_owned()))
}

/// Parse a lowercase wire name such as `live` or `announcement`.
fn parse_wire<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase())).map_err(|_| format!("unknown value `{raw}`"))
}
