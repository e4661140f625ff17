use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use services::{
    AlertSubscriber, Clock, LogAlertService, ProgressService, StaticPreferences,
    SubmissionService,
};
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tutor_core::model::{
    AnswerCounts, AssignmentId, IdError, LessonId, MetricsSettingsDraft, TopicId, UserId,
};

const DB_URL_ENV: &str = "TUTOR_DB_URL";
const DEFAULT_DB_URL: &str = "sqlite://tutor.sqlite3";
const DEFAULT_LOG_FILTER: &str = "app=info,services=info";

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { command: &'static str, flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, source: IdError },
    InvalidDate { raw: String },
    InvalidCount { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { command, flag } => write!(f, "{command} requires {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, source } => write!(f, "invalid {flag} value: {source}"),
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --date value: {raw} (expected YYYY-MM-DD)")
            }
            ArgsError::InvalidCount { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
    parse: fn(&str) -> Result<T, IdError>,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    parse(&value).map_err(|source| ArgsError::InvalidId { flag, source })
}

fn parse_count(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u64, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidCount { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app topic      --student <id> --topic <id>  [--teacher <id>] [--db <sqlite_url>]");
    eprintln!("  app lesson     --student <id> --lesson <id> [--teacher <id>] [--db <sqlite_url>]");
    eprintln!("  app dual       --student <id>               [--teacher <id>] [--db <sqlite_url>]");
    eprintln!("  app assignment --assignment <id> [--date YYYY-MM-DD] [--teacher <id>] [--db <sqlite_url>]");
    eprintln!("  app record     --assignment <id> [--date YYYY-MM-DD]");
    eprintln!("                 [--right <n>] [--wrong <n>] [--empty <n>] [--bonus <n>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --date today (UTC)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV}, TUTOR_CACHE_TTL_SECS, TUTOR_ACCURACY_THRESHOLD, TUTOR_EVENT_CAPACITY, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq)]
enum Request {
    Topic { student: UserId, topic: TopicId },
    Lesson { student: UserId, lesson: LessonId },
    Dual { student: UserId },
    Assignment { assignment: AssignmentId, date: Option<NaiveDate> },
    Record {
        assignment: AssignmentId,
        date: Option<NaiveDate>,
        counts: AnswerCounts,
    },
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::Topic { .. } => "topic",
            Request::Lesson { .. } => "lesson",
            Request::Dual { .. } => "dual",
            Request::Assignment { .. } => "assignment",
            Request::Record { .. } => "record",
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    teacher: Option<UserId>,
    request: Request,
}

/// Flags collected before the command decides which ones it needs.
#[derive(Default)]
struct Flags {
    db_url: Option<String>,
    student: Option<UserId>,
    teacher: Option<UserId>,
    topic: Option<TopicId>,
    lesson: Option<LessonId>,
    assignment: Option<AssignmentId>,
    date: Option<NaiveDate>,
    counts: AnswerCounts,
}

fn required<T>(value: Option<T>, command: &'static str, flag: &'static str) -> Result<T, ArgsError> {
    value.ok_or(ArgsError::MissingFlag { command, flag })
}

impl Args {
    fn parse(
        argv: impl IntoIterator<Item = String>,
        default_db_url: String,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let command = args.next().ok_or(ArgsError::MissingCommand)?;
        let mut flags = Flags::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    flags.db_url = Some(normalize_sqlite_url(value));
                }
                "--student" => flags.student = Some(parse_id(&mut args, "--student", UserId::parse)?),
                "--teacher" => flags.teacher = Some(parse_id(&mut args, "--teacher", UserId::parse)?),
                "--topic" => flags.topic = Some(parse_id(&mut args, "--topic", TopicId::parse)?),
                "--lesson" => flags.lesson = Some(parse_id(&mut args, "--lesson", LessonId::parse)?),
                "--assignment" => {
                    flags.assignment = Some(parse_id(&mut args, "--assignment", AssignmentId::parse)?);
                }
                "--date" => {
                    let value = require_value(&mut args, "--date")?;
                    let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                        .map_err(|_| ArgsError::InvalidDate { raw: value })?;
                    flags.date = Some(date);
                }
                "--right" => flags.counts.right = parse_count(&mut args, "--right")?,
                "--wrong" => flags.counts.wrong = parse_count(&mut args, "--wrong")?,
                "--empty" => flags.counts.empty = parse_count(&mut args, "--empty")?,
                "--bonus" => flags.counts.bonus = parse_count(&mut args, "--bonus")?,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let request = match command.as_str() {
            "topic" => Request::Topic {
                student: required(flags.student, "topic", "--student")?,
                topic: required(flags.topic, "topic", "--topic")?,
            },
            "lesson" => Request::Lesson {
                student: required(flags.student, "lesson", "--student")?,
                lesson: required(flags.lesson, "lesson", "--lesson")?,
            },
            "dual" => Request::Dual {
                student: required(flags.student, "dual", "--student")?,
            },
            "assignment" => Request::Assignment {
                assignment: required(flags.assignment, "assignment", "--assignment")?,
                date: flags.date,
            },
            "record" => Request::Record {
                assignment: required(flags.assignment, "record", "--assignment")?,
                date: flags.date,
                counts: flags.counts,
            },
            _ => return Err(ArgsError::UnknownCommand(command)),
        };

        Ok(Self {
            db_url: flags.db_url.unwrap_or(default_db_url),
            teacher: flags.teacher,
            request,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn execute(
    args: &Args,
    progress: &ProgressService,
    submissions: &SubmissionService,
    clock: Clock,
) -> Result<String, Box<dyn std::error::Error>> {
    let teacher = args.teacher.as_ref();
    let json = match &args.request {
        Request::Topic { student, topic } => {
            serde_json::to_string_pretty(&progress.topic_progress(student, topic, teacher).await?)?
        }
        Request::Lesson { student, lesson } => serde_json::to_string_pretty(
            &progress.lesson_progress(student, lesson, teacher).await?,
        )?,
        Request::Dual { student } => {
            serde_json::to_string_pretty(&progress.dual_metrics(student, teacher).await?)?
        }
        Request::Assignment { assignment, date } => {
            let on = date.unwrap_or_else(|| clock.today());
            serde_json::to_string_pretty(
                &progress
                    .calculate_assignment_progress(assignment, on, teacher)
                    .await?,
            )?
        }
        Request::Record {
            assignment,
            date,
            counts,
        } => {
            let on = date.unwrap_or_else(|| clock.today());
            serde_json::to_string_pretty(&submissions.record(assignment, on, *counts).await?)?
        }
    };
    Ok(json)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), None | Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let default_db_url = std::env::var(DB_URL_ENV)
        .ok()
        .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
    let args = Args::parse(argv, default_db_url).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = MetricsSettingsDraft::from_env()?.validate()?;

    info!(command = args.request.name(), db = %args.db_url, "starting");
    let storage = Storage::sqlite(&args.db_url).await?;
    let clock = Clock::default_clock();
    let progress = ProgressService::with_settings(storage.clone(), &settings, clock);
    let submissions = SubmissionService::new(
        clock,
        Arc::clone(&storage.assignments),
        Arc::clone(&storage.progress_logs),
        progress.cache().clone(),
        progress.events().clone(),
    );
    let alerts = AlertSubscriber::new(
        Arc::new(StaticPreferences::new()),
        Arc::new(LogAlertService),
        settings.default_accuracy_threshold(),
    )
    .spawn(progress.events().subscribe());

    let result = execute(&args, &progress, &submissions, clock).await;

    // Dropping the services closes the bus so the subscriber can finish.
    drop(progress);
    drop(submissions);
    alerts.await?;

    println!("{}", result?);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(
            argv.iter().map(|s| (*s).to_string()),
            DEFAULT_DB_URL.to_string(),
        )
    }

    #[test]
    fn parses_topic_request_with_teacher() {
        let args = parse(&["topic", "--student", "s1", "--topic", "t-9", "--teacher", "t1"]).unwrap();
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert_eq!(args.teacher, Some(UserId::parse("t1").unwrap()));
        assert_eq!(
            args.request,
            Request::Topic {
                student: UserId::parse("s1").unwrap(),
                topic: TopicId::parse("t-9").unwrap(),
            }
        );
    }

    #[test]
    fn record_collects_counts_and_date() {
        let args = parse(&[
            "record",
            "--assignment",
            "a1",
            "--date",
            "2024-03-02",
            "--right",
            "7",
            "--wrong",
            "3",
            "--bonus",
            "1",
        ])
        .unwrap();
        assert_eq!(args.request.name(), "record");
        assert_eq!(
            args.request,
            Request::Record {
                assignment: AssignmentId::parse("a1").unwrap(),
                date: NaiveDate::from_ymd_opt(2024, 3, 2),
                counts: AnswerCounts::new(7, 3, 0, 1),
            }
        );
    }

    #[test]
    fn missing_required_flag_is_reported() {
        let err = parse(&["lesson", "--student", "s1"]).unwrap_err();
        assert!(matches!(
            err,
            ArgsError::MissingFlag {
                command: "lesson",
                flag: "--lesson"
            }
        ));
        assert_eq!(err.to_string(), "lesson requires --lesson");
    }

    #[test]
    fn ids_are_validated_while_parsing() {
        let err = parse(&["dual", "--student", "s:1"]).unwrap_err();
        assert!(matches!(
            err,
            ArgsError::InvalidId {
                flag: "--student",
                ..
            }
        ));
        let err = parse(&["dual", "--student", ""]).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidId { .. }));
    }

    #[test]
    fn rejects_bad_values_and_unknown_input() {
        assert!(matches!(
            parse(&["assignment", "--assignment", "a1", "--date", "03/02/2024"]),
            Err(ArgsError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse(&["record", "--assignment", "a1", "--right", "-1"]),
            Err(ArgsError::InvalidCount { flag: "--right", .. })
        ));
        assert!(matches!(
            parse(&["dual", "--student"]),
            Err(ArgsError::MissingValue { flag: "--student" })
        ));
        assert!(matches!(
            parse(&["dual", "--verbose"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(&["report", "--student", "s1"]),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(parse(&[]), Err(ArgsError::MissingCommand)));
    }

    #[test]
    fn db_flag_overrides_default() {
        let args = parse(&["dual", "--student", "s1", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert!(matches!(
            parse(&["dual", "--db", "  "]),
            Err(ArgsError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/tutor.sqlite3".to_string());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/tutor.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite://already.db".to_string()),
            "sqlite://already.db"
        );
    }
}
