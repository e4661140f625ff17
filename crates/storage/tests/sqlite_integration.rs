use chrono::{Duration, NaiveDate};
use storage::repository::{
    AssignmentRepository, CurriculumRepository, ProgressLogRepository, StorageError,
    UserRepository,
};
use storage::sqlite::SqliteRepository;
use tutor_core::model::{
    AnswerCounts, AssignmentId, LessonId, ProgressLog, Role, TopicId, UserId,
};
use tutor_core::time::fixed_now;

// The host application owns this schema; tests recreate just enough of it.
const FIXTURE_SCHEMA: &[&str] = &[
    "CREATE TABLE users (id TEXT PRIMARY KEY, role TEXT NOT NULL, teacher_id TEXT)",
    "CREATE TABLE lessons (id TEXT PRIMARY KEY, name TEXT NOT NULL, teacher_id TEXT)",
    "CREATE TABLE topics (id TEXT PRIMARY KEY, lesson_id TEXT NOT NULL, name TEXT NOT NULL)",
    r"CREATE TABLE assignments (
        id TEXT PRIMARY KEY,
        student_id TEXT NOT NULL,
        topic_id TEXT NOT NULL,
        question_count INTEGER NOT NULL,
        daily_target INTEGER NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL
    )",
    r"CREATE TABLE progress_logs (
        assignment_id TEXT NOT NULL REFERENCES assignments(id) ON DELETE CASCADE,
        date TEXT NOT NULL,
        right_count INTEGER NOT NULL,
        wrong_count INTEGER NOT NULL,
        empty_count INTEGER NOT NULL,
        bonus_count INTEGER NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (assignment_id, date)
    )",
];

const FIXTURE_ROWS: &[&str] = &[
    "INSERT INTO users VALUES ('t1', 'teacher', NULL)",
    "INSERT INTO users VALUES ('s1', 'student', 't1')",
    "INSERT INTO lessons VALUES ('l1', 'Algebra', NULL)",
    "INSERT INTO lessons VALUES ('l2', 'Private', 't1')",
    "INSERT INTO topics VALUES ('tp2', 'l1', 'Equations')",
    "INSERT INTO topics VALUES ('tp1', 'l1', 'Fractions')",
    "INSERT INTO assignments VALUES ('a1', 's1', 'tp1', 200, 20, '2024-03-01', '2024-03-31')",
    "INSERT INTO assignments VALUES ('a2', 's1', 'tp2', 100, 10, '2024-03-01', '2024-03-15')",
];

async fn fixture(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    for stmt in FIXTURE_SCHEMA.iter().chain(FIXTURE_ROWS) {
        sqlx::query(stmt)
            .execute(repo.pool())
            .await
            .expect("fixture statement");
    }
    repo
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn log(assignment: &str, date: NaiveDate, counts: AnswerCounts) -> ProgressLog {
    ProgressLog::new(
        AssignmentId::parse(assignment).unwrap(),
        date,
        counts,
        fixed_now(),
    )
}

#[tokio::test]
async fn sqlite_reads_users_and_curriculum() {
    let repo = fixture("memdb_curriculum").await;

    let student = repo
        .get_user(&UserId::parse("s1").unwrap())
        .await
        .unwrap()
        .expect("student");
    assert_eq!(student.role(), Role::Student);
    assert_eq!(student.teacher_id(), Some(&UserId::parse("t1").unwrap()));
    assert!(
        repo.get_user(&UserId::parse("ghost").unwrap())
            .await
            .unwrap()
            .is_none()
    );

    let global = repo
        .get_lesson(&LessonId::parse("l1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(global.is_global());
    let private = repo
        .get_lesson(&LessonId::parse("l2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(private.teacher_id(), Some(&UserId::parse("t1").unwrap()));

    let topics = repo
        .topics_for_lesson(&LessonId::parse("l1").unwrap())
        .await
        .unwrap();
    let names: Vec<&str> = topics.iter().map(|t| t.name()).collect();
    assert_eq!(names, ["Fractions", "Equations"]);

    let topic = repo
        .get_topic(&TopicId::parse("tp1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic.lesson_id(), &LessonId::parse("l1").unwrap());
}

#[tokio::test]
async fn sqlite_reads_assignments() {
    let repo = fixture("memdb_assignments").await;

    let assignments = repo
        .assignments_for_student(&UserId::parse("s1").unwrap())
        .await
        .unwrap();
    assert_eq!(assignments.len(), 2);
    let total: u32 = assignments.iter().map(|a| a.question_count()).sum();
    assert_eq!(total, 300);

    let a2 = repo
        .get_assignment(&AssignmentId::parse("a2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a2.end_date(), day(15));
    assert!(a2.is_active_on(day(15)));
}

#[tokio::test]
async fn sqlite_upserts_and_joins_progress_logs() {
    let repo = fixture("memdb_progress").await;

    repo.upsert_log(&log("a1", day(2), AnswerCounts::new(10, 5, 0, 0)))
        .await
        .unwrap();
    repo.upsert_log(&log("a1", day(1), AnswerCounts::new(4, 1, 0, 0)))
        .await
        .unwrap();
    repo.upsert_log(&log("a2", day(1), AnswerCounts::new(7, 0, 1, 2)))
        .await
        .unwrap();

    // Same-day submission replaces the counts.
    let mut replacement = log("a1", day(2), AnswerCounts::new(12, 5, 1, 0));
    replacement.updated_at = fixed_now() + Duration::hours(1);
    repo.upsert_log(&replacement).await.unwrap();

    let s1 = UserId::parse("s1").unwrap();
    let topic_logs = repo
        .logs_for_student_topic(&s1, &TopicId::parse("tp1").unwrap())
        .await
        .unwrap();
    assert_eq!(topic_logs.len(), 2);
    assert_eq!(topic_logs[0].date, day(1));
    assert_eq!(topic_logs[1].counts, AnswerCounts::new(12, 5, 1, 0));
    assert_eq!(topic_logs[1].updated_at, fixed_now() + Duration::hours(1));

    let all = repo.logs_for_student(&s1).await.unwrap();
    assert_eq!(all.len(), 3);

    let a2_logs = repo
        .logs_for_assignment(&AssignmentId::parse("a2").unwrap())
        .await
        .unwrap();
    assert_eq!(a2_logs.len(), 1);
    assert_eq!(a2_logs[0].counts.total(), 10);
}

#[tokio::test]
async fn sqlite_upsert_rejects_unknown_assignment() {
    let repo = fixture("memdb_unknown_assignment").await;
    let err = repo
        .upsert_log(&log("ghost", day(1), AnswerCounts::new(1, 0, 0, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
