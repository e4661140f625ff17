mod assignment;
mod curriculum;
mod ids;
mod progress;
mod progress_log;
mod settings;
mod user;

pub use ids::{AssignmentId, IdError, LessonId, MAX_ID_LEN, TopicId, UserId};

pub use assignment::{Assignment, AssignmentError};
pub use curriculum::{CurriculumError, Lesson, Topic};
pub use progress::{AssignmentProgress, DualMetrics, LessonProgress, TopicProgress};
pub use progress_log::{AnswerCounts, ProgressLog};
pub use settings::{
    DEFAULT_ACCURACY_THRESHOLD, DEFAULT_CACHE_TTL_SECS, DEFAULT_EVENT_CAPACITY,
    ENV_ACCURACY_THRESHOLD, ENV_CACHE_TTL_SECS, ENV_EVENT_CAPACITY, MetricsSettings,
    MetricsSettingsDraft, MetricsSettingsError,
};
pub use user::{Role, User, UserError};
