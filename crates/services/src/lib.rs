#![forbid(unsafe_code)]

pub mod alerts;
pub mod cache;
pub mod error;
pub mod events;
pub mod progress_service;
pub mod submission_service;

pub use tutor_core::Clock;

pub use alerts::{
    AlertCheck, AlertOutcome, AlertService, AlertSubscriber, LogAlertService, PreferenceService,
    StaticPreferences,
};
pub use cache::{CacheStore, ProgressCache, TtlCache};
pub use error::{AlertError, ProgressError, SubmissionError};
pub use events::{EventBus, ProgressEvent};
pub use progress_service::ProgressService;
pub use submission_service::SubmissionService;
