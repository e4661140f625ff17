//! Low-accuracy alerting, driven by `ProgressEvent`s.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tutor_core::model::{TopicId, UserId};

use crate::error::AlertError;
use crate::events::ProgressEvent;

/// Per-teacher alert preferences.
#[async_trait]
pub trait PreferenceService: Send + Sync {
    /// `Ok(None)` means the teacher never set a threshold.
    ///
    /// # Errors
    ///
    /// Returns `AlertError` if the preference backend fails.
    async fn accuracy_threshold(&self, teacher_id: &UserId) -> Result<Option<f64>, AlertError>;
}

/// Creates alerts. Implementations may deduplicate.
#[async_trait]
pub trait AlertService: Send + Sync {
    /// Returns whether a new alert was created.
    ///
    /// # Errors
    ///
    /// Returns `AlertError` if the alert backend fails.
    async fn check_and_generate_alert(&self, check: &AlertCheck) -> Result<bool, AlertError>;
}

/// A below-threshold result handed to the `AlertService`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCheck {
    pub student_id: UserId,
    pub topic_id: TopicId,
    pub teacher_id: Option<UserId>,
    pub accuracy: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Not a topic result, or nothing answered yet.
    Skipped,
    AboveThreshold,
    /// The alert service was called; `true` if it created an alert.
    Raised(bool),
    /// The alert service failed. Already logged.
    Failed,
}

pub struct AlertSubscriber {
    preferences: Arc<dyn PreferenceService>,
    alerts: Arc<dyn AlertService>,
    default_threshold: f64,
}

impl AlertSubscriber {
    #[must_use]
    pub fn new(
        preferences: Arc<dyn PreferenceService>,
        alerts: Arc<dyn AlertService>,
        default_threshold: f64,
    ) -> Self {
        Self {
            preferences,
            alerts,
            default_threshold,
        }
    }

    async fn threshold_for(&self, teacher_id: Option<&UserId>) -> f64 {
        let Some(teacher_id) = teacher_id else {
            return self.default_threshold;
        };
        match self.preferences.accuracy_threshold(teacher_id).await {
            Ok(Some(threshold)) => threshold,
            Ok(None) => self.default_threshold,
            Err(err) => {
                warn!(teacher = %teacher_id, error = %err, "threshold lookup failed; using default");
                self.default_threshold
            }
        }
    }

    /// Reacts to a single event. Never fails; errors are logged.
    pub async fn handle(&self, event: &ProgressEvent) -> AlertOutcome {
        let ProgressEvent::TopicProgressCalculated {
            student_id,
            topic_id,
            teacher_id,
            accuracy,
            total_questions,
            ..
        } = event
        else {
            return AlertOutcome::Skipped;
        };
        if *total_questions == 0 {
            return AlertOutcome::Skipped;
        }

        let threshold = self.threshold_for(teacher_id.as_ref()).await;
        if *accuracy >= threshold {
            return AlertOutcome::AboveThreshold;
        }

        let check = AlertCheck {
            student_id: student_id.clone(),
            topic_id: topic_id.clone(),
            teacher_id: teacher_id.clone(),
            accuracy: *accuracy,
            threshold,
        };
        match self.alerts.check_and_generate_alert(&check).await {
            Ok(created) => {
                debug!(student = %student_id, topic = %topic_id, accuracy, threshold, created, "accuracy alert checked");
                AlertOutcome::Raised(created)
            }
            Err(err) => {
                warn!(student = %student_id, topic = %topic_id, error = %err, "alert generation failed");
                AlertOutcome::Failed
            }
        }
    }

    /// Consumes `rx` on a background task until every sender is dropped.
    pub fn spawn(self, mut rx: broadcast::Receiver<ProgressEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        self.handle(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "alert subscriber lagged; events dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("progress event bus closed; alert subscriber stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// Thresholds held in memory, keyed by teacher.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    thresholds: HashMap<UserId, f64>,
}

impl StaticPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_threshold(mut self, teacher_id: UserId, threshold: f64) -> Self {
        self.thresholds.insert(teacher_id, threshold);
        self
    }
}

#[async_trait]
impl PreferenceService for StaticPreferences {
    async fn accuracy_threshold(&self, teacher_id: &UserId) -> Result<Option<f64>, AlertError> {
        Ok(self.thresholds.get(teacher_id).copied())
    }
}

/// Reports alerts through `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertService;

#[async_trait]
impl AlertService for LogAlertService {
    async fn check_and_generate_alert(&self, check: &AlertCheck) -> Result<bool, AlertError> {
        warn!(
            student = %check.student_id,
            topic = %check.topic_id,
            accuracy = check.accuracy,
            threshold = check.threshold,
            "accuracy below threshold"
        );
        Ok(true)
    }
}
