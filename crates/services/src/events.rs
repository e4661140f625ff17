//! Progress events and the broadcast bus they travel on.
//!
//! Calculations publish and move on; subscribers (alerting today) react on
//! their own task. A slow or failing subscriber never delays a calculation.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tutor_core::model::{AssignmentId, TopicId, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A topic's accuracy was freshly computed (cache hits do not emit).
    TopicProgressCalculated {
        student_id: UserId,
        topic_id: TopicId,
        /// Teacher on whose behalf the request ran, if any.
        teacher_id: Option<UserId>,
        accuracy: f64,
        total_questions: u64,
        timestamp: DateTime<Utc>,
    },

    /// A progress log was written.
    ProgressRecorded {
        student_id: UserId,
        assignment_id: AssignmentId,
        topic_id: TopicId,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    #[must_use]
    pub fn student_id(&self) -> &UserId {
        match self {
            Self::TopicProgressCalculated { student_id, .. }
            | Self::ProgressRecorded { student_id, .. } => student_id,
        }
    }
}

/// One-to-many fan-out over `tokio::sync::broadcast`.
///
/// Receivers that fall more than `capacity` events behind lose the oldest ones.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ProgressEvent>,
    capacity: usize,
}

impl EventBus {
    /// # Panics
    ///
    /// Panics if `capacity` is zero. `MetricsSettings` rejects that value.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Receives every event emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of receivers reached, or an error when nobody listens.
    ///
    /// # Errors
    ///
    /// Returns `SendError` carrying the event back if there are no subscribers.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ProgressEvent,
    ) -> Result<usize, broadcast::error::SendError<ProgressEvent>> {
        self.tx.send(event)
    }

    /// Fire-and-forget; having no subscribers is not an error.
    pub fn emit_lossy(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
