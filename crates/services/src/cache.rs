//! TTL caches for computed progress, plus the invalidation chain between them.
//!
//! Three stores are kept: topic (`"{student}:{topic}"`), lesson
//! (`"{student}:{lesson}"`) and dual metrics (`"{student}"`). Lesson entries
//! are built from topic data, so any topic or dual invalidation for a student
//! also drops that student's lesson entries. Nothing depends on dual metrics.
//!
//! Eviction is lazy: a stale entry is removed when it is read, never by a
//! background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use tutor_core::Clock;
use tutor_core::model::{DualMetrics, LessonId, LessonProgress, TopicId, TopicProgress, UserId};

/// Key/value store with expiry, swappable for a shared cache.
///
/// Backends that can fail (network caches) report failures as misses.
#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Fresh value for `key`, or `None`. Stale entries are evicted here.
    async fn get(&self, key: &str) -> Option<V>;

    /// Overwrites unconditionally and restarts the entry's TTL.
    async fn set(&self, key: String, value: V);

    /// Returns whether an entry was removed.
    async fn remove(&self, key: &str) -> bool;

    /// Removes every entry whose key starts with `prefix`; returns how many.
    async fn remove_prefix(&self, prefix: &str) -> usize;
}

//
// ─── IN-PROCESS STORE ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Process-local `CacheStore` backed by a `HashMap`.
pub struct TtlCache<V> {
    ttl: Duration,
    clock: Mutex<Clock>,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

// A poisoned lock only means another request panicked mid-write; the map is
// still structurally valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new(ttl: Duration, clock: Clock) -> Self {
        Self {
            ttl,
            clock: Mutex::new(clock),
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Moves a fixed clock forward. Has no effect on the system clock.
    pub fn advance_clock(&self, delta: Duration) {
        lock(&self.clock).advance(delta);
    }

    /// Number of stored entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn now(&self) -> DateTime<Utc> {
        lock(&self.clock).now()
    }

    fn get_now(&self, key: &str) -> Option<V> {
        let now = self.now();
        let mut entries = lock(&self.entries);
        let fresh = match entries.get(key) {
            None => return None,
            Some(entry) => now - entry.stored_at < self.ttl,
        };
        if fresh {
            entries.get(key).map(|e| e.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    fn set_now(&self, key: String, value: V) {
        let stored_at = self.now();
        lock(&self.entries).insert(key, Entry { value, stored_at });
    }

    fn remove_now(&self, key: &str) -> bool {
        lock(&self.entries).remove(key).is_some()
    }

    fn remove_prefix_now(&self, prefix: &str) -> usize {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }
}

#[async_trait]
impl<V> CacheStore<V> for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.get_now(key)
    }

    async fn set(&self, key: String, value: V) {
        self.set_now(key, value);
    }

    async fn remove(&self, key: &str) -> bool {
        self.remove_now(key)
    }

    async fn remove_prefix(&self, prefix: &str) -> usize {
        self.remove_prefix_now(prefix)
    }
}

//
// ─── PROGRESS CACHE ────────────────────────────────────────────────────────────
//

fn pair_key(student: &UserId, other: &str) -> String {
    format!("{student}:{other}")
}

fn student_prefix(student: &UserId) -> String {
    format!("{student}:")
}

/// The three progress caches behind one façade that owns keys and cascades.
#[derive(Clone)]
pub struct ProgressCache {
    topics: Arc<dyn CacheStore<TopicProgress>>,
    lessons: Arc<dyn CacheStore<LessonProgress>>,
    dual: Arc<dyn CacheStore<DualMetrics>>,
}

impl ProgressCache {
    #[must_use]
    pub fn new(
        topics: Arc<dyn CacheStore<TopicProgress>>,
        lessons: Arc<dyn CacheStore<LessonProgress>>,
        dual: Arc<dyn CacheStore<DualMetrics>>,
    ) -> Self {
        Self {
            topics,
            lessons,
            dual,
        }
    }

    /// Three process-local `TtlCache`s sharing one TTL and clock.
    #[must_use]
    pub fn in_memory(ttl: Duration, clock: Clock) -> Self {
        Self::new(
            Arc::new(TtlCache::<TopicProgress>::new(ttl, clock)),
            Arc::new(TtlCache::<LessonProgress>::new(ttl, clock)),
            Arc::new(TtlCache::<DualMetrics>::new(ttl, clock)),
        )
    }

    pub async fn get_topic(&self, student: &UserId, topic: &TopicId) -> Option<TopicProgress> {
        self.topics.get(&pair_key(student, topic.as_str())).await
    }

    pub async fn set_topic(&self, progress: &TopicProgress) {
        let key = pair_key(&progress.student_id, progress.topic_id.as_str());
        self.topics.set(key, progress.clone()).await;
    }

    pub async fn get_lesson(&self, student: &UserId, lesson: &LessonId) -> Option<LessonProgress> {
        self.lessons.get(&pair_key(student, lesson.as_str())).await
    }

    pub async fn set_lesson(&self, progress: &LessonProgress) {
        let key = pair_key(&progress.student_id, progress.lesson_id.as_str());
        self.lessons.set(key, progress.clone()).await;
    }

    pub async fn get_dual(&self, student: &UserId) -> Option<DualMetrics> {
        self.dual.get(student.as_str()).await
    }

    pub async fn set_dual(&self, metrics: &DualMetrics) {
        self.dual
            .set(metrics.student_id.to_string(), metrics.clone())
            .await;
    }

    /// Drops one topic entry (or all of the student's when `topic` is `None`)
    /// and every lesson entry of the student.
    pub async fn invalidate_topic(&self, student: &UserId, topic: Option<&TopicId>) {
        let removed = match topic {
            Some(topic) => usize::from(self.topics.remove(&pair_key(student, topic.as_str())).await),
            None => self.topics.remove_prefix(&student_prefix(student)).await,
        };
        let lessons = self.lessons.remove_prefix(&student_prefix(student)).await;
        debug!(%student, ?topic, removed, lessons, "invalidated topic cache");
    }

    /// Drops one lesson entry, or all of the student's when `lesson` is `None`.
    pub async fn invalidate_lesson(&self, student: &UserId, lesson: Option<&LessonId>) {
        let removed = match lesson {
            Some(lesson) => {
                usize::from(self.lessons.remove(&pair_key(student, lesson.as_str())).await)
            }
            None => self.lessons.remove_prefix(&student_prefix(student)).await,
        };
        debug!(%student, ?lesson, removed, "invalidated lesson cache");
    }

    /// Drops the student's dual metrics and every lesson entry of the student.
    pub async fn invalidate_dual(&self, student: &UserId) {
        let removed = self.dual.remove(student.as_str()).await;
        let lessons = self.lessons.remove_prefix(&student_prefix(student)).await;
        debug!(%student, removed, lessons, "invalidated dual metrics cache");
    }

    /// Drops everything cached for the student.
    pub async fn invalidate_student(&self, student: &UserId) {
        self.invalidate_topic(student, None).await;
        self.invalidate_dual(student).await;
    }
}
