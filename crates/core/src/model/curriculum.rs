use thiserror::Error;

use crate::model::ids::{LessonId, TopicId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("lesson name cannot be empty")]
    EmptyLessonName,

    #[error("topic name cannot be empty")]
    EmptyTopicName,
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A container of topics.
///
/// Lessons without an owner are global and visible to every teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    name: String,
    teacher_id: Option<UserId>,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `CurriculumError::EmptyLessonName` if name is empty or whitespace-only.
    pub fn new(
        id: LessonId,
        name: impl Into<String>,
        teacher_id: Option<UserId>,
    ) -> Result<Self, CurriculumError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CurriculumError::EmptyLessonName);
        }
        Ok(Self {
            id,
            name: name.trim().to_owned(),
            teacher_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn teacher_id(&self) -> Option<&UserId> {
        self.teacher_id.as_ref()
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.teacher_id.is_none()
    }

    #[must_use]
    pub fn visible_to(&self, teacher: &UserId) -> bool {
        match &self.teacher_id {
            None => true,
            Some(owner) => owner == teacher,
        }
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    lesson_id: LessonId,
    name: String,
}

impl Topic {
    /// # Errors
    ///
    /// Returns `CurriculumError::EmptyTopicName` if name is empty or whitespace-only.
    pub fn new(
        id: TopicId,
        lesson_id: LessonId,
        name: impl Into<String>,
    ) -> Result<Self, CurriculumError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CurriculumError::EmptyTopicName);
        }
        Ok(Self {
            id,
            lesson_id,
            name: name.trim().to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &TopicId {
        &self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_lesson_is_visible_to_everyone() {
        let lesson = Lesson::new(LessonId::parse("l1").unwrap(), "Algebra", None).unwrap();
        assert!(lesson.is_global());
        assert!(lesson.visible_to(&UserId::parse("t9").unwrap()));
    }

    #[test]
    fn owned_lesson_is_visible_to_owner_only() {
        let owner = UserId::parse("t1").unwrap();
        let lesson =
            Lesson::new(LessonId::parse("l1").unwrap(), "Algebra", Some(owner.clone())).unwrap();
        assert!(!lesson.is_global());
        assert!(lesson.visible_to(&owner));
        assert!(!lesson.visible_to(&UserId::parse("t2").unwrap()));
    }

    #[test]
    fn names_are_trimmed_and_required() {
        let lesson_id = LessonId::parse("l1").unwrap();
        let topic = Topic::new(TopicId::parse("t1").unwrap(), lesson_id.clone(), "  Limits ").unwrap();
        assert_eq!(topic.name(), "Limits");

        let err = Topic::new(TopicId::parse("t2").unwrap(), lesson_id.clone(), "   ").unwrap_err();
        assert_eq!(err, CurriculumError::EmptyTopicName);
        let err = Lesson::new(lesson_id, "", None).unwrap_err();
        assert_eq!(err, CurriculumError::EmptyLessonName);
    }
}
