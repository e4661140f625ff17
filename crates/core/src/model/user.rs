use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    /// Parses the persisted role name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `UserError::UnknownRole` for anything else.
    pub fn parse(raw: &str) -> Result<Self, UserError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            _ => Err(UserError::UnknownRole(raw.to_owned())),
        }
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// The slice of a user account the metrics core needs.
///
/// Students carry the id of the teacher that owns them; that link is the
/// tenant boundary for every progress calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    role: Role,
    teacher_id: Option<UserId>,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, role: Role, teacher_id: Option<UserId>) -> Self {
        Self {
            id,
            role,
            teacher_id,
        }
    }

    #[must_use]
    pub fn student(id: UserId, teacher_id: UserId) -> Self {
        Self::new(id, Role::Student, Some(teacher_id))
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn teacher_id(&self) -> Option<&UserId> {
        self.teacher_id.as_ref()
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// True when `teacher` is allowed to see this user's data.
    #[must_use]
    pub fn belongs_to(&self, teacher: &UserId) -> bool {
        self.teacher_id.as_ref() == Some(teacher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("STUDENT").unwrap(), Role::Student);
        assert_eq!(Role::parse(" teacher ").unwrap(), Role::Teacher);
        assert!(matches!(
            Role::parse("janitor"),
            Err(UserError::UnknownRole(_))
        ));
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Admin, Role::Teacher, Role::Student, Role::Parent] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn student_belongs_only_to_its_teacher() {
        let student = User::student(uid("s1"), uid("t1"));
        assert!(student.is_student());
        assert!(student.belongs_to(&uid("t1")));
        assert!(!student.belongs_to(&uid("t2")));

        let orphan = User::new(uid("s2"), Role::Student, None);
        assert!(!orphan.belongs_to(&uid("t1")));
    }
}
