use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest identifier accepted from callers.
pub const MAX_ID_LEN: usize = 64;

/// Error type for parsing an ID from a string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    #[error("{kind} contains invalid character {ch:?}")]
    InvalidChar { kind: &'static str, ch: char },

    #[error("{kind} is longer than {max} characters")]
    TooLong { kind: &'static str, max: usize },
}

/// Ids are cuid-like: ASCII alphanumerics, `-` and `_` only.
///
/// Keeping `:` out of ids lets cache keys use it as a separator.
fn validate(kind: &'static str, raw: &str) -> Result<(), IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if raw.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            kind,
            max: MAX_ID_LEN,
        });
    }
    if let Some(ch) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(IdError::InvalidChar { kind, ch });
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses and validates an id supplied by a caller.
            ///
            /// # Errors
            ///
            /// Returns `IdError` if the value is empty, too long, or contains
            /// characters outside `[A-Za-z0-9_-]`.
            pub fn parse(raw: &str) -> Result<Self, IdError> {
                validate(stringify!($name), raw)?;
                Ok(Self(raw.to_owned()))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                validate(stringify!($name), &value)?;
                Ok(Self(value))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of any user (student, teacher, parent, admin).
    UserId
}

string_id! {
    /// Identifier of a lesson.
    LessonId
}

string_id! {
    /// Identifier of a topic inside a lesson.
    TopicId
}

string_id! {
    /// Identifier of an assignment.
    AssignmentId
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cuid_like_ids() {
        let id = UserId::parse("ckx9a1b2c0000qz8-stu_1").unwrap();
        assert_eq!(id.as_str(), "ckx9a1b2c0000qz8-stu_1");
        assert_eq!(id.to_string(), "ckx9a1b2c0000qz8-stu_1");
    }

    #[test]
    fn rejects_empty_id() {
        let err = "".parse::<TopicId>().unwrap_err();
        assert_eq!(err, IdError::Empty { kind: "TopicId" });
    }

    #[test]
    fn rejects_separator_and_whitespace() {
        let err = LessonId::parse("lesson:1").unwrap_err();
        assert_eq!(
            err,
            IdError::InvalidChar {
                kind: "LessonId",
                ch: ':'
            }
        );
        assert!(LessonId::parse(" lesson").is_err());
    }

    #[test]
    fn rejects_overlong_id() {
        let raw = "a".repeat(MAX_ID_LEN + 1);
        assert!(matches!(
            AssignmentId::parse(&raw),
            Err(IdError::TooLong { .. })
        ));
        assert!(AssignmentId::parse(&"a".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn debug_names_the_kind() {
        let id = AssignmentId::parse("a1").unwrap();
        assert_eq!(format!("{id:?}"), "AssignmentId(a1)");
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let id: UserId = serde_json::from_str("\"stu-1\"").unwrap();
        assert_eq!(id, UserId::parse("stu-1").unwrap());
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"stu-1\"");
    }
}
