// src/session/mod.rs

pub mod registry;
pub mod students;

pub use registry::{NewSession, SessionRegistry};
pub use students::StudentDirectory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Student numbers shorter than this cannot belong to an enrolled student.
pub const STUDENT_NUMBER_MIN_LEN: usize = 9;

/// Whether the person behind a session is an enrolled student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Current,
    Prospective,
}

impl UserType {
    /// Derived from the student number alone. A missing or short number
    /// cannot be verified, so the user is treated as prospective.
    pub fn from_student_number(student_number: Option<&str>) -> Self {
        match student_number {
            Some(n) if n.trim().len() >= STUDENT_NUMBER_MIN_LEN => UserType::Current,
            _ => UserType::Prospective,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Current => "current",
            UserType::Prospective => "prospective",
        }
    }
}

/// Registrar snapshot attached to a session at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub level: Option<u8>,
    pub semester: String,
    pub course_count: u32,
    pub program: String,
    pub enrollment_status: String,
}

impl StudentInfo {
    /// Placeholder snapshot for numbers the directory does not know.
    pub fn unknown() -> Self {
        Self {
            level: None,
            semester: "Unknown".to_string(),
            course_count: 0,
            program: "Unknown".to_string(),
            enrollment_status: "unknown".to_string(),
        }
    }
}

/// One live conversation participant.
///
/// The session identifier never changes after creation, and `chat_id` is
/// assigned at most once (see [`registry::SessionRegistry::attach_chat_id`]).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub name: String,
    pub student_number: Option<String>,
    pub chat_id: Option<String>,
    pub user_type: UserType,
    pub student_info: StudentInfo,
    /// Summary recovered from a previous conversation under the same chat
    /// ID, fed into the generation prompt for continuity.
    pub previous_context: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_requires_a_full_length_number() {
        assert_eq!(UserType::from_student_number(None), UserType::Prospective);
        assert_eq!(UserType::from_student_number(Some("")), UserType::Prospective);
        assert_eq!(UserType::from_student_number(Some("12345678")), UserType::Prospective);
        assert_eq!(UserType::from_student_number(Some("123456789")), UserType::Current);
    }

    #[test]
    fn user_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserType::Prospective).unwrap(),
            "\"prospective\""
        );
        assert_eq!(serde_json::to_string(&UserType::Current).unwrap(), "\"current\"");
    }

    #[test]
    fn unknown_snapshot_has_no_level() {
        let info = StudentInfo::unknown();
        assert_eq!(info.level, None);
        assert_eq!(info.course_count, 0);
        assert_eq!(info.enrollment_status, "unknown");
    }
}
