// src/session/students.rs

use super::StudentInfo;

/// Mock registrar lookup.
///
/// Stands in for the student-records integration; only one demo number is
/// known, everything else resolves to the unknown snapshot. The lookup is
/// keyed by the session's final student number, after any continuity
/// backfill has been applied.
pub struct StudentDirectory;

/// Demo student number recognized by the mock directory.
pub const DEMO_STUDENT_NUMBER: &str = "400127653";

impl StudentDirectory {
    pub fn lookup(student_number: Option<&str>) -> StudentInfo {
        match student_number {
            Some(DEMO_STUDENT_NUMBER) => StudentInfo {
                level: Some(3),
                semester: "Fall 2026".to_string(),
                course_count: 4,
                program: "Information Systems".to_string(),
                enrollment_status: "full-time".to_string(),
            },
            _ => StudentInfo::unknown(),
        }
    }
}
