use serde::Serialize;
use thiserror::Error;

/// Coarse classification the UI uses to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    EmptyResult,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalidInput",
            ErrorKind::NotFound => "notFound",
            ErrorKind::Conflict => "conflict",
            ErrorKind::EmptyResult => "emptyResult",
            ErrorKind::PersistenceFailure => "persistenceFailure",
        }
    }

    /// Advisory failures are shown as a notice; the rest need acknowledgement.
    pub fn is_advisory(self) -> bool {
        !matches!(self, ErrorKind::PersistenceFailure)
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("student code must not be empty")]
    InvalidCode,

    #[error("{0}")]
    InvalidInput(String),

    #[error("no student with code {code}")]
    StudentNotFound { code: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    Duplicate(String),

    #[error("{name} already has attendance marked today")]
    AlreadyMarked { name: String },

    #[error("{name} has no entry recorded today")]
    NoEntryRecorded { name: String },

    #[error("{name} already has an exit recorded today")]
    AlreadyMarkedExit { name: String },

    #[error("no attendance records")]
    NoRecords,

    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, AttendanceError>;

impl AttendanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttendanceError::InvalidCode | AttendanceError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            AttendanceError::StudentNotFound { .. } | AttendanceError::NotFound { .. } => {
                ErrorKind::NotFound
            }
            AttendanceError::Duplicate(_)
            | AttendanceError::AlreadyMarked { .. }
            | AttendanceError::NoEntryRecorded { .. }
            | AttendanceError::AlreadyMarkedExit { .. } => ErrorKind::Conflict,
            AttendanceError::NoRecords => ErrorKind::EmptyResult,
            AttendanceError::Persistence(_) | AttendanceError::Export(_) => {
                ErrorKind::PersistenceFailure
            }
        }
    }

    /// Stable code carried in sidecar error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::InvalidCode => "invalid_code",
            AttendanceError::InvalidInput(_) => "bad_params",
            AttendanceError::StudentNotFound { .. } => "student_not_found",
            AttendanceError::NotFound { .. } => "not_found",
            AttendanceError::Duplicate(_) => "duplicate",
            AttendanceError::AlreadyMarked { .. } => "already_marked",
            AttendanceError::NoEntryRecorded { .. } => "no_entry_recorded",
            AttendanceError::AlreadyMarkedExit { .. } => "already_marked_exit",
            AttendanceError::NoRecords => "no_records",
            AttendanceError::Persistence(_) => "db_failed",
            AttendanceError::Export(_) => "export_failed",
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        AttendanceError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// True when the SQLite error is a UNIQUE/PRIMARY KEY violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == rusqlite::ErrorCode::ConstraintViolation
                && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(AttendanceError::InvalidCode.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            AttendanceError::StudentNotFound { code: "ZZZ".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AttendanceError::AlreadyMarked { name: "x".into() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AttendanceError::AlreadyMarkedExit { name: "x".into() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(AttendanceError::NoRecords.kind(), ErrorKind::EmptyResult);
        assert_eq!(
            AttendanceError::Export("locked".into()).kind(),
            ErrorKind::PersistenceFailure
        );
        assert!(!ErrorKind::PersistenceFailure.is_advisory());
        assert!(ErrorKind::EmptyResult.is_advisory());
    }

    #[test]
    fn codes_are_snake_case() {
        let e = AttendanceError::NoEntryRecorded { name: "x".into() };
        assert_eq!(e.code(), "no_entry_recorded");
        assert_eq!(
            AttendanceError::not_found("grade", 7).to_string(),
            "grade not found: 7"
        );
    }

    #[test]
    fn unique_violation_is_told_apart_from_other_constraints() {
        let conn = rusqlite::Connection::open_in_memory().expect("memory db");
        conn.execute(
            "CREATE TABLE t(k TEXT NOT NULL UNIQUE, n INTEGER CHECK(n > 0))",
            [],
        )
        .expect("table");
        conn.execute("INSERT INTO t(k, n) VALUES('a', 1)", [])
            .expect("first row");

        let dup = conn
            .execute("INSERT INTO t(k, n) VALUES('a', 2)", [])
            .expect_err("unique");
        assert!(is_unique_violation(&dup));

        let check = conn
            .execute("INSERT INTO t(k, n) VALUES('b', 0)", [])
            .expect_err("check");
        assert!(!is_unique_violation(&check));
        assert!(!is_unique_violation(&rusqlite::Error::QueryReturnedNoRows));
    }
}
