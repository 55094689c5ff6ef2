use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: i64,
    pub name: String,
    pub level_id: i64,
}

/// A grade combined with a section letter (detalle_grado).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSection {
    pub id: i64,
    pub grade_id: i64,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub code: String,
    pub given_names: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub enrollment_date: String,
    pub grade_section_id: i64,
}

impl Student {
    /// "Paterno Materno, Nombres", the way rosters list students.
    pub fn full_name(&self) -> String {
        full_name(
            &self.given_names,
            &self.paternal_surname,
            &self.maternal_surname,
        )
    }

    /// "Nombres Paterno", shown on the scan confirmation.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_names, self.paternal_surname)
            .trim()
            .to_string()
    }
}

pub fn full_name(given: &str, paternal: &str, maternal: &str) -> String {
    let surnames = format!("{} {}", paternal.trim(), maternal.trim());
    format!("{}, {}", surnames.trim(), given.trim())
}

/// Fields accepted when creating or replacing a student.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub code: String,
    pub given_names: String,
    pub paternal_surname: String,
    #[serde(default)]
    pub maternal_surname: String,
    pub enrollment_date: String,
    pub grade_section_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub date: String,
    pub entry_time: Option<String>,
    pub exit_time: Option<String>,
}

/// Which marking behavior a plain scan uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceMode {
    #[default]
    EntryExit,
    Simple,
}

impl AttendanceMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entryExit" => Some(Self::EntryExit),
            "simple" => Some(Self::Simple),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntryExit => "entryExit",
            Self::Simple => "simple",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(Self::Entry),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}
