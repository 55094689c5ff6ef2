use crate::admin;
use crate::calendar::{self, BusinessDay};
use crate::db::{fmt_date, parse_date};
use crate::error::{AttendanceError, Result};
use crate::model::full_name;
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;

/// A report as plain strings, ready for any tabular exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    /// Optional second header line, aligned with `headers`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDayRow {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub day: u32,
    pub entry_time: Option<String>,
    pub exit_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDateRow {
    pub student_id: i64,
    pub code: String,
    pub full_name: String,
    pub entry_time: Option<String>,
    pub exit_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayMark {
    #[serde(rename = "A")]
    Present,
    #[serde(rename = "I")]
    Absent,
}

impl DayMark {
    pub fn as_str(self) -> &'static str {
        match self {
            DayMark::Present => "A",
            DayMark::Absent => "I",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixDay {
    pub day: u32,
    pub initial: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRow {
    pub ordinal: usize,
    pub student_id: i64,
    pub full_name: String,
    pub marks: Vec<DayMark>,
    pub times_present: usize,
    pub attendance_percent: f64,
    pub times_absent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthMatrix {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub days: Vec<MatrixDay>,
    pub rows: Vec<MatrixRow>,
}

impl MonthMatrix {
    pub fn business_day_count(&self) -> usize {
        self.days.len()
    }

    pub fn to_table(&self) -> ReportTable {
        let mut headers = vec!["N°".to_string(), "Apellidos y Nombres".to_string()];
        let mut sub_headers = vec![String::new(), String::new()];
        for d in &self.days {
            headers.push(d.initial.to_string());
            sub_headers.push(d.day.to_string());
        }
        headers.extend([
            "Asistencias".to_string(),
            "% Asistencia".to_string(),
            "Inasistencias".to_string(),
        ]);
        sub_headers.extend([String::new(), String::new(), String::new()]);

        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut cells = vec![r.ordinal.to_string(), r.full_name.clone()];
                cells.extend(r.marks.iter().map(|m| m.as_str().to_string()));
                cells.push(r.times_present.to_string());
                cells.push(format!("{:.1}", r.attendance_percent));
                cells.push(r.times_absent.to_string());
                cells
            })
            .collect();

        ReportTable {
            title: format!("{} {}", self.month_name, self.year),
            headers,
            sub_headers,
            rows,
        }
    }
}

pub fn student_table(title: impl Into<String>, rows: &[StudentDayRow]) -> ReportTable {
    ReportTable {
        title: title.into(),
        headers: ["Año", "Mes", "Día", "Hora de entrada", "Hora de salida"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        sub_headers: Vec::new(),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.year.to_string(),
                    r.month_name.to_string(),
                    r.day.to_string(),
                    r.entry_time.clone().unwrap_or_default(),
                    r.exit_time.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    }
}

pub fn grade_date_table(title: impl Into<String>, rows: &[GradeDateRow]) -> ReportTable {
    ReportTable {
        title: title.into(),
        headers: ["Código", "Apellidos y Nombres", "Hora de entrada", "Hora de salida"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        sub_headers: Vec::new(),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.code.clone(),
                    r.full_name.clone(),
                    r.entry_time.clone().unwrap_or_default(),
                    r.exit_time.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    }
}

/// Read-only attendance reports. Rows come from the `v_asistencias` view, so
/// entry/exit and single-timestamp marks are both covered.
pub struct ReportEngine<'c> {
    conn: &'c Connection,
}

impl<'c> ReportEngine<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        ReportEngine { conn }
    }

    /// Every recorded day of one student, oldest first. `NoRecords` when the
    /// student has none.
    pub fn by_student(&self, student_id: i64) -> Result<Vec<StudentDayRow>> {
        if admin::student_by_id(self.conn, student_id)?.is_none() {
            return Err(AttendanceError::not_found("student", student_id));
        }
        let mut stmt = self.conn.prepare(
            "SELECT fecha, hora_entrada, hora_salida
             FROM v_asistencias
             WHERE alumno_id = ?
             ORDER BY fecha",
        )?;
        let raw = stmt
            .query_map([student_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<String>>(1)?,
                    r.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (fecha, entry_time, exit_time) in raw {
            let Some(date) = parse_date(&fecha) else {
                log::warn!("skipping attendance with bad date {:?} for {}", fecha, student_id);
                continue;
            };
            rows.push(StudentDayRow {
                year: date.year(),
                month: date.month(),
                month_name: calendar::month_name(date.month()),
                day: date.day(),
                entry_time,
                exit_time,
            });
        }
        if rows.is_empty() {
            return Err(AttendanceError::NoRecords);
        }
        log::debug!("student {} report: {} rows", student_id, rows.len());
        Ok(rows)
    }

    /// Attendance of one grade section on one day. An empty list is a valid
    /// answer.
    pub fn by_grade_section_date(
        &self,
        grade_id: i64,
        section: &str,
        date: NaiveDate,
    ) -> Result<Vec<GradeDateRow>> {
        let gs = admin::find_grade_section(self.conn, grade_id, section)?;
        let mut stmt = self.conn.prepare(
            "SELECT a.alumno_id, a.codigo, a.nombres, a.apellido_paterno, a.apellido_materno,
                    v.hora_entrada, v.hora_salida
             FROM v_asistencias v
             JOIN alumnos a ON a.alumno_id = v.alumno_id
             WHERE a.detalle_grado_id = ? AND v.fecha = ?
             ORDER BY a.apellido_paterno, a.apellido_materno, a.nombres, a.alumno_id",
        )?;
        let rows = stmt
            .query_map((gs.id, fmt_date(date)), |r| {
                let given: String = r.get(2)?;
                let paternal: String = r.get(3)?;
                let maternal: String = r.get(4)?;
                Ok(GradeDateRow {
                    student_id: r.get(0)?,
                    code: r.get(1)?,
                    full_name: full_name(&given, &paternal, &maternal),
                    entry_time: r.get(5)?,
                    exit_time: r.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        log::debug!(
            "grade {} section {} on {}: {} rows",
            grade_id,
            gs.section,
            date,
            rows.len()
        );
        Ok(rows)
    }

    /// Twelve month tables for a grade section, January to December.
    pub fn monthly_matrix(&self, grade_id: i64, section: &str, year: i32) -> Result<Vec<MonthMatrix>> {
        let gs = admin::find_grade_section(self.conn, grade_id, section)?;
        let present = self.present_days(gs.id, year)?;
        let students = admin::list_students(self.conn, Some(gs.id))?;
        let roster: Vec<(i64, String)> = students
            .iter()
            .map(|s| (s.id, s.full_name()))
            .collect();

        Ok((1..=12)
            .map(|month| {
                build_month(year, month, &calendar::business_days(year, month), &roster, &present)
            })
            .collect())
    }

    fn present_days(&self, grade_section_id: i64, year: i32) -> Result<HashSet<(i64, NaiveDate)>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.alumno_id, v.fecha
             FROM v_asistencias v
             JOIN alumnos a ON a.alumno_id = v.alumno_id
             WHERE a.detalle_grado_id = ? AND v.fecha BETWEEN ? AND ?",
        )?;
        let rows = stmt
            .query_map(
                (
                    grade_section_id,
                    format!("{:04}-01-01", year),
                    format!("{:04}-12-31", year),
                ),
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, fecha)| parse_date(&fecha).map(|d| (id, d)))
            .collect())
    }
}

/// Builds one month of the matrix from the roster (already in display
/// order) and the set of (student, date) pairs with attendance.
pub fn build_month(
    year: i32,
    month: u32,
    days: &[BusinessDay],
    roster: &[(i64, String)],
    present: &HashSet<(i64, NaiveDate)>,
) -> MonthMatrix {
    let rows = roster
        .iter()
        .enumerate()
        .map(|(i, (student_id, name))| {
            let marks: Vec<DayMark> = days
                .iter()
                .map(|d| {
                    if present.contains(&(*student_id, d.date)) {
                        DayMark::Present
                    } else {
                        DayMark::Absent
                    }
                })
                .collect();
            let times_present = marks.iter().filter(|m| **m == DayMark::Present).count();
            MatrixRow {
                ordinal: i + 1,
                student_id: *student_id,
                full_name: name.clone(),
                marks,
                times_present,
                attendance_percent: calendar::attendance_percent(times_present, days.len()),
                times_absent: days.len() - times_present,
            }
        })
        .collect();

    MonthMatrix {
        year,
        month,
        month_name: calendar::month_name(month),
        days: days
            .iter()
            .map(|d| MatrixDay {
                day: d.day(),
                initial: d.initial,
            })
            .collect(),
        rows,
    }
}
