use crate::admin;
use crate::clock::{Clock, SystemClock};
use crate::db::{fmt_date, fmt_time};
use crate::error::{is_unique_violation, AttendanceError, Result};
use crate::model::{AttendanceMode, AttendanceRecord, Direction, Student};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkKind {
    Entry,
    Exit,
    Simple,
}

/// Returned on every successful mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub student_id: i64,
    pub code: String,
    pub display_name: String,
    pub kind: MarkKind,
    pub date: String,
    pub time: String,
}

impl Confirmation {
    pub fn message(&self) -> String {
        match self.kind {
            MarkKind::Entry => format!("Entrada registrada: {}", self.display_name),
            MarkKind::Exit => format!("Salida registrada: {}", self.display_name),
            MarkKind::Simple => format!("Asistencia registrada: {}", self.display_name),
        }
    }
}

/// Marks attendance for "today" as reported by the clock.
///
/// Per student and day the entry/exit record moves `none -> entry -> exit`
/// and never back. Each mark writes at most one row.
pub struct AttendanceService<'c, C: Clock = SystemClock> {
    conn: &'c Connection,
    clock: C,
}

impl<'c> AttendanceService<'c, SystemClock> {
    pub fn new(conn: &'c Connection) -> Self {
        AttendanceService {
            conn,
            clock: SystemClock,
        }
    }
}

impl<'c, C: Clock> AttendanceService<'c, C> {
    pub fn with_clock(conn: &'c Connection, clock: C) -> Self {
        AttendanceService { conn, clock }
    }

    fn lookup(&self, code: &str) -> Result<Student> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AttendanceError::InvalidCode);
        }
        match admin::student_by_code(self.conn, code)? {
            Some(s) => Ok(s),
            None => {
                log::warn!("scan rejected: unknown code {}", code);
                Err(AttendanceError::StudentNotFound {
                    code: code.to_string(),
                })
            }
        }
    }

    pub fn mark_entry(&self, code: &str) -> Result<Confirmation> {
        let student = self.lookup(code)?;
        let now = self.clock.now();
        let date = fmt_date(now.date());
        let time = fmt_time(now.time());

        if self.record_for(student.id, &date)?.is_some() {
            log::warn!("entry rejected: {} already marked on {}", student.code, date);
            return Err(AttendanceError::AlreadyMarked {
                name: student.display_name(),
            });
        }

        self.insert_entry(&student, &date, &time)?;

        log::info!("entry marked: {} {} {}", student.code, date, time);
        Ok(confirmation(&student, MarkKind::Entry, date, time))
    }

    /// Writes the entry row. The unique index on (student, day) rejects a
    /// second row even when another writer passed the existence check too.
    fn insert_entry(&self, student: &Student, date: &str, time: &str) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO asistencias(alumno_id, fecha, hora_entrada) VALUES(?, ?, ?)",
            (student.id, date, time),
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                log::warn!("entry rejected: {} already marked on {}", student.code, date);
                Err(AttendanceError::AlreadyMarked {
                    name: student.display_name(),
                })
            }
            Err(e) => {
                log::error!("entry insert failed for {}: {}", student.code, e);
                Err(e.into())
            }
        }
    }

    pub fn mark_exit(&self, code: &str) -> Result<Confirmation> {
        let student = self.lookup(code)?;
        let now = self.clock.now();
        let date = fmt_date(now.date());
        let time = fmt_time(now.time());

        let record = match self.record_for(student.id, &date)? {
            Some(r) if r.entry_time.is_some() => r,
            _ => {
                log::warn!("exit rejected: {} has no entry on {}", student.code, date);
                return Err(AttendanceError::NoEntryRecorded {
                    name: student.display_name(),
                });
            }
        };
        if record.exit_time.is_some() {
            log::warn!("exit rejected: {} already left on {}", student.code, date);
            return Err(AttendanceError::AlreadyMarkedExit {
                name: student.display_name(),
            });
        }

        let changed = self
            .conn
            .execute(
                "UPDATE asistencias SET hora_salida = ?
                 WHERE asistencia_id = ? AND hora_salida IS NULL",
                (&time, record.id),
            )
            .map_err(|e| {
                log::error!("exit update failed for {}: {}", student.code, e);
                AttendanceError::from(e)
            })?;
        if changed == 0 {
            return Err(AttendanceError::AlreadyMarkedExit {
                name: student.display_name(),
            });
        }

        log::info!("exit marked: {} {} {}", student.code, date, time);
        Ok(confirmation(&student, MarkKind::Exit, date, time))
    }

    /// Single-timestamp mark. Repeated scans are all kept.
    pub fn mark_simple(&self, code: &str) -> Result<Confirmation> {
        let student = self.lookup(code)?;
        let now = self.clock.now();
        let date = fmt_date(now.date());
        let time = fmt_time(now.time());

        self.conn
            .execute(
                "INSERT INTO marcaciones(alumno_id, fecha, hora) VALUES(?, ?, ?)",
                (student.id, &date, &time),
            )
            .map_err(|e| {
                log::error!("simple mark failed for {}: {}", student.code, e);
                AttendanceError::from(e)
            })?;

        log::info!("attendance marked: {} {} {}", student.code, date, time);
        Ok(confirmation(&student, MarkKind::Simple, date, time))
    }

    /// A scan from the check-in screen, routed by the configured mode.
    pub fn scan(
        &self,
        code: &str,
        mode: AttendanceMode,
        direction: Direction,
    ) -> Result<Confirmation> {
        match (mode, direction) {
            (AttendanceMode::Simple, _) => self.mark_simple(code),
            (AttendanceMode::EntryExit, Direction::Entry) => self.mark_entry(code),
            (AttendanceMode::EntryExit, Direction::Exit) => self.mark_exit(code),
        }
    }

    pub fn record_for(&self, student_id: i64, date: &str) -> Result<Option<AttendanceRecord>> {
        let rec = self
            .conn
            .query_row(
                "SELECT asistencia_id, alumno_id, fecha, hora_entrada, hora_salida
                 FROM asistencias
                 WHERE alumno_id = ? AND fecha = ?",
                (student_id, date),
                |r| {
                    Ok(AttendanceRecord {
                        id: r.get(0)?,
                        student_id: r.get(1)?,
                        date: r.get(2)?,
                        entry_time: r.get(3)?,
                        exit_time: r.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(rec)
    }
}

fn confirmation(student: &Student, kind: MarkKind, date: String, time: String) -> Confirmation {
    Confirmation {
        student_id: student.id,
        code: student.code.clone(),
        display_name: student.display_name(),
        kind,
        date,
        time,
    }
}
