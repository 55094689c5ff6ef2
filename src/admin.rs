//! Administrative upkeep of the grade hierarchy and student records.

use crate::db::parse_date;
use crate::error::{is_unique_violation, AttendanceError, Result};
use crate::model::{Grade, GradeSection, Level, Student, StudentInput};
use rusqlite::{Connection, OptionalExtension, Row};

const STUDENT_COLUMNS: &str = "alumno_id, codigo, nombres, apellido_paterno, apellido_materno,
     fecha_ingreso, detalle_grado_id";

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        code: r.get(1)?,
        given_names: r.get(2)?,
        paternal_surname: r.get(3)?,
        maternal_surname: r.get(4)?,
        enrollment_date: r.get(5)?,
        grade_section_id: r.get(6)?,
    })
}

fn required(value: &str, field: &str) -> Result<String> {
    let t = value.trim();
    if t.is_empty() {
        return Err(AttendanceError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(t.to_string())
}

fn duplicate_or(e: rusqlite::Error, message: impl FnOnce() -> String) -> AttendanceError {
    if is_unique_violation(&e) {
        AttendanceError::Duplicate(message())
    } else {
        AttendanceError::Persistence(e)
    }
}

pub fn list_levels(conn: &Connection) -> Result<Vec<Level>> {
    let mut stmt = conn.prepare("SELECT nivel_id, nivel FROM niveles ORDER BY nivel_id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Level {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn create_level(conn: &Connection, name: &str) -> Result<Level> {
    let name = required(name, "level name")?;
    conn.execute("INSERT INTO niveles(nivel) VALUES(?)", [&name])
        .map_err(|e| duplicate_or(e, || format!("level {} already exists", name)))?;
    Ok(Level {
        id: conn.last_insert_rowid(),
        name,
    })
}

fn level_exists(conn: &Connection, level_id: i64) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM niveles WHERE nivel_id = ?", [level_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some())
}

pub fn list_grades(conn: &Connection, level_id: Option<i64>) -> Result<Vec<Grade>> {
    let mut stmt = conn.prepare(
        "SELECT grado_id, grado, nivel_id
         FROM grados
         WHERE ?1 IS NULL OR nivel_id = ?1
         ORDER BY nivel_id, grado_id",
    )?;
    let rows = stmt
        .query_map([level_id], |r| {
            Ok(Grade {
                id: r.get(0)?,
                name: r.get(1)?,
                level_id: r.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn grade_by_id(conn: &Connection, grade_id: i64) -> Result<Option<Grade>> {
    let grade = conn
        .query_row(
            "SELECT grado_id, grado, nivel_id FROM grados WHERE grado_id = ?",
            [grade_id],
            |r| {
                Ok(Grade {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    level_id: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(grade)
}

pub fn create_grade(conn: &Connection, level_id: i64, name: &str) -> Result<Grade> {
    let name = required(name, "grade name")?;
    if !level_exists(conn, level_id)? {
        return Err(AttendanceError::not_found("level", level_id));
    }
    conn.execute(
        "INSERT INTO grados(grado, nivel_id) VALUES(?, ?)",
        (&name, level_id),
    )
    .map_err(|e| duplicate_or(e, || format!("grade {} already exists", name)))?;
    Ok(Grade {
        id: conn.last_insert_rowid(),
        name,
        level_id,
    })
}

/// Section labels are stored trimmed and upper-cased ("a " -> "A").
pub fn normalize_section(section: &str) -> String {
    section.trim().to_uppercase()
}

pub fn list_sections(conn: &Connection, grade_id: i64) -> Result<Vec<GradeSection>> {
    let mut stmt = conn.prepare(
        "SELECT detalle_grado_id, grado_id, seccion
         FROM detalle_grados
         WHERE grado_id = ?
         ORDER BY seccion",
    )?;
    let rows = stmt
        .query_map([grade_id], |r| {
            Ok(GradeSection {
                id: r.get(0)?,
                grade_id: r.get(1)?,
                section: r.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn create_section(conn: &Connection, grade_id: i64, section: &str) -> Result<GradeSection> {
    let section = normalize_section(&required(section, "section")?);
    if grade_by_id(conn, grade_id)?.is_none() {
        return Err(AttendanceError::not_found("grade", grade_id));
    }
    conn.execute(
        "INSERT INTO detalle_grados(grado_id, seccion) VALUES(?, ?)",
        (grade_id, &section),
    )
    .map_err(|e| duplicate_or(e, || format!("section {} already exists for grade", section)))?;
    Ok(GradeSection {
        id: conn.last_insert_rowid(),
        grade_id,
        section,
    })
}

/// Resolves a grade + section pair, failing with `NotFound` for either half.
pub fn find_grade_section(conn: &Connection, grade_id: i64, section: &str) -> Result<GradeSection> {
    let section = normalize_section(section);
    if section.is_empty() {
        return Err(AttendanceError::InvalidInput(
            "section must not be empty".to_string(),
        ));
    }
    if grade_by_id(conn, grade_id)?.is_none() {
        return Err(AttendanceError::not_found("grade", grade_id));
    }
    conn.query_row(
        "SELECT detalle_grado_id, grado_id, seccion
         FROM detalle_grados
         WHERE grado_id = ? AND seccion = ?",
        (grade_id, &section),
        |r| {
            Ok(GradeSection {
                id: r.get(0)?,
                grade_id: r.get(1)?,
                section: r.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| AttendanceError::not_found("section", format!("{}{}", grade_id, section)))
}

fn grade_section_exists(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM detalle_grados WHERE detalle_grado_id = ?",
            [id],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Students of one grade section (or all), ordered by surnames then names.
pub fn list_students(conn: &Connection, grade_section_id: Option<i64>) -> Result<Vec<Student>> {
    let sql = format!(
        "SELECT {}
         FROM alumnos
         WHERE ?1 IS NULL OR detalle_grado_id = ?1
         ORDER BY apellido_paterno, apellido_materno, nombres, alumno_id",
        STUDENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([grade_section_id], student_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn student_by_id(conn: &Connection, id: i64) -> Result<Option<Student>> {
    let sql = format!("SELECT {} FROM alumnos WHERE alumno_id = ?", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], student_from_row).optional()?)
}

pub fn student_by_code(conn: &Connection, code: &str) -> Result<Option<Student>> {
    let sql = format!("SELECT {} FROM alumnos WHERE codigo = ?", STUDENT_COLUMNS);
    Ok(conn
        .query_row(&sql, [code.trim()], student_from_row)
        .optional()?)
}

struct ValidStudent {
    code: String,
    given_names: String,
    paternal_surname: String,
    maternal_surname: String,
    enrollment_date: String,
    grade_section_id: i64,
}

fn validate_student(conn: &Connection, input: &StudentInput) -> Result<ValidStudent> {
    let code = input.code.trim().to_string();
    if code.is_empty() {
        return Err(AttendanceError::InvalidCode);
    }
    let given_names = required(&input.given_names, "given names")?;
    let paternal_surname = required(&input.paternal_surname, "paternal surname")?;
    let enrollment_date = parse_date(&input.enrollment_date).ok_or_else(|| {
        AttendanceError::InvalidInput("enrollment date must be YYYY-MM-DD".to_string())
    })?;
    if !grade_section_exists(conn, input.grade_section_id)? {
        return Err(AttendanceError::not_found(
            "grade section",
            input.grade_section_id,
        ));
    }
    Ok(ValidStudent {
        code,
        given_names,
        paternal_surname,
        maternal_surname: input.maternal_surname.trim().to_string(),
        enrollment_date: crate::db::fmt_date(enrollment_date),
        grade_section_id: input.grade_section_id,
    })
}

pub fn create_student(conn: &Connection, input: &StudentInput) -> Result<Student> {
    let v = validate_student(conn, input)?;
    conn.execute(
        "INSERT INTO alumnos(codigo, nombres, apellido_paterno, apellido_materno,
                             fecha_ingreso, detalle_grado_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &v.code,
            &v.given_names,
            &v.paternal_surname,
            &v.maternal_surname,
            &v.enrollment_date,
            v.grade_section_id,
        ),
    )
    .map_err(|e| duplicate_or(e, || format!("code {} is already assigned", v.code)))?;
    let id = conn.last_insert_rowid();
    log::info!("student created: {} ({})", v.code, id);
    Ok(Student {
        id,
        code: v.code,
        given_names: v.given_names,
        paternal_surname: v.paternal_surname,
        maternal_surname: v.maternal_surname,
        enrollment_date: v.enrollment_date,
        grade_section_id: v.grade_section_id,
    })
}

pub fn update_student(conn: &Connection, id: i64, input: &StudentInput) -> Result<Student> {
    let v = validate_student(conn, input)?;
    let changed = conn
        .execute(
            "UPDATE alumnos SET
               codigo = ?, nombres = ?, apellido_paterno = ?, apellido_materno = ?,
               fecha_ingreso = ?, detalle_grado_id = ?
             WHERE alumno_id = ?",
            (
                &v.code,
                &v.given_names,
                &v.paternal_surname,
                &v.maternal_surname,
                &v.enrollment_date,
                v.grade_section_id,
                id,
            ),
        )
        .map_err(|e| duplicate_or(e, || format!("code {} is already assigned", v.code)))?;
    if changed == 0 {
        return Err(AttendanceError::not_found("student", id));
    }
    Ok(Student {
        id,
        code: v.code,
        given_names: v.given_names,
        paternal_surname: v.paternal_surname,
        maternal_surname: v.maternal_surname,
        enrollment_date: v.enrollment_date,
        grade_section_id: v.grade_section_id,
    })
}

/// Removes a student together with every attendance row that points at it.
pub fn delete_student(conn: &Connection, id: i64) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM asistencias WHERE alumno_id = ?", [id])?;
    tx.execute("DELETE FROM marcaciones WHERE alumno_id = ?", [id])?;
    let changed = tx.execute("DELETE FROM alumnos WHERE alumno_id = ?", [id])?;
    if changed == 0 {
        return Err(AttendanceError::not_found("student", id));
    }
    tx.commit()?;
    log::info!("student deleted: {}", id);
    Ok(())
}
