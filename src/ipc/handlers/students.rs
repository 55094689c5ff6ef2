use crate::admin;
use crate::error::AttendanceError;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_i64, get_optional_str, get_required_i64, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentInput;
use rusqlite::Connection;
use serde_json::json;

fn parse_student_input(params: &serde_json::Value) -> Result<StudentInput, HandlerErr> {
    let Some(student) = params.get("student") else {
        return Err(HandlerErr::bad_params("missing student"));
    };
    serde_json::from_value(student.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid student: {}", e)))
}

fn students_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_section_id = match (
        get_optional_i64(params, "gradeId")?,
        get_optional_str(params, "section"),
    ) {
        (Some(grade_id), Some(section)) => {
            Some(admin::find_grade_section(conn, grade_id, &section)?.id)
        }
        (None, None) => get_optional_i64(params, "gradeSectionId")?,
        _ => {
            return Err(HandlerErr::bad_params(
                "gradeId and section must be given together",
            ))
        }
    };
    let students = admin::list_students(conn, grade_section_id)?;
    let rows: Vec<serde_json::Value> = students
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "code": s.code,
                "fullName": s.full_name(),
                "givenNames": s.given_names,
                "paternalSurname": s.paternal_surname,
                "maternalSurname": s.maternal_surname,
                "enrollmentDate": s.enrollment_date,
                "gradeSectionId": s.grade_section_id
            })
        })
        .collect();
    Ok(json!({ "students": rows }))
}

fn students_get(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student = if let Some(code) = get_optional_str(params, "code") {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(AttendanceError::InvalidCode.into());
        }
        admin::student_by_code(conn, &code)?
            .ok_or(AttendanceError::StudentNotFound { code })?
    } else {
        let id = get_required_i64(params, "studentId")?;
        admin::student_by_id(conn, id)?.ok_or_else(|| AttendanceError::NotFound {
            entity: "student",
            key: id.to_string(),
        })?
    };
    Ok(json!({ "student": student, "fullName": student.full_name() }))
}

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let input = parse_student_input(params)?;
    let student = admin::create_student(conn, &input)?;
    Ok(json!({ "student": student }))
}

fn students_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_i64(params, "studentId")?;
    let input = parse_student_input(params)?;
    let student = admin::update_student(conn, id, &input)?;
    Ok(json!({ "student": student }))
}

fn students_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_i64(params, "studentId")?;
    admin::delete_student(conn, id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    match req.method.as_str() {
        "students.list" => Some(with_conn(state, req, |conn, _| students_list(conn, p))),
        "students.get" => Some(with_conn(state, req, |conn, _| students_get(conn, p))),
        "students.create" => Some(with_conn(state, req, |conn, _| students_create(conn, p))),
        "students.update" => Some(with_conn(state, req, |conn, _| students_update(conn, p))),
        "students.delete" => Some(with_conn(state, req, |conn, _| students_delete(conn, p))),
        _ => None,
    }
}
