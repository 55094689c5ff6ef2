use crate::admin;
use crate::error::AttendanceError;
use crate::export;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_optional_i64, get_optional_str, get_required_date, get_required_i64, get_required_str,
    with_conn,
};
use crate::ipc::types::{AppState, Request};
use crate::reports::{self, ReportEngine, ReportTable};
use crate::setup;
use chrono::Datelike;
use rusqlite::Connection;
use serde_json::json;
use std::path::{Path, PathBuf};

fn resolve_student_id(conn: &Connection, params: &serde_json::Value) -> Result<i64, HandlerErr> {
    if let Some(code) = get_optional_str(params, "code") {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(AttendanceError::InvalidCode.into());
        }
        return admin::student_by_code(conn, &code)?
            .map(|s| s.id)
            .ok_or_else(|| AttendanceError::StudentNotFound { code }.into());
    }
    get_required_i64(params, "studentId")
}

fn report_year(state: &AppState, params: &serde_json::Value) -> Result<i32, HandlerErr> {
    match get_optional_i64(params, "year")? {
        None => Ok(state.clock.today().year()),
        Some(y) if (1900..=9999).contains(&y) => Ok(y as i32),
        Some(_) => Err(HandlerErr::bad_params("year out of range")),
    }
}

fn report_month(params: &serde_json::Value) -> Result<Option<u32>, HandlerErr> {
    match get_optional_i64(params, "month")? {
        None => Ok(None),
        Some(m) if (1..=12).contains(&m) => Ok(Some(m as u32)),
        Some(_) => Err(HandlerErr::bad_params("month must be between 1 and 12")),
    }
}

fn by_student(conn: &Connection, params: &serde_json::Value) -> Result<(serde_json::Value, Vec<ReportTable>), HandlerErr> {
    let student_id = resolve_student_id(conn, params)?;
    let rows = ReportEngine::new(conn).by_student(student_id)?;
    let title = admin::student_by_id(conn, student_id)?
        .map(|s| s.full_name())
        .unwrap_or_default();
    let table = reports::student_table(title, &rows);
    Ok((json!({ "studentId": student_id, "rows": rows }), vec![table]))
}

fn by_grade_section_date(
    conn: &Connection,
    params: &serde_json::Value,
    date: chrono::NaiveDate,
) -> Result<(serde_json::Value, Vec<ReportTable>), HandlerErr> {
    let grade_id = get_required_i64(params, "gradeId")?;
    let section = get_required_str(params, "section")?;
    let rows = ReportEngine::new(conn).by_grade_section_date(grade_id, &section, date)?;
    let grade_name = admin::grade_by_id(conn, grade_id)?
        .map(|g| g.name)
        .unwrap_or_default();
    let title = format!(
        "{} {} {}",
        grade_name,
        admin::normalize_section(&section),
        crate::db::fmt_date(date)
    );
    let table = reports::grade_date_table(title, &rows);
    Ok((
        json!({ "date": crate::db::fmt_date(date), "rows": rows }),
        vec![table],
    ))
}

fn monthly_matrix(
    conn: &Connection,
    state: &AppState,
    params: &serde_json::Value,
) -> Result<(serde_json::Value, Vec<ReportTable>), HandlerErr> {
    let grade_id = get_required_i64(params, "gradeId")?;
    let section = get_required_str(params, "section")?;
    let year = report_year(state, params)?;
    let month = report_month(params)?;
    let mut months = ReportEngine::new(conn).monthly_matrix(grade_id, &section, year)?;
    if let Some(m) = month {
        months.retain(|mm| mm.month == m);
    }
    let tables = months.iter().map(|m| m.to_table()).collect();
    Ok((json!({ "year": year, "months": months }), tables))
}

fn build_report(
    conn: &Connection,
    state: &AppState,
    report: &str,
    params: &serde_json::Value,
) -> Result<(serde_json::Value, Vec<ReportTable>), HandlerErr> {
    match report {
        "byStudent" => by_student(conn, params),
        "byGradeSectionDate" => {
            let date = get_required_date(params, "date")?;
            by_grade_section_date(conn, params, date)
        }
        "today" => by_grade_section_date(conn, params, state.clock.today()),
        "monthlyMatrix" => monthly_matrix(conn, state, params),
        other => Err(HandlerErr::bad_params(format!(
            "report must be one of: byStudent, byGradeSectionDate, today, monthlyMatrix (got {})",
            other
        ))),
    }
}

fn export_path(
    conn: &Connection,
    state: &AppState,
    report: &str,
    requested: Option<String>,
) -> Result<PathBuf, HandlerErr> {
    let base = setup::export_dir(conn)?
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
        .unwrap_or_default();
    let path = match requested {
        Some(p) if Path::new(&p).is_absolute() => PathBuf::from(p),
        Some(p) => base.join(p),
        None => {
            let stamp = state.clock.now().format("%Y%m%d_%H%M%S");
            base.join(format!("asistencia_{}_{}.csv", report, stamp))
        }
    };
    Ok(path)
}

fn reports_export(
    conn: &Connection,
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let report = get_required_str(params, "report")?;
    let (_, tables) = build_report(conn, state, &report, params)?;
    let path = export_path(conn, state, &report, get_optional_str(params, "path"))?;
    match tables.as_slice() {
        [single] => export::write_csv(single, &path)?,
        many => export::write_csv_sections(many, &path)?,
    }
    Ok(json!({
        "path": path.to_string_lossy(),
        "tables": tables.len(),
        "rows": tables.iter().map(|t| t.rows.len()).sum::<usize>()
    }))
}

fn reports_view(
    conn: &Connection,
    state: &AppState,
    report: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (mut value, tables) = build_report(conn, state, report, params)?;
    value["tables"] = json!(tables);
    Ok(value)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let report = match req.method.as_str() {
        "reports.byStudent" => "byStudent",
        "reports.byGradeSectionDate" => "byGradeSectionDate",
        "reports.today" => "today",
        "reports.monthlyMatrix" => "monthlyMatrix",
        "reports.export" => {
            return Some(with_conn(state, req, |conn, state| {
                reports_export(conn, state, p)
            }))
        }
        _ => return None,
    };
    Some(with_conn(state, req, |conn, state| {
        reports_view(conn, state, report, p)
    }))
}
