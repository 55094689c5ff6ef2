use crate::admin;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_i64, get_required_i64, get_required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn levels_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let levels = admin::list_levels(conn)?;
    Ok(json!({ "levels": levels }))
}

fn levels_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let level = admin::create_level(conn, &name)?;
    Ok(json!({ "level": level }))
}

fn grades_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let level_id = get_optional_i64(params, "levelId")?;
    let grades = admin::list_grades(conn, level_id)?;

    // Include sections so the report pickers need a single round trip.
    let mut out = Vec::with_capacity(grades.len());
    for g in grades {
        let sections: Vec<String> = admin::list_sections(conn, g.id)?
            .into_iter()
            .map(|s| s.section)
            .collect();
        out.push(json!({
            "id": g.id,
            "name": g.name,
            "levelId": g.level_id,
            "sections": sections
        }));
    }
    Ok(json!({ "grades": out }))
}

fn grades_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let level_id = get_required_i64(params, "levelId")?;
    let name = get_required_str(params, "name")?;
    let grade = admin::create_grade(conn, level_id, &name)?;
    Ok(json!({ "grade": grade }))
}

fn sections_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_i64(params, "gradeId")?;
    let sections = admin::list_sections(conn, grade_id)?;
    Ok(json!({ "sections": sections }))
}

fn sections_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_i64(params, "gradeId")?;
    let section = get_required_str(params, "section")?;
    let gs = admin::create_section(conn, grade_id, &section)?;
    Ok(json!({ "gradeSection": gs }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    match req.method.as_str() {
        "levels.list" => Some(with_conn(state, req, |conn, _| levels_list(conn))),
        "levels.create" => Some(with_conn(state, req, |conn, _| levels_create(conn, p))),
        "grades.list" => Some(with_conn(state, req, |conn, _| grades_list(conn, p))),
        "grades.create" => Some(with_conn(state, req, |conn, _| grades_create(conn, p))),
        "sections.list" => Some(with_conn(state, req, |conn, _| sections_list(conn, p))),
        "sections.create" => Some(with_conn(state, req, |conn, _| sections_create(conn, p))),
        _ => None,
    }
}
