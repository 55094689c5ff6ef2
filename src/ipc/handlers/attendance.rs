use crate::attendance::{AttendanceService, Confirmation};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::model::Direction;
use crate::setup;
use rusqlite::Connection;
use serde_json::json;

fn confirmation_json(c: &Confirmation) -> serde_json::Value {
    json!({
        "message": c.message(),
        "confirmation": c
    })
}

fn mark(
    conn: &Connection,
    state: &AppState,
    params: &serde_json::Value,
    method: &str,
) -> Result<serde_json::Value, HandlerErr> {
    let code = get_required_str(params, "code")?;
    let service = AttendanceService::with_clock(conn, &*state.clock);
    let confirmation = match method {
        "attendance.markEntry" => service.mark_entry(&code)?,
        "attendance.markExit" => service.mark_exit(&code)?,
        "attendance.markSimple" => service.mark_simple(&code)?,
        _ => {
            let direction = match get_optional_str(params, "direction") {
                None => Direction::Entry,
                Some(raw) => Direction::parse(&raw).ok_or_else(|| {
                    HandlerErr::bad_params("direction must be one of: entry, exit")
                })?,
            };
            let mode = setup::attendance_mode(conn)?;
            service.scan(&code, mode, direction)?
        }
    };
    Ok(confirmation_json(&confirmation))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.markEntry"
        | "attendance.markExit"
        | "attendance.markSimple"
        | "attendance.scan" => Some(with_conn(state, req, |conn, state| {
            mark(conn, state, &req.params, &req.method)
        })),
        _ => None,
    }
}
