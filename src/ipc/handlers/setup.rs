use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::setup::{self, SetupSection};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

fn setup_get(conn: &Connection) -> Result<Value, HandlerErr> {
    let mut out = Map::new();
    for section in SetupSection::ALL {
        out.insert(
            section.name().to_string(),
            setup::load_section(conn, section)?,
        );
    }
    Ok(Value::Object(out))
}

fn setup_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let section_raw = get_required_str(params, "section")?;
    let section = SetupSection::parse(&section_raw)
        .ok_or_else(|| HandlerErr::bad_params("unknown section"))?;
    let patch = params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("patch must be an object"))?;
    let current = setup::update_section(conn, section, patch)?;
    let mut out = json!({ "ok": true });
    out[section.name()] = current;
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(with_conn(state, req, |conn, _| setup_get(conn))),
        "setup.update" => Some(with_conn(state, req, |conn, _| {
            setup_update(conn, &req.params)
        })),
        _ => None,
    }
}
