//! Workspace settings, stored per section as JSON in the `settings` table.

use crate::db;
use crate::error::{AttendanceError, Result};
use crate::model::AttendanceMode;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupSection {
    Attendance,
    Reports,
}

impl SetupSection {
    pub const ALL: [SetupSection; 2] = [SetupSection::Attendance, SetupSection::Reports];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attendance" => Some(Self::Attendance),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Reports => "reports",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Attendance => "setup.attendance",
            Self::Reports => "setup.reports",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Attendance => json!({
            "mode": AttendanceMode::default().as_str(),
        }),
        SetupSection::Reports => json!({
            "exportDir": null,
        }),
    }
}

fn parse_string_max(v: &Value, key: &str, max: usize) -> std::result::Result<String, String> {
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be a string", key))?
        .trim()
        .to_string();
    if s.chars().count() > max {
        return Err(format!("{} must be at most {} characters", key, max));
    }
    Ok(s)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> std::result::Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Attendance => match k.as_str() {
                "mode" => {
                    let raw = parse_string_max(v, k, 20)?;
                    let mode = AttendanceMode::parse(&raw)
                        .ok_or_else(|| "mode must be one of: entryExit, simple".to_string())?;
                    obj.insert(k.clone(), Value::String(mode.as_str().to_string()));
                }
                _ => return Err(format!("unknown attendance field: {}", k)),
            },
            SetupSection::Reports => match k.as_str() {
                "exportDir" => {
                    if v.is_null() {
                        obj.insert(k.clone(), Value::Null);
                    } else {
                        let dir = parse_string_max(v, k, 1024)?;
                        obj.insert(
                            k.clone(),
                            if dir.is_empty() {
                                Value::Null
                            } else {
                                Value::String(dir)
                            },
                        );
                    }
                }
                _ => return Err(format!("unknown reports field: {}", k)),
            },
        }
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Stale or malformed fields fall back to defaults.
            if let Err(e) = merge_section_patch(section, &mut current, saved_obj) {
                log::warn!("ignoring saved {} settings: {}", section.name(), e);
                current = default_section(section);
            }
        }
    }
    Ok(current)
}

pub fn update_section(
    conn: &Connection,
    section: SetupSection,
    patch: &Map<String, Value>,
) -> Result<Value> {
    let mut current = load_section(conn, section)?;
    merge_section_patch(section, &mut current, patch).map_err(AttendanceError::InvalidInput)?;
    db::settings_set_json(conn, section.key(), &current)?;
    log::info!("{} settings updated", section.name());
    Ok(current)
}

pub fn attendance_mode(conn: &Connection) -> Result<AttendanceMode> {
    let v = load_section(conn, SetupSection::Attendance)?;
    Ok(v.get("mode")
        .and_then(|m| m.as_str())
        .and_then(AttendanceMode::parse)
        .unwrap_or_default())
}

pub fn export_dir(conn: &Connection) -> Result<Option<String>> {
    let v = load_section(conn, SetupSection::Reports)?;
    Ok(v.get("exportDir")
        .and_then(|d| d.as_str())
        .map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let c = Connection::open_in_memory().expect("memory db");
        db::migrate(&c).expect("migrate");
        c
    }

    #[test]
    fn defaults_to_entry_exit() {
        let c = conn();
        assert_eq!(attendance_mode(&c).expect("mode"), AttendanceMode::EntryExit);
        assert_eq!(export_dir(&c).expect("dir"), None);
    }

    #[test]
    fn update_switches_mode_and_rejects_unknown_fields() {
        let c = conn();
        let patch = json!({ "mode": "simple" });
        update_section(&c, SetupSection::Attendance, patch.as_object().expect("obj"))
            .expect("update");
        assert_eq!(attendance_mode(&c).expect("mode"), AttendanceMode::Simple);

        let bad = json!({ "mode": "hourly" });
        let err = update_section(&c, SetupSection::Attendance, bad.as_object().expect("obj"))
            .expect_err("bad mode");
        assert_eq!(err.code(), "bad_params");

        let unknown = json!({ "colour": "red" });
        assert!(
            update_section(&c, SetupSection::Attendance, unknown.as_object().expect("obj"))
                .is_err()
        );
        // Failed updates leave the saved value alone.
        assert_eq!(attendance_mode(&c).expect("mode"), AttendanceMode::Simple);
    }

    #[test]
    fn blank_export_dir_clears_it() {
        let c = conn();
        let set = json!({ "exportDir": "/tmp/reportes" });
        update_section(&c, SetupSection::Reports, set.as_object().expect("obj")).expect("set");
        assert_eq!(export_dir(&c).expect("dir").as_deref(), Some("/tmp/reportes"));
        let clear = json!({ "exportDir": "  " });
        update_section(&c, SetupSection::Reports, clear.as_object().expect("obj")).expect("clear");
        assert_eq!(export_dir(&c).expect("dir"), None);
    }
}
