use crate::error::Result;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "asistencias.sqlite3";
pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TIME_FMT: &str = "%H:%M:%S";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// File-backed attendance database. Holds no connection; every unit of work
/// acquires its own through [`Store::connect`] and releases it on drop.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Opens (creating if needed) the database inside a workspace directory
    /// and brings its schema up to date.
    pub fn open(workspace: &Path) -> anyhow::Result<Store> {
        std::fs::create_dir_all(workspace)?;
        Store::open_file(&workspace.join(DB_FILE_NAME))
    }

    pub fn open_file(path: &Path) -> anyhow::Result<Store> {
        let store = Store {
            path: path.to_path_buf(),
        };
        let conn = store.connect()?;
        migrate(&conn)?;
        log::debug!("attendance store ready at {}", path.to_string_lossy());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(conn)
    }

    /// Runs `f` on a fresh connection. The connection is closed on every
    /// exit path, including errors and panics unwinding through `f`.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connect()?;
        f(&conn)
    }
}

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS niveles(
            nivel_id INTEGER PRIMARY KEY AUTOINCREMENT,
            nivel TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grados(
            grado_id INTEGER PRIMARY KEY AUTOINCREMENT,
            grado TEXT NOT NULL,
            nivel_id INTEGER NOT NULL,
            FOREIGN KEY(nivel_id) REFERENCES niveles(nivel_id),
            UNIQUE(nivel_id, grado)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grados_nivel ON grados(nivel_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS detalle_grados(
            detalle_grado_id INTEGER PRIMARY KEY AUTOINCREMENT,
            grado_id INTEGER NOT NULL,
            seccion TEXT NOT NULL,
            FOREIGN KEY(grado_id) REFERENCES grados(grado_id),
            UNIQUE(grado_id, seccion)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS alumnos(
            alumno_id INTEGER PRIMARY KEY AUTOINCREMENT,
            codigo TEXT NOT NULL UNIQUE CHECK(length(trim(codigo)) > 0),
            nombres TEXT NOT NULL,
            apellido_paterno TEXT NOT NULL,
            apellido_materno TEXT NOT NULL DEFAULT '',
            fecha_ingreso TEXT NOT NULL,
            detalle_grado_id INTEGER NOT NULL,
            FOREIGN KEY(detalle_grado_id) REFERENCES detalle_grados(detalle_grado_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_alumnos_detalle_grado ON alumnos(detalle_grado_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS asistencias(
            asistencia_id INTEGER PRIMARY KEY AUTOINCREMENT,
            alumno_id INTEGER NOT NULL,
            fecha TEXT NOT NULL,
            hora_entrada TEXT,
            hora_salida TEXT,
            FOREIGN KEY(alumno_id) REFERENCES alumnos(alumno_id)
        )",
        [],
    )?;
    // Databases from the single-timestamp revision have no exit column.
    ensure_asistencias_hora_salida(conn)?;
    fold_duplicate_asistencias(conn)?;
    // One record per student and day; makes concurrent entry marks collide
    // in the store instead of both succeeding.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_asistencias_alumno_fecha
         ON asistencias(alumno_id, fecha)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_asistencias_fecha ON asistencias(fecha)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS marcaciones(
            marcacion_id INTEGER PRIMARY KEY AUTOINCREMENT,
            alumno_id INTEGER NOT NULL,
            fecha TEXT NOT NULL,
            hora TEXT NOT NULL,
            FOREIGN KEY(alumno_id) REFERENCES alumnos(alumno_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marcaciones_alumno_fecha ON marcaciones(alumno_id, fecha)",
        [],
    )?;

    // Reports read this view so both marking styles show up as one row per
    // student and day. Entry/exit rows win over single-timestamp marks.
    conn.execute(
        "CREATE VIEW IF NOT EXISTS v_asistencias AS
         SELECT alumno_id, fecha, hora_entrada, hora_salida
         FROM asistencias
         UNION ALL
         SELECT m.alumno_id, m.fecha, MIN(m.hora) AS hora_entrada, NULL AS hora_salida
         FROM marcaciones m
         WHERE NOT EXISTS (
           SELECT 1 FROM asistencias a
           WHERE a.alumno_id = m.alumno_id AND a.fecha = m.fecha
         )
         GROUP BY m.alumno_id, m.fecha",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn ensure_asistencias_hora_salida(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, "asistencias", "hora_salida")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE asistencias ADD COLUMN hora_salida TEXT", [])?;
    Ok(())
}

/// Collapses several rows for the same student and day (left behind by the
/// single-timestamp revision) into one: earliest entry, latest exit, kept on
/// the lowest id.
fn fold_duplicate_asistencias(conn: &Connection) -> rusqlite::Result<()> {
    let has_duplicates = conn
        .query_row(
            "SELECT 1 FROM asistencias
             GROUP BY alumno_id, fecha
             HAVING COUNT(*) > 1
             LIMIT 1",
            [],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !has_duplicates {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE asistencias SET
           hora_entrada = (
             SELECT MIN(b.hora_entrada) FROM asistencias b
             WHERE b.alumno_id = asistencias.alumno_id AND b.fecha = asistencias.fecha
           ),
           hora_salida = (
             SELECT MAX(b.hora_salida) FROM asistencias b
             WHERE b.alumno_id = asistencias.alumno_id AND b.fecha = asistencias.fecha
           )
         WHERE asistencia_id IN (
           SELECT MIN(asistencia_id) FROM asistencias
           GROUP BY alumno_id, fecha
           HAVING COUNT(*) > 1
         )",
        [],
    )?;
    let removed = tx.execute(
        "DELETE FROM asistencias
         WHERE asistencia_id NOT IN (
           SELECT MIN(asistencia_id) FROM asistencias GROUP BY alumno_id, fecha
         )",
        [],
    )?;
    tx.commit()?;
    log::warn!("folded {} duplicate attendance rows", removed);
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    // A malformed stored value reads as unset so defaults apply.
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

pub fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

pub fn fmt_time(t: NaiveTime) -> String {
    t.format(TIME_FMT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FMT).ok()
}
