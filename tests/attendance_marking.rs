use asistenciad::admin;
use asistenciad::model::{AttendanceMode, Direction, StudentInput};
use asistenciad::{AttendanceError, AttendanceService, ErrorKind, FixedClock, MarkKind, Store};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> FixedClock {
    FixedClock::at(
        NaiveDate::from_ymd_opt(y, m, d).expect("date"),
        NaiveTime::from_hms_opt(h, min, 0).expect("time"),
    )
}

/// One level, grade "5to" section "A", and student A001.
fn seeded_store(prefix: &str) -> (PathBuf, Store, i64) {
    let workspace = temp_dir(prefix);
    let store = Store::open(&workspace).expect("open store");
    let conn = store.connect().expect("connect");
    let level = admin::create_level(&conn, "Primaria").expect("level");
    let grade = admin::create_grade(&conn, level.id, "5to").expect("grade");
    let gs = admin::create_section(&conn, grade.id, "A").expect("section");
    let student = admin::create_student(
        &conn,
        &StudentInput {
            code: "A001".to_string(),
            given_names: "Ana Lucia".to_string(),
            paternal_surname: "Quispe".to_string(),
            maternal_surname: "Mamani".to_string(),
            enrollment_date: "2024-03-01".to_string(),
            grade_section_id: gs.id,
        },
    )
    .expect("student");
    (workspace, store, student.id)
}

fn attendance_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM asistencias", [], |r| r.get(0))
        .expect("count")
}

#[test]
fn entry_succeeds_once_per_day() {
    let (workspace, store, _) = seeded_store("asis-entry-once");
    let conn = store.connect().expect("connect");
    let service = AttendanceService::with_clock(&conn, at(2025, 4, 7, 7, 45));

    let first = service.mark_entry("A001").expect("first entry");
    assert_eq!(first.kind, MarkKind::Entry);
    assert_eq!(first.display_name, "Ana Lucia Quispe");
    assert_eq!(first.date, "2025-04-07");
    assert_eq!(first.time, "07:45:00");
    assert!(first.message().contains("Ana Lucia Quispe"));

    let second = service.mark_entry("A001").expect_err("second entry");
    assert!(matches!(second, AttendanceError::AlreadyMarked { .. }));
    assert_eq!(second.kind(), ErrorKind::Conflict);
    assert_eq!(attendance_rows(&conn), 1);

    // A new day starts clean.
    let next_day = AttendanceService::with_clock(&conn, at(2025, 4, 8, 7, 50));
    next_day.mark_entry("A001").expect("entry next day");
    assert_eq!(attendance_rows(&conn), 2);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_and_blank_codes_are_rejected() {
    let (workspace, store, _) = seeded_store("asis-unknown");
    let conn = store.connect().expect("connect");
    let service = AttendanceService::with_clock(&conn, at(2025, 4, 7, 8, 0));

    let e = service.mark_entry("ZZZ").expect_err("unknown code");
    assert!(matches!(e, AttendanceError::StudentNotFound { ref code } if code == "ZZZ"));
    assert_eq!(e.kind(), ErrorKind::NotFound);

    let e = service.mark_entry("   ").expect_err("blank code");
    assert!(matches!(e, AttendanceError::InvalidCode));
    assert_eq!(e.kind(), ErrorKind::InvalidInput);

    assert!(matches!(
        service.mark_exit("ZZZ"),
        Err(AttendanceError::StudentNotFound { .. })
    ));
    assert!(matches!(
        service.mark_simple(""),
        Err(AttendanceError::InvalidCode)
    ));
    assert_eq!(attendance_rows(&conn), 0);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn scanned_code_is_trimmed() {
    let (workspace, store, _) = seeded_store("asis-trim");
    let conn = store.connect().expect("connect");
    let service = AttendanceService::with_clock(&conn, at(2025, 4, 7, 8, 0));
    service.mark_entry("  A001\n").expect("entry with whitespace");
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exit_requires_entry_and_happens_once() {
    let (workspace, store, student_id) = seeded_store("asis-exit");
    let conn = store.connect().expect("connect");

    let morning = AttendanceService::with_clock(&conn, at(2025, 4, 7, 7, 30));
    let e = morning.mark_exit("A001").expect_err("exit before entry");
    assert!(matches!(e, AttendanceError::NoEntryRecorded { .. }));
    assert_eq!(attendance_rows(&conn), 0);

    morning.mark_entry("A001").expect("entry");

    let afternoon = AttendanceService::with_clock(&conn, at(2025, 4, 7, 13, 15));
    let exit = afternoon.mark_exit("A001").expect("exit");
    assert_eq!(exit.kind, MarkKind::Exit);
    assert_eq!(exit.time, "13:15:00");

    let e = afternoon.mark_exit("A001").expect_err("second exit");
    assert!(matches!(e, AttendanceError::AlreadyMarkedExit { .. }));

    let record = afternoon
        .record_for(student_id, "2025-04-07")
        .expect("query")
        .expect("record");
    assert_eq!(record.entry_time.as_deref(), Some("07:30:00"));
    assert_eq!(record.exit_time.as_deref(), Some("13:15:00"));

    // Entry stays frozen after exit.
    assert!(matches!(
        afternoon.mark_entry("A001"),
        Err(AttendanceError::AlreadyMarked { .. })
    ));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn store_rejects_second_record_for_same_day() {
    let (workspace, store, student_id) = seeded_store("asis-unique");
    let conn = store.connect().expect("connect");
    conn.execute(
        "INSERT INTO asistencias(alumno_id, fecha, hora_entrada) VALUES(?, '2025-04-07', '07:00:00')",
        [student_id],
    )
    .expect("first row");
    let dup = conn.execute(
        "INSERT INTO asistencias(alumno_id, fecha, hora_entrada) VALUES(?, '2025-04-07', '07:01:00')",
        [student_id],
    );
    assert!(dup.is_err(), "unique (alumno_id, fecha) must hold");
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn second_connection_sees_first_entry() {
    let (workspace, store, _) = seeded_store("asis-two-conns");
    let a = store.connect().expect("connect a");
    let b = store.connect().expect("connect b");
    let clock = at(2025, 4, 7, 7, 45);

    AttendanceService::with_clock(&a, clock)
        .mark_entry("A001")
        .expect("first writer");
    let e = AttendanceService::with_clock(&b, clock)
        .mark_entry("A001")
        .expect_err("second writer");
    assert!(matches!(e, AttendanceError::AlreadyMarked { .. }));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn simple_marks_never_conflict() {
    let (workspace, store, _) = seeded_store("asis-simple");
    let conn = store.connect().expect("connect");
    let service = AttendanceService::with_clock(&conn, at(2025, 4, 7, 8, 0));

    for _ in 0..3 {
        let c = service.mark_simple("A001").expect("simple mark");
        assert_eq!(c.kind, MarkKind::Simple);
    }
    let marks: i64 = conn
        .query_row("SELECT COUNT(*) FROM marcaciones", [], |r| r.get(0))
        .expect("count");
    assert_eq!(marks, 3);
    assert_eq!(attendance_rows(&conn), 0);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn scan_follows_configured_mode() {
    let (workspace, store, _) = seeded_store("asis-scan");
    let conn = store.connect().expect("connect");
    let service = AttendanceService::with_clock(&conn, at(2025, 4, 7, 8, 0));

    let c = service
        .scan("A001", AttendanceMode::EntryExit, Direction::Entry)
        .expect("entry scan");
    assert_eq!(c.kind, MarkKind::Entry);
    let c = service
        .scan("A001", AttendanceMode::EntryExit, Direction::Exit)
        .expect("exit scan");
    assert_eq!(c.kind, MarkKind::Exit);
    let c = service
        .scan("A001", AttendanceMode::Simple, Direction::Exit)
        .expect("simple scan");
    assert_eq!(c.kind, MarkKind::Simple);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn admin_lookup_matches_attendance_lookup() {
    let (workspace, store, student_id) = seeded_store("asis-lookup");
    let conn = store.connect().expect("connect");
    let s = admin::student_by_code(&conn, "A001")
        .expect("query")
        .expect("student");
    assert_eq!(s.id, student_id);
    assert_eq!(s.full_name(), "Quispe Mamani, Ana Lucia");
    let _ = std::fs::remove_dir_all(workspace);
}
