use asistenciad::admin;
use asistenciad::model::StudentInput;
use asistenciad::{AttendanceError, AttendanceService, ErrorKind, FixedClock, Store};
use chrono::{NaiveDate, NaiveTime};
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

fn input(code: &str, gs: i64) -> StudentInput {
    StudentInput {
        code: code.to_string(),
        given_names: "Diego".to_string(),
        paternal_surname: "Huaman".to_string(),
        maternal_surname: String::new(),
        enrollment_date: "2025-03-03".to_string(),
        grade_section_id: gs,
    }
}

#[test]
fn hierarchy_rejects_duplicates_and_dangling_refs() {
    let workspace = temp_dir("asis-admin-hierarchy");
    let store = Store::open(&workspace).expect("open store");
    let conn = store.connect().expect("connect");

    let level = admin::create_level(&conn, "Secundaria").expect("level");
    let e = admin::create_level(&conn, "Secundaria").expect_err("dup level");
    assert_eq!(e.kind(), ErrorKind::Conflict);
    assert_eq!(e.code(), "duplicate");
    assert_eq!(
        admin::create_level(&conn, "  ").expect_err("blank").kind(),
        ErrorKind::InvalidInput
    );

    let e = admin::create_grade(&conn, 999, "1ro").expect_err("missing level");
    assert_eq!(e.kind(), ErrorKind::NotFound);
    let grade = admin::create_grade(&conn, level.id, "1ro").expect("grade");

    let gs = admin::create_section(&conn, grade.id, " b ").expect("section");
    assert_eq!(gs.section, "B");
    let e = admin::create_section(&conn, grade.id, "B").expect_err("dup section");
    assert!(matches!(e, AttendanceError::Duplicate(_)));
    admin::create_section(&conn, grade.id, "A").expect("section A");

    let sections: Vec<String> = admin::list_sections(&conn, grade.id)
        .expect("list")
        .into_iter()
        .map(|s| s.section)
        .collect();
    assert_eq!(sections, vec!["A", "B"]);
    assert_eq!(
        admin::find_grade_section(&conn, grade.id, "b").expect("find").id,
        gs.id
    );

    let grades = admin::list_grades(&conn, Some(level.id)).expect("grades");
    assert_eq!(grades.len(), 1);
    assert!(admin::list_grades(&conn, Some(level.id + 1))
        .expect("grades")
        .is_empty());
    assert_eq!(admin::list_levels(&conn).expect("levels").len(), 1);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn student_codes_are_unique_and_validated() {
    let workspace = temp_dir("asis-admin-students");
    let store = Store::open(&workspace).expect("open store");
    let conn = store.connect().expect("connect");
    let level = admin::create_level(&conn, "Primaria").expect("level");
    let grade = admin::create_grade(&conn, level.id, "3ro").expect("grade");
    let gs = admin::create_section(&conn, grade.id, "A").expect("section");

    let s = admin::create_student(&conn, &input(" C100 ", gs.id)).expect("student");
    assert_eq!(s.code, "C100");

    let e = admin::create_student(&conn, &input("C100", gs.id)).expect_err("dup code");
    assert_eq!(e.kind(), ErrorKind::Conflict);

    let e = admin::create_student(&conn, &input("", gs.id)).expect_err("blank code");
    assert!(matches!(e, AttendanceError::InvalidCode));

    let e = admin::create_student(&conn, &input("C101", 777)).expect_err("bad section");
    assert_eq!(e.kind(), ErrorKind::NotFound);

    let mut bad_date = input("C102", gs.id);
    bad_date.enrollment_date = "03/03/2025".to_string();
    assert_eq!(
        admin::create_student(&conn, &bad_date)
            .expect_err("bad date")
            .kind(),
        ErrorKind::InvalidInput
    );

    let mut renamed = input("C100", gs.id);
    renamed.given_names = "Diego Alonso".to_string();
    let updated = admin::update_student(&conn, s.id, &renamed).expect("update");
    assert_eq!(updated.given_names, "Diego Alonso");
    assert_eq!(
        admin::update_student(&conn, 4040, &renamed)
            .expect_err("missing")
            .kind(),
        ErrorKind::NotFound
    );

    let listed = admin::list_students(&conn, Some(gs.id)).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].full_name(), "Huaman, Diego Alonso");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_a_student_drops_their_attendance() {
    let workspace = temp_dir("asis-admin-delete");
    let store = Store::open(&workspace).expect("open store");
    let conn = store.connect().expect("connect");
    let level = admin::create_level(&conn, "Primaria").expect("level");
    let grade = admin::create_grade(&conn, level.id, "4to").expect("grade");
    let gs = admin::create_section(&conn, grade.id, "A").expect("section");
    let s = admin::create_student(&conn, &input("D1", gs.id)).expect("student");

    let clock = FixedClock::at(
        NaiveDate::from_ymd_opt(2025, 6, 2).expect("date"),
        NaiveTime::from_hms_opt(7, 0, 0).expect("time"),
    );
    let service = AttendanceService::with_clock(&conn, clock);
    service.mark_entry("D1").expect("entry");
    service.mark_simple("D1").expect("simple");

    admin::delete_student(&conn, s.id).expect("delete");
    let left: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM asistencias) + (SELECT COUNT(*) FROM marcaciones)",
            [],
            |r| r.get(0),
        )
        .expect("count");
    assert_eq!(left, 0);
    assert!(admin::student_by_code(&conn, "D1").expect("query").is_none());
    assert_eq!(
        admin::delete_student(&conn, s.id)
            .expect_err("second delete")
            .kind(),
        ErrorKind::NotFound
    );

    let _ = std::fs::remove_dir_all(workspace);
}
