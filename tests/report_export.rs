use asistenciad::calendar;
use asistenciad::export;
use asistenciad::reports::{build_month, ReportTable};
use asistenciad::ErrorKind;
use std::collections::HashSet;
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

#[test]
fn csv_keeps_header_lines_and_rows() {
    let dir = temp_dir("asis-export-csv");
    let days = calendar::business_days(2025, 2);
    let roster = vec![(1, "Quispe Mamani, Ana".to_string())];
    let present: HashSet<_> = days.iter().take(18).map(|d| (1, d.date)).collect();
    let table = build_month(2025, 2, &days, &roster, &present).to_table();

    let path = dir.join("nested").join("febrero.csv");
    export::write_csv(&table, &path).expect("write csv");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .expect("open csv");
    let records: Vec<csv::StringRecord> = rdr
        .records()
        .collect::<Result<_, _>>()
        .expect("read csv");
    assert_eq!(records.len(), 3);
    assert_eq!(&records[0][2], "L");
    assert_eq!(&records[1][2], "3");
    assert_eq!(&records[2][1], "Quispe Mamani, Ana");
    assert_eq!(&records[2][23], "90.0");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn sections_file_has_one_block_per_table() {
    let dir = temp_dir("asis-export-sections");
    let tables: Vec<ReportTable> = (1..=3)
        .map(|m| {
            build_month(2025, m, &calendar::business_days(2025, m), &[], &HashSet::new())
                .to_table()
        })
        .collect();
    let path = dir.join("matriz.csv");
    export::write_csv_sections(&tables, &path).expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.contains("Enero 2025"));
    assert!(text.contains("Marzo 2025"));
    assert_eq!(text.matches("Apellidos y Nombres").count(), 3);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unwritable_target_is_a_persistence_failure() {
    let dir = temp_dir("asis-export-fail");
    // A directory where the file should go.
    let path = dir.join("ocupado.csv");
    std::fs::create_dir_all(&path).expect("block path");
    let table = ReportTable {
        title: "x".to_string(),
        headers: vec!["a".to_string()],
        sub_headers: Vec::new(),
        rows: Vec::new(),
    };
    let e = export::write_csv(&table, &path).expect_err("cannot write");
    assert_eq!(e.kind(), ErrorKind::PersistenceFailure);
    assert!(e.to_string().contains("close the file and retry"));
    let _ = std::fs::remove_dir_all(dir);
}
