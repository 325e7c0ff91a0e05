// KioskLog - tests/e2e_dump.rs
//
// End-to-end test for the archive dump: a real zip in a temp directory,
// parsed by kind and written out as CSV tables.

use kiosklog::app::dump::{dump_archive, write_tables};
use kiosklog::core::dump::LogKind;
use std::fs::{self, File};
use std::io::Write;
use zip::write::SimpleFileOptions;

#[test]
fn e2e_dump_writes_one_table_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("POR-01C-PDC7.zip");
    let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
    for (name, content) in [
        ("Log/2025-02-10.log", "10:20:28.389 [Info]启动MQTT重连定时器\n"),
        ("Log/2025-02-10_local.log", "09:24:12 645 [Svc]服务器状态：False\n"),
        (
            "Log/2025-02-10_command.log",
            "09:23:12.395  HttpHelper Send   https://example.invalid/x\n",
        ),
    ] {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();

    let report = dump_archive(&archive, "Log").unwrap();
    let out = dir.path().join("dump");
    let written = write_tables(&report.tables, &out).unwrap();

    let kinds: Vec<_> = written.iter().map(|(k, _, n)| (*k, *n)).collect();
    assert_eq!(
        kinds,
        vec![(LogKind::Main, 1), (LogKind::Local, 1), (LogKind::Command, 1)]
    );

    let main = fs::read_to_string(out.join("Main_Logs.csv")).unwrap();
    assert_eq!(
        main,
        "Date,Timestamp,LogLevel,Message\n2025-02-10,10:20:28.389,Info,启动MQTT重连定时器\n"
    );
    let command = fs::read_to_string(out.join("Command_Logs.csv")).unwrap();
    assert!(command.starts_with("Date,Timestamp,Component,Action,Details\n"));
    assert!(command.contains("HttpHelper,Send,https://example.invalid/x"));
}
