#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::{NamedTempFile, tempdir};

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.env_remove("TIMETABLE_TOOL_CATALOG")
        .write_stdin(script.to_string())
        .assert()
}

#[test]
fn cli_rejects_second_lesson_in_class_slot() {
    run_cli("assign 10-A mon 1 MATH T1\nassign 10-A mon 1 PHYS T2\nquit\n")
        .success()
        .stdout(str_contains("Assigned entry-1 (MATH T1 national) for class 10-A on Mon period 1."))
        .stdout(str_contains("already has a lesson on Mon period 1"));
}

#[test]
fn cli_warns_about_double_booked_teacher() {
    run_cli("assign 10-A mon 1 MATH T1\nassign 10-B mon 1 MATH T1\nconflicts entry-1\nquit\n")
        .success()
        .stdout(str_contains("Warning: teacher T1 is already teaching 10-A on Mon period 1"))
        .stdout(str_contains("Teacher also teaches 10-B in that slot."));
}

#[test]
fn cli_delete_command_removes_lesson() {
    run_cli("assign 10-A tue 2 MATH T1\ndelete entry-1\ndelete entry-1\nquit\n")
        .success()
        .stdout(str_contains("Deleted entry-1."))
        .stdout(str_contains("entry 'entry-1' not found"));
}

#[test]
fn cli_copy_asks_before_overwriting() {
    run_cli(
        "assign 10-A mon 1 MATH T1\nassign 10-B fri 3 ART T3\ncopy 10-A 10-B\ncopy 10-A 10-B --force\nquit\n",
    )
    .success()
    .stdout(str_contains("Class 10-B will receive 1 lesson(s) and lose 1."))
    .stdout(str_contains("Re-run with --force to overwrite class 10-B."))
    .stdout(str_contains("Copied 1 lesson(s) from 10-A to 10-B (1 discarded)."));
}

#[test]
fn cli_saves_empty_template() {
    run_cli("template save 11-C\ntemplate list\nquit\n")
        .success()
        .stdout(str_contains("Saved template '11-C weekly template' with 0 lesson(s)."));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("store").to_string_lossy().to_string();
    let script = format!(
        "assign 10-A mon 1 KEEPME T1\nsave json {path}\nassign 10-A mon 2 TEMPORARY T2\nload json {path}\nassign 10-A wed 1 NEXT T1\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Timetable loaded from"));
    let after_reload = output
        .split("Timetable loaded from")
        .last()
        .unwrap_or_default();
    assert!(after_reload.contains("KEEPME"));
    assert!(
        !after_reload.contains("TEMPORARY"),
        "temporary lesson should not appear after reload:\n{}",
        after_reload
    );
    assert!(after_reload.contains("Assigned entry-2 (NEXT"));
}

#[test]
fn cli_csv_export_then_import() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().to_string();
    let script = format!(
        "assign 10-A thu 5 CHEM T4\nsave csv {path}\ndelete entry-1\nload csv {path}\nshow 10-A\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Timetable loaded from"))
        .stdout(str_contains("CHEM/T4"));
}

#[test]
fn cli_load_json_leaves_saved_copy_untouched() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("store").to_string_lossy().to_string();
    let script = format!(
        "assign 10-A mon 1 KEEPME T1\nsave json {path}\nload json {path}\nassign 10-A mon 2 SCRATCH T2\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Assigned entry-2 (SCRATCH"));

    let saved = std::fs::read_to_string(dir.path().join("store").join("timetable.entries.json"))
        .expect("read saved entries");
    assert!(saved.contains("KEEPME"));
    assert!(!saved.contains("SCRATCH"), "load must not turn the directory into a save target:\n{saved}");
}
