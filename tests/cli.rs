//! Drives the compiled `car-enrich` binary against scratch datasets.
//!
//! Every scenario here finishes before the first network request: either the
//! run is rejected up front or every record in range is already enriched.

mod common;

use common::{stderr_text, stdout_json, DatasetFixture};
use serde_json::json;

fn enriched_dataset() -> DatasetFixture {
    DatasetFixture::new(json!([
        {
            "make": "Peugeot",
            "model": "205",
            "year": 1987,
            "image_url": "https://img.example.com/205.jpg",
            "image_size": "1920x1080",
            "car_color": "firebrick"
        },
        {
            "make": "Renault",
            "model": "Clio",
            "year": 2012,
            "image_url": "https://img.example.com/clio.jpg",
            "image_size": "1280x720",
            "car_color": "",
            "trim": "RS"
        },
        {
            "make": "Renault",
            "model": "Twingo",
            "year": 2020,
            "image_url": null
        }
    ]))
}

#[test]
fn status_json_reports_progress() {
    let fixture = enriched_dataset();

    let output = fixture.run(&["status", "--json"]);

    assert!(output.status.success(), "{}", stderr_text(&output));
    let status = stdout_json(&output);
    assert_eq!(status["total"], 3);
    assert_eq!(status["enriched"], 2);
    assert_eq!(status["missing_color"], 1);
    assert_eq!(status["last_enriched_index"], 2);
    assert_eq!(status["next_start"], 3);
    assert_eq!(status["locked_by_pid"], serde_json::Value::Null);
}

#[test]
fn status_text_suggests_next_start() {
    let fixture = enriched_dataset();

    let output = fixture.run(&["status"]);

    assert!(output.status.success(), "{}", stderr_text(&output));
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("records: 3"), "{text}");
    assert!(text.contains("next: car-enrich run --start 3"), "{text}");
}

#[test]
fn invalid_ranges_exit_non_zero_and_leave_dataset_untouched() {
    let fixture = enriched_dataset();
    let before = fixture.contents();

    for range in [
        ["--start", "0", "--end", "2"],
        ["--start", "3", "--end", "2"],
        ["--start", "1", "--end", "4"],
    ] {
        let mut args = vec!["run"];
        args.extend(range);
        let output = fixture.run(&args);
        assert!(!output.status.success(), "{range:?} should fail");
        assert!(
            stderr_text(&output).contains("invalid range"),
            "{}",
            stderr_text(&output)
        );
    }

    assert_eq!(fixture.contents(), before);
    assert!(!fixture.dir().join("cars.json.lock").exists());
}

#[test]
fn enriched_range_runs_without_rewriting() {
    let fixture = enriched_dataset();
    let before = fixture.contents();
    let history = fixture.dir().join("history.jsonl");
    let report = fixture.dir().join("report.json");

    let output = fixture.run(&[
        "run",
        "--end",
        "2",
        "--json",
        "--history",
        history.to_str().expect("utf-8 path"),
        "--report",
        report.to_str().expect("utf-8 path"),
    ]);

    assert!(output.status.success(), "{}", stderr_text(&output));
    let summary = stdout_json(&output);
    assert_eq!(summary["status"], "done");
    assert_eq!(summary["found"], 2);
    assert_eq!(summary["skipped"], 2);
    assert_eq!(summary["writes"], 0);
    assert_eq!(fixture.contents(), before);

    let history_text = std::fs::read_to_string(&history).expect("read history");
    assert_eq!(history_text.lines().count(), 1);
    let entry: serde_json::Value =
        serde_json::from_str(history_text.trim()).expect("parse history entry");
    assert_eq!(entry["success"], true);
    assert_eq!(entry["status"], "done");

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report).expect("read report"))
            .expect("parse report");
    assert_eq!(report["providers"], json!(["duckduckgo"]));
    assert_eq!(report["summary"]["found"], 2);
}

#[test]
fn malformed_dataset_is_rejected() {
    let fixture = DatasetFixture::with_raw(r#"[{"make": "Renault", "model": "Clio"}]"#);

    let output = fixture.run(&["run"]);

    assert!(!output.status.success());
    assert!(
        stderr_text(&output).contains("not a valid record array"),
        "{}",
        stderr_text(&output)
    );
    assert_eq!(
        fixture.contents(),
        br#"[{"make": "Renault", "model": "Clio"}]"#.to_vec()
    );
}

#[test]
fn held_lock_blocks_a_second_run_until_forced() {
    let fixture = enriched_dataset();
    let lock = fixture.dir().join("cars.json.lock");
    std::fs::write(&lock, br#"{"pid":1,"started_at_epoch_ms":0}"#).expect("write lock");

    let blocked = fixture.run(&["run", "--end", "2"]);
    assert!(!blocked.status.success());
    assert!(
        stderr_text(&blocked).contains("locked"),
        "{}",
        stderr_text(&blocked)
    );

    let status = fixture.run(&["status", "--json"]);
    assert_eq!(stdout_json(&status)["locked_by_pid"], 1);

    let forced = fixture.run(&["run", "--end", "2", "--force-unlock"]);
    assert!(forced.status.success(), "{}", stderr_text(&forced));
    assert!(!lock.exists());
}

#[test]
fn invalid_config_is_rejected_before_touching_the_dataset() {
    let fixture = enriched_dataset();
    let config = fixture.dir().join("config.json");
    std::fs::write(&config, br#"{"schema_version": 1, "max_candidates": 0}"#)
        .expect("write config");
    let history = fixture.dir().join("history.jsonl");

    let output = fixture.run(&[
        "run",
        "--config",
        config.to_str().expect("utf-8 path"),
        "--history",
        history.to_str().expect("utf-8 path"),
    ]);

    assert!(!output.status.success());
    assert!(
        stderr_text(&output).contains("max_candidates"),
        "{}",
        stderr_text(&output)
    );
    let entry: serde_json::Value = serde_json::from_str(
        std::fs::read_to_string(&history)
            .expect("read history")
            .trim(),
    )
    .expect("parse history entry");
    assert_eq!(entry["success"], false);
}

#[test]
fn range_is_checked_before_taking_the_lock() {
    let fixture = enriched_dataset();
    let lock = fixture.dir().join("cars.json.lock");
    let held = br#"{"pid":1,"started_at_epoch_ms":0}"#;
    std::fs::write(&lock, held).expect("write lock");

    let output = fixture.run(&["run", "--start", "2", "--end", "1"]);

    assert!(!output.status.success());
    let stderr = stderr_text(&output);
    assert!(stderr.contains("invalid range"), "{stderr}");
    assert!(!stderr.contains("locked"), "{stderr}");
    assert_eq!(std::fs::read(&lock).expect("read lock"), held.to_vec());
}

#[test]
fn unwritable_history_keeps_the_run_outcome() {
    let fixture = enriched_dataset();
    let history = fixture.dir().to_str().expect("utf-8 path").to_string();

    let done = fixture.run(&["run", "--end", "2", "--json", "--history", &history]);
    assert!(done.status.success(), "{}", stderr_text(&done));
    assert_eq!(stdout_json(&done)["status"], "done");
    assert!(stderr_text(&done).contains("run history not recorded"));

    let failed = fixture.run(&["run", "--start", "9", "--history", &history]);
    assert!(!failed.status.success());
    assert!(
        stderr_text(&failed).contains("invalid range"),
        "{}",
        stderr_text(&failed)
    );
}
