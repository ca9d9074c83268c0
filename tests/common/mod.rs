//! Shared test infrastructure for integration tests.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory holding one dataset file.
pub struct DatasetFixture {
    dir: TempDir,
    pub dataset: PathBuf,
}

impl DatasetFixture {
    pub fn new(records: Value) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let dataset = dir.path().join("cars.json");
        let text = serde_json::to_string_pretty(&records).expect("serialize dataset");
        std::fs::write(&dataset, text).expect("write dataset");
        Self { dir, dataset }
    }

    pub fn with_raw(contents: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let dataset = dir.path().join("cars.json");
        std::fs::write(&dataset, contents).expect("write dataset");
        Self { dir, dataset }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn contents(&self) -> Vec<u8> {
        std::fs::read(&self.dataset).expect("read dataset")
    }

    /// Run the binary with `args`, appending `--dataset <file>`.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_car-enrich"))
            .args(args)
            .arg("--dataset")
            .arg(&self.dataset)
            .env("RUST_LOG", "warn")
            .output()
            .expect("spawn car-enrich")
    }
}

pub fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
