//! CLI regression tests.
//!
//! Runs the built `sensord` binary against temporary config files and checks
//! the documents and diagnostics it prints.

use std::path::Path;
use std::process::{Command, Output};

fn sensord(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sensord"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("sensord.toml");
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

#[test]
fn collect_prints_static_gauge_document() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[logging]
filter = "warn"

[[producers]]
kind = "static"
metric = "sensor_temp"
value = 21.5
tags = { host = "h1" }
"#,
    );

    let out = sensord(&["collect", "--config", &config]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("# TYPE sensor_temp gauge"));
    let sample = lines.next().unwrap();
    assert!(sample.starts_with("sensor_temp{host=\"h1\"} 21.5 "), "{sample}");
    let timestamp: i64 = sample.rsplit(' ').next().unwrap().parse().unwrap();
    assert!(timestamp > 1_700_000_000_000);
    assert_eq!(lines.next(), Some("# EOF"));
    assert_eq!(lines.next(), None);
}

#[test]
fn check_config_rejects_unknown_producer() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[[producers]]\nkind = \"wmi\"\n");

    let out = sensord(&["check-config", "--config", &config]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown producer kind \"wmi\""));
}

#[test]
fn check_config_accepts_scaffold() {
    let init = sensord(&["init", "--site", "lab"]);
    assert!(init.status.success());

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &String::from_utf8(init.stdout).unwrap());

    let out = sensord(&["check-config", "--config", &config]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("ok (3 producers, 4 metrics"));
}

#[test]
fn producers_lists_builtins() {
    let out = sensord(&["producers"]);
    let stdout = String::from_utf8(out.stdout).unwrap();
    for kind in ["static", "process", "loadavg"] {
        assert!(stdout.lines().any(|l| l.starts_with(kind)), "missing {kind}");
    }
}
