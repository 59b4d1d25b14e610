use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tickstack(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("tickstack").unwrap();
    cmd.current_dir(dir).env_remove("TICKSTACK_CONFIG");
    cmd
}

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("custom.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn reclaim_orders_by_score() {
    let dir = TempDir::new().unwrap();
    let cfg = write_config(
        dir.path(),
        "capacity = 3\n[pressure_model]\nkind = \"fixed\"\nvalue = 0.5\n",
    );
    tickstack(dir.path())
        .arg("--config")
        .arg(&cfg)
        .args(["reclaim", "10:1", "2000:2", "5:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending (head first):\n  item2 #2 score=0.4000"))
        .stdout(predicate::str::contains("drained: released=3, double_release=0"))
        .stdout(predicate::str::contains("capacity:       3"));
}

#[test]
fn reclaim_rejects_past_capacity() {
    let dir = TempDir::new().unwrap();
    let cfg = write_config(
        dir.path(),
        "capacity = 2\n[pressure_model]\nkind = \"fixed\"\nvalue = 0.5\n",
    );
    tickstack(dir.path())
        .arg("--config")
        .arg(&cfg)
        .args(["reclaim", "1:1", "2:1", "3:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected item3"))
        .stdout(predicate::str::contains("drained: released=2"));
}

#[test]
fn reclaim_cascades_on_pressure_breach() {
    let dir = TempDir::new().unwrap();
    // Stepped pressure: the fourth admission makes count > 4 * 0.9.
    tickstack(dir.path())
        .args(["reclaim", "--capacity", "4", "1:1", "2:1", "3:1", "4:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cascade: 4 drained"))
        .stdout(predicate::str::contains("pending: (none)"))
        .stdout(predicate::str::contains("cascades:       1"));
}

#[test]
fn reclaim_json_output() {
    let dir = TempDir::new().unwrap();
    let output = tickstack(dir.path())
        .args(["--json", "reclaim", "100:1", "900:2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["pending"].as_array().unwrap().len(), 2);
    assert_eq!(value["drained"][0]["outcome"], "released");
    assert_eq!(value["status"]["released_total"], 2);
}

#[test]
fn reclaim_rejects_malformed_item() {
    let dir = TempDir::new().unwrap();
    tickstack(dir.path())
        .args(["reclaim", "heavy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected WEIGHT:REFS"));
}

#[test]
fn reclaim_rejects_zero_capacity() {
    let dir = TempDir::new().unwrap();
    tickstack(dir.path())
        .args(["reclaim", "--capacity", "0", "1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid reclaimer configuration"));
}

#[test]
fn demo_reports_double_release_attempts() {
    let dir = TempDir::new().unwrap();
    tickstack(dir.path())
        .args(["demo", "--count", "50", "--retire-every", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allocated:      50 buffers"))
        .stdout(predicate::str::contains("released:       45"))
        .stdout(predicate::str::contains("double release: 5"))
        .stdout(predicate::str::contains("magnitude:"));
}

#[test]
fn demo_is_deterministic_per_seed() {
    let dir = TempDir::new().unwrap();
    let run = || {
        tickstack(dir.path())
            .args(["--json", "demo", "--count", "30", "--seed", "9"])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn topology_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.json");
    let first = vec![0.0; 11];
    let second: Vec<f64> = (1..=11).map(f64::from).collect();
    std::fs::write(&path, serde_json::to_string(&vec![first, second]).unwrap()).unwrap();

    tickstack(dir.path())
        .arg("topology")
        .arg(&path)
        .args(["--project", "subtract"])
        .assert()
        .success()
        .stdout(predicate::str::contains("samples:    2"))
        .stdout(predicate::str::contains("magnitude:  22.494444"))
        .stdout(predicate::str::contains("projection: [1.0000, 2.0000"));
}

#[test]
fn topology_skips_single_sample() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.json");
    std::fs::write(&path, serde_json::to_string(&vec![vec![1.0; 11]]).unwrap()).unwrap();

    tickstack(dir.path())
        .arg("topology")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("topology: skipped"));
}

#[test]
fn topology_rejects_wrong_dimension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.json");
    std::fs::write(&path, "[[1.0, 2.0]]").unwrap();

    tickstack(dir.path())
        .arg("topology")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 11"));
}

#[test]
fn config_defaults_and_working_dir_file() {
    let dir = TempDir::new().unwrap();
    tickstack(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("# source: built-in defaults"))
        .stdout(predicate::str::contains("capacity = 1024"));

    std::fs::write(dir.path().join("tickstack.toml"), "capacity = 77\n").unwrap();
    tickstack(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity = 77"))
        .stdout(predicate::str::contains("tickstack.toml"));
}

#[test]
fn config_env_var_is_honoured() {
    let dir = TempDir::new().unwrap();
    let cfg = write_config(dir.path(), "capacity = 9\n");
    tickstack(dir.path())
        .env("TICKSTACK_CONFIG", &cfg)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity = 9"))
        .stdout(predicate::str::contains("(TICKSTACK_CONFIG)"));
}

#[test]
fn config_invalid_file_fails() {
    let dir = TempDir::new().unwrap();
    let cfg = write_config(dir.path(), "high_pressure_threshold = 2.0\n");
    tickstack(dir.path())
        .arg("--config")
        .arg(&cfg)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}
