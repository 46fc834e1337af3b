use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_warroom")
}

fn data_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn unique_temp_path(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("warroom-{name}-{stamp}.yaml"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env_remove("WARROOM_CONFIG")
        .output()
        .expect("warroom should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("command should emit json")
}

#[test]
fn simulate_command_dispatches_and_emits_json() {
    let scenario = data_file("scenario.yaml");
    let output = run(&["simulate", scenario.as_str(), "500", "42"]);

    assert_eq!(output.status.code(), Some(0));
    let payload = stdout_json(&output);
    assert_eq!(payload["seed"], 42);
    assert_eq!(payload["summary"]["iterations"], 500);
    assert_eq!(payload["attacker_march_speed"], 7.0);
    assert_eq!(payload["defender_march_speed"], 5.0);
    let rates = ["attacker_win_rate", "defender_win_rate", "draw_rate"]
        .iter()
        .map(|key| payload["summary"][key].as_f64().expect("rate"))
        .sum::<f64>();
    assert!((rates - 1.0).abs() < 1e-9);
}

#[test]
fn seeded_simulate_is_reproducible() {
    let scenario = data_file("scenario.yaml");
    let first = run(&["simulate", scenario.as_str(), "800", "9"]);
    let second = run(&["simulate", scenario.as_str(), "800", "9"]);
    assert_eq!(first.status.code(), Some(0));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn simulate_table_prints_tab_separated_rows() {
    let scenario = data_file("scenario.yaml");
    let output = run(&["simulate", scenario.as_str(), "200", "3", "--table"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert!(lines
        .next()
        .expect("header")
        .starts_with("iterations\tseed\tattacker_win_rate"));
    assert!(lines.next().expect("row").starts_with("200\t3\t"));
}

#[test]
fn optimize_command_dispatches_and_emits_json() {
    let scenario = data_file("scenario.yaml");
    let output = run(&["optimize", scenario.as_str(), "30", "10", "5"]);

    assert_eq!(output.status.code(), Some(0));
    let payload = stdout_json(&output);
    assert_eq!(payload["side"], "attacker");
    let spent: u64 = payload["best_composition"]
        .as_array()
        .expect("composition entries")
        .iter()
        .map(|entry| entry["count"].as_u64().expect("count"))
        .sum();
    assert_eq!(spent, 30);
    assert!(payload["ranking"].as_array().is_some_and(|rows| !rows.is_empty()));
}

#[test]
fn optimize_csv_and_defend_flags_are_honored() {
    let scenario = data_file("scenario.yaml");
    let output = run(&["optimize", scenario.as_str(), "20", "10", "5", "--defend", "--csv"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("rank,candidate_index,win_rate"));
    assert!(stdout.lines().count() > 1);
}

#[test]
fn optimize_without_troop_budget_is_a_usage_error() {
    let scenario = data_file("scenario.yaml");
    let output = run(&["optimize", scenario.as_str()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: warroom optimize"));
}

#[test]
fn recommend_command_emits_advice() {
    let scenario = data_file("scenario.yaml");
    let output = run(&["recommend", scenario.as_str(), "500", "1"]);

    assert_eq!(output.status.code(), Some(0));
    let payload = stdout_json(&output);
    assert!(payload["recommendations"].is_array());
    assert!(payload["attacker_win_rate"].is_number());
}

#[test]
fn validate_command_accepts_sample_scenario() {
    let output = run(&["validate", data_file("scenario.yaml").as_str()]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("validation passed"));
}

#[test]
fn validate_command_returns_non_zero_on_invalid_data() {
    let output = run(&["validate", data_file("invalid_scenario.yaml").as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error\tdefender.phalanx\tunknown unit type"));
    assert!(stdout.contains("error\tfortification\t"));
}

#[test]
fn simulate_fails_on_unknown_units() {
    let output = run(&["simulate", data_file("invalid_scenario.yaml").as_str(), "10", "1"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_scenario_file_fails() {
    let output = run(&["simulate", "/nonexistent/scenario.yaml"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scenario error"));
}

#[test]
fn unknown_command_prints_usage() {
    let output = run(&["serve"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: warroom"));
}

#[test]
fn engine_config_is_read_from_the_environment() {
    let scenario = data_file("scenario.yaml");
    let output = Command::new(bin())
        .args(["simulate", scenario.as_str(), "100", "2"])
        .env("WARROOM_CONFIG", data_file("engine.yaml"))
        .output()
        .expect("warroom should run");
    assert_eq!(output.status.code(), Some(0));

    let path = unique_temp_path("bad-config");
    fs::write(&path, "simulation:\n  loot_fraction: 2.0\n").expect("fixture should be written");
    let output = Command::new(bin())
        .args(["simulate", scenario.as_str(), "100", "2"])
        .env("WARROOM_CONFIG", &path)
        .output()
        .expect("warroom should run");
    let _ = fs::remove_file(path);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration error"));
}
