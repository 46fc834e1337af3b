use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::advisor::{recommend, Recommendation};
use crate::combat::engine::BattleSetup;
use crate::combat::rng::{entropy_seed, Rng};
use crate::config::EngineConfig;
use crate::data::scenario::ScenarioFile;
use crate::data::validate::{validate_scenario, ValidationSeverity};
use crate::optimizer::export_csv::ranking_to_csv_string;
use crate::optimizer::monte_carlo::Simulator;
use crate::optimizer::summary::SimulationSummary;
use crate::optimizer::{OptimizationRequest, OptimizationSide, Optimizer};

const USAGE: &str = "usage: warroom <simulate|optimize|recommend|validate> <scenario> [args...]";
const DEFAULT_ITERATIONS: u32 = 1000;
const DEFAULT_ITERATIONS_PER_TRIAL: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Simulate,
    Optimize,
    Recommend,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("simulate") => Some(Command::Simulate),
        Some("optimize") => Some(Command::Optimize),
        Some("recommend") => Some(Command::Recommend),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

/// Run the CLI. Returns the process exit code: 0 success, 1 failure, 2 usage.
pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };
    let positional: Vec<&String> = args
        .iter()
        .skip(2)
        .filter(|arg| !arg.starts_with("--"))
        .collect();
    let Some(scenario_path) = positional.first().copied() else {
        eprintln!("{USAGE}");
        return 2;
    };

    match command {
        Command::Simulate => handle_simulate(args, scenario_path, &positional[1..]),
        Command::Optimize => handle_optimize(args, scenario_path, &positional[1..]),
        Command::Recommend => handle_recommend(scenario_path, &positional[1..]),
        Command::Validate => handle_validate(scenario_path),
    }
}

/// Configuration, scenario and simulator shared by the commands.
struct Session {
    config: EngineConfig,
    scenario: ScenarioFile,
    simulator: Simulator,
}

fn load_session(scenario_path: &str) -> Result<Session, i32> {
    let config = EngineConfig::from_env().map_err(|err| fail("configuration error", err))?;
    let scenario =
        ScenarioFile::load(scenario_path).map_err(|err| fail("scenario error", err))?;
    let catalog = scenario
        .catalog()
        .map_err(|err| fail("scenario error", err))?;
    let simulator = Simulator::new(
        Arc::new(catalog),
        config.simulation.clone(),
        config.worker_pool(),
    )
    .map_err(|err| fail("configuration error", err))?;
    Ok(Session {
        config,
        scenario,
        simulator,
    })
}

#[derive(Debug, Serialize)]
struct SimulateReport {
    seed: u64,
    attacker_march_speed: Option<f64>,
    defender_march_speed: Option<f64>,
    summary: SimulationSummary,
}

fn handle_simulate(args: &[String], scenario_path: &str, rest: &[&String]) -> i32 {
    let iterations = parse_u32_arg(rest.first().copied(), "iterations", DEFAULT_ITERATIONS);
    let as_table = args.iter().any(|arg| arg == "--table");
    let session = match load_session(scenario_path) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let seed = match resolve_seed(rest.get(1).copied()) {
        Ok(seed) => seed,
        Err(code) => return code,
    };

    let (summary, setup) = match run_simulation(&session, iterations, seed) {
        Ok(result) => result,
        Err(code) => return code,
    };

    if as_table {
        println!(
            "iterations\tseed\tattacker_win_rate\tdefender_win_rate\tdraw_rate\tattacker_power_mean\tdefender_power_mean"
        );
        println!(
            "{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.3}\t{:.3}",
            summary.iterations,
            seed,
            summary.attacker_win_rate,
            summary.defender_win_rate,
            summary.draw_rate,
            summary.attacker_power.mean,
            summary.defender_power.mean
        );
        return 0;
    }

    let catalog = session.simulator.catalog();
    let report = SimulateReport {
        seed,
        attacker_march_speed: setup.attacker.march_speed(catalog).ok().flatten(),
        defender_march_speed: setup.defender.march_speed(catalog).ok().flatten(),
        summary,
    };
    print_json(&report, "simulation result")
}

fn run_simulation(
    session: &Session,
    iterations: u32,
    seed: u64,
) -> Result<(SimulationSummary, BattleSetup), i32> {
    let setup = session
        .scenario
        .battle_setup(&session.config.defense)
        .map_err(|err| fail("scenario error", err))?;
    let summary = session
        .simulator
        .simulate(&setup, iterations, &mut Rng::new(seed))
        .map_err(|err| fail("simulation failed", err))?;
    Ok((summary, setup))
}

fn handle_optimize(args: &[String], scenario_path: &str, rest: &[&String]) -> i32 {
    let Some(total_troops) = rest.first().and_then(|raw| raw.parse::<u32>().ok()) else {
        eprintln!("usage: warroom optimize <scenario> <total_troops> [iterations_per_trial] [seed] [--defend] [--csv]");
        return 2;
    };
    let iterations = parse_u32_arg(
        rest.get(1).copied(),
        "iterations_per_trial",
        DEFAULT_ITERATIONS_PER_TRIAL,
    );
    let side = if args.iter().any(|arg| arg == "--defend") {
        OptimizationSide::Defender
    } else {
        OptimizationSide::Attacker
    };
    let as_csv = args.iter().any(|arg| arg == "--csv");

    let session = match load_session(scenario_path) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let seed = match resolve_seed(rest.get(2).copied()) {
        Ok(seed) => seed,
        Err(code) => return code,
    };
    let setup = match session.scenario.battle_setup(&session.config.defense) {
        Ok(setup) => setup,
        Err(err) => return fail("scenario error", err),
    };
    let opponent = match side {
        OptimizationSide::Attacker => setup.defender,
        OptimizationSide::Defender => setup.attacker,
    };
    let request = OptimizationRequest::new(
        side,
        opponent,
        setup.fortification,
        total_troops,
        iterations,
    )
    .with_resources(setup.defender_resources);

    let optimizer = match Optimizer::new(session.simulator, session.config.optimizer) {
        Ok(optimizer) => optimizer,
        Err(err) => return fail("configuration error", err),
    };
    let result = match optimizer.optimize(&request, &mut Rng::new(seed)) {
        Ok(result) => result,
        Err(err) => return fail("optimization failed", err),
    };

    if as_csv {
        return match ranking_to_csv_string(&result.ranking) {
            Ok(csv) => {
                print!("{csv}");
                0
            }
            Err(err) => fail("failed to write ranking csv", err),
        };
    }
    print_json(&result, "optimization result")
}

#[derive(Debug, Serialize)]
struct RecommendReport {
    seed: u64,
    attacker_win_rate: f64,
    defender_win_rate: f64,
    draw_rate: f64,
    recommendations: Vec<Recommendation>,
}

fn handle_recommend(scenario_path: &str, rest: &[&String]) -> i32 {
    let iterations = parse_u32_arg(rest.first().copied(), "iterations", DEFAULT_ITERATIONS);
    let session = match load_session(scenario_path) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let seed = match resolve_seed(rest.get(1).copied()) {
        Ok(seed) => seed,
        Err(code) => return code,
    };
    let summary = match run_simulation(&session, iterations, seed) {
        Ok((summary, _)) => summary,
        Err(code) => return code,
    };
    let report = RecommendReport {
        seed,
        attacker_win_rate: summary.attacker_win_rate,
        defender_win_rate: summary.defender_win_rate,
        draw_rate: summary.draw_rate,
        recommendations: recommend(&summary, &session.config.advisor),
    };
    print_json(&report, "recommendations")
}

fn handle_validate(scenario_path: &str) -> i32 {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(err) => return fail("configuration error", err),
    };
    let scenario = match ScenarioFile::load(scenario_path) {
        Ok(scenario) => scenario,
        Err(err) => return fail("validation failed", err),
    };
    let report = validate_scenario(&scenario, &config.defense);
    for diag in &report.diagnostics {
        println!("{}\t{}\t{}", diag.severity, diag.context, diag.message);
    }
    let errors = report.count(ValidationSeverity::Error);
    let warnings = report.count(ValidationSeverity::Warning);
    if report.has_errors() {
        eprintln!("validation failed: {errors} error(s), {warnings} warning(s)");
        1
    } else {
        eprintln!("validation passed: {scenario_path} ({warnings} warning(s))");
        0
    }
}

fn print_json<T: Serialize>(value: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => fail(&format!("failed to serialize {what}"), err),
    }
}

fn fail(context: &str, err: impl fmt::Display) -> i32 {
    eprintln!("{context}: {err}");
    1
}

/// Use the given seed, or draw one from OS entropy. The seed in use is
/// logged so an entropy-seeded run can be replayed.
fn resolve_seed(raw: Option<&String>) -> Result<u64, i32> {
    if let Some(value) = raw {
        match value.parse::<u64>() {
            Ok(seed) => return Ok(seed),
            Err(_) => warn!(seed = %value, "invalid seed, using an entropy seed"),
        }
    }
    let seed = entropy_seed().map_err(|err| fail("unable to seed random source", err))?;
    info!(seed, "using entropy seed");
    Ok(seed)
}

fn parse_u32_arg(raw: Option<&String>, name: &str, default: u32) -> u32 {
    raw.and_then(|value| value.parse::<u32>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                warn!(name, value = %value, default, "invalid argument, using default");
            }
            default
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parse_command_recognizes_every_subcommand() {
        assert_eq!(parse_command(&args(&["warroom", "simulate"])), Some(Command::Simulate));
        assert_eq!(parse_command(&args(&["warroom", "optimize"])), Some(Command::Optimize));
        assert_eq!(parse_command(&args(&["warroom", "recommend"])), Some(Command::Recommend));
        assert_eq!(parse_command(&args(&["warroom", "validate"])), Some(Command::Validate));
        assert_eq!(parse_command(&args(&["warroom", "serve"])), None);
        assert_eq!(parse_command(&args(&["warroom"])), None);
    }

    #[test]
    fn missing_scenario_is_a_usage_error() {
        assert_eq!(run_with_args(&args(&["warroom", "simulate", "--table"])), 2);
        assert_eq!(run_with_args(&args(&["warroom", "bogus"])), 2);
    }

    #[test]
    fn parse_u32_arg_falls_back_on_garbage() {
        let raw = "many".to_string();
        assert_eq!(parse_u32_arg(Some(&raw), "iterations", 7), 7);
        let raw = "12".to_string();
        assert_eq!(parse_u32_arg(Some(&raw), "iterations", 7), 12);
        assert_eq!(parse_u32_arg(None, "iterations", 7), 7);
    }
}
