//! CLI entrypoint for the canarystack harness.

use std::path::PathBuf;
use std::time::Instant;

use canarystack_harness::{
    HarnessError, LogEmitter, LogEntry, LogLevel, Outcome, Scenario, SoakPlan, resolve_profile,
    run_scenario, run_soak,
};
use canarystack_membrane::{DetectorProfile, detector_profile, global_metrics};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Corruption-injection tooling for canarystack.
#[derive(Debug, Parser)]
#[command(name = "canarystack-harness")]
#[command(about = "Scenario driver for the self-verifying stack")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push 10..17 and 24, dump, pop, destroy.
    Demo {
        /// Detector profile (`full`, `release`, or `off`); defaults to
        /// `CANARYSTACK_MODE`.
        #[arg(long)]
        mode: Option<String>,
    },
    /// Damage a stack and check the matching detector fires.
    Inject {
        /// Scenario name, or `all`.
        #[arg(long, default_value = "all")]
        scenario: String,
        #[arg(long)]
        mode: Option<String>,
        /// JSONL evidence output (stdout when omitted).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Print each captured dump.
        #[arg(long)]
        show_dumps: bool,
    },
    /// Random operations checked against a reference model.
    Soak {
        /// Root seed (decimal or 0x...).
        #[arg(long, default_value = "0xDEAD_BEEF")]
        seed: String,
        #[arg(long, default_value_t = 10_000)]
        steps: usize,
        #[arg(long)]
        mode: Option<String>,
        /// Allocator byte budget.
        #[arg(long)]
        alloc_limit: Option<usize>,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List detector profiles and what each enables.
    Modes,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Demo { mode } => {
            let config = resolve_profile(mode.as_deref()).config();
            let report = run_scenario(Scenario::Demo, config)?;
            print!("{}", report.transcript);
            println!("destroy status: {}", report.observed);
            report.into_result()?;
        }
        Command::Inject {
            scenario,
            mode,
            log,
            show_dumps,
        } => {
            let scenarios = if scenario.eq_ignore_ascii_case("all") {
                Scenario::ALL.to_vec()
            } else {
                vec![
                    Scenario::from_str_loose(&scenario)
                        .ok_or_else(|| HarnessError::UnknownScenario(scenario.clone()))?,
                ]
            };
            let profile = resolve_profile(mode.as_deref());
            let config = profile.config();
            let mut emitter = open_emitter(log.as_ref(), "inject")?;
            let mut failed = Vec::new();
            for sc in scenarios {
                let started = Instant::now();
                let report = run_scenario(sc, config)?;
                let passed = report.passed();
                if show_dumps {
                    eprint!("{}", report.transcript);
                }
                emitter.emit_entry(
                    LogEntry::new(
                        "",
                        if passed { LogLevel::Info } else { LogLevel::Error },
                        "scenario_result",
                    )
                    .with_mode(profile.as_str())
                    .with_scenario(sc.name())
                    .with_status(report.observed)
                    .with_outcome(if passed { Outcome::Pass } else { Outcome::Fail })
                    .with_dump(&report.transcript)
                    .with_duration_us(started.elapsed().as_micros() as u64)
                    .with_details(serde_json::json!({
                        "expected_bits": report.expected.bits(),
                    })),
                )?;
                if !passed {
                    failed.push(report);
                }
            }
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Info, "metrics")
                    .with_mode(profile.as_str())
                    .with_details(serde_json::to_value(MetricsView::capture())?),
            )?;
            emitter.flush()?;
            if let Some(report) = failed.into_iter().next() {
                report.into_result()?;
            }
        }
        Command::Soak {
            seed,
            steps,
            mode,
            alloc_limit,
            log,
        } => {
            let plan = SoakPlan {
                seed: parse_u64(&seed)?,
                steps,
                alloc_limit,
            };
            let profile = resolve_profile(mode.as_deref());
            let config = profile.config();
            let mut emitter = open_emitter(log.as_ref(), "soak")?;
            let started = Instant::now();
            let result = run_soak(config, plan);
            let entry = LogEntry::new("", LogLevel::Info, "soak_result")
                .with_mode(profile.as_str())
                .with_duration_us(started.elapsed().as_micros() as u64);
            let entry = match &result {
                Ok(report) => entry
                    .with_outcome(Outcome::Pass)
                    .with_details(serde_json::to_value(report)?),
                Err(err) => {
                    let mut entry = entry
                        .with_outcome(Outcome::Fail)
                        .with_details(serde_json::json!({ "error": err.to_string() }));
                    entry.level = LogLevel::Error;
                    entry
                }
            };
            emitter.emit_entry(entry)?;
            emitter.flush()?;
            result?;
        }
        Command::Modes => {
            for profile in [
                DetectorProfile::Full,
                DetectorProfile::Release,
                DetectorProfile::Off,
            ] {
                let config = profile.config();
                let active = if profile == detector_profile() { " (active)" } else { "" };
                println!(
                    "{}{active}: [{}] verbosity={} quiet_gate={}",
                    profile.as_str(),
                    config.enabled_detectors().join(", "),
                    config.verbosity,
                    config.quiet_gate
                );
            }
        }
    }
    Ok(())
}

fn open_emitter(path: Option<&PathBuf>, run: &str) -> std::io::Result<LogEmitter> {
    let run_id = format!("{run}-{}", std::process::id());
    match path {
        Some(path) => LogEmitter::to_file(path, &run_id),
        None => Ok(LogEmitter::to_stdout(&run_id)),
    }
}

fn parse_u64(raw: &str) -> Result<u64, String> {
    let cleaned = raw.replace('_', "");
    let parsed = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse(),
    };
    parsed.map_err(|e| format!("invalid seed '{raw}': {e}"))
}

/// Serializable copy of the global counters.
#[derive(Debug, serde::Serialize)]
struct MetricsView {
    health_checks: u64,
    faults_detected: u64,
    canary_failures: u64,
    checksum_failures: u64,
    poison_violations: u64,
    gated_operations: u64,
    allocation_failures: u64,
    dumps: u64,
}

impl MetricsView {
    fn capture() -> Self {
        let snap = global_metrics().snapshot();
        Self {
            health_checks: snap.health_checks,
            faults_detected: snap.faults_detected,
            canary_failures: snap.canary_failures,
            checksum_failures: snap.checksum_failures,
            poison_violations: snap.poison_violations,
            gated_operations: snap.gated_operations,
            allocation_failures: snap.allocation_failures,
            dumps: snap.dumps,
        }
    }
}
