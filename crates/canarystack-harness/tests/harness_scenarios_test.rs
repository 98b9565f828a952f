//! Every injection scenario under every detector profile, plus the JSONL
//! evidence trail and allocation-limited soaks.

use canarystack_harness::structured_log::validate_log_line;
use canarystack_harness::{
    HarnessError, LogEmitter, LogEntry, LogLevel, Outcome, Scenario, SoakPlan, run_scenario,
    run_soak,
};
use canarystack_membrane::{DetectorProfile, StackConfig, Status};

const PROFILES: [DetectorProfile; 3] = [
    DetectorProfile::Full,
    DetectorProfile::Release,
    DetectorProfile::Off,
];

#[test]
fn every_scenario_passes_under_every_profile() {
    for profile in PROFILES {
        for scenario in Scenario::ALL {
            let report = run_scenario(scenario, profile.config())
                .unwrap_or_else(|e| panic!("{profile:?}/{}: {e}", scenario.name()));
            assert!(
                report.passed(),
                "{profile:?}/{}: expected {} observed {}",
                scenario.name(),
                report.expected,
                report.observed
            );
        }
    }
}

#[test]
fn full_profile_reports_the_exact_canary() {
    let cases = [
        (Scenario::LeftDataCanary, Status::LEFT_DATA_CANARY),
        (Scenario::RightDataCanary, Status::RIGHT_DATA_CANARY),
        (Scenario::LeftStructCanary, Status::LEFT_STRUCT_CANARY),
        (Scenario::RightStructCanary, Status::RIGHT_STRUCT_CANARY),
    ];
    for (scenario, flag) in cases {
        let report = run_scenario(scenario, StackConfig::full_debug()).unwrap();
        assert_eq!(report.observed & Status::ANY_CANARY, flag, "{}", scenario.name());
    }
}

#[test]
fn demo_transcript_shows_contents_and_ends_clean() {
    let report = run_scenario(Scenario::Demo, StackConfig::full_debug()).unwrap();
    assert_eq!(report.observed, Status::OK);
    assert!(report.transcript.contains("| *   24"));
    assert!(report.transcript.contains("| *   10"));
    assert!(report.transcript.contains("| Current status = 0"));
}

#[test]
fn corruption_dump_lists_the_failure() {
    let report = run_scenario(Scenario::LiveSlotScribble, StackConfig::full_debug()).unwrap();
    assert!(report.observed.contains(Status::BAD_DATA_HASH));
    assert!(report.transcript.contains("Problems found during healthcheck!"));
    assert!(report.transcript.contains("Bad data hash"));
}

#[test]
fn scenario_log_lines_validate() {
    let (mut emitter, buffer) = LogEmitter::to_buffer("test");
    for scenario in [Scenario::Demo, Scenario::CapacityTamper] {
        let report = run_scenario(scenario, StackConfig::full_debug()).unwrap();
        emitter
            .emit_entry(
                LogEntry::new("", LogLevel::Info, "scenario_result")
                    .with_scenario(scenario.name())
                    .with_status(report.observed)
                    .with_outcome(Outcome::Pass)
                    .with_dump(&report.transcript),
            )
            .unwrap();
    }
    let text = buffer.contents();
    let entries: Vec<_> = text
        .lines()
        .enumerate()
        .map(|(i, line)| validate_log_line(line, i + 1).expect("valid line"))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].scenario.as_deref(), Some("demo"));
    let tamper_bits = entries[1].status_bits.unwrap();
    assert_ne!(tamper_bits & Status::INTEGRITY_VIOLATED.bits(), 0);
    assert_ne!(entries[0].dump_sha256, entries[1].dump_sha256);
}

#[test]
fn soak_agrees_with_model_across_seeds_and_profiles() {
    for profile in PROFILES {
        for seed in [1_u64, 0xDEAD_BEEF, 0x1234_5678_9ABC_DEF0] {
            let plan = SoakPlan {
                seed,
                steps: 600,
                alloc_limit: None,
            };
            let report = run_soak(profile.config(), plan)
                .unwrap_or_else(|e| panic!("{profile:?} seed {seed:#x}: {e}"));
            assert_eq!(report.allocation_failures, 0);
        }
    }
}

#[test]
fn soak_survives_allocation_failures() {
    let plan = SoakPlan {
        seed: 99,
        steps: 2_000,
        alloc_limit: Some(256),
    };
    let report = run_soak(StackConfig::full_debug(), plan).unwrap();
    assert!(report.allocation_failures > 0);
    assert!(report.final_capacity > 0);
}

#[test]
fn soak_with_shrinking_matches_model() {
    let config = StackConfig {
        auto_shrink: true,
        ..StackConfig::full_debug()
    };
    let plan = SoakPlan {
        seed: 7,
        steps: 1_500,
        alloc_limit: None,
    };
    run_soak(config, plan).unwrap();
}

#[test]
fn failed_report_becomes_error() {
    let report = run_scenario(Scenario::Demo, StackConfig::full_debug()).unwrap();
    let forged = canarystack_harness::ScenarioReport {
        expected: Status::BAD_DATA_HASH,
        ..report
    };
    assert!(matches!(
        forged.into_result(),
        Err(HarnessError::ScenarioFailed { .. })
    ));
}
