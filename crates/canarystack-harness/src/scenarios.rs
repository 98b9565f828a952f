//! Canned scenarios: the demo run and one corruption injection per detector.
//!
//! Each scenario builds a stack holding 10..17 and 24, optionally damages
//! it, runs a health check, and compares the observed status with the
//! detector that must fire.

use canarystack_membrane::{
    DetectorProfile, GuardedStack, LogSink, StackConfig, StackError, Status, detector_profile,
};

use crate::error::HarnessError;

/// Values pushed by every scenario.
pub const DEMO_VALUES: [i32; 9] = [10, 11, 12, 13, 14, 15, 16, 17, 24];

/// Which damage a scenario applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Push, dump, pop, destroy: no damage.
    Demo,
    LeftDataCanary,
    RightDataCanary,
    LeftStructCanary,
    RightStructCanary,
    /// Overwrite `capacity` with 100.
    CapacityTamper,
    /// Overwrite `len` with 1000.
    LenTamper,
    /// Scribble over one unused slot.
    UnusedSlotScribble,
    /// Scribble over one live slot.
    LiveSlotScribble,
    /// Pop an empty stack.
    EmptyPop,
}

impl Scenario {
    pub const ALL: [Self; 10] = [
        Self::Demo,
        Self::LeftDataCanary,
        Self::RightDataCanary,
        Self::LeftStructCanary,
        Self::RightStructCanary,
        Self::CapacityTamper,
        Self::LenTamper,
        Self::UnusedSlotScribble,
        Self::LiveSlotScribble,
        Self::EmptyPop,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::LeftDataCanary => "left-data-canary",
            Self::RightDataCanary => "right-data-canary",
            Self::LeftStructCanary => "left-struct-canary",
            Self::RightStructCanary => "right-struct-canary",
            Self::CapacityTamper => "capacity-tamper",
            Self::LenTamper => "len-tamper",
            Self::UnusedSlotScribble => "unused-slot-scribble",
            Self::LiveSlotScribble => "live-slot-scribble",
            Self::EmptyPop => "empty-pop",
        }
    }

    /// Parse from string (case-insensitive, `_` and `-` interchangeable).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let wanted = s.to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|sc| sc.name() == wanted)
    }

    /// Flags that must be present after the damage, given the detectors in `config`.
    #[must_use]
    pub fn expected(self, config: &StackConfig) -> Status {
        let when = |on: bool, flag: Status| if on { flag } else { Status::OK };
        match self {
            Self::Demo | Self::EmptyPop => Status::OK,
            Self::LeftDataCanary => when(config.canaries, Status::LEFT_DATA_CANARY),
            Self::RightDataCanary => when(config.canaries, Status::RIGHT_DATA_CANARY),
            Self::LeftStructCanary => when(config.canaries, Status::LEFT_STRUCT_CANARY),
            Self::RightStructCanary => when(config.canaries, Status::RIGHT_STRUCT_CANARY),
            Self::CapacityTamper => {
                Status::INTEGRITY_VIOLATED | when(config.struct_checksum, Status::BAD_STRUCT_HASH)
            }
            Self::LenTamper => {
                Status::INTEGRITY_VIOLATED | when(config.struct_checksum, Status::BAD_STRUCT_HASH)
            }
            Self::UnusedSlotScribble => {
                when(config.poison, Status::DATA_INTEGRITY_VIOLATED)
                    | when(config.data_checksum, Status::BAD_DATA_HASH)
            }
            Self::LiveSlotScribble => when(config.data_checksum, Status::BAD_DATA_HASH),
        }
    }
}

/// Profile named on the command line, else the one selected by
/// `CANARYSTACK_MODE`.
#[must_use]
pub fn resolve_profile(mode: Option<&str>) -> DetectorProfile {
    mode.map_or_else(detector_profile, DetectorProfile::from_str_loose)
}

/// Result of one scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub expected: Status,
    pub observed: Status,
    /// Diagnostic stream captured during the run, dumps included.
    pub transcript: String,
}

impl ScenarioReport {
    /// Every expected flag fired; canary scenarios must not trip any other canary.
    #[must_use]
    pub fn passed(&self) -> bool {
        if !self.observed.contains(self.expected) {
            return false;
        }
        let canaries = self.expected & Status::ANY_CANARY;
        canaries.is_empty() || self.observed & Status::ANY_CANARY == canaries
    }

    /// Convert a failed report into an error.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(HarnessError::ScenarioFailed {
                name: self.scenario.name().to_string(),
                expected: self.expected,
                observed: self.observed,
            })
        }
    }
}

/// Run `scenario` against a fresh `i32` stack.
pub fn run_scenario(scenario: Scenario, config: StackConfig) -> Result<ScenarioReport, HarnessError> {
    let sink = LogSink::capture();
    let mut stack: GuardedStack<i32> =
        GuardedStack::constructed_in(config, Default::default(), sink.clone())?;
    for value in DEMO_VALUES {
        stack.push(value)?;
    }
    tracing::info!(scenario = scenario.name(), len = stack.len(), "stack populated");

    let observed = match scenario {
        Scenario::Demo => {
            stack.dump();
            let top = stack.pop()?;
            if top != 24 || stack.len() != 8 {
                return Err(HarnessError::ScenarioFailed {
                    name: scenario.name().to_string(),
                    expected: Status::OK,
                    observed: stack.status(),
                });
            }
            stack.destroy()
        }
        Scenario::EmptyPop => {
            stack.clear()?;
            match stack.pop() {
                Err(StackError::EmptyPop) => stack.health_check(),
                Err(err) => return Err(err.into()),
                Ok(_) => Status::BAD_MEM_ALLOC,
            }
        }
        damage => {
            apply(&mut stack, damage)?;
            let status = stack.health_check();
            stack.dump();
            status
        }
    };

    Ok(ScenarioReport {
        scenario,
        expected: scenario.expected(&config),
        observed,
        transcript: sink.take_captured().unwrap_or_default(),
    })
}

fn apply(stack: &mut GuardedStack<i32>, scenario: Scenario) -> Result<(), StackError> {
    match scenario {
        Scenario::LeftDataCanary => stack.inject_left_data_canary(0x00),
        Scenario::RightDataCanary => stack.inject_right_data_canary(0x00),
        Scenario::LeftStructCanary => stack.inject_left_struct_canary(0),
        Scenario::RightStructCanary => stack.inject_right_struct_canary(0),
        Scenario::CapacityTamper => stack.inject_capacity(100),
        Scenario::LenTamper => stack.inject_len(1000),
        Scenario::UnusedSlotScribble => {
            if stack.len() == stack.capacity() {
                stack.reallocate(stack.capacity() + 1)?;
            }
            let index = stack.len();
            stack.inject_slot(index, 0x00);
        }
        Scenario::LiveSlotScribble => stack.inject_slot(0, 0x77),
        Scenario::Demo | Scenario::EmptyPop => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_str_loose(scenario.name()), Some(scenario));
        }
        assert_eq!(
            Scenario::from_str_loose("LEFT_DATA_CANARY"),
            Some(Scenario::LeftDataCanary)
        );
        assert_eq!(Scenario::from_str_loose("nope"), None);
    }

    #[test]
    fn explicit_mode_overrides_environment() {
        assert_eq!(resolve_profile(Some("RELEASE")), DetectorProfile::Release);
        assert_eq!(resolve_profile(Some("none")).config(), DetectorProfile::Off.config());
        assert_eq!(resolve_profile(None), detector_profile());
    }

    #[test]
    fn canary_scenarios_must_be_exact() {
        let report = ScenarioReport {
            scenario: Scenario::LeftDataCanary,
            expected: Status::LEFT_DATA_CANARY,
            observed: Status::LEFT_DATA_CANARY | Status::RIGHT_DATA_CANARY,
            transcript: String::new(),
        };
        assert!(!report.passed());
    }

    #[test]
    fn release_config_expects_only_always_on_checks() {
        let release = StackConfig::release();
        assert_eq!(Scenario::LeftDataCanary.expected(&release), Status::OK);
        assert_eq!(
            Scenario::CapacityTamper.expected(&release),
            Status::INTEGRITY_VIOLATED
        );
    }
}
