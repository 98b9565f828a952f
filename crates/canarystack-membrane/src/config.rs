//! Detector configuration.
//!
//! Every corruption detector is independently switchable at runtime through
//! [`StackConfig`]. A process-wide default profile is read from the
//! `CANARYSTACK_MODE` environment variable:
//! - `full` (default): every detector on, verbose diagnostics.
//! - `release`: every detector off; the stack is a plain amortized-O(1) stack.
//! - `off`: like `release`, and the precondition gate stops logging.

use std::sync::OnceLock;

use thiserror::Error;

use crate::checksum::ChecksumKind;

/// Starting capacity used by the presets.
pub const DEFAULT_STARTING_CAPACITY: usize = 2;

/// Multiplicative growth factor used by the presets.
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.5;

/// Shrink divisor used by the presets.
pub const DEFAULT_SHRINK_FACTOR: f64 = 3.0;

/// Process-wide detector profile.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorProfile {
    /// Every detector enabled.
    #[default]
    Full,
    /// Every detector disabled.
    Release,
    /// Detectors disabled and gate logging silenced.
    Off,
}

impl DetectorProfile {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Release => "release",
            Self::Off => "off",
        }
    }

    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "full" | "debug" | "paranoid" => Self::Full,
            "release" | "fast" => Self::Release,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Full,
        }
    }

    /// The configuration preset this profile stands for.
    #[must_use]
    pub fn config(self) -> StackConfig {
        match self {
            Self::Full => StackConfig::full_debug(),
            Self::Release => StackConfig::release(),
            Self::Off => StackConfig {
                quiet_gate: true,
                ..StackConfig::release()
            },
        }
    }
}

static GLOBAL_PROFILE: OnceLock<DetectorProfile> = OnceLock::new();

/// Get the configured profile (reads env var on first call, caches thereafter).
#[must_use]
pub fn detector_profile() -> DetectorProfile {
    *GLOBAL_PROFILE.get_or_init(|| {
        std::env::var("CANARYSTACK_MODE")
            .map(|v| DetectorProfile::from_str_loose(&v))
            .unwrap_or_default()
    })
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("growth factor {0} must be finite and greater than 1")]
    GrowthFactor(f64),
    #[error("shrink factor {shrink} must be finite and greater than the growth factor {growth}")]
    ShrinkFactor { shrink: f64, growth: f64 },
    #[error("starting capacity must be at least 1")]
    StartingCapacity,
    #[error("verbosity {0} out of range (0..=2)")]
    Verbosity(u8),
}

/// Runtime selection of detectors and sizing policy for one stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackConfig {
    /// Fill unused and freed slots with recognizable byte patterns.
    pub poison: bool,
    /// Refuse to dereference buffers whose state tag is not live.
    pub pointer_checks: bool,
    /// Sentinel words around the control structure and the data buffer.
    pub canaries: bool,
    /// Checksum over the control structure's scalar fields.
    pub struct_checksum: bool,
    /// Checksum over the bytes of the data region.
    pub data_checksum: bool,
    /// OS residency probe and allocator usable-size cross-check.
    pub os_checks: bool,
    /// Digest used by both checksums.
    pub checksum_kind: ChecksumKind,
    /// Dump detail: 0 status only, 1 adds layout and contents, 2 also reports
    /// every operation refused by the precondition gate.
    pub verbosity: u8,
    /// Shrink the buffer on pop once length drops below the shrink target.
    pub auto_shrink: bool,
    /// Silence the precondition gate's diagnostic output.
    pub quiet_gate: bool,
    /// Element slots allocated at construction.
    pub starting_capacity: usize,
    /// Growth multiplier.
    pub growth_factor: f64,
    /// Shrink divisor; must exceed `growth_factor`.
    pub shrink_factor: f64,
}

impl StackConfig {
    /// Every detector enabled, maximal verbosity.
    #[must_use]
    pub const fn full_debug() -> Self {
        Self {
            poison: true,
            pointer_checks: true,
            canaries: true,
            struct_checksum: true,
            data_checksum: true,
            os_checks: true,
            checksum_kind: ChecksumKind::Crc32,
            verbosity: 2,
            auto_shrink: false,
            quiet_gate: false,
            starting_capacity: DEFAULT_STARTING_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
        }
    }

    /// Every detector disabled.
    #[must_use]
    pub const fn release() -> Self {
        Self {
            poison: false,
            pointer_checks: false,
            canaries: false,
            struct_checksum: false,
            data_checksum: false,
            os_checks: false,
            checksum_kind: ChecksumKind::Crc32,
            verbosity: 0,
            auto_shrink: false,
            quiet_gate: false,
            starting_capacity: DEFAULT_STARTING_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
        }
    }

    /// Preset selected by `CANARYSTACK_MODE`.
    #[must_use]
    pub fn from_env() -> Self {
        detector_profile().config()
    }

    /// Check sizing parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.growth_factor.is_finite() || self.growth_factor <= 1.0 {
            return Err(ConfigError::GrowthFactor(self.growth_factor));
        }
        // Shrink and grow thresholds must never coincide.
        if !self.shrink_factor.is_finite() || self.shrink_factor <= self.growth_factor {
            return Err(ConfigError::ShrinkFactor {
                shrink: self.shrink_factor,
                growth: self.growth_factor,
            });
        }
        if self.starting_capacity == 0 {
            return Err(ConfigError::StartingCapacity);
        }
        if self.verbosity > 2 {
            return Err(ConfigError::Verbosity(self.verbosity));
        }
        Ok(())
    }

    /// Names of the enabled detectors, in a fixed order.
    #[must_use]
    pub fn enabled_detectors(&self) -> Vec<&'static str> {
        [
            (self.poison, "poison"),
            (self.pointer_checks, "pointer-checks"),
            (self.canaries, "canaries"),
            (self.struct_checksum, "struct-checksum"),
            (self.data_checksum, "data-checksum"),
            (self.os_checks, "os-checks"),
            (self.auto_shrink, "auto-shrink"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::full_debug()
    }
}
