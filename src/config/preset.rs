//! Named configuration presets.
//!
//! Each preset is one of the reference setups, expressed as an
//! [`AssimConfig`] that can be adjusted field by field after construction.
use std::str::FromStr;

use crate::{
    config::options::{AssimConfig, Selection},
    errors::AssimError,
    transform::log_transform::TransformOptions,
};

/// Lower clamp applied before the log in the log-chlorophyll setup.
pub const LOG_CHLOROPHYLL_MINIMUM: f64 = 1.0e-12;

/// Reference assimilation setups.
///
/// Variants:
/// - `ParameterSum`: P1 state plus the P1 `sum` parameter; the parameter is
///   clipped and kept spread; every retained variable stays non-negative.
/// - `ParameterQuota`: P2 state plus the P2 quota parameters `xqn` / `xqcn`,
///   controlled the same way.
/// - `LogChlorophyll`: every BGC variable (`*_*`) and total chlorophyll in
///   log space, floored at `1e-12`, observations left untouched, finite
///   check on.
/// - `Ogs3dVar`: variational setup retaining `P?_*`, `total_chlorophyll` and
///   `z` for the covariance operator.
///
/// Parsing:
/// `FromStr` accepts case-insensitive names with `-` or `_` separators
/// (`"parameter-sum"`, `"LOG_CHLOROPHYLL"`, `"ogs-3dvar"`). Unknown names
/// return `AssimError::UnknownPreset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    ParameterSum,
    ParameterQuota,
    LogChlorophyll,
    Ogs3dVar,
}

impl Preset {
    pub const ALL: [Preset; 4] =
        [Preset::ParameterSum, Preset::ParameterQuota, Preset::LogChlorophyll, Preset::Ogs3dVar];

    pub fn name(self) -> &'static str {
        match self {
            Preset::ParameterSum => "parameter-sum",
            Preset::ParameterQuota => "parameter-quota",
            Preset::LogChlorophyll => "log-chlorophyll",
            Preset::Ogs3dVar => "ogs-3dvar",
        }
    }

    /// Build the preset's configuration.
    pub fn config(self) -> AssimConfig {
        match self {
            Preset::ParameterSum => parameter_config(
                &["P1_Chl", "P1_c", "P1_p", "P1_n", "P1_s", "instances_P1_parameters_sum"],
                &["instances_P1_parameters_sum"],
            ),
            Preset::ParameterQuota => parameter_config(
                &[
                    "P2_Chl",
                    "P2_c",
                    "P2_p",
                    "P2_n",
                    "instances_P2_parameters_xqn",
                    "instances_P2_parameters_xqcn",
                ],
                &["instances_P2_parameters_xqn", "instances_P2_parameters_xqcn"],
            ),
            Preset::LogChlorophyll => {
                let mut config = AssimConfig::new(Selection::Patterns(strings(&[
                    "*_*",
                    "total_chlorophyll",
                ])));
                config.check_finite = true;
                config.log_variables = strings(&["*"]);
                config.transform = TransformOptions {
                    transform_obs: false,
                    minimum: Some(LOG_CHLOROPHYLL_MINIMUM),
                };
                config
            }
            Preset::Ogs3dVar => AssimConfig::new(Selection::Patterns(strings(&[
                "P?_*",
                "total_chlorophyll",
                "z",
            ]))),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = AssimError;

    /// Parse a preset name (case-insensitive, `-` and `_` interchangeable).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "parameter-sum" => Ok(Preset::ParameterSum),
            "parameter-quota" => Ok(Preset::ParameterQuota),
            "log-chlorophyll" => Ok(Preset::LogChlorophyll),
            "ogs-3dvar" => Ok(Preset::Ogs3dVar),
            _ => Err(AssimError::UnknownPreset { name: s.to_string() }),
        }
    }
}

fn parameter_config(kept: &[&str], controlled: &[&str]) -> AssimConfig {
    let mut config = AssimConfig::new(Selection::Names(strings(kept)));
    config.controlled = strings(controlled);
    config.positive = strings(&["*"]);
    config
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
