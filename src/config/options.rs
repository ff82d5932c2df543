//! AssimConfig — validated bundle of every per-plugin option.
//!
//! Purpose
//! -------
//! Replace ad hoc module-level lists (kept variables, log-transformed
//! variables, clipping thresholds) with one explicit structure that is
//! checked once at plugin initialization.
//!
//! Key behaviors
//! -------------
//! - [`Selection`] decides which host variables the assimilation owns, by
//!   exact names or by shell-style patterns.
//! - [`AssimConfig::validate`] checks the bundled option structs and
//!   role-list consistency.
//! - [`AssimConfig::resolve_roles`] expands role lists against the retained
//!   catalog (`"*"` in a role list means "every retained variable").
//!
//! Invariants & assumptions
//! ------------------------
//! - Role lists name retained variables only; unknown names fail at plugin
//!   initialization with `MissingVariable`.
//! - A variable may be both log-transformed and spread-controlled; this is
//!   allowed but logged, since the reference configurations keep the two
//!   disjoint.
use std::path::PathBuf;

use crate::{
    covariance::cvt::CvtOptions,
    errors::{AssimError, AssimResult},
    spread::options::SpreadOptions,
    state::{
        catalog::{RetainedCatalog, VariableCatalog},
        validation::validate_unique_names,
    },
    transform::log_transform::TransformOptions,
};

/// Which host variables are retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Exact names; every name must exist.
    Names(Vec<String>),
    /// Shell-style patterns; every pattern must match something.
    Patterns(Vec<String>),
}

impl Selection {
    /// Retain the selected subset of `catalog`.
    pub fn apply(&self, catalog: &VariableCatalog) -> AssimResult<RetainedCatalog> {
        match self {
            Selection::Names(names) => catalog.retain(names.as_slice()),
            Selection::Patterns(patterns) => catalog.retain_matching(patterns.as_slice()),
        }
    }
}

/// Location of the EOF resources used by the variational plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EofResources {
    /// Prefix of the per-month tables; month `m` reads `"{prefix}{m:02}.txt"`.
    pub prefix: String,
    /// Depth table shared by every month.
    pub depth_file: PathBuf,
}

impl Default for EofResources {
    fn default() -> Self {
        EofResources { prefix: "data/init/eof.".to_string(), depth_file: "data/init/z.txt".into() }
    }
}

/// Full configuration of one assimilation setup.
///
/// Fields
/// ------
/// - `selection`: retained variables.
/// - `check_finite`: reject NaN/±inf states before the analysis.
/// - `log_variables` / `transform`: log-space stage.
/// - `controlled` / `positive` / `spread`: post-analysis constraints.
///   Any role list may be `["*"]` for every retained variable.
/// - `cvt` / `eof`: covariance operator (variational setups only).
/// - `ensemble_size`: expected member count, if the host announces one.
#[derive(Debug, Clone, PartialEq)]
pub struct AssimConfig {
    pub selection: Selection,
    pub check_finite: bool,
    pub log_variables: Vec<String>,
    pub transform: TransformOptions,
    pub controlled: Vec<String>,
    pub positive: Vec<String>,
    pub spread: SpreadOptions,
    pub cvt: CvtOptions,
    pub eof: EofResources,
    pub ensemble_size: Option<usize>,
}

/// Role lists resolved against a retained catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoles {
    pub log_variables: Vec<String>,
    pub controlled: Vec<String>,
    pub positive: Vec<String>,
}

impl AssimConfig {
    /// Configuration retaining `selection` with every stage disabled.
    pub fn new(selection: Selection) -> Self {
        AssimConfig {
            selection,
            check_finite: false,
            log_variables: Vec::new(),
            transform: TransformOptions::default(),
            controlled: Vec::new(),
            positive: Vec::new(),
            spread: SpreadOptions::default(),
            cvt: CvtOptions::default(),
            eof: EofResources::default(),
            ensemble_size: None,
        }
    }

    /// Check the bundled options.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidOption` for an empty selection, a zero
    ///   ensemble size, or a role list naming a variable twice.
    /// - Whatever the option constructors reject (`TransformOptions::new`,
    ///   `SpreadOptions::new`, `CvtOptions::validate`), re-run on the stored
    ///   values since their fields are public.
    pub fn validate(&self) -> AssimResult<()> {
        let empty = match &self.selection {
            Selection::Names(v) | Selection::Patterns(v) => v.is_empty(),
        };
        if empty {
            return Err(AssimError::InvalidOption {
                name: "selection",
                reason: "At least one variable must be retained.".to_string(),
            });
        }
        if self.ensemble_size == Some(0) {
            return Err(AssimError::InvalidOption {
                name: "ensemble_size",
                reason: "An ensemble needs at least one member.".to_string(),
            });
        }

        TransformOptions::new(self.transform.transform_obs, self.transform.minimum)?;
        let s = &self.spread;
        SpreadOptions::new(s.lower_threshold, s.upper_threshold)?
            .with_lower_floor_factor(s.lower_floor_factor)?
            .with_upper_ceiling(s.upper_ceiling)?
            .with_spread_fraction(s.spread_fraction)?
            .with_positivity_floor(s.positivity_floor)?;
        self.cvt.validate()?;
        validate_unique_names("log_variables", self.log_variables.as_slice())?;
        validate_unique_names("controlled", self.controlled.as_slice())?;
        validate_unique_names("positive", self.positive.as_slice())?;

        for name in self.controlled.iter().filter(|n| self.log_variables.contains(*n)) {
            log::info!("'{name}' is both log-transformed and spread-controlled");
        }
        Ok(())
    }

    /// Expand role lists against `catalog`.
    ///
    /// A `"*"` entry in any role list expands to every retained name, in
    /// catalog order. Other names are passed through and checked by the
    /// components that consume them.
    pub fn resolve_roles(&self, catalog: &RetainedCatalog) -> ResolvedRoles {
        let expand = |names: &[String]| {
            if names.iter().any(|n| n == "*") { catalog.names() } else { names.to_vec() }
        };
        ResolvedRoles {
            log_variables: expand(&self.log_variables),
            controlled: expand(&self.controlled),
            positive: expand(&self.positive),
        }
    }
}
