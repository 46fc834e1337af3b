//! Diagnostic validation of scenario files. Unlike the engine, which stops at
//! the first bad input, this collects every problem so a user can fix a file
//! in one pass.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::combat::defense::{compute_defense, DefenseConfig};
use crate::data::composition::Composition;
use crate::data::scenario::ScenarioFile;
use crate::data::unit::{UnitCatalog, UnitDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

pub fn validate_scenario(scenario: &ScenarioFile, defense: &DefenseConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if scenario.units.is_empty() {
        report.push(ValidationSeverity::Error, "units", "unit catalog is empty");
    }
    let mut seen = HashSet::new();
    for unit in &scenario.units {
        let context = format!("units.{}", unit.id);
        if !seen.insert(&unit.id) {
            report.push(ValidationSeverity::Error, &context, "duplicate unit id");
        }
        if !unit.stats.speed.is_finite() || unit.stats.speed < 0.0 {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("speed must be a finite value >= 0, got {}", unit.stats.speed),
            );
        } else if unit.stats.speed == 0.0 {
            report.push(ValidationSeverity::Warning, &context, "unit cannot move (speed 0)");
        }
        if unit.stats.attack == 0
            && unit.stats.defense_infantry == 0
            && unit.stats.defense_cavalry == 0
        {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "unit has no attack and no defense",
            );
        }
    }

    let catalog = UnitCatalog::new(scenario.units.iter().cloned()).ok();
    for (side, composition) in [("attacker", &scenario.attacker), ("defender", &scenario.defender)] {
        check_composition(&mut report, side, composition, &scenario.units, catalog.as_ref());
    }
    if scenario.attacker.total_troops() == 0 && scenario.defender.total_troops() == 0 {
        report.push(
            ValidationSeverity::Warning,
            "battle",
            "both armies are empty; every trial is a draw",
        );
    }

    match compute_defense(&scenario.fortification, defense) {
        Ok(snapshot) => report.push(
            ValidationSeverity::Info,
            "fortification",
            format!(
                "defensive bonus {:.4}, flat defense {:.1}, spy defense {:.1}%",
                snapshot.defensive_bonus, snapshot.flat_defense, snapshot.spy_defense
            ),
        ),
        Err(err) => report.push(ValidationSeverity::Error, "fortification", err.to_string()),
    }

    if scenario.defender_resources.is_empty() {
        report.push(
            ValidationSeverity::Info,
            "defender_resources",
            "no stored resources; loot will always be zero",
        );
    }

    report
}

fn check_composition(
    report: &mut ValidationReport,
    side: &str,
    composition: &Composition,
    units: &[UnitDefinition],
    catalog: Option<&UnitCatalog>,
) {
    for entry in composition.entries() {
        let context = format!("{side}.{}", entry.unit_type);
        if !units.iter().any(|unit| unit.id == entry.unit_type) {
            report.push(ValidationSeverity::Error, &context, "unknown unit type");
        } else if entry.count == 0 {
            report.push(ValidationSeverity::Info, &context, "entry has zero troops");
        }
    }
    if let Some(catalog) = catalog {
        if let Ok(Some(speed)) = composition.march_speed(catalog) {
            report.push(
                ValidationSeverity::Info,
                side,
                format!(
                    "{} troops, march speed {speed:.1}",
                    composition.total_troops()
                ),
            );
        }
    }
}
