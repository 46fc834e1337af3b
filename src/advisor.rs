//! Recommendation generator: turns a simulation summary into prioritized
//! advisories. Pure and deterministic; every threshold is injectable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::optimizer::summary::SimulationSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    /// Stable identifier of the rule that fired.
    pub code: String,
    pub message: String,
}

impl Recommendation {
    fn new(priority: Priority, code: &str, message: String) -> Self {
        Self {
            priority,
            code: code.to_string(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub defender_win_rate_floor: f64,
    /// Attacker cavalry share at or above which advice names cavalry.
    pub cavalry_share_alert: f64,
    pub draw_rate_ceiling: f64,
    pub attacker_loss_ratio_ceiling: f64,
    /// Average looted total per trial above which stored resources are flagged.
    pub loot_alert_total: f64,
    /// Spy defense percentage below which espionage exposure is flagged.
    pub spy_defense_floor: f64,
    pub attacker_win_rate_target: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            defender_win_rate_floor: 0.5,
            cavalry_share_alert: 0.5,
            draw_rate_ceiling: 0.3,
            attacker_loss_ratio_ceiling: 0.4,
            loot_alert_total: 1000.0,
            spy_defense_floor: 20.0,
            attacker_win_rate_target: 0.9,
        }
    }
}

impl RecommendationThresholds {
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("advisor.defender_win_rate_floor", self.defender_win_rate_floor),
            ("advisor.cavalry_share_alert", self.cavalry_share_alert),
            ("advisor.draw_rate_ceiling", self.draw_rate_ceiling),
            ("advisor.attacker_loss_ratio_ceiling", self.attacker_loss_ratio_ceiling),
            ("advisor.attacker_win_rate_target", self.attacker_win_rate_target),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::invalid_input(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !self.loot_alert_total.is_finite() || self.loot_alert_total < 0.0 {
            return Err(EngineError::invalid_input(format!(
                "advisor.loot_alert_total must be >= 0, got {}",
                self.loot_alert_total
            )));
        }
        if !(0.0..=100.0).contains(&self.spy_defense_floor) {
            return Err(EngineError::invalid_input(format!(
                "advisor.spy_defense_floor must be within [0, 100], got {}",
                self.spy_defense_floor
            )));
        }
        Ok(())
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Advisories for `summary`, highest priority first. Rules that fire at the
/// same priority keep their rule order.
pub fn recommend(
    summary: &SimulationSummary,
    thresholds: &RecommendationThresholds,
) -> Vec<Recommendation> {
    let mut advice = Vec::new();

    if summary.defender_win_rate < thresholds.defender_win_rate_floor {
        let message = if summary.attacker_cavalry_share >= thresholds.cavalry_share_alert {
            format!(
                "Strengthen defense: defenders hold only {} of battles against this \
                 cavalry-heavy attack; favour units with high cavalry defense.",
                percent(summary.defender_win_rate)
            )
        } else {
            format!(
                "Strengthen defense: defenders hold only {} of battles; add troops or \
                 raise the wall.",
                percent(summary.defender_win_rate)
            )
        };
        advice.push(Recommendation::new(
            Priority::High,
            "strengthen_defense",
            message,
        ));
    }

    if summary.draw_rate > thresholds.draw_rate_ceiling {
        advice.push(Recommendation::new(
            Priority::Medium,
            "battles_too_close",
            format!(
                "Battles are too close: {} end without a decisive winner.",
                percent(summary.draw_rate)
            ),
        ));
    }

    if summary.attacker_win_rate >= thresholds.attacker_win_rate_target
        && summary.attacker_loss_ratio > thresholds.attacker_loss_ratio_ceiling
    {
        advice.push(Recommendation::new(
            Priority::Medium,
            "costly_attack",
            format!(
                "Attack is costly: it wins {} of battles but loses {} of the army on average.",
                percent(summary.attacker_win_rate),
                percent(summary.attacker_loss_ratio)
            ),
        ));
    }

    let looted = summary.avg_loot_total();
    if looted > thresholds.loot_alert_total {
        advice.push(Recommendation::new(
            Priority::Medium,
            "resources_exposed",
            format!(
                "Resources exposed: attackers carry off {looted:.0} resources per battle on \
                 average; spend or hide stock."
            ),
        ));
    }

    if summary.spy_defense < thresholds.spy_defense_floor {
        advice.push(Recommendation::new(
            Priority::Low,
            "espionage_exposure",
            format!(
                "Espionage exposure: spy defense is {:.1}%, below the {:.1}% floor.",
                summary.spy_defense, thresholds.spy_defense_floor
            ),
        ));
    }

    // Defense and espionage advice concern the other side and do not suppress this.
    let attack_flagged = advice
        .iter()
        .any(|recommendation| recommendation.priority == Priority::Medium);
    if summary.attacker_win_rate >= thresholds.attacker_win_rate_target && !attack_flagged {
        advice.push(Recommendation::new(
            Priority::Low,
            "attack_reliable",
            format!(
                "Attack is reliable: it wins {} of battles at acceptable cost.",
                percent(summary.attacker_win_rate)
            ),
        ));
    }

    advice.sort_by_key(|recommendation| recommendation.priority);
    advice
}
