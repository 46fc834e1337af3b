use serde::{Deserialize, Serialize};

use crate::data::composition::Composition;
use crate::optimizer::summary::SimulationSummary;
use crate::optimizer::OptimizationSide;

/// One simulated candidate, keyed by its position in generation order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvaluation {
    pub candidate_index: usize,
    pub composition: Composition,
    pub summary: SimulationSummary,
}

/// Row of the ranking reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub candidate_index: usize,
    pub composition: Composition,
    pub win_rate: f64,
    pub draw_rate: f64,
    /// Average fraction of the optimized side's troops lost per trial.
    pub loss_ratio: f64,
    pub iterations: u32,
}

/// Highest win rate first; equal win rates keep the earliest generated candidate first.
pub fn rank_results(
    mut evaluations: Vec<CandidateEvaluation>,
    side: OptimizationSide,
) -> Vec<CandidateEvaluation> {
    evaluations.sort_by(|left, right| {
        side.win_rate(&right.summary)
            .total_cmp(&side.win_rate(&left.summary))
            .then_with(|| left.candidate_index.cmp(&right.candidate_index))
    });
    evaluations
}

/// The first `limit` ranked evaluations as report rows.
pub fn ranked_view(
    evaluations: &[CandidateEvaluation],
    side: OptimizationSide,
    limit: usize,
) -> Vec<RankedCandidate> {
    evaluations
        .iter()
        .take(limit)
        .enumerate()
        .map(|(position, evaluation)| RankedCandidate {
            rank: position + 1,
            candidate_index: evaluation.candidate_index,
            composition: evaluation.composition.clone(),
            win_rate: side.win_rate(&evaluation.summary),
            draw_rate: evaluation.summary.draw_rate,
            loss_ratio: side.loss_ratio(&evaluation.summary),
            iterations: evaluation.summary.iterations,
        })
        .collect()
}
