//! Tiered evaluation: the scouting pass runs every candidate with
//! `iterations_per_trial`, then the short list is re-simulated with
//! `confirmation_iterations` and re-ranked before a winner is picked.

use tracing::debug;

use crate::combat::rng::RandomSource;
use crate::error::EngineResult;
use crate::optimizer::ranking::{rank_results, CandidateEvaluation};
use crate::optimizer::{OptimizationRequest, Optimizer};

/// Re-simulate the first `confirm_top` entries of `ranked` and re-rank them
/// with the usual rule. Confirmed entries replace their scouting summaries and
/// stay ahead of the unconfirmed tail.
pub fn confirm_top<R>(
    optimizer: &Optimizer,
    request: &OptimizationRequest,
    mut ranked: Vec<CandidateEvaluation>,
    rng: &mut R,
) -> EngineResult<Vec<CandidateEvaluation>>
where
    R: RandomSource + Send,
{
    let config = optimizer.config();
    let top = config.confirm_top.min(ranked.len());
    if top == 0 {
        return Ok(ranked);
    }
    debug!(
        top,
        iterations = config.confirmation_iterations,
        "confirming short list"
    );

    let tail = ranked.split_off(top);
    let work: Vec<_> = ranked
        .into_iter()
        .map(|evaluation| {
            (
                evaluation.candidate_index,
                evaluation.composition,
                rng.fork(),
            )
        })
        .collect();
    let confirmed =
        optimizer.evaluate_candidates(request, work, config.confirmation_iterations)?;

    let mut ranked = rank_results(confirmed, request.side);
    ranked.extend(tail);
    Ok(ranked)
}
