//! Order search over (p, q) for a fixed differencing order.
//!
//! The stepwise strategy hill-climbs from `(start_p, d, start_q)` over the
//! `p +/- 1` and `q +/- 1` neighbours of the current best, evaluating each
//! batch of untried neighbours and moving only on a strict improvement. The
//! exhaustive strategy evaluates the whole bounded grid in one batch.
//!
//! Candidates that fail to estimate or whose optimizer did not converge are
//! recorded and skipped. The search state is a plain value threaded through
//! each step, and every batch is merged in order, so parallel and sequential
//! evaluation select the same model.

use crate::config::{AutoArimaConfig, SearchStrategy};
use crate::error::{ArimaError, EstimationError, Result};
use crate::estimator::CandidateFit;
use crate::models::ModelOrder;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A candidate that can be ranked by the search
pub trait Scored {
    /// Order of the candidate
    fn order(&self) -> ModelOrder;

    /// Information criterion value, lower is better
    fn score(&self) -> f64;

    /// Whether the estimate converged. Unconverged candidates never win.
    fn converged(&self) -> bool {
        true
    }
}

impl Scored for CandidateFit {
    fn order(&self) -> ModelOrder {
        self.order
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn converged(&self) -> bool {
        self.converged
    }
}

/// What happened to one evaluated order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOutcome {
    /// Estimated with this criterion score
    Scored(f64),
    /// Skipped after an estimation failure
    Failed(String),
}

/// One entry of the search trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRecord {
    pub order: ModelOrder,
    pub outcome: SearchOutcome,
}

/// Best-so-far state of a search
#[derive(Debug, Clone)]
pub struct SearchState<F> {
    /// Best candidate found so far
    pub best: Option<F>,
    /// Orders already evaluated
    pub tried: BTreeSet<ModelOrder>,
    /// Evaluations in the order they were merged
    pub trace: Vec<SearchRecord>,
}

impl<F> Default for SearchState<F> {
    fn default() -> Self {
        Self {
            best: None,
            tried: BTreeSet::new(),
            trace: Vec::new(),
        }
    }
}

impl<F: Scored> SearchState<F> {
    /// Number of candidates evaluated
    pub fn evaluations(&self) -> usize {
        self.trace.len()
    }

    /// Merge a batch of evaluations, returning the updated state
    fn absorb(
        mut self,
        mut batch: Vec<(ModelOrder, std::result::Result<F, EstimationError>)>,
        tie_epsilon: f64,
    ) -> Self {
        batch.sort_by_key(|(order, _)| *order);

        for (order, result) in batch {
            self.tried.insert(order);
            let outcome = match result {
                Ok(candidate) if !candidate.converged() => {
                    let message = format!(
                        "optimizer did not converge (criterion score {:.4})",
                        candidate.score()
                    );
                    warn!(%order, reason = %message, "candidate skipped");
                    SearchOutcome::Failed(message)
                }
                Ok(candidate) if candidate.score().is_finite() => {
                    let score = candidate.score();
                    debug!(%order, score, "candidate evaluated");
                    let improves = self
                        .best
                        .as_ref()
                        .map_or(true, |best| compare(&candidate, best, tie_epsilon).is_lt());
                    if improves {
                        self.best = Some(candidate);
                    }
                    SearchOutcome::Scored(score)
                }
                Ok(candidate) => {
                    let message = format!("non-finite criterion score {}", candidate.score());
                    warn!(%order, reason = %message, "candidate skipped");
                    SearchOutcome::Failed(message)
                }
                Err(err) => {
                    warn!(%order, error = %err, "candidate skipped");
                    SearchOutcome::Failed(err.to_string())
                }
            };
            self.trace.push(SearchRecord { order, outcome });
        }

        self
    }
}

/// Rank two candidates. Scores within `tie_epsilon` of each other are
/// ordered by `p + q`, then `p`, then `q`.
pub fn compare<A: Scored, B: Scored>(a: &A, b: &B, tie_epsilon: f64) -> Ordering {
    let (sa, sb) = (a.score(), b.score());
    if (sa - sb).abs() <= tie_epsilon {
        complexity_key(a.order()).cmp(&complexity_key(b.order()))
    } else {
        sa.total_cmp(&sb)
    }
}

fn complexity_key(order: ModelOrder) -> (usize, usize, usize) {
    (order.arma_terms(), order.p, order.q)
}

/// Final outcome of a search
#[derive(Debug, Clone)]
pub struct SearchResult<F> {
    /// Selected candidate
    pub best: F,
    /// Every evaluation, in merge order
    pub trace: Vec<SearchRecord>,
}

/// Search the configured (p, q) bounds at differencing order `d`.
///
/// `evaluate` estimates one order. It must be a pure function of the order
/// for the parallel and sequential paths to agree.
pub fn search<F, E>(d: usize, config: &AutoArimaConfig, evaluate: E) -> Result<SearchResult<F>>
where
    F: Scored + Send,
    E: Fn(ModelOrder) -> std::result::Result<F, EstimationError> + Sync,
{
    let run_batch = |state: SearchState<F>, batch: Vec<ModelOrder>| -> SearchState<F> {
        let results: Vec<_> = if config.parallel {
            batch
                .into_par_iter()
                .map(|order| (order, evaluate(order)))
                .collect()
        } else {
            batch
                .into_iter()
                .map(|order| (order, evaluate(order)))
                .collect()
        };
        state.absorb(results, config.tie_epsilon)
    };

    let state = match config.strategy {
        SearchStrategy::Exhaustive => {
            let grid = (config.start_p..=config.max_p)
                .flat_map(|p| {
                    (config.start_q..=config.max_q).map(move |q| ModelOrder::new(p, d, q))
                })
                .collect();
            run_batch(SearchState::default(), grid)
        }
        SearchStrategy::Stepwise => {
            let start = ModelOrder::new(config.start_p, d, config.start_q);
            let mut state = run_batch(SearchState::default(), vec![start]);

            loop {
                let budget = config.max_evaluations.saturating_sub(state.evaluations());
                if budget == 0 {
                    debug!("evaluation budget spent");
                    break;
                }

                let center = match &state.best {
                    Some(best) => Some(best.order()),
                    None => frontier(&state.tried, config),
                };
                let Some(center) = center else {
                    break;
                };

                let batch: Vec<ModelOrder> = neighbours(center, config)
                    .into_iter()
                    .filter(|order| !state.tried.contains(order))
                    .take(budget)
                    .collect();
                if batch.is_empty() {
                    break;
                }

                let previous = state.best.as_ref().map(|best| best.order());
                state = run_batch(state, batch);
                let current = state.best.as_ref().map(|best| best.order());

                if previous.is_some() && previous == current {
                    break;
                }
            }

            state
        }
    };

    let SearchState { best, trace, .. } = state;
    match best {
        Some(best) => {
            debug!(order = %best.order(), evaluations = trace.len(), "search finished");
            Ok(SearchResult { best, trace })
        }
        None => Err(ArimaError::NoViableModel {
            d,
            start_p: config.start_p,
            max_p: config.max_p,
            start_q: config.start_q,
            max_q: config.max_q,
            attempted: trace.len(),
        }),
    }
}

/// `p +/- 1` and `q +/- 1` orders inside the bounds, sorted
fn neighbours(center: ModelOrder, config: &AutoArimaConfig) -> Vec<ModelOrder> {
    let ModelOrder { p, d, q } = center;
    let mut out = Vec::with_capacity(4);
    if p > config.start_p {
        out.push(ModelOrder::new(p - 1, d, q));
    }
    if p < config.max_p {
        out.push(ModelOrder::new(p + 1, d, q));
    }
    if q > config.start_q {
        out.push(ModelOrder::new(p, d, q - 1));
    }
    if q < config.max_q {
        out.push(ModelOrder::new(p, d, q + 1));
    }
    out.sort();
    out
}

/// Lowest tried order that still has untried neighbours
fn frontier(tried: &BTreeSet<ModelOrder>, config: &AutoArimaConfig) -> Option<ModelOrder> {
    tried.iter().copied().find(|order| {
        neighbours(*order, config)
            .iter()
            .any(|n| !tried.contains(n))
    })
}
