//! Multi-chain training and the fitted model.
//!
//! `train` runs `nchain` sequential searches and keeps the single best
//! list. The first chain seeds freely; every later chain must seed at a
//! list whose prefix bound reaches the best posterior found so far, so
//! the later chains only spend iterations where the bound says an
//! improvement is still possible.
//!
//! The fitted model carries, per list position, the Beta posterior mean
//! `theta[j] = (n1 + a1) / (n0 + n1 + a0 + a1)` of the class-1 probability
//! among the samples captured there; callers predict class 1 at positions
//! where `theta[j] >= params.threshold`.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::posterior::BoundLength;
use crate::ruleset::RuleSet;
use crate::search::annealing::{run_annealing, CoolingSchedule};
use crate::search::chain::{run_mcmc, ChainStats, SearchContext};
use crate::types::{Params, Rule, TrainData};

/// Which sampler drives the chains.
#[derive(Debug, Clone)]
pub enum SearchMethod {
    /// Metropolis-Hastings with warm-started chains.
    Mcmc,
    /// Simulated annealing under the given cooling schedule.
    Annealing(CoolingSchedule),
}

/// A fitted rule list with its per-position predictive probabilities.
#[derive(Debug, Clone)]
pub struct PredictionModel {
    pub rule_set: RuleSet,
    /// Beta posterior mean of the class-1 probability per position.
    pub theta: Vec<f64>,
    pub log_posterior: f64,
}

/// Per-chain diagnostics for one training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainReport {
    /// Move counters of each chain, in run order.
    pub chains: Vec<ChainStats>,
    /// Final log-posterior of each chain's best list.
    pub chain_scores: Vec<f64>,
    /// Index of the chain that produced the returned model.
    pub winner: usize,
}

impl TrainReport {
    /// Human-readable run summary; the library never prints on its own.
    pub fn print_summary(&self) {
        println!("\n=== Training chains ===\n");
        for (i, (stats, score)) in self.chains.iter().zip(&self.chain_scores).enumerate() {
            let marker = if i == self.winner { " <- best" } else { "" };
            println!(
                "chain {:>2}: log_posterior {:>12.4}  add {:>5}  delete {:>5}  swap {:>5}  bound-rejects {:>6}{}",
                i, score, stats.n_add, stats.n_delete, stats.n_swap, stats.n_bound_rejects, marker
            );
        }
    }
}

/// Train a rule list and return only the model.
pub fn train(data: &TrainData, method: SearchMethod, params: &Params) -> Result<PredictionModel> {
    train_with_report(data, method, params).map(|(model, _)| model)
}

/// Train a rule list, also returning per-chain diagnostics.
pub fn train_with_report(
    data: &TrainData,
    method: SearchMethod,
    params: &Params,
) -> Result<(PredictionModel, TrainReport)> {
    params.validate(data.nrules())?;

    let mut ctx = SearchContext::new(data, params);
    let mut report = TrainReport::default();

    // The first chain seeds freely; its result anchors the warm-start
    // threshold for every later chain.
    let (mut best_rs, mut best_score) =
        run_chain(&mut ctx, &method, params, f64::NEG_INFINITY)?;
    report.chains.push(*ctx.stats());
    report.chain_scores.push(best_score);

    for chain in 1..params.nchain {
        let (rs, score) = run_chain(&mut ctx, &method, params, best_score)?;
        report.chains.push(*ctx.stats());
        report.chain_scores.push(score);
        if score >= best_score {
            report.winner = chain;
            best_rs = rs;
            best_score = score;
        }
    }

    let theta = compute_theta(&best_rs, &data.labels, params.alpha);
    Ok((
        PredictionModel {
            rule_set: best_rs,
            theta,
            log_posterior: best_score,
        },
        report,
    ))
}

/// Run one chain under the chosen sampler and rescore its best list with
/// the bound disabled.
fn run_chain(
    ctx: &mut SearchContext<'_>,
    method: &SearchMethod,
    params: &Params,
    v_star: f64,
) -> Result<(RuleSet, f64)> {
    let (rs, _) = match method {
        SearchMethod::Mcmc => run_mcmc(ctx, params.iters, params.init_size, v_star)?,
        SearchMethod::Annealing(schedule) => run_annealing(ctx, params.init_size, schedule)?,
    };
    let score = ctx.evaluate(&rs, BoundLength::Disabled)?.log_posterior;
    Ok((rs, score))
}

/// Beta posterior mean of the class-1 probability at every list position.
fn compute_theta(rs: &RuleSet, labels: &[Rule; 2], alpha: [f64; 2]) -> Vec<f64> {
    rs.entries()
        .iter()
        .map(|entry| {
            let n0 = entry.captures.and_count(&labels[0].truthtable) as f64;
            let n1 = entry.ncaptured as f64 - n0;
            (n1 + alpha[1]) / (n0 + n1 + alpha[0] + alpha[1])
        })
        .collect()
}
