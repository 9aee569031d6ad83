//! Log-posterior scoring of rule lists, with a prefix upper bound.
//!
//! The posterior of an ordered rule list factors into a structural prior
//! and a Beta-Bernoulli likelihood:
//!
//! ```text
//! log P(d | data) = log P(len)                        Poisson(lambda)
//!                 + sum over non-default positions    truncated Poisson(eta)
//!                     of the cardinality factor         over cardinalities
//!                                                       still in the pool
//!                 + sum over all positions            Beta(alpha) marginal
//!                     of log B(n0 + a0, n1 + a1)        of the captured
//!                                                       class counts
//! ```
//!
//! The cardinality prior is *consuming*: each placed rule removes one rule
//! of its cardinality from the pool, and when a cardinality class empties
//! the truncated-Poisson normalizer is re-normalized over the classes that
//! remain. This makes the prior of a list depend on what the miner
//! produced, not just on the list itself.
//!
//! ## Prefix bound
//!
//! Alongside the exact score, `evaluate` produces an upper envelope on the
//! posterior of *any* completion of the first `length4bound + 1` positions:
//! the length factor is taken at the more probable of the current length
//! and the prior mean, per-position likelihoods use the flat (alpha = 1)
//! Beta marginal, and the samples not yet captured by the prefix contribute
//! the best split any suffix could achieve. Drivers prune proposals whose
//! bound cannot beat the best posterior already seen.

use anyhow::{ensure, Result};

use crate::ruleset::RuleSet;
use crate::types::{Params, Rule, TrainData, MAX_CARDINALITY};

/// Guard for the re-normalized truncated-Poisson mass; below this the
/// cardinality support is considered exhausted.
const EPSILON: f64 = 1e-9;

/// Natural log of the Poisson probability mass function.
pub fn log_poisson_pmf(k: usize, mu: f64) -> f64 {
    k as f64 * mu.ln() - mu - libm::lgamma(k as f64 + 1.0)
}

/// Poisson CDF over the small truncated support, by direct summation.
pub fn poisson_cdf(k: usize, mu: f64) -> f64 {
    (0..=k).map(|i| log_poisson_pmf(i, mu).exp()).sum()
}

/// log B(a, b), the log-Beta function.
fn log_beta(a: f64, b: f64) -> f64 {
    libm::lgamma(a) + libm::lgamma(b) - libm::lgamma(a + b)
}

/// Precomputed log-PMF tables for the structural prior.
///
/// Rebuilt per evaluator, so a new run with different `(nrules, lambda,
/// eta)` never sees stale tables.
#[derive(Debug, Clone)]
pub struct PriorCache {
    /// `log Poisson(k; lambda)` for `k in [0, nrules)`.
    log_lambda_pmf: Vec<f64>,
    /// `log Poisson(c; eta)` for `c in [0, MAX_CARDINALITY]`.
    log_eta_pmf: [f64; MAX_CARDINALITY + 1],
    /// `PoissonCDF(MAX_CARDINALITY; eta) - PoissonPMF(0; eta)`: total mass
    /// of the truncated cardinality prior, assuming every cardinality in
    /// `[1, MAX_CARDINALITY]` is representable.
    eta_norm: f64,
}

impl PriorCache {
    pub fn new(nrules: usize, lambda: f64, eta: f64) -> Self {
        let log_lambda_pmf = (0..nrules).map(|k| log_poisson_pmf(k, lambda)).collect();
        let mut log_eta_pmf = [0.0; MAX_CARDINALITY + 1];
        for (c, slot) in log_eta_pmf.iter_mut().enumerate() {
            *slot = log_poisson_pmf(c, eta);
        }
        let eta_norm = poisson_cdf(MAX_CARDINALITY, eta) - log_poisson_pmf(0, eta).exp();
        Self {
            log_lambda_pmf,
            log_eta_pmf,
            eta_norm,
        }
    }
}

/// How much of the list the prefix bound should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundLength {
    /// No bound requested; `prefix_bound` carries only the length factor.
    Disabled,
    /// Positions `[0, i]` are the shared prefix.
    Prefix(usize),
}

impl BoundLength {
    fn covers(self, j: usize) -> bool {
        match self {
            BoundLength::Disabled => false,
            BoundLength::Prefix(i) => j <= i,
        }
    }

    fn is_last(self, j: usize) -> bool {
        matches!(self, BoundLength::Prefix(i) if i == j)
    }
}

/// An evaluated rule list: its exact score and the prefix envelope.
#[derive(Debug, Clone, Copy)]
pub struct Posterior {
    pub log_posterior: f64,
    pub prefix_bound: f64,
}

/// Scores rule lists against one dataset and parameter setting.
pub struct PosteriorEvaluator<'a> {
    rules: &'a [Rule],
    labels: &'a [Rule; 2],
    alpha: [f64; 2],
    lambda: f64,
    prior: PriorCache,
    /// Rules per cardinality across the whole pool; cloned and consumed
    /// during each evaluation.
    card_count: Vec<usize>,
}

impl<'a> PosteriorEvaluator<'a> {
    pub fn new(data: &'a TrainData, params: &Params) -> Self {
        let mut card_count = vec![0usize; MAX_CARDINALITY + 1];
        for rule in &data.rules {
            card_count[rule.cardinality] += 1;
        }
        Self {
            rules: &data.rules,
            labels: &data.labels,
            alpha: params.alpha,
            lambda: params.lambda,
            prior: PriorCache::new(data.rules.len(), params.lambda, params.eta),
            card_count,
        }
    }

    /// Compute the log-posterior of `rs` and the upper envelope over
    /// completions of its prefix.
    pub fn evaluate(&self, rs: &RuleSet, bound: BoundLength) -> Result<Posterior> {
        let m = rs.n_rules();
        debug_assert!(m >= 1 && m <= self.rules.len());

        // Structural prior: length factor, then one consuming cardinality
        // factor per non-default position.
        let mut card_count = self.card_count.clone();
        let mut norm_constant = self.prior.eta_norm;
        let mut log_prior = self.prior.log_lambda_pmf[m - 1];

        // The envelope's length factor: a completion can still grow toward
        // the prior mean, so take the PMF at whichever of (current length,
        // prior mean) is more probable. Clamped to the table.
        let bound_len = (m - 1).max(self.lambda as usize).min(self.rules.len() - 1);
        let mut prefix_prior = self.prior.log_lambda_pmf[bound_len];

        for i in 0..m - 1 {
            let c = self.rules[rs.entry(i).rule_id].cardinality;
            ensure!(
                norm_constant > EPSILON,
                "truncated cardinality prior has no remaining support at position {}",
                i
            );
            let factor =
                self.prior.log_eta_pmf[c] - norm_constant.ln() - (card_count[c] as f64).ln();
            log_prior += factor;
            if bound.covers(i) {
                prefix_prior += factor;
            }
            card_count[c] -= 1;
            if card_count[c] == 0 {
                norm_constant -= self.prior.log_eta_pmf[c].exp();
            }
        }

        // Beta-Bernoulli likelihood over the captured class counts, plus
        // the flat-prior prefix terms and the uncaptured-mass residual.
        let mut log_likelihood = 0.0;
        let mut prefix_log_likelihood = 0.0;
        let mut left0 = self.labels[0].support;
        let mut left1 = self.labels[1].support;

        for j in 0..m {
            let entry = rs.entry(j);
            let n0 = entry.captures.and_count(&self.labels[0].truthtable);
            let n1 = entry.ncaptured - n0;
            log_likelihood += log_beta(n0 as f64 + self.alpha[0], n1 as f64 + self.alpha[1]);

            left0 -= n0;
            left1 -= n1;
            if bound.covers(j) {
                prefix_log_likelihood += log_beta(n0 as f64 + 1.0, n1 as f64 + 1.0);
                if bound.is_last(j) {
                    // Best achievable over the samples the prefix leaves
                    // uncaptured: a pure-class split of the remainder.
                    prefix_log_likelihood += libm::lgamma(left0 as f64 + 1.0)
                        - libm::lgamma(left0 as f64 + 2.0)
                        + libm::lgamma(left1 as f64 + 1.0)
                        - libm::lgamma(left1 as f64 + 2.0);
                }
            }
        }

        Ok(Posterior {
            log_posterior: log_prior + log_likelihood,
            prefix_bound: prefix_prior + prefix_log_likelihood,
        })
    }
}
