//! Simulated annealing over rule lists.
//!
//! The cooling schedule is piecewise-constant: stage `i` holds temperature
//! `1/(i+1)` for a plateau whose width grows as `exp(rate * (i+1))`, so
//! early stages explore at high temperature briefly while late stages
//! grind near-greedily for most of the run. Every timepoint runs a fixed
//! number of proposal steps.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::posterior::BoundLength;
use crate::ruleset::RuleSet;
use crate::search::chain::{SearchContext, StepKind};

/// A piecewise-constant cooling schedule with exponentially growing
/// plateaus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoolingSchedule {
    /// Number of temperature stages; the final plateau sits at
    /// `1 / stages`.
    pub stages: usize,
    /// Growth rate of the plateau widths.
    pub rate: f64,
    /// Proposal steps per timepoint.
    pub iters_per_step: usize,
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        Self {
            stages: 28,
            rate: 0.25,
            iters_per_step: 200,
        }
    }
}

impl CoolingSchedule {
    /// Expand the schedule into one temperature per integer timepoint.
    pub fn temperatures(&self) -> Vec<f64> {
        let mut temps = Vec::new();
        let mut tau_prev = 1.0f64;
        for i in 1..self.stages {
            let tau = tau_prev + (self.rate * (i as f64 + 1.0)).exp();
            let plateau = 1.0 / (i as f64 + 1.0);
            for _ in (tau_prev as usize)..(tau as usize) {
                temps.push(plateau);
            }
            tau_prev = tau;
        }
        temps
    }
}

/// Run simulated annealing and return the best list seen with its score.
///
/// Unlike the MCMC chain there is no warm-start gate: a single random
/// seed is drawn and the schedule does the rest.
pub fn run_annealing(
    ctx: &mut SearchContext<'_>,
    init_size: usize,
    schedule: &CoolingSchedule,
) -> Result<(RuleSet, f64)> {
    ctx.reset_stats();

    let mut rs = ctx.seed_random(init_size);
    let mut log_post = ctx
        .evaluate(&rs, BoundLength::Disabled)?
        .log_posterior;
    let mut max_log_posterior = log_post;
    let mut best_ids = rs.backup();

    for temperature in schedule.temperatures() {
        for _ in 0..schedule.iters_per_step {
            rs = ctx.propose_step(
                rs,
                &mut log_post,
                max_log_posterior,
                StepKind::Annealed { temperature },
            )?;
            if log_post > max_log_posterior {
                max_log_posterior = log_post;
                best_ids = rs.backup();
            }
        }
    }

    let best = RuleSet::restore(&best_ids, &ctx.data().rules, ctx.data().nsamples);
    Ok((best, max_log_posterior))
}
