//! rulelist - Bayesian rule lists by stochastic search
//!
//! Learns an ordered list of pre-mined boolean rules, terminated by a
//! default rule, that models a binary label distribution. Training is a
//! stochastic search over orderings: Metropolis-Hastings MCMC chains (or
//! simulated annealing) propose structural edits and a Bayesian
//! log-posterior scores them.
//!
//! # Architecture
//!
//! ```text
//! Train -> ChainDriver (xN) -> ProposalKernel -> RuleSet -> Posterior -> Accept
//!   |            |                  |               |           |           |
//! theta     warm-start         add/delete/      capture     prior +     Metropolis
//! per rule  seeding gate       swap + jump      vectors     likelihood  or annealed
//!                              ratio                        + prefix
//!                                                           bound
//! ```
//!
//! The prefix bound is the searcher's pruning lever: an upper envelope on
//! the posterior of any completion of a proposal's unchanged prefix.
//! Proposals whose envelope cannot beat the best posterior already seen
//! are rejected before any acceptance randomness is spent.
//!
//! # Scope
//!
//! Rule mining, dataset loading, and held-out prediction live upstream and
//! downstream of this crate; it consumes rules as truth-table bitvectors
//! and produces an ordered list plus per-position predictive
//! probabilities.

pub mod bits;
pub mod posterior;
pub mod ruleset;
pub mod search;
pub mod train;
pub mod types;

// Re-export the public surface
pub use bits::BitVec;
pub use posterior::{BoundLength, Posterior, PosteriorEvaluator, PriorCache};
pub use ruleset::{CapturedRule, RuleSet};
pub use search::{
    run_annealing, run_mcmc, AcceptRule, ChainStats, CoolingSchedule, Move, Proposal,
    SearchContext, StepKind,
};
pub use train::{train, train_with_report, PredictionModel, SearchMethod, TrainReport};
pub use types::{Params, Rule, TrainData, DEFAULT_RULE_ID, MAX_CARDINALITY};
