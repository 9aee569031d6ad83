//! Stochastic search over ordered rule lists.
//!
//! Both samplers share one proposal machinery:
//!
//! ```text
//! ProposalKernel -> RuleSet mutation -> PosteriorEvaluator -> AcceptRule
//!      draw a          clone + apply       score + prefix       gate +
//!      move and        the move            bound at the         accept
//!      jump ratio                          change index         test
//! ```
//!
//! The MCMC driver wraps the step with Metropolis acceptance and a
//! warm-start seeding gate; the simulated-annealing driver wraps the same
//! step with a cooling schedule. Both track the best list seen as a bare
//! id backup and re-materialize it when the run ends.

pub mod accept;
pub mod annealing;
pub mod chain;
pub mod proposal;

pub use accept::AcceptRule;
pub use annealing::{run_annealing, CoolingSchedule};
pub use chain::{run_mcmc, ChainStats, SearchContext, StepKind};
pub use proposal::{propose_move, Move, Proposal};
