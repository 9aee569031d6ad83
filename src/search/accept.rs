//! Acceptance rules shared by the MCMC and annealing drivers.

use rand::Rng;

/// How a proposed list is accepted or rejected.
///
/// Both variants first apply the hard pruning gate: a proposal whose
/// prefix bound cannot beat the best posterior already seen is rejected
/// before any randomness is spent.
#[derive(Debug, Clone, Copy)]
pub enum AcceptRule {
    /// Metropolis-Hastings: accept with probability
    /// `min(1, exp(delta) * jump_ratio)`.
    Metropolis { jump_ratio: f64 },
    /// Simulated annealing at a fixed temperature: uphill moves always
    /// pass, downhill moves pass with probability `exp(delta / T)`.
    Annealing { temperature: f64 },
}

impl AcceptRule {
    pub fn accepts<R: Rng>(
        &self,
        rng: &mut R,
        new_log_post: f64,
        old_log_post: f64,
        prefix_bound: f64,
        max_log_post: f64,
    ) -> bool {
        if !(prefix_bound > max_log_post) {
            return false;
        }
        let delta = new_log_post - old_log_post;
        match *self {
            AcceptRule::Metropolis { jump_ratio } => {
                rng.gen::<f64>().ln() < delta + jump_ratio.ln()
            }
            AcceptRule::Annealing { temperature } => {
                new_log_post > old_log_post || rng.gen::<f64>().ln() < delta / temperature
            }
        }
    }
}
