//! The proposal kernel: which move to try next, and its Hastings ratio.
//!
//! Move probabilities depend on where the list sits between the shortest
//! legal list and the full pool, so the chain stays reversible at the
//! boundaries. The jump ratio returned with each move is the Hastings
//! correction for the asymmetry between a move and its reverse.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ruleset::RuleSet;

/// A structural edit of a rule list. The default rule is never targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Insert `rule_id` at `position`.
    Add { rule_id: usize, position: usize },
    /// Remove the rule at `position`.
    Delete { position: usize },
    /// Exchange positions `i` and `j`.
    Swap { i: usize, j: usize },
}

impl Move {
    /// First position at which the edited list diverges from the original;
    /// everything before it is shared and usable for the prefix bound.
    pub fn change_index(&self) -> usize {
        match *self {
            Move::Add { position, .. } => position,
            Move::Delete { position } => position,
            Move::Swap { i, j } => i.min(j),
        }
    }
}

/// A drawn move plus its Hastings correction.
#[derive(Debug, Clone, Copy)]
pub struct Proposal {
    pub mv: Move,
    pub jump_ratio: f64,
}

// Per-regime probabilities and jump-ratio bases, in (swap, add, delete)
// order. Regimes: list of length 1, length 2, one below the pool size, two
// below the pool size, interior.
const MOVE_PROBS: [[f64; 3]; 5] = [
    [0.0, 1.0, 0.0],
    [0.0, 0.5, 0.5],
    [0.5, 0.0, 0.5],
    [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
    [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
];
const JUMP_BASES: [[f64; 3]; 5] = [
    [0.0, 0.5, 0.0],
    [0.0, 2.0 / 3.0, 2.0],
    [1.0, 0.0, 2.0 / 3.0],
    [1.0, 1.5, 1.0],
    [1.0, 1.0, 1.0],
];

fn regime(m: usize, nrules: usize) -> usize {
    if m == 1 {
        0
    } else if m == 2 {
        1
    } else if m == nrules - 1 {
        2
    } else if m == nrules - 2 {
        3
    } else {
        4
    }
}

/// Draw a move for the current list from a pool of `nrules` rules.
pub fn propose_move<R: Rng>(rng: &mut R, rs: &RuleSet, nrules: usize) -> Proposal {
    let m = rs.n_rules();
    let r = regime(m, nrules);
    let [p_swap, mut p_add, p_delete] = MOVE_PROBS[r];
    let bases = JUMP_BASES[r];

    // With every rule already placed there is nothing to add; the mass
    // falls to the remaining moves.
    if m >= nrules {
        p_add = 0.0;
    }
    let total = p_swap + p_add + p_delete;
    debug_assert!(total > 0.0, "no legal move for m={} nrules={}", m, nrules);

    let u: f64 = rng.gen::<f64>() * total;
    if u < p_swap {
        let i = rng.gen_range(0..m - 1);
        let mut j = rng.gen_range(0..m - 1);
        while j == i {
            j = rng.gen_range(0..m - 1);
        }
        Proposal {
            mv: Move::Swap { i, j },
            jump_ratio: bases[0],
        }
    } else if u < p_swap + p_add {
        let unused: Vec<usize> = (1..nrules).filter(|&id| !rs.contains(id)).collect();
        let rule_id = *unused.choose(rng).expect("add drawn with an empty pool");
        let position = rng.gen_range(0..m);
        Proposal {
            mv: Move::Add { rule_id, position },
            jump_ratio: bases[1] * (nrules - 1 - m) as f64,
        }
    } else {
        let position = rng.gen_range(0..m - 1);
        Proposal {
            mv: Move::Delete { position },
            jump_ratio: bases[2] * (nrules - m) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;
    use crate::types::{Rule, DEFAULT_RULE_ID};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: usize) -> Vec<Rule> {
        let mut rules = vec![Rule::new(0, 1, BitVec::ones(6))];
        for id in 1..=n {
            let bits: Vec<bool> = (0..6).map(|s| (s + id) % 2 == 0).collect();
            rules.push(Rule::new(id, 1, BitVec::from_bools(&bits)));
        }
        rules
    }

    fn draw_many(rs: &RuleSet, nrules: usize, n: usize) -> Vec<Proposal> {
        let mut rng = StdRng::seed_from_u64(99);
        (0..n).map(|_| propose_move(&mut rng, rs, nrules)).collect()
    }

    #[test]
    fn test_change_index() {
        assert_eq!(Move::Add { rule_id: 3, position: 2 }.change_index(), 2);
        assert_eq!(Move::Delete { position: 1 }.change_index(), 1);
        assert_eq!(Move::Swap { i: 4, j: 1 }.change_index(), 1);
    }

    #[test]
    fn test_two_rule_list_never_swaps() {
        let rules = pool(6);
        let rs = RuleSet::restore(&[1, 0], &rules, 6);
        let proposals = draw_many(&rs, rules.len(), 200);
        assert!(proposals.iter().all(|p| !matches!(p.mv, Move::Swap { .. })));
        assert!(proposals.iter().any(|p| matches!(p.mv, Move::Add { .. })));
        assert!(proposals.iter().any(|p| matches!(p.mv, Move::Delete { .. })));
    }

    #[test]
    fn test_interior_regime_draws_all_kinds() {
        let rules = pool(8);
        let rs = RuleSet::restore(&[1, 2, 3, 0], &rules, 6);
        let proposals = draw_many(&rs, rules.len(), 300);
        assert!(proposals.iter().any(|p| matches!(p.mv, Move::Swap { .. })));
        assert!(proposals.iter().any(|p| matches!(p.mv, Move::Add { .. })));
        assert!(proposals.iter().any(|p| matches!(p.mv, Move::Delete { .. })));
    }

    #[test]
    fn test_moves_never_target_default() {
        let rules = pool(8);
        let rs = RuleSet::restore(&[1, 2, 3, 4, 0], &rules, 6);
        let m = rs.n_rules();
        for p in draw_many(&rs, rules.len(), 500) {
            match p.mv {
                Move::Swap { i, j } => {
                    assert!(i < m - 1 && j < m - 1 && i != j);
                }
                Move::Delete { position } => assert!(position < m - 1),
                Move::Add { rule_id, position } => {
                    assert_ne!(rule_id, DEFAULT_RULE_ID);
                    assert!(!rs.contains(rule_id));
                    assert!(position < m);
                }
            }
        }
    }

    #[test]
    fn test_jump_ratios_by_regime() {
        let rules = pool(8);
        // Interior regime: m = 4, nrules = 9.
        let rs = RuleSet::restore(&[1, 2, 3, 0], &rules, 6);
        for p in draw_many(&rs, rules.len(), 300) {
            match p.mv {
                Move::Swap { .. } => assert_eq!(p.jump_ratio, 1.0),
                Move::Add { .. } => assert_eq!(p.jump_ratio, (9 - 1 - 4) as f64),
                Move::Delete { .. } => assert_eq!(p.jump_ratio, (9 - 4) as f64),
            }
        }

        // Length-2 regime: add base 2/3, delete base 2.
        let rs = RuleSet::restore(&[1, 0], &rules, 6);
        for p in draw_many(&rs, rules.len(), 200) {
            match p.mv {
                Move::Add { .. } => assert_eq!(p.jump_ratio, 2.0 / 3.0 * (9 - 1 - 2) as f64),
                Move::Delete { .. } => assert_eq!(p.jump_ratio, 2.0 * (9 - 2) as f64),
                Move::Swap { .. } => unreachable!(),
            }
        }
    }

    #[test]
    fn test_full_pool_only_shrinks_or_shuffles() {
        let rules = pool(3);
        let rs = RuleSet::restore(&[1, 2, 3, 0], &rules, 6);
        let proposals = draw_many(&rs, rules.len(), 200);
        assert!(proposals.iter().all(|p| !matches!(p.mv, Move::Add { .. })));
    }
}
