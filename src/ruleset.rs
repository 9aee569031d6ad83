//! Ordered rule lists with per-position capture vectors.
//!
//! A `RuleSet` is an ordered sequence of rules ending in the default rule.
//! Each position carries a `captures` bitvector: the samples that fire on
//! the rule at that position and on no earlier rule. The capture vectors
//! are therefore pairwise disjoint and their union is the full sample set;
//! the default rule's all-ones truth-table makes the last position absorb
//! whatever is left.
//!
//! Mutations (`add`, `delete`, `swap_any`) re-derive the capture vectors of
//! every position at and after the change point. Positions before it keep
//! their vectors untouched, which is what lets the posterior's prefix bound
//! reuse the shared prefix.
//!
//! A set is backed up as its bare rule-id list (`backup`) and rebuilt from
//! one (`restore`): chains keep only ids for their best-so-far list and
//! re-materialize it at the end.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::bits::BitVec;
use crate::types::{Rule, DEFAULT_RULE_ID};

/// One position of a rule list: a rule id plus the samples it captures
/// there.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRule {
    pub rule_id: usize,
    pub captures: BitVec,
    pub ncaptured: usize,
}

/// An ordered rule list terminated by the default rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    entries: Vec<CapturedRule>,
    nsamples: usize,
}

impl RuleSet {
    /// Seed a list with `init_size` distinct non-default rules in random
    /// order, followed by the default rule.
    pub fn create_random<R: Rng>(init_size: usize, rules: &[Rule], rng: &mut R) -> Self {
        debug_assert!(init_size >= 1 && init_size <= rules.len() - 1);
        let mut ids: Vec<usize> = (1..rules.len()).collect();
        ids.shuffle(rng);
        ids.truncate(init_size);
        ids.push(DEFAULT_RULE_ID);
        Self::restore(&ids, rules, rules[DEFAULT_RULE_ID].truthtable.len())
    }

    /// Rebuild a list from a backed-up id sequence (default rule last).
    pub fn restore(ids: &[usize], rules: &[Rule], nsamples: usize) -> Self {
        let entries = ids
            .iter()
            .map(|&rule_id| CapturedRule {
                rule_id,
                captures: BitVec::zeros(nsamples),
                ncaptured: 0,
            })
            .collect();
        let mut rs = Self { entries, nsamples };
        rs.recompute_from(0, rules);
        rs
    }

    /// The bare id sequence, suitable for `restore`.
    pub fn backup(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.rule_id).collect()
    }

    /// List length, default rule included.
    pub fn n_rules(&self) -> usize {
        self.entries.len()
    }

    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    pub fn entries(&self) -> &[CapturedRule] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> &CapturedRule {
        &self.entries[position]
    }

    /// Is the rule id anywhere in the list?
    pub fn contains(&self, rule_id: usize) -> bool {
        self.entries.iter().any(|e| e.rule_id == rule_id)
    }

    /// Insert a rule at `position` in `[0, n_rules - 1]`. The default rule
    /// cannot be displaced past the end; inserting at `n_rules - 1` places
    /// the rule directly before it.
    pub fn add(&mut self, rule_id: usize, position: usize, rules: &[Rule]) {
        debug_assert!(position < self.entries.len());
        debug_assert!(rule_id != DEFAULT_RULE_ID && !self.contains(rule_id));
        self.entries.insert(
            position,
            CapturedRule {
                rule_id,
                captures: BitVec::zeros(self.nsamples),
                ncaptured: 0,
            },
        );
        self.recompute_from(position, rules);
    }

    /// Remove the non-default rule at `position`.
    pub fn delete(&mut self, position: usize, rules: &[Rule]) {
        debug_assert!(position < self.entries.len() - 1, "cannot delete the default rule");
        self.entries.remove(position);
        self.recompute_from(position, rules);
    }

    /// Exchange two non-default positions.
    pub fn swap_any(&mut self, i: usize, j: usize, rules: &[Rule]) {
        debug_assert!(i != j);
        debug_assert!(i < self.entries.len() - 1 && j < self.entries.len() - 1);
        self.entries.swap(i, j);
        self.recompute_from(i.min(j), rules);
    }

    /// Re-derive capture vectors for positions `from..`, leaving earlier
    /// positions untouched.
    fn recompute_from(&mut self, from: usize, rules: &[Rule]) {
        let mut taken = BitVec::zeros(self.nsamples);
        for entry in &self.entries[..from] {
            taken.union_with(&entry.captures);
        }
        for entry in &mut self.entries[from..] {
            let truthtable = &rules[entry.rule_id].truthtable;
            entry.captures = truthtable.and_not(&taken);
            entry.ncaptured = entry.captures.count_ones();
            taken.union_with(&entry.captures);
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.rule_id == DEFAULT_RULE_ID {
                writeln!(
                    f,
                    "{:>3}: default captures {}/{}",
                    position, entry.ncaptured, self.nsamples
                )?;
            } else {
                writeln!(
                    f,
                    "{:>3}: rule {} captures {}/{}",
                    position, entry.rule_id, entry.ncaptured, self.nsamples
                )?;
            }
        }
        Ok(())
    }
}
