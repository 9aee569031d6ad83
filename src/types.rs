//! Core types for rulelist - rules, training data, and search parameters.
//!
//! The trainer consumes pre-mined rules: each rule is a boolean predicate
//! over the samples, materialized as a truth-table bitvector by an upstream
//! miner. Rule 0 is special: it is the *default rule*, fires on every
//! sample, and always terminates a rule list. Class membership arrives the
//! same way, as two complementary indicator "rules" (`labels[0]` for class
//! 0, `labels[1]` for class 1).

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::bits::BitVec;

/// Largest rule cardinality (number of conjoined attributes) the
/// cardinality prior is truncated to.
pub const MAX_CARDINALITY: usize = 10;

/// Index of the default rule in the input pool.
pub const DEFAULT_RULE_ID: usize = 0;

/// A pre-mined boolean predicate over the samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Index of this rule in the input pool.
    pub id: usize,
    /// Number of attributes conjoined in the predicate.
    pub cardinality: usize,
    /// One bit per sample: does the predicate fire on it?
    pub truthtable: BitVec,
    /// Popcount of the truth-table.
    pub support: usize,
}

impl Rule {
    /// Build a rule; the support is derived from the truth-table.
    pub fn new(id: usize, cardinality: usize, truthtable: BitVec) -> Self {
        let support = truthtable.count_ones();
        Self {
            id,
            cardinality,
            truthtable,
            support,
        }
    }
}

/// A mined rule pool plus class labels, validated and ready to train on.
#[derive(Debug, Clone)]
pub struct TrainData {
    /// The rule pool. `rules[0]` is the all-ones default rule.
    pub rules: Vec<Rule>,
    /// Class indicator bitvectors: `labels[0]` marks class-0 samples,
    /// `labels[1]` class-1 samples.
    pub labels: [Rule; 2],
    /// Number of samples every truth-table covers.
    pub nsamples: usize,
}

impl TrainData {
    /// Validate and assemble training data.
    ///
    /// Checks the structural assumptions the search relies on: a default
    /// rule at index 0 firing everywhere, uniform truth-table lengths,
    /// cardinalities inside the truncated prior's support, and labels that
    /// partition the sample set.
    pub fn new(rules: Vec<Rule>, labels: [Rule; 2], nsamples: usize) -> Result<Self> {
        ensure!(nsamples > 0, "dataset has no samples");
        ensure!(
            rules.len() >= 2,
            "rule pool needs the default rule plus at least one mined rule, got {}",
            rules.len()
        );

        for (i, rule) in rules.iter().enumerate() {
            ensure!(
                rule.truthtable.len() == nsamples,
                "rule {} truth-table covers {} samples, expected {}",
                i,
                rule.truthtable.len(),
                nsamples
            );
            ensure!(
                rule.id == i,
                "rule at index {} carries id {}; ids must match pool order",
                i,
                rule.id
            );
            if i == DEFAULT_RULE_ID {
                ensure!(
                    rule.support == nsamples,
                    "default rule must fire on all {} samples, fires on {}",
                    nsamples,
                    rule.support
                );
                ensure!(
                    rule.cardinality <= MAX_CARDINALITY,
                    "default rule cardinality {} exceeds {}",
                    rule.cardinality,
                    MAX_CARDINALITY
                );
            } else {
                ensure!(
                    (1..=MAX_CARDINALITY).contains(&rule.cardinality),
                    "rule {} cardinality {} outside [1, {}]",
                    i,
                    rule.cardinality,
                    MAX_CARDINALITY
                );
            }
        }

        for label in &labels {
            ensure!(
                label.truthtable.len() == nsamples,
                "label truth-table covers {} samples, expected {}",
                label.truthtable.len(),
                nsamples
            );
        }
        ensure!(
            labels[0].truthtable.is_disjoint(&labels[1].truthtable),
            "class labels overlap"
        );
        ensure!(
            labels[0].support + labels[1].support == nsamples,
            "labels cover {} of {} samples",
            labels[0].support + labels[1].support,
            nsamples
        );

        Ok(Self {
            rules,
            labels,
            nsamples,
        })
    }

    /// Size of the rule pool, default rule included.
    pub fn nrules(&self) -> usize {
        self.rules.len()
    }
}

/// Hyperparameters of the prior and the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Prior mean list length (Poisson).
    pub lambda: f64,
    /// Prior mean rule cardinality (truncated Poisson).
    pub eta: f64,
    /// Beta pseudo-counts for class 0 and class 1.
    pub alpha: [f64; 2],
    /// Predict class 1 at a position when `theta >= threshold`.
    pub threshold: f64,
    /// Proposal steps per MCMC chain.
    pub iters: usize,
    /// Number of rules (excluding the default) in a freshly seeded list.
    pub init_size: usize,
    /// Number of sequential chains.
    pub nchain: usize,
    /// RNG seed; `None` draws one from entropy. Fixing it makes training
    /// bit-for-bit reproducible.
    pub seed: Option<u64>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            lambda: 3.0,
            eta: 1.0,
            alpha: [1.0, 1.0],
            threshold: 0.5,
            iters: 5000,
            init_size: 3,
            nchain: 10,
            seed: None,
        }
    }
}

impl Params {
    /// Reject parameter combinations the search cannot run with.
    pub fn validate(&self, nrules: usize) -> Result<()> {
        ensure!(self.lambda > 0.0, "lambda must be positive");
        ensure!(self.eta > 0.0, "eta must be positive");
        ensure!(
            self.alpha[0] > 0.0 && self.alpha[1] > 0.0,
            "alpha pseudo-counts must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&self.threshold),
            "threshold {} outside [0, 1]",
            self.threshold
        );
        ensure!(self.nchain >= 1, "nchain must be at least 1");
        ensure!(self.init_size >= 1, "init_size must be at least 1");
        if self.init_size > nrules - 1 {
            bail!(
                "init_size {} exceeds the {} available non-default rules",
                self.init_size,
                nrules - 1
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: usize, cardinality: usize, bits: &[bool]) -> Rule {
        Rule::new(id, cardinality, BitVec::from_bools(bits))
    }

    fn labels(class1: &[bool]) -> [Rule; 2] {
        let class0: Vec<bool> = class1.iter().map(|b| !b).collect();
        [
            Rule::new(0, 1, BitVec::from_bools(&class0)),
            Rule::new(1, 1, BitVec::from_bools(class1)),
        ]
    }

    #[test]
    fn test_rule_support_derived() {
        let r = rule(3, 2, &[true, false, true, true]);
        assert_eq!(r.support, 3);
    }

    #[test]
    fn test_valid_data() {
        let rules = vec![
            rule(0, 1, &[true; 4]),
            rule(1, 1, &[true, true, false, false]),
        ];
        let data = TrainData::new(rules, labels(&[true, false, true, false]), 4).unwrap();
        assert_eq!(data.nrules(), 2);
    }

    #[test]
    fn test_default_must_cover_all() {
        let rules = vec![
            rule(0, 1, &[true, true, true, false]),
            rule(1, 1, &[true, true, false, false]),
        ];
        assert!(TrainData::new(rules, labels(&[true, false, true, false]), 4).is_err());
    }

    #[test]
    fn test_ragged_truthtable_rejected() {
        let rules = vec![rule(0, 1, &[true; 4]), rule(1, 1, &[true, false, false])];
        assert!(TrainData::new(rules, labels(&[true, false, true, false]), 4).is_err());
    }

    #[test]
    fn test_cardinality_bounds() {
        let rules = vec![
            rule(0, 1, &[true; 4]),
            rule(1, MAX_CARDINALITY + 1, &[true, false, false, false]),
        ];
        assert!(TrainData::new(rules, labels(&[true, false, true, false]), 4).is_err());
    }

    #[test]
    fn test_overlapping_labels_rejected() {
        let rules = vec![rule(0, 1, &[true; 4]), rule(1, 1, &[true, false, true, false])];
        let bad = [
            Rule::new(0, 1, BitVec::from_bools(&[true, true, false, false])),
            Rule::new(1, 1, BitVec::from_bools(&[true, false, true, true])),
        ];
        assert!(TrainData::new(rules, bad, 4).is_err());
    }

    #[test]
    fn test_param_validation() {
        let mut p = Params::default();
        assert!(p.validate(10).is_ok());

        p.alpha = [0.0, 1.0];
        assert!(p.validate(10).is_err());

        p = Params::default();
        p.nchain = 0;
        assert!(p.validate(10).is_err());

        p = Params::default();
        p.init_size = 10;
        assert!(p.validate(10).is_err(), "init_size > nrules - 1 must fail");

        p = Params::default();
        p.threshold = 1.5;
        assert!(p.validate(10).is_err());
    }
}
