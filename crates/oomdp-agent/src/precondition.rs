//! Precondition learning over lifted conditions
//!
//! A precondition is a disjunction of conjunctions (an antichain: no
//! conjunction is implied by another). Every positive example is covered
//! by some conjunction and no negative example is, so evaluating the
//! precondition at an observed condition always reproduces what was seen.

use serde::Serialize;
use std::collections::BTreeSet;

use oomdp_core::Condition;

/// What an example did to a precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionChange {
    /// The example was already known
    Unchanged,
    /// The example was stored; the conjunctions are unchanged
    Recorded,
    /// The conjunctions changed
    Generalised,
    /// The condition was already seen with the opposite outcome
    Contradiction,
}

impl PreconditionChange {
    /// Whether evaluating the precondition may now give a different answer
    #[must_use]
    pub fn is_relevant(self) -> bool {
        matches!(self, Self::Generalised | Self::Contradiction)
    }
}

/// Disjunctive precondition with its supporting examples
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Precondition {
    conjunctions: Vec<Condition>,
    positives: BTreeSet<Condition>,
    negatives: BTreeSet<Condition>,
}

impl Precondition {
    /// A precondition that holds nowhere
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Conjunctions in sorted order
    #[must_use]
    pub fn conjunctions(&self) -> &[Condition] {
        &self.conjunctions
    }

    /// Conditions under which the effect was observed
    #[must_use]
    pub fn positives(&self) -> &BTreeSet<Condition> {
        &self.positives
    }

    /// Conditions under which the effect was not observed
    #[must_use]
    pub fn negatives(&self) -> &BTreeSet<Condition> {
        &self.negatives
    }

    /// Whether some conjunction is satisfied by `condition`
    #[must_use]
    pub fn holds(&self, condition: &Condition) -> bool {
        self.conjunctions.iter().any(|c| c.satisfied_by(condition))
    }

    /// Add a condition under which the effect occurred
    pub fn add_positive(&mut self, condition: &Condition) -> PreconditionChange {
        if self.negatives.contains(condition) {
            return PreconditionChange::Contradiction;
        }
        if !self.positives.insert(condition.clone()) {
            return PreconditionChange::Unchanged;
        }
        if self.holds(condition) {
            return PreconditionChange::Recorded;
        }
        self.cover(condition);
        PreconditionChange::Generalised
    }

    /// Add a condition under which the effect did not occur
    pub fn add_negative(&mut self, condition: &Condition) -> PreconditionChange {
        if self.positives.contains(condition) {
            return PreconditionChange::Contradiction;
        }
        if !self.negatives.insert(condition.clone()) {
            return PreconditionChange::Unchanged;
        }
        let before = self.conjunctions.len();
        self.conjunctions.retain(|c| !c.satisfied_by(condition));
        if self.conjunctions.len() == before {
            return PreconditionChange::Recorded;
        }

        let uncovered: Vec<Condition> = self
            .positives
            .iter()
            .filter(|p| !self.holds(p))
            .cloned()
            .collect();
        for positive in &uncovered {
            if !self.holds(positive) {
                self.cover(positive);
            }
        }
        PreconditionChange::Generalised
    }

    /// Generalise the first conjunction that can absorb `condition` without
    /// covering a negative, or start a new one
    fn cover(&mut self, condition: &Condition) {
        let absorbed = self.conjunctions.iter().enumerate().find_map(|(i, conj)| {
            let meet = conj.intersect(condition);
            let consistent = !self.negatives.iter().any(|n| meet.satisfied_by(n));
            consistent.then_some((i, meet))
        });

        match absorbed {
            Some((index, meet)) => {
                self.conjunctions[index] = meet.clone();
                let mut position = 0;
                self.conjunctions.retain(|c| {
                    let keep = position == index || !meet.satisfied_by(c);
                    position += 1;
                    keep
                });
            }
            None => self.conjunctions.push(condition.clone()),
        }
        self.conjunctions.sort();
        self.conjunctions.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oomdp_core::{RelationId, Term, TermArg};
    use proptest::prelude::*;

    fn cond(bits: &[bool]) -> Condition {
        Condition::from_literals(
            bits.iter()
                .enumerate()
                .map(|(r, &s)| (Term::new(RelationId(r), vec![TermArg::Focus]), s)),
        )
    }

    #[test]
    fn test_single_conjunction_generalises() {
        let mut pre = Precondition::new();
        assert_eq!(pre.add_positive(&cond(&[false, true, true])), PreconditionChange::Generalised);
        assert_eq!(pre.add_positive(&cond(&[false, false, true])), PreconditionChange::Generalised);
        assert_eq!(pre.conjunctions().len(), 1);
        assert_eq!(pre.conjunctions()[0].len(), 2);
        assert!(pre.holds(&cond(&[false, true, true])));
        assert!(!pre.holds(&cond(&[true, true, true])));
    }

    #[test]
    fn test_repeated_positive_is_unchanged() {
        let mut pre = Precondition::new();
        pre.add_positive(&cond(&[true, false]));
        let snapshot = pre.clone();
        assert_eq!(pre.add_positive(&cond(&[true, false])), PreconditionChange::Unchanged);
        assert_eq!(pre, snapshot);
    }

    #[test]
    fn test_negative_blocks_generalisation() {
        // the effect happens when exactly one of the two literals is false
        let mut pre = Precondition::new();
        pre.add_negative(&cond(&[false, false]));
        pre.add_positive(&cond(&[false, true]));
        pre.add_positive(&cond(&[true, false]));
        assert_eq!(pre.conjunctions().len(), 2);
        assert!(!pre.holds(&cond(&[false, false])));
        assert!(pre.holds(&cond(&[false, true])));
        assert!(pre.holds(&cond(&[true, false])));
    }

    #[test]
    fn test_negative_splits_conjunction() {
        let mut pre = Precondition::new();
        pre.add_positive(&cond(&[false, true]));
        pre.add_positive(&cond(&[true, false]));
        assert!(pre.holds(&cond(&[false, false])));
        assert_eq!(pre.add_negative(&cond(&[false, false])), PreconditionChange::Generalised);
        assert!(!pre.holds(&cond(&[false, false])));
        assert!(pre.holds(&cond(&[false, true])));
        assert!(pre.holds(&cond(&[true, false])));
    }

    #[test]
    fn test_contradiction() {
        let mut pre = Precondition::new();
        pre.add_positive(&cond(&[true]));
        assert_eq!(pre.add_negative(&cond(&[true])), PreconditionChange::Contradiction);
        let mut pre = Precondition::new();
        pre.add_negative(&cond(&[true]));
        assert_eq!(pre.add_positive(&cond(&[true])), PreconditionChange::Contradiction);
    }

    fn arb_condition() -> impl Strategy<Value = Condition> {
        proptest::collection::vec(any::<bool>(), 4).prop_map(|bits| cond(&bits))
    }

    proptest! {
        #[test]
        fn prop_examples_are_reproduced(
            examples in proptest::collection::vec((arb_condition(), any::<bool>()), 1..24)
        ) {
            let mut pre = Precondition::new();
            for (condition, positive) in &examples {
                if *positive {
                    pre.add_positive(condition);
                } else {
                    pre.add_negative(condition);
                }
            }
            for p in pre.positives() {
                prop_assert!(pre.holds(p));
            }
            for n in pre.negatives() {
                prop_assert!(!pre.holds(n));
            }
        }

        #[test]
        fn prop_positive_only_chain_shrinks(
            examples in proptest::collection::vec(arb_condition(), 1..16)
        ) {
            let mut pre = Precondition::new();
            let mut previous: Option<Condition> = None;
            for condition in &examples {
                pre.add_positive(condition);
                prop_assert_eq!(pre.conjunctions().len(), 1);
                let current = pre.conjunctions()[0].clone();
                if let Some(previous) = previous {
                    prop_assert!(current.satisfied_by(&previous));
                }
                previous = Some(current);
            }
        }
    }
}
