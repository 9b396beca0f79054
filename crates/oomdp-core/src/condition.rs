//! Lifted conditions over relation terms
//!
//! The condition of an object lifts every proposition that mentions it:
//! the object itself becomes [`TermArg::Focus`] and every other argument
//! becomes its class, read existentially. Conditions are sorted literal
//! lists, so intersection is an ordered-set intersection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::relation::{propositions, Proposition};
use crate::schema::{ClassId, RelationId, Schema};
use crate::state::{ObjectId, State};

/// Argument slot of a lifted term
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermArg {
    /// The object the condition is about
    Focus,
    /// Some object of this class
    Class(ClassId),
}

/// A relation with lifted arguments
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Relation
    pub relation: RelationId,
    /// Lifted arguments
    pub args: Vec<TermArg>,
}

impl Term {
    /// Create a term
    #[must_use]
    pub fn new(relation: RelationId, args: Vec<TermArg>) -> Self {
        Self { relation, args }
    }

    /// Position of the focus argument, if any
    #[must_use]
    pub fn focus_position(&self) -> Option<usize> {
        self.args.iter().position(|a| *a == TermArg::Focus)
    }
}

/// A conjunction of signed terms (a partial assignment)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Condition {
    literals: Vec<(Term, bool)>,
}

impl Condition {
    /// The empty conjunction, satisfied everywhere
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from literals; a later literal for the same term wins
    pub fn from_literals(literals: impl IntoIterator<Item = (Term, bool)>) -> Self {
        let mut literals: Vec<(Term, bool)> = literals.into_iter().collect();
        // stable sort keeps insertion order among equal terms
        literals.sort_by(|a, b| a.0.cmp(&b.0));
        let mut deduped: Vec<(Term, bool)> = Vec::with_capacity(literals.len());
        for (term, sign) in literals {
            match deduped.last_mut() {
                Some(last) if last.0 == term => last.1 = sign,
                _ => deduped.push((term, sign)),
            }
        }
        Self { literals: deduped }
    }

    /// Sorted literals
    #[must_use]
    pub fn literals(&self) -> &[(Term, bool)] {
        &self.literals
    }

    /// Sign of a term, if assigned
    #[must_use]
    pub fn get(&self, term: &Term) -> Option<bool> {
        self.literals
            .binary_search_by(|(t, _)| t.cmp(term))
            .ok()
            .map(|i| self.literals[i].1)
    }

    /// Number of literals
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Whether there are no literals
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Whether every literal of `self` appears, with the same sign, in `other`
    #[must_use]
    pub fn satisfied_by(&self, other: &Condition) -> bool {
        let mut theirs = other.literals.iter();
        'ours: for (term, sign) in &self.literals {
            for (other_term, other_sign) in theirs.by_ref() {
                match other_term.cmp(term) {
                    Ordering::Less => continue,
                    Ordering::Equal if other_sign == sign => continue 'ours,
                    _ => return false,
                }
            }
            return false;
        }
        true
    }

    /// Literals present in both conditions with the same sign
    #[must_use]
    pub fn intersect(&self, other: &Condition) -> Condition {
        let mut literals = Vec::with_capacity(self.literals.len().min(other.literals.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.literals.len() && j < other.literals.len() {
            let (a, b) = (&self.literals[i], &other.literals[j]);
            match a.0.cmp(&b.0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if a.1 == b.1 {
                        literals.push(a.clone());
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        Condition { literals }
    }

    /// Readable form, e.g. `touch_w(Focus, wall) & !on_passenger(Focus, passenger)`
    #[must_use]
    pub fn describe(&self, schema: &Schema) -> String {
        if self.literals.is_empty() {
            return "true".to_string();
        }
        self.literals
            .iter()
            .map(|(term, sign)| {
                let text = schema.describe_term(term);
                if *sign {
                    text
                } else {
                    format!("!{text}")
                }
            })
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

/// Everything the learner needs to know about a state's relations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    propositions: BTreeSet<Proposition>,
    objects: Vec<(ObjectId, Condition)>,
    global: Condition,
}

impl Signature {
    /// Evaluate relations and lift per-object and global conditions
    #[must_use]
    pub fn of(state: &State) -> Self {
        let schema = state.schema();
        let propositions = propositions(state);

        let mut mentions: BTreeSet<(RelationId, usize, ObjectId)> = BTreeSet::new();
        for proposition in &propositions {
            for (position, id) in proposition.args.iter().enumerate() {
                mentions.insert((proposition.relation, position, *id));
            }
        }

        let objects = state
            .objects()
            .iter()
            .map(|object| {
                let literals = schema.templates(object.class).iter().map(|term| {
                    let holds = term
                        .focus_position()
                        .is_some_and(|p| mentions.contains(&(term.relation, p, object.id)));
                    (term.clone(), holds)
                });
                (object.id, Condition::from_literals(literals))
            })
            .collect();

        let global = Condition::from_literals(schema.global_terms().iter().map(|term| {
            let holds = propositions.iter().any(|p| p.relation == term.relation);
            (term.clone(), holds)
        }));

        Self {
            propositions,
            objects,
            global,
        }
    }

    /// Propositions true in the state
    #[must_use]
    pub fn propositions(&self) -> &BTreeSet<Proposition> {
        &self.propositions
    }

    /// Lifted condition of one object
    #[must_use]
    pub fn condition(&self, id: ObjectId) -> Option<&Condition> {
        self.objects
            .binary_search_by(|(o, _)| o.cmp(&id))
            .ok()
            .map(|i| &self.objects[i].1)
    }

    /// Condition over every relation with all arguments lifted to classes
    #[must_use]
    pub fn global(&self) -> &Condition {
        &self.global
    }
}
