//! Effect model: one record per (action, class, attribute, effect kind)

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use oomdp_core::{Action, ClassId, Condition, EffectKind, Schema, Value};

use crate::precondition::{Precondition, PreconditionChange};

/// Lifecycle of an effect record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Status {
    /// Never explained an observation
    Unseen,
    /// Explained one condition
    Candidate,
    /// Held across at least one generalisation of its precondition
    Confirmed,
    /// Needed two different values; permanently unusable
    Overloaded,
    /// A condition was seen both with and without the effect; permanently unusable
    Refuted,
}

impl Status {
    /// Whether records with this status take part in prediction
    #[must_use]
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Candidate | Self::Confirmed)
    }

    /// Whether the status can never change again
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Overloaded | Self::Refuted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unseen => "unseen",
            Self::Candidate => "candidate",
            Self::Confirmed => "confirmed",
            Self::Overloaded => "overloaded",
            Self::Refuted => "refuted",
        };
        f.write_str(name)
    }
}

/// Key of an effect record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EffectKey<A> {
    /// Action
    pub action: A,
    /// Object class
    pub class: ClassId,
    /// Attribute index within the class
    pub attribute: usize,
    /// Effect kind
    pub kind: EffectKind,
}

impl<A: Action> EffectKey<A> {
    /// Readable form, e.g. `(West, taxi, col, AssignmentAdd)`
    #[must_use]
    pub fn describe(&self, schema: &Schema) -> String {
        let class = schema.class(self.class);
        let attribute = class
            .attributes
            .get(self.attribute)
            .map_or("?", |a| a.name.as_str());
        format!(
            "({}, {}, {}, {})",
            self.action.name(),
            class.name,
            attribute,
            self.kind
        )
    }
}

/// Stored value, precondition and status of one effect hypothesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectRecord {
    status: Status,
    value: Option<Value>,
    precondition: Precondition,
}

impl Default for EffectRecord {
    fn default() -> Self {
        Self {
            status: Status::Unseen,
            value: None,
            precondition: Precondition::new(),
        }
    }
}

impl EffectRecord {
    /// Current status
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Stored effect parameter
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.value
    }

    /// Learned precondition
    #[must_use]
    pub fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    /// Parameter to apply at `condition`, if this record predicts there
    #[must_use]
    pub fn applicable(&self, condition: &Condition) -> Option<Value> {
        if self.status.is_eligible() && self.precondition.holds(condition) {
            self.value
        } else {
            None
        }
    }

    /// The kind explained the observation with `value` under `condition`.
    /// Returns whether predictions may have changed.
    pub fn observe_explained(&mut self, value: Value, condition: &Condition) -> bool {
        match self.status {
            Status::Overloaded | Status::Refuted => false,
            Status::Unseen => {
                self.value = Some(value);
                if self.precondition.add_positive(condition) == PreconditionChange::Contradiction {
                    self.status = Status::Refuted;
                    false
                } else {
                    self.status = Status::Candidate;
                    true
                }
            }
            Status::Candidate | Status::Confirmed => {
                if self.value != Some(value) {
                    self.status = Status::Overloaded;
                    return true;
                }
                match self.precondition.add_positive(condition) {
                    PreconditionChange::Unchanged | PreconditionChange::Recorded => false,
                    PreconditionChange::Contradiction => {
                        self.status = Status::Refuted;
                        true
                    }
                    PreconditionChange::Generalised => {
                        self.status = Status::Confirmed;
                        true
                    }
                }
            }
        }
    }

    /// The kind did not explain the observation under `condition`.
    /// Returns whether predictions may have changed.
    pub fn observe_unexplained(&mut self, condition: &Condition) -> bool {
        if self.status.is_final() {
            return false;
        }
        match self.precondition.add_negative(condition) {
            PreconditionChange::Contradiction => {
                let was_eligible = self.status.is_eligible();
                self.status = Status::Refuted;
                was_eligible
            }
            change => self.status.is_eligible() && change.is_relevant(),
        }
    }
}

/// All effect records, ordered by key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectModel<A> {
    records: BTreeMap<EffectKey<A>, EffectRecord>,
}

impl<A> Default for EffectModel<A> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<A: Action> EffectModel<A> {
    /// Empty model
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a key, if it was ever touched
    #[must_use]
    pub fn get(&self, key: &EffectKey<A>) -> Option<&EffectRecord> {
        self.records.get(key)
    }

    /// Record for a key, created unseen on first use
    pub fn entry(&mut self, key: EffectKey<A>) -> &mut EffectRecord {
        self.records.entry(key).or_default()
    }

    /// Records in key order
    pub fn iter(&self) -> impl Iterator<Item = (&EffectKey<A>, &EffectRecord)> + '_ {
        self.records.iter()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records per status
    #[must_use]
    pub fn status_counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }
}

impl<A: Serialize> Serialize for EffectModel<A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}
