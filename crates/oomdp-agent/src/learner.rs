//! DOORmax transition learner
//!
//! Every observed transition is split per object and attribute. For each
//! effect kind the attribute admits, the kind either explains the change
//! (a positive example at the object's lifted condition) or it does not (a
//! negative example). Prediction applies, per attribute, the value that all
//! applicable records agree on.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use oomdp_core::{
    Action, Budget, ClassId, EffectKind, ObjectId, OomdpError, Result, Reward, Schema, Signature,
    State, Value,
};

use crate::effect_model::{EffectKey, EffectModel, EffectRecord};

/// Learner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Explain an unchanged attribute only by `NoChange`
    pub prefer_no_change: bool,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            prefer_no_change: true,
        }
    }
}

/// DOORmax effect learner
#[derive(Debug, Clone)]
pub struct DoorMaxLearner<A> {
    schema: Arc<Schema>,
    config: LearnerConfig,
    model: EffectModel<A>,
    revisions: Vec<u64>,
    observations: u64,
    budget: Budget,
}

/// Learner with default configuration
pub fn make_learner<A: Action>(schema: &Arc<Schema>) -> DoorMaxLearner<A> {
    DoorMaxLearner::new(schema, LearnerConfig::default())
}

impl<A: Action> DoorMaxLearner<A> {
    /// Create an empty learner for a schema
    pub fn new(schema: &Arc<Schema>, config: LearnerConfig) -> Self {
        Self {
            schema: Arc::clone(schema),
            config,
            model: EffectModel::new(),
            revisions: vec![0; A::count()],
            observations: 0,
            budget: Budget::unlimited(),
        }
    }

    /// Schema the learner types states against
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> LearnerConfig {
        self.config
    }

    /// Learned records
    #[must_use]
    pub fn effect_model(&self) -> &EffectModel<A> {
        &self.model
    }

    /// Number of transitions observed
    #[must_use]
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Counter bumped whenever predictions for `action` may have changed
    #[must_use]
    pub fn revision(&self, action: A) -> u64 {
        self.revisions.get(action.index()).copied().unwrap_or_default()
    }

    /// Attach a cancellation budget; each observation costs one unit
    pub fn set_budget(&mut self, budget: Budget) {
        self.budget = budget;
    }

    /// Record for `(action, class, attribute, kind)` addressed by name
    #[must_use]
    pub fn entry(
        &self,
        action: A,
        class: &str,
        attribute: &str,
        kind: EffectKind,
    ) -> Option<&EffectRecord> {
        let class = self.schema.class_id(class)?;
        let attribute = self.schema.class(class).attribute_index(attribute)?;
        self.model.get(&EffectKey {
            action,
            class,
            attribute,
            kind,
        })
    }

    fn check_state(&self, state: &State) -> Result<()> {
        if Arc::ptr_eq(state.schema(), &self.schema) || state.schema().name() == self.schema.name()
        {
            Ok(())
        } else {
            Err(OomdpError::InvalidState(format!(
                "state of schema `{}` given to a `{}` learner",
                state.schema().name(),
                self.schema.name()
            )))
        }
    }

    /// Learn from a transition `(state, action, next_state, reward)`
    pub fn observe(&mut self, state: &State, action: A, next_state: &State, reward: Reward) -> Result<()> {
        let signature = Signature::of(state);
        self.observe_with(state, &signature, action, next_state, reward)
    }

    /// [`observe`](Self::observe) with a precomputed signature of `state`
    pub fn observe_with(
        &mut self,
        state: &State,
        signature: &Signature,
        action: A,
        next_state: &State,
        reward: Reward,
    ) -> Result<()> {
        self.check_state(state)?;
        if !state.same_objects(next_state) {
            return Err(OomdpError::InvalidState(
                "transition changes the set of objects".into(),
            ));
        }
        self.budget.charge(1)?;

        let mut relevant = false;
        for (object, after) in state.objects().iter().zip(next_state.objects()) {
            let Some(condition) = signature.condition(object.id) else {
                continue;
            };
            let class = self.schema.class(object.class);
            for (attribute, decl) in class.attributes.iter().enumerate() {
                let before = object.values[attribute];
                let value = after.values[attribute];
                for &kind in &decl.effect_kinds {
                    let explanation = if self.config.prefer_no_change && before == value {
                        (kind == EffectKind::NoChange).then_some(0)
                    } else {
                        kind.explain(before, value)
                    };
                    let key = EffectKey {
                        action,
                        class: object.class,
                        attribute,
                        kind,
                    };
                    let record = self.model.entry(key);
                    let previous = record.status();
                    let changed = match explanation {
                        Some(parameter) => record.observe_explained(parameter, condition),
                        None => record.observe_unexplained(condition),
                    };
                    if record.status() != previous {
                        tracing::debug!(
                            entry = %key.describe(&self.schema),
                            from = %previous,
                            to = %record.status(),
                            "effect record status changed"
                        );
                    }
                    relevant |= changed;
                }
            }
        }

        self.observations += 1;
        if relevant {
            if let Some(revision) = self.revisions.get_mut(action.index()) {
                *revision += 1;
            }
        }
        tracing::trace!(action = action.name(), reward = reward.0, relevant, "observed transition");
        Ok(())
    }

    /// Predicted next state, or `None` when the outcome is unknown
    pub fn predict(&self, state: &State, action: A) -> Result<Option<State>> {
        self.check_state(state)?;
        let signature = Signature::of(state);
        self.predict_with(state, &signature, action)
    }

    /// Whether the outcome of `action` in `state` is predicted
    pub fn known(&self, state: &State, action: A) -> Result<bool> {
        Ok(self.predict(state, action)?.is_some())
    }

    /// [`predict`](Self::predict) with a precomputed signature of `state`
    pub fn predict_with(&self, state: &State, signature: &Signature, action: A) -> Result<Option<State>> {
        let mut changes: Vec<(ObjectId, usize, Value)> = Vec::new();
        for object in state.objects() {
            let Some(condition) = signature.condition(object.id) else {
                return Ok(None);
            };
            let class = self.schema.class(object.class);
            for (attribute, decl) in class.attributes.iter().enumerate() {
                let before = object.values[attribute];
                let mut unchanged: Option<Value> = None;
                let mut changing: Option<(EffectKind, Value)> = None;
                for &kind in &decl.effect_kinds {
                    let key = EffectKey {
                        action,
                        class: object.class,
                        attribute,
                        kind,
                    };
                    let Some(parameter) = self.model.get(&key).and_then(|r| r.applicable(condition))
                    else {
                        continue;
                    };
                    if kind == EffectKind::NoChange {
                        unchanged = Some(before);
                        continue;
                    }
                    // two changing kinds at once: the model cannot tell them apart
                    if changing.is_some() {
                        return Ok(None);
                    }
                    let value = kind.apply(parameter, before).ok_or_else(|| {
                        self.violation(&key, object.class, before, state, "overflow")
                    })?;
                    changing = Some((kind, value));
                }
                let (kind, value) = match (unchanged, changing) {
                    (None, None) => return Ok(None),
                    (Some(value), None) => (EffectKind::NoChange, value),
                    (None, Some(predicted)) => predicted,
                    (Some(value), Some((kind, other))) if value == other => (kind, value),
                    (Some(_), Some(_)) => return Ok(None),
                };
                if value != before {
                    let key = EffectKey {
                        action,
                        class: object.class,
                        attribute,
                        kind,
                    };
                    if !decl.domain.contains(value) {
                        return Err(self.violation(&key, object.class, value, state, "out of domain"));
                    }
                    changes.push((object.id, attribute, value));
                }
            }
        }
        Ok(Some(state.with_values(&changes)?))
    }

    fn violation(
        &self,
        key: &EffectKey<A>,
        class: ClassId,
        value: Value,
        state: &State,
        reason: &str,
    ) -> OomdpError {
        let decl = self.schema.class(class);
        let attribute = &decl.attributes[key.attribute];
        OomdpError::DomainViolation {
            class: decl.name.clone(),
            attribute: attribute.name.clone(),
            value,
            domain: attribute.domain.to_string(),
            context: format!(
                "{reason} predicting entry {} in {state}",
                key.describe(&self.schema)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oomdp_core::{Domain, SchemaBuilder};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    enum Step {
        Right,
        Double,
    }

    impl Action for Step {
        fn all() -> &'static [Self] {
            &[Step::Right, Step::Double]
        }

        fn name(self) -> &'static str {
            match self {
                Step::Right => "Right",
                Step::Double => "Double",
            }
        }
    }

    fn line() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("line")
                .class("walker")
                .attribute("x", Domain::range(0, 4))
                .kinds(&[
                    EffectKind::NoChange,
                    EffectKind::AssignmentAdd,
                    EffectKind::AssignmentMultiply,
                    EffectKind::SetConstant,
                ])
                .and()
                .class("fence")
                .attribute("x", Domain::range(0, 4))
                .and()
                .relation("at_fence", &["walker", "fence"], |a| {
                    a[0].get("x") == a[1].get("x")
                })
                .freeze()
                .unwrap(),
        )
    }

    fn at(schema: &Arc<Schema>, x: Value) -> State {
        State::builder(schema)
            .object(0, "walker", &[("x", x)])
            .object(1, "fence", &[("x", 3)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_learns_blocked_move() {
        let schema = line();
        let mut learner = make_learner::<Step>(&schema);
        assert_eq!(learner.predict(&at(&schema, 0), Step::Right).unwrap(), None);

        learner.observe(&at(&schema, 0), Step::Right, &at(&schema, 1), Reward(-1.0)).unwrap();
        learner.observe(&at(&schema, 3), Step::Right, &at(&schema, 3), Reward(-1.0)).unwrap();
        learner.observe(&at(&schema, 1), Step::Right, &at(&schema, 2), Reward(-1.0)).unwrap();

        assert_eq!(learner.predict(&at(&schema, 2), Step::Right).unwrap(), Some(at(&schema, 3)));
        assert_eq!(learner.predict(&at(&schema, 3), Step::Right).unwrap(), Some(at(&schema, 3)));
        assert!(learner.known(&at(&schema, 0), Step::Right).unwrap());
        assert!(!learner.known(&at(&schema, 0), Step::Double).unwrap());
    }

    #[test]
    fn test_competing_changes_leave_outcome_unknown() {
        let schema = line();
        let mut learner = make_learner::<Step>(&schema);
        learner.observe(&at(&schema, 1), Step::Double, &at(&schema, 2), Reward(0.0)).unwrap();
        // add(+1), multiply(×2) and set(2) all explain 1 → 2, even from 1
        for kind in [
            EffectKind::AssignmentAdd,
            EffectKind::AssignmentMultiply,
            EffectKind::SetConstant,
        ] {
            let record = learner.entry(Step::Double, "walker", "x", kind).unwrap();
            assert_eq!(record.status(), crate::effect_model::Status::Candidate);
        }
        assert_eq!(learner.predict(&at(&schema, 1), Step::Double).unwrap(), None);
        assert_eq!(learner.predict(&at(&schema, 2), Step::Double).unwrap(), None);

        learner.observe(&at(&schema, 2), Step::Double, &at(&schema, 3), Reward(0.0)).unwrap();
        let add = learner.entry(Step::Double, "walker", "x", EffectKind::AssignmentAdd).unwrap();
        assert!(add.status().is_eligible());
        let multiply = learner
            .entry(Step::Double, "walker", "x", EffectKind::AssignmentMultiply)
            .unwrap();
        assert!(!multiply.status().is_eligible());
        let set = learner.entry(Step::Double, "walker", "x", EffectKind::SetConstant).unwrap();
        assert_eq!(set.status(), crate::effect_model::Status::Overloaded);
        assert_eq!(learner.predict(&at(&schema, 1), Step::Double).unwrap(), Some(at(&schema, 2)));
    }

    #[test]
    fn test_domain_violation_reports_entry() {
        let schema = line();
        let mut learner = make_learner::<Step>(&schema);
        learner.observe(&at(&schema, 0), Step::Right, &at(&schema, 1), Reward(-1.0)).unwrap();
        learner.observe(&at(&schema, 1), Step::Right, &at(&schema, 2), Reward(-1.0)).unwrap();
        learner.observe(&at(&schema, 2), Step::Right, &at(&schema, 3), Reward(-1.0)).unwrap();
        // with the fence moved away, x = 3 looks like every observed
        // condition and add(+1) leaves the domain
        let hidden = State::builder(&schema)
            .object(0, "walker", &[("x", 3)])
            .object(1, "fence", &[("x", 0)])
            .build()
            .unwrap();
        match learner.predict(&hidden, Step::Right) {
            Err(OomdpError::DomainViolation { context, value, .. }) => {
                assert_eq!(value, 4);
                assert!(context.contains("(Right, walker, x, AssignmentAdd)"));
            }
            other => panic!("expected a domain violation, got {other:?}"),
        }
    }

    #[test]
    fn test_revision_tracks_relevant_changes() {
        let schema = line();
        let mut learner = make_learner::<Step>(&schema);
        learner.observe(&at(&schema, 0), Step::Right, &at(&schema, 1), Reward(-1.0)).unwrap();
        let revision = learner.revision(Step::Right);
        assert!(revision > 0);
        assert_eq!(learner.revision(Step::Double), 0);
        learner.observe(&at(&schema, 0), Step::Right, &at(&schema, 1), Reward(-1.0)).unwrap();
        assert_eq!(learner.revision(Step::Right), revision);
        assert_eq!(learner.observations(), 2);
    }

    #[test]
    fn test_budget_cancels_without_learning() {
        let schema = line();
        let mut learner = make_learner::<Step>(&schema);
        learner.set_budget(Budget::new(0));
        assert!(matches!(
            learner.observe(&at(&schema, 0), Step::Right, &at(&schema, 1), Reward(-1.0)),
            Err(OomdpError::Cancelled)
        ));
        assert!(learner.effect_model().is_empty());
    }
}
