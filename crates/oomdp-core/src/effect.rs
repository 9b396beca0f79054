//! Effect kinds: atomic changes to a single attribute

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::Value;

/// Closed set of attribute effect kinds
///
/// Each kind knows how to explain an observed change (`explain`) and how
/// to reproduce it (`apply`). Which kinds an attribute admits is a schema
/// decision, see [`crate::schema::AttributeDecl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Attribute unchanged
    NoChange,
    /// Attribute becomes its prior value plus a delta
    AssignmentAdd,
    /// Attribute becomes its prior value times a factor
    AssignmentMultiply,
    /// Attribute becomes a constant
    SetConstant,
}

impl EffectKind {
    /// All kinds in enumeration order
    pub const ALL: [EffectKind; 4] = [
        EffectKind::NoChange,
        EffectKind::AssignmentAdd,
        EffectKind::AssignmentMultiply,
        EffectKind::SetConstant,
    ];

    /// The parameter with which this kind turns `before` into `after`, if any.
    ///
    /// `NoChange` carries no parameter and reports `0` when it explains.
    /// A multiplication from zero is not informative about its factor and
    /// is never reported as explaining.
    #[must_use]
    pub fn explain(self, before: Value, after: Value) -> Option<Value> {
        match self {
            Self::NoChange => (before == after).then_some(0),
            Self::AssignmentAdd => after.checked_sub(before),
            Self::AssignmentMultiply => {
                if before == 0 || after % before != 0 {
                    None
                } else {
                    Some(after / before)
                }
            }
            Self::SetConstant => Some(after),
        }
    }

    /// Apply this kind with `parameter` to `before`; `None` on overflow.
    #[must_use]
    pub fn apply(self, parameter: Value, before: Value) -> Option<Value> {
        match self {
            Self::NoChange => Some(before),
            Self::AssignmentAdd => before.checked_add(parameter),
            Self::AssignmentMultiply => before.checked_mul(parameter),
            Self::SetConstant => Some(parameter),
        }
    }

    /// Short name used in logs and error contexts
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NoChange => "NoChange",
            Self::AssignmentAdd => "AssignmentAdd",
            Self::AssignmentMultiply => "AssignmentMultiply",
            Self::SetConstant => "SetConstant",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A kind paired with its parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Effect {
    /// Effect kind
    pub kind: EffectKind,
    /// Kind parameter (ignored for `NoChange`)
    pub value: Value,
}

impl Effect {
    /// Create an effect
    #[must_use]
    pub fn new(kind: EffectKind, value: Value) -> Self {
        Self { kind, value }
    }

    /// Apply the effect to a prior value
    #[must_use]
    pub fn apply(&self, before: Value) -> Option<Value> {
        self.kind.apply(self.value, before)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EffectKind::NoChange => write!(f, "NoChange"),
            kind => write!(f, "{}({})", kind, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_each_kind() {
        assert_eq!(EffectKind::NoChange.explain(3, 3), Some(0));
        assert_eq!(EffectKind::NoChange.explain(3, 2), None);
        assert_eq!(EffectKind::AssignmentAdd.explain(1, 0), Some(-1));
        assert_eq!(EffectKind::SetConstant.explain(1, 0), Some(0));
        assert_eq!(EffectKind::AssignmentMultiply.explain(2, 6), Some(3));
        assert_eq!(EffectKind::AssignmentMultiply.explain(2, 5), None);
        assert_eq!(EffectKind::AssignmentMultiply.explain(0, 0), None);
    }

    #[test]
    fn test_apply_reproduces_explained_change() {
        for kind in EffectKind::ALL {
            for (before, after) in [(4, 2), (0, 1), (3, 3), (2, 8)] {
                if let Some(p) = kind.explain(before, after) {
                    assert_eq!(kind.apply(p, before), Some(after), "{kind}");
                }
            }
        }
    }

    #[test]
    fn test_apply_overflow() {
        assert_eq!(EffectKind::AssignmentAdd.apply(1, Value::MAX), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Effect::new(EffectKind::AssignmentAdd, -1).to_string(), "AssignmentAdd(-1)");
        assert_eq!(Effect::new(EffectKind::NoChange, 0).to_string(), "NoChange");
    }
}
