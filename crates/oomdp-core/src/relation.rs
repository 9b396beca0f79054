//! Relation evaluator: grounded propositions of a state

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::schema::{RelationId, Schema};
use crate::state::{ObjectId, ObjectInstance, ObjectView, State};

/// A relation applied to a tuple of object ids
///
/// The derived ordering is `(relation, args)`; since frozen relations are
/// sorted by name this is the lexicographic order of
/// `(relation-name, argument-ids)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Proposition {
    /// Relation
    pub relation: RelationId,
    /// Argument object ids
    pub args: Vec<ObjectId>,
}

impl Proposition {
    /// Readable form, e.g. `touch_w(#0, #7)`
    #[must_use]
    pub fn describe(&self, schema: &Schema) -> String {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        format!("{}({})", schema.relation(self.relation).name, args.join(", "))
    }
}

/// All propositions true in `state`: its condition signature
#[must_use]
pub fn propositions(state: &State) -> BTreeSet<Proposition> {
    let schema = state.schema();
    let mut result = BTreeSet::new();
    for (r, relation) in schema.relations().iter().enumerate() {
        let candidates: Vec<Vec<&ObjectInstance>> = relation
            .params
            .iter()
            .map(|class| state.objects_of_class(*class).collect())
            .collect();
        if candidates.iter().any(Vec::is_empty) {
            continue;
        }

        // Odometer over the cartesian product of argument candidates.
        let mut cursor = vec![0usize; candidates.len()];
        'product: loop {
            let args: Vec<ObjectView<'_>> = cursor
                .iter()
                .zip(&candidates)
                .map(|(&i, objects)| state.view(objects[i]))
                .collect();
            if relation.holds(&args) {
                result.insert(Proposition {
                    relation: RelationId(r),
                    args: args.iter().map(ObjectView::id).collect(),
                });
            }

            let mut position = cursor.len();
            while position > 0 {
                position -= 1;
                cursor[position] += 1;
                if cursor[position] < candidates[position].len() {
                    continue 'product;
                }
                cursor[position] = 0;
            }
            break;
        }
    }
    tracing::trace!(count = result.len(), "evaluated propositions");
    result
}
