//! Immutable OO-MDP states
//!
//! A state is a flat, id-keyed collection of object instances. Cross-object
//! references (in relations and conditions) always go through ids, so states
//! are plain values that can be compared, hashed and used as table keys.

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{OomdpError, Result};
use crate::schema::{ClassDecl, ClassId, Schema};

/// Attribute value; booleans are encoded as `0`/`1`
pub type Value = i64;

/// Object identity, unique within a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One object: its id, class and attribute values in declaration order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjectInstance {
    /// Object id
    pub id: ObjectId,
    /// Object class
    pub class: ClassId,
    /// Values, indexed like the class's attribute declarations
    pub values: Vec<Value>,
}

/// Read-only view of an object together with its class declaration
#[derive(Debug, Clone, Copy)]
pub struct ObjectView<'a> {
    class: &'a ClassDecl,
    instance: &'a ObjectInstance,
}

impl<'a> ObjectView<'a> {
    /// Object id
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.instance.id
    }

    /// Class name
    #[must_use]
    pub fn class_name(&self) -> &'a str {
        &self.class.name
    }

    /// Attribute value by name
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<Value> {
        self.class
            .attribute_index(attribute)
            .and_then(|i| self.instance.values.get(i).copied())
    }

    /// Boolean attribute by name (`false` when absent)
    #[must_use]
    pub fn flag(&self, attribute: &str) -> bool {
        self.get(attribute).is_some_and(|v| v != 0)
    }
}

/// Snapshot of all objects
///
/// Equality, ordering and hashing consider the objects only; states are
/// expected to share one schema.
#[derive(Clone)]
pub struct State {
    schema: Arc<Schema>,
    objects: Vec<ObjectInstance>,
}

impl State {
    /// Build a state from `id → (class name, attribute name → value)`.
    ///
    /// Every attribute of the class must be given exactly once and every
    /// value must lie in its domain.
    pub fn from_attribute_map(
        schema: &Arc<Schema>,
        objects: &BTreeMap<ObjectId, (String, BTreeMap<String, Value>)>,
    ) -> Result<Self> {
        let mut builder = StateBuilder::new(schema);
        for (id, (class, attributes)) in objects {
            let pairs: Vec<(&str, Value)> =
                attributes.iter().map(|(k, v)| (k.as_str(), *v)).collect();
            builder = builder.object(id.0, class, &pairs);
        }
        builder.build()
    }

    /// Start a fluent state builder
    #[must_use]
    pub fn builder(schema: &Arc<Schema>) -> StateBuilder {
        StateBuilder::new(schema)
    }

    /// Schema this state is typed against
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// All objects, ordered by id
    #[must_use]
    pub fn objects(&self) -> &[ObjectInstance] {
        &self.objects
    }

    /// Object by id
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&ObjectInstance> {
        self.objects
            .binary_search_by(|o| o.id.cmp(&id))
            .ok()
            .map(|i| &self.objects[i])
    }

    /// Attribute value by object id and attribute name
    #[must_use]
    pub fn get(&self, id: ObjectId, attribute: &str) -> Option<Value> {
        let object = self.object(id)?;
        let index = self.schema.class(object.class).attribute_index(attribute)?;
        object.values.get(index).copied()
    }

    /// Attribute value by object id and attribute index
    #[must_use]
    pub fn value(&self, id: ObjectId, attribute: usize) -> Option<Value> {
        self.object(id).and_then(|o| o.values.get(attribute).copied())
    }

    /// Objects of one class, ordered by id
    pub fn objects_of_class(&self, class: ClassId) -> impl Iterator<Item = &ObjectInstance> + '_ {
        self.objects.iter().filter(move |o| o.class == class)
    }

    /// View an object with its class declaration
    #[must_use]
    pub fn view<'a>(&'a self, object: &'a ObjectInstance) -> ObjectView<'a> {
        ObjectView {
            class: self.schema.class(object.class),
            instance: object,
        }
    }

    /// A copy with some attribute values replaced, domain-checked.
    pub fn with_values(&self, changes: &[(ObjectId, usize, Value)]) -> Result<Self> {
        let mut objects = self.objects.clone();
        for &(id, attribute, value) in changes {
            let index = objects
                .binary_search_by(|o| o.id.cmp(&id))
                .map_err(|_| OomdpError::InvalidState(format!("no object {id}")))?;
            let object = &mut objects[index];
            if attribute >= object.values.len() {
                return Err(OomdpError::InvalidState(format!(
                    "object {id} has no attribute {attribute}"
                )));
            }
            self.schema
                .check_value(object.class, attribute, value, || format!("update of object {id}"))?;
            object.values[attribute] = value;
        }
        Ok(Self {
            schema: Arc::clone(&self.schema),
            objects,
        })
    }

    /// A copy with one attribute, addressed by name, replaced
    pub fn with_value(&self, id: ObjectId, attribute: &str, value: Value) -> Result<Self> {
        let object = self
            .object(id)
            .ok_or_else(|| OomdpError::InvalidState(format!("no object {id}")))?;
        let index = self
            .schema
            .class(object.class)
            .attribute_index(attribute)
            .ok_or_else(|| OomdpError::InvalidState(format!("object {id} has no `{attribute}`")))?;
        self.with_values(&[(id, index, value)])
    }

    /// Whether both states have the same ids bound to the same classes
    #[must_use]
    pub fn same_objects(&self, other: &State) -> bool {
        self.objects.len() == other.objects.len()
            && self
                .objects
                .iter()
                .zip(&other.objects)
                .all(|(a, b)| a.id == b.id && a.class == b.class)
    }

    /// Canonical serialisation (JSON)
    pub fn canonical_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Hash that is stable across runs and platforms
    #[must_use]
    pub fn stable_hash(&self) -> u64 {
        let mut hasher = Sha256::new();
        for object in &self.objects {
            hasher.update(object.id.0.to_le_bytes());
            hasher.update((object.class.0 as u64).to_le_bytes());
            for value in &object.values {
                hasher.update(value.to_le_bytes());
            }
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.objects == other.objects
    }
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        self.objects.cmp(&other.objects)
    }
}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.objects.hash(state);
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.objects)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, object) in self.objects.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let class = self.schema.class(object.class);
            write!(f, "{}{}(", class.name, object.id)?;
            for (j, (attr, value)) in class.attributes.iter().zip(&object.values).enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", attr.name, value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State[{self}]")
    }
}

/// Builder for states
pub struct StateBuilder {
    schema: Arc<Schema>,
    objects: Vec<(u32, String, Vec<(String, Value)>)>,
}

impl StateBuilder {
    /// Start an empty state
    #[must_use]
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            objects: Vec::new(),
        }
    }

    /// Add an object
    #[must_use]
    pub fn object(mut self, id: u32, class: &str, attributes: &[(&str, Value)]) -> Self {
        self.objects.push((
            id,
            class.to_string(),
            attributes.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        ));
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<State> {
        let mut objects = Vec::with_capacity(self.objects.len());
        for (id, class_name, attributes) in self.objects {
            let id = ObjectId(id);
            let class = self
                .schema
                .class_id(&class_name)
                .ok_or_else(|| OomdpError::InvalidState(format!("unknown class `{class_name}`")))?;
            let decl = self.schema.class(class);
            let mut values: Vec<Option<Value>> = vec![None; decl.attributes.len()];
            for (name, value) in attributes {
                let index = decl.attribute_index(&name).ok_or_else(|| {
                    OomdpError::InvalidState(format!("class `{class_name}` has no `{name}`"))
                })?;
                if values[index].replace(value).is_some() {
                    return Err(OomdpError::InvalidState(format!(
                        "attribute `{name}` of object {id} given twice"
                    )));
                }
                self.schema
                    .check_value(class, index, value, || format!("construction of object {id}"))?;
            }
            let values = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    v.ok_or_else(|| {
                        OomdpError::InvalidState(format!(
                            "object {id} is missing `{}`",
                            decl.attributes[i].name
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            objects.push(ObjectInstance { id, class, values });
        }
        objects.sort_by_key(|o| o.id);
        if objects.windows(2).any(|w| w[0].id == w[1].id) {
            return Err(OomdpError::InvalidState("duplicate object id".into()));
        }
        Ok(State {
            schema: self.schema,
            objects,
        })
    }
}
