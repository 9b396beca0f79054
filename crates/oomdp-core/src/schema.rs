//! Schema registry: object classes, attribute domains and relation predicates
//!
//! A schema is assembled with [`SchemaBuilder`] and frozen into an immutable
//! [`Schema`], which is then the only reference for typing states,
//! evaluating relations and lifting conditions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::condition::{Term, TermArg};
use crate::effect::EffectKind;
use crate::error::{OomdpError, SchemaError};
use crate::state::{ObjectView, Value};

/// Index of a class in a frozen schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub usize);

/// Index of a relation in a frozen schema (relations are sorted by name)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(pub usize);

/// Finite domain of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    /// Integers in `[low, high)`
    Range {
        /// Inclusive lower bound
        low: Value,
        /// Exclusive upper bound
        high: Value,
    },
    /// `{0, 1}`
    Boolean,
    /// An explicit set of values
    Set(BTreeSet<Value>),
}

impl Domain {
    /// Half-open integer range
    #[must_use]
    pub fn range(low: Value, high: Value) -> Self {
        Self::Range { low, high }
    }

    /// Boolean domain
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// Explicit value set
    pub fn set(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(values.into_iter().collect())
    }

    /// Whether `value` lies in the domain
    #[must_use]
    pub fn contains(&self, value: Value) -> bool {
        match self {
            Self::Range { low, high } => *low <= value && value < *high,
            Self::Boolean => value == 0 || value == 1,
            Self::Set(values) => values.contains(&value),
        }
    }

    /// Whether the domain admits no value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Range { low, high } => low >= high,
            Self::Boolean => false,
            Self::Set(values) => values.is_empty(),
        }
    }

    /// Effect kinds admitted when an attribute does not declare its own
    #[must_use]
    pub fn default_effect_kinds(&self) -> Vec<EffectKind> {
        match self {
            Self::Boolean => vec![EffectKind::NoChange, EffectKind::SetConstant],
            Self::Range { .. } | Self::Set(_) => vec![
                EffectKind::NoChange,
                EffectKind::AssignmentAdd,
                EffectKind::SetConstant,
            ],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { low, high } => write!(f, "[{low}, {high})"),
            Self::Boolean => write!(f, "{{0, 1}}"),
            Self::Set(values) => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}

/// Attribute declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDecl {
    /// Attribute name
    pub name: String,
    /// Admissible values
    pub domain: Domain,
    /// Effect kinds the learner may use to explain changes of this attribute
    pub effect_kinds: Vec<EffectKind>,
}

impl AttributeDecl {
    /// Declare an attribute with the domain's default effect kinds
    pub fn new(name: impl Into<String>, domain: Domain) -> Self {
        let effect_kinds = domain.default_effect_kinds();
        Self {
            name: name.into(),
            domain,
            effect_kinds,
        }
    }

    /// Replace the admissible effect kinds
    #[must_use]
    pub fn with_kinds(mut self, kinds: &[EffectKind]) -> Self {
        let mut kinds = kinds.to_vec();
        kinds.sort_unstable();
        kinds.dedup();
        self.effect_kinds = kinds;
        self
    }

    /// Whether the attribute admits `kind`
    #[must_use]
    pub fn admits(&self, kind: EffectKind) -> bool {
        self.effect_kinds.contains(&kind)
    }
}

/// Object class declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Ordered attributes
    pub attributes: Vec<AttributeDecl>,
}

impl ClassDecl {
    /// Declare an empty class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.attributes.push(AttributeDecl::new(name, domain));
        self
    }

    /// Position of an attribute by name
    #[must_use]
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }
}

/// Relation predicate over the argument objects
pub type Predicate = Arc<dyn Fn(&[ObjectView<'_>]) -> bool + Send + Sync>;

/// Relation declaration (unfrozen: parameters are class names)
#[derive(Clone)]
pub struct RelationDecl {
    /// Relation name
    pub name: String,
    /// Parameter class names
    pub params: Vec<String>,
    predicate: Predicate,
}

impl RelationDecl {
    /// Declare a relation with a pure predicate body
    pub fn new<F>(name: impl Into<String>, params: &[&str], predicate: F) -> Self
    where
        F: Fn(&[ObjectView<'_>]) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for RelationDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDecl")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A frozen relation
#[derive(Clone)]
pub struct Relation {
    /// Relation name
    pub name: String,
    /// Parameter classes
    pub params: Vec<ClassId>,
    predicate: Predicate,
}

impl Relation {
    /// Evaluate the predicate on argument objects
    #[must_use]
    pub fn holds(&self, args: &[ObjectView<'_>]) -> bool {
        (self.predicate)(args)
    }

    /// Number of parameters
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Immutable schema
#[derive(Debug)]
pub struct Schema {
    name: String,
    classes: Vec<ClassDecl>,
    relations: Vec<Relation>,
    templates: Vec<Vec<Term>>,
    global_terms: Vec<Term>,
}

impl Schema {
    /// Schema name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All classes in declaration order
    #[must_use]
    pub fn classes(&self) -> &[ClassDecl] {
        &self.classes
    }

    /// Class declaration by id
    ///
    /// # Panics
    /// If `id` did not come from this schema.
    #[must_use]
    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.0]
    }

    /// Look up a class id by name
    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.classes.iter().position(|c| c.name == name).map(ClassId)
    }

    /// All relations, sorted by name
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Relation by id
    #[must_use]
    pub fn relation(&self, id: RelationId) -> &Relation {
        &self.relations[id.0]
    }

    /// Look up a relation id by name
    #[must_use]
    pub fn relation_id(&self, name: &str) -> Option<RelationId> {
        self.relations.iter().position(|r| r.name == name).map(RelationId)
    }

    /// Lifted term templates mentioning an object of `class`
    #[must_use]
    pub fn templates(&self, class: ClassId) -> &[Term] {
        &self.templates[class.0]
    }

    /// One fully existential term per relation
    #[must_use]
    pub fn global_terms(&self) -> &[Term] {
        &self.global_terms
    }

    /// Fail with `DomainViolation` unless `value` is admissible for the attribute
    pub fn check_value(
        &self,
        class: ClassId,
        attribute: usize,
        value: Value,
        context: impl FnOnce() -> String,
    ) -> crate::Result<()> {
        let decl = self.class(class);
        let attr = &decl.attributes[attribute];
        if attr.domain.contains(value) {
            Ok(())
        } else {
            Err(OomdpError::DomainViolation {
                class: decl.name.clone(),
                attribute: attr.name.clone(),
                value,
                domain: attr.domain.to_string(),
                context: context(),
            })
        }
    }

    /// Human-readable form of a term, e.g. `touch_w(Focus, wall)`
    #[must_use]
    pub fn describe_term(&self, term: &Term) -> String {
        let args: Vec<&str> = term
            .args
            .iter()
            .map(|arg| match arg {
                TermArg::Focus => "Focus",
                TermArg::Class(c) => self.class(*c).name.as_str(),
            })
            .collect();
        format!("{}({})", self.relation(term.relation).name, args.join(", "))
    }
}

/// Builder for creating schemas fluently
pub struct SchemaBuilder {
    name: String,
    classes: Vec<ClassDecl>,
    relations: Vec<RelationDecl>,
}

impl SchemaBuilder {
    /// Start a schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Register a class declaration
    pub fn declare_class(&mut self, class: ClassDecl) -> &mut Self {
        self.classes.push(class);
        self
    }

    /// Register a relation declaration
    pub fn declare_relation(&mut self, relation: RelationDecl) -> &mut Self {
        self.relations.push(relation);
        self
    }

    /// Begin a class with the fluent attribute builder
    pub fn class(self, name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            builder: self,
            class: ClassDecl::new(name),
        }
    }

    /// Add a relation
    #[must_use]
    pub fn relation<F>(mut self, name: &str, params: &[&str], predicate: F) -> Self
    where
        F: Fn(&[ObjectView<'_>]) -> bool + Send + Sync + 'static,
    {
        self.relations.push(RelationDecl::new(name, params, predicate));
        self
    }

    /// Validate and freeze the schema
    pub fn freeze(self) -> Result<Schema, SchemaError> {
        if self.classes.is_empty() {
            return Err(SchemaError::NoClasses(self.name));
        }

        let mut class_names = BTreeSet::new();
        for class in &self.classes {
            if !class_names.insert(class.name.as_str()) {
                return Err(SchemaError::DuplicateClass(class.name.clone()));
            }
            let mut attribute_names = BTreeSet::new();
            for attr in &class.attributes {
                if !attribute_names.insert(attr.name.as_str()) {
                    return Err(SchemaError::DuplicateAttribute {
                        class: class.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
                if attr.domain.is_empty() {
                    return Err(SchemaError::EmptyDomain {
                        class: class.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
                if attr.effect_kinds.is_empty() {
                    return Err(SchemaError::NoEffectKinds {
                        class: class.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
            }
        }

        let class_id = |name: &str| self.classes.iter().position(|c| c.name == name).map(ClassId);

        let mut relation_names = BTreeSet::new();
        let mut relations = Vec::with_capacity(self.relations.len());
        for decl in &self.relations {
            if !relation_names.insert(decl.name.as_str()) {
                return Err(SchemaError::DuplicateRelation(decl.name.clone()));
            }
            if decl.params.is_empty() {
                return Err(SchemaError::NullaryRelation(decl.name.clone()));
            }
            let params = decl
                .params
                .iter()
                .map(|p| {
                    class_id(p.as_str()).ok_or_else(|| SchemaError::UnknownClass {
                        relation: decl.name.clone(),
                        class: p.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            relations.push(Relation {
                name: decl.name.clone(),
                params,
                predicate: Arc::clone(&decl.predicate),
            });
        }
        relations.sort_by(|a, b| a.name.cmp(&b.name));

        let mut templates = vec![Vec::new(); self.classes.len()];
        let mut global_terms = Vec::with_capacity(relations.len());
        for (r, relation) in relations.iter().enumerate() {
            let relation_id = RelationId(r);
            for (focus, class) in relation.params.iter().enumerate() {
                let args = relation
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, c)| if i == focus { TermArg::Focus } else { TermArg::Class(*c) })
                    .collect();
                templates[class.0].push(Term::new(relation_id, args));
            }
            global_terms.push(Term::new(
                relation_id,
                relation.params.iter().map(|c| TermArg::Class(*c)).collect(),
            ));
        }

        tracing::debug!(
            schema = %self.name,
            classes = self.classes.len(),
            relations = relations.len(),
            "schema frozen"
        );

        Ok(Schema {
            name: self.name,
            classes: self.classes,
            relations,
            templates,
            global_terms,
        })
    }
}

/// Builder for one class
pub struct ClassBuilder {
    builder: SchemaBuilder,
    class: ClassDecl,
}

impl ClassBuilder {
    /// Add an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.class.attributes.push(AttributeDecl::new(name, domain));
        self
    }

    /// Add a boolean attribute
    #[must_use]
    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.attribute(name, Domain::Boolean)
    }

    /// Override the effect kinds of the most recently added attribute
    #[must_use]
    pub fn kinds(mut self, kinds: &[EffectKind]) -> Self {
        if let Some(last) = self.class.attributes.pop() {
            self.class.attributes.push(last.with_kinds(kinds));
        }
        self
    }

    /// Finish the class and return to the schema builder
    pub fn and(mut self) -> SchemaBuilder {
        self.builder.classes.push(self.class);
        self.builder
    }

    /// Finish the class and freeze the schema
    pub fn freeze(self) -> Result<Schema, SchemaError> {
        self.and().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid() -> SchemaBuilder {
        SchemaBuilder::new("grid")
            .class("agent")
            .attribute("x", Domain::range(0, 3))
            .and()
            .class("flag")
            .boolean("up")
            .and()
    }

    #[test]
    fn test_freeze_sorts_relations() {
        let schema = grid()
            .relation("zeta", &["agent"], |_| true)
            .relation("alpha", &["agent", "flag"], |_| false)
            .freeze()
            .unwrap();
        let names: Vec<&str> = schema.relations().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(schema.relation_id("zeta"), Some(RelationId(1)));
    }

    #[test]
    fn test_templates_per_class() {
        let schema = grid()
            .relation("near", &["agent", "flag"], |_| true)
            .freeze()
            .unwrap();
        let agent = schema.class_id("agent").unwrap();
        let flag = schema.class_id("flag").unwrap();
        assert_eq!(schema.templates(agent).len(), 1);
        assert_eq!(
            schema.describe_term(&schema.templates(flag)[0]),
            "near(agent, Focus)"
        );
        assert_eq!(schema.describe_term(&schema.global_terms()[0]), "near(agent, flag)");
    }

    #[test]
    fn test_empty_domain_rejected() {
        let err = SchemaBuilder::new("bad")
            .class("agent")
            .attribute("x", Domain::range(2, 2))
            .freeze()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::EmptyDomain {
                class: "agent".into(),
                attribute: "x".into()
            }
        );
    }

    #[test]
    fn test_unknown_class_rejected() {
        let err = grid()
            .relation("on", &["agent", "boat"], |_| true)
            .freeze()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownClass { ref class, .. } if class == "boat"));
    }

    #[test]
    fn test_declare_operations() {
        let mut builder = SchemaBuilder::new("decl");
        builder
            .declare_class(ClassDecl::new("agent").attribute("x", Domain::set([1, 3, 5])))
            .declare_relation(RelationDecl::new("odd", &["agent"], |a| {
                a[0].get("x").is_some_and(|x| x % 2 == 1)
            }));
        let schema = builder.freeze().unwrap();
        assert_eq!(schema.classes().len(), 1);
        assert!(schema.class(ClassId(0)).attributes[0].domain.contains(3));
        assert!(!schema.class(ClassId(0)).attributes[0].domain.contains(2));
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let err = grid().class("agent").freeze().unwrap_err();
        assert_eq!(err, SchemaError::DuplicateClass("agent".into()));
    }

    #[test]
    fn test_default_kinds_by_domain() {
        assert_eq!(
            AttributeDecl::new("b", Domain::Boolean).effect_kinds,
            vec![EffectKind::NoChange, EffectKind::SetConstant]
        );
        let custom = AttributeDecl::new("n", Domain::range(0, 10))
            .with_kinds(&[EffectKind::AssignmentMultiply, EffectKind::NoChange]);
        assert!(custom.admits(EffectKind::AssignmentMultiply));
        assert!(!custom.admits(EffectKind::SetConstant));
    }

    #[test]
    fn test_check_value() {
        let schema = grid().freeze().unwrap();
        let agent = schema.class_id("agent").unwrap();
        assert!(schema.check_value(agent, 0, 2, String::new).is_ok());
        let err = schema.check_value(agent, 0, 3, || "test".into()).unwrap_err();
        assert!(matches!(err, OomdpError::DomainViolation { value: 3, .. }));
    }
}
