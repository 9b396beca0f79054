//! Error types for the OO-MDP core library

use thiserror::Error;

use crate::state::Value;

/// Malformed schema declarations, reported when a schema is frozen
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A schema must declare at least one class
    #[error("schema `{0}` declares no classes")]
    NoClasses(String),

    /// Two classes share a name
    #[error("duplicate class `{0}`")]
    DuplicateClass(String),

    /// Two attributes of one class share a name
    #[error("duplicate attribute `{attribute}` in class `{class}`")]
    DuplicateAttribute {
        /// Class name
        class: String,
        /// Attribute name
        attribute: String,
    },

    /// An attribute domain admits no value
    #[error("attribute `{class}.{attribute}` has an empty domain")]
    EmptyDomain {
        /// Class name
        class: String,
        /// Attribute name
        attribute: String,
    },

    /// An attribute admits no effect kind at all
    #[error("attribute `{class}.{attribute}` admits no effect kinds")]
    NoEffectKinds {
        /// Class name
        class: String,
        /// Attribute name
        attribute: String,
    },

    /// Two relations share a name
    #[error("duplicate relation `{0}`")]
    DuplicateRelation(String),

    /// A relation takes no arguments
    #[error("relation `{0}` has no parameters")]
    NullaryRelation(String),

    /// A relation parameter names a class that was never declared
    #[error("relation `{relation}` references unknown class `{class}`")]
    UnknownClass {
        /// Relation name
        relation: String,
        /// Missing class name
        class: String,
    },
}

/// Core error type for OO-MDP operations
#[derive(Error, Debug)]
pub enum OomdpError {
    /// Schema construction failed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Action symbol outside the closed action set
    #[error("Illegal action: {0}")]
    IllegalAction(String),

    /// A computed attribute value would leave its declared domain
    #[error("Domain violation: {class}.{attribute} = {value} is outside {domain} ({context})")]
    DomainViolation {
        /// Class of the offending object
        class: String,
        /// Offending attribute
        attribute: String,
        /// Value that was produced
        value: Value,
        /// Declared domain
        domain: String,
        /// Where the value came from, including the effect entry and witness state
        context: String,
    },

    /// Step budget exhausted
    #[error("Cancelled: step budget exhausted")]
    Cancelled,

    /// Structurally invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Environment misuse (e.g. stepping a finished episode)
    #[error("Environment error: {0}")]
    Environment(String),

    /// Rejected configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OomdpError {
    /// Whether the caller can reasonably continue after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::IllegalAction(_))
    }
}

/// Result type alias for OO-MDP operations
pub type Result<T> = std::result::Result<T, OomdpError>;
