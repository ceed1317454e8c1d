//! # Operation Abstract Syntax Tree
//!
//! The expression tree evaluated by filters and lambdas, shared with the
//! wire format and the SQL translator.
//!
//! - **[operation]** - [`Operation`] nodes, shape views and [`FilterOperation`]
//! - **[tokens]** - Lexical tokens of the textual syntax
//!
//! ## Textual syntax
//!
//! ```text
//! o => o.name == 'Foo' && o.tags.Any(t => t == 'b')
//! ```
//!
//! Fields are dotted paths rooted at a lambda argument (`o.address.city`).
//! Array steps are written `[0]` or `[*]`; a wildcard step makes the field
//! produce one value per element.
//!
//! ## Wire format
//!
//! Every node serializes as a JSON object tagged by `"op"`:
//!
//! ```text
//! {"op":"any","field":{"op":"field","name":"o.tags"},"arg":"t",
//!  "predicate":{"op":"equal","left":{"op":"field","name":"t"},"right":{"op":"string","value":"b"}}}
//! ```
use std::fmt;

pub mod operation;
pub mod tokens;

pub use operation::{
    AggregateKind, BinaryKind, FilterOperation, NotAFilter, Operation, QuantifierKind, Shape,
    UnaryKind,
};
pub use tokens::Token;

/// Operation or patch JSON that does not match the wire format.
#[derive(Debug)]
pub struct WireError(pub serde_json::Error);

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid wire format: {}", self.0)
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError(e)
    }
}

/// Decode an operation from its wire JSON.
pub fn from_wire(json: &str) -> Result<Operation, WireError> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a predicate; value-producing kinds are rejected.
pub fn filter_from_wire(json: &str) -> Result<FilterOperation, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn to_wire(op: &Operation) -> Result<String, WireError> {
    Ok(serde_json::to_string(op)?)
}
