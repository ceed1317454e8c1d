//! Streaming JSON filter, selector and patch engine.
//!
//! - [`Filter`]/[`Lambda`] evaluate expressions such as
//!   `o => o.tags.Any(t => t == 'b')` against documents.
//! - [`Selector`] extracts many paths from a document in one pass.
//! - [`Patcher`] applies JSON Patch operations while copying untouched
//!   input verbatim.
//!
//! All three share [`Scalar`] values and the [`Operation`] tree.
pub mod ast;
pub mod cli;
pub mod config;
pub mod document;
pub mod evaluator;
pub mod filter;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod patch;
pub mod path;
pub mod pool;
pub mod scalar;
pub mod selector;
pub mod sql;

pub use ast::{FilterOperation, Operation, Token, WireError};
pub use config::EngineConfig;
pub use document::{Document, NodeId};
pub use evaluator::{EvalContext, EvalResult, InitContext, InitError};
pub use filter::{CompileError, Filter, FilterError, FilterKind, Lambda};
pub use json::{JsonEvent, JsonReader, JsonWriter, ReadError};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, parse_operation};
pub use patch::{PatchError, PatchOperation, Patcher};
pub use pool::{Lease, Pool, Reset};
pub use scalar::Scalar;
pub use selector::{SelectResult, Selector};
pub use sql::{SqliteTranslator, Traverse};
