//! CLI support for jsonsieve
//!
//! Each command is available as a plain function taking an options struct,
//! so the `sieve` binary stays a thin argument parser.

mod patch;
mod query;
mod select;

pub use patch::{PatchOptions, execute_patch};
pub use query::{
    FilterLines, QueryOptions, execute_eval, execute_explain, execute_filter, execute_filter_lines,
};
pub use select::{SelectOptions, execute_select};

use std::io;

use crate::{
    ast::WireError, config::ConfigError, filter::CompileError, filter::FilterError,
    json::ReadError, patch::PatchError, path::PathError, sql::SqlError,
};

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Expression text or wire JSON could not be compiled
    Compile(CompileError),
    /// Filter or eval failed on the input document
    Filter(FilterError),
    /// Input document is malformed
    Read(ReadError),
    /// Selector path is malformed
    Path(PathError),
    Patch(PatchError),
    Wire(WireError),
    Sql(SqlError),
    Config(ConfigError),
    /// JSON output error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Compile(e) => write!(f, "Compile error: {}", e),
            CliError::Filter(e) => write!(f, "Evaluation error: {}", e),
            CliError::Read(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Path(e) => write!(f, "{}", e),
            CliError::Patch(e) => write!(f, "Patch error: {}", e),
            CliError::Wire(e) => write!(f, "{}", e),
            CliError::Sql(e) => write!(f, "SQL error: {}", e),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Json(e) => write!(f, "JSON error: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No input provided. Use --input or pipe JSON to stdin."),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Compile(e) => Some(e),
            CliError::Filter(e) => Some(e),
            CliError::Read(e) => Some(e),
            CliError::Path(e) => Some(e),
            CliError::Patch(e) => Some(e),
            CliError::Wire(e) => Some(e),
            CliError::Sql(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NoInput => None,
        }
    }
}

impl From<CompileError> for CliError {
    fn from(e: CompileError) -> Self {
        CliError::Compile(e)
    }
}

impl From<FilterError> for CliError {
    fn from(e: FilterError) -> Self {
        CliError::Filter(e)
    }
}

impl From<ReadError> for CliError {
    fn from(e: ReadError) -> Self {
        CliError::Read(e)
    }
}

impl From<PathError> for CliError {
    fn from(e: PathError) -> Self {
        CliError::Path(e)
    }
}

impl From<PatchError> for CliError {
    fn from(e: PatchError) -> Self {
        CliError::Patch(e)
    }
}

impl From<WireError> for CliError {
    fn from(e: WireError) -> Self {
        CliError::Wire(e)
    }
}

impl From<SqlError> for CliError {
    fn from(e: SqlError) -> Self {
        CliError::Sql(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
