//! Apply a JSON Patch to JSON input

use super::CliError;
use crate::{config::EngineConfig, patch::Patcher};

/// Options for the patch command
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Patch document: a JSON array of operations
    pub patch: String,
    /// JSON input string
    pub input: Option<String>,
    pub config: EngineConfig,
}

pub fn execute_patch(options: &PatchOptions) -> Result<String, CliError> {
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let mut patcher = Patcher::with_config(&options.config);
    let out = patcher.apply_wire(input.as_bytes(), &options.patch)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
