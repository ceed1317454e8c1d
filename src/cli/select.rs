//! Extract paths from JSON input

use super::CliError;
use crate::{config::EngineConfig, selector::Selector};

/// Options for the select command
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Paths such as `a.b`, `items[0].id` or `items[*].price`
    pub paths: Vec<String>,
    /// JSON input string
    pub input: Option<String>,
    pub config: EngineConfig,
}

/// Select every path in one pass. The result maps each path to the list of
/// values it matched, objects and arrays included in full.
pub fn execute_select(options: &SelectOptions) -> Result<serde_json::Value, CliError> {
    let mut selector = Selector::with_config(&options.paths, &options.config)?;
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let results = selector.select(input.as_bytes())?;

    let mut out = serde_json::Map::new();
    for (path, result) in options.paths.iter().zip(results) {
        let values = result
            .json
            .iter()
            .map(|raw| serde_json::from_str(raw))
            .collect::<Result<Vec<serde_json::Value>, _>>()?;
        out.insert(path.clone(), serde_json::Value::Array(values));
    }
    tracing::debug!(skipped = selector.skipped(), events = selector.events_read(), "selected");
    Ok(serde_json::Value::Object(out))
}
