//! Run expressions against JSON input

use rayon::prelude::*;

use super::CliError;
use crate::{
    config::EngineConfig,
    filter::{Filter, Lambda},
    pool::Pool,
    sql::SqliteTranslator,
};

/// Options shared by the filter, eval and explain commands
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Expression text, or operation JSON when `wire` is set
    pub expr: String,
    /// JSON input string
    pub input: Option<String>,
    /// Treat `expr` as wire-format JSON
    pub wire: bool,
    /// Treat every non-empty input line as its own document
    pub lines: bool,
    pub config: EngineConfig,
}

/// Outcome of filtering newline-delimited documents
#[derive(Debug, Default)]
pub struct FilterLines {
    /// Documents that passed, as given
    pub matched: Vec<String>,
    /// Documents skipped because they failed to read or evaluate
    pub failed: usize,
}

fn compile_filter(options: &QueryOptions) -> Result<Filter, CliError> {
    Ok(if options.wire {
        Filter::from_wire(&options.expr, &options.config)?
    } else {
        Filter::parse(&options.expr, &options.config)?
    })
}

fn compile_lambda(options: &QueryOptions) -> Result<Lambda, CliError> {
    Ok(if options.wire {
        Lambda::from_wire(&options.expr, &options.config)?
    } else {
        Lambda::parse(&options.expr, &options.config)?
    })
}

/// Decide whether the single input document passes.
pub fn execute_filter(options: &QueryOptions) -> Result<bool, CliError> {
    let mut filter = compile_filter(options)?;
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    Ok(filter.filter(input.as_bytes())?)
}

/// Filter newline-delimited documents. A document that fails is logged
/// and skipped; it does not stop the batch.
///
/// Lines are split into contiguous chunks processed in parallel; each chunk
/// borrows its own filter from a pool. Matches keep input order.
pub fn execute_filter_lines(options: &QueryOptions) -> Result<FilterLines, CliError> {
    let prototype = compile_filter(options)?;
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let lines: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let workers = rayon::current_num_threads().min(options.config.pool_capacity.max(1));
    let chunk_size = lines.len().div_ceil(workers).max(1);
    let pool = Pool::with_config(&options.config, move || prototype.clone());

    let chunks: Vec<FilterLines> = lines
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut filter = pool.lend();
            let mut outcome = FilterLines::default();
            for &(n, line) in chunk {
                match filter.filter(line.as_bytes()) {
                    Ok(true) => outcome.matched.push(line.to_string()),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(line = n + 1, error = %e, "skipping document");
                        outcome.failed += 1;
                    }
                }
            }
            outcome
        })
        .collect();

    let mut outcome = FilterLines::default();
    for chunk in chunks {
        outcome.matched.extend(chunk.matched);
        outcome.failed += chunk.failed;
    }
    Ok(outcome)
}

/// Evaluate the expression as a projection of the input document.
pub fn execute_eval(options: &QueryOptions) -> Result<serde_json::Value, CliError> {
    let mut lambda = compile_lambda(options)?;
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    Ok(lambda.eval(input.as_bytes())?)
}

/// Show the compiled expression: folded text, wire JSON and SQLite clause.
pub fn execute_explain(options: &QueryOptions) -> Result<serde_json::Value, CliError> {
    let lambda = compile_lambda(options)?;
    let wire = serde_json::to_value(lambda.body())?;
    let sql = SqliteTranslator::new("data", lambda.arg()).where_clause(lambda.body());
    Ok(serde_json::json!({
        "arg": lambda.arg(),
        "expression": lambda.body().to_string(),
        "wire": wire,
        "sql": match sql {
            Ok(clause) => serde_json::Value::String(clause),
            Err(e) => serde_json::Value::String(format!("-- {}", e)),
        },
    }))
}
