//! Compiled lambdas and filters: a validated, constant-folded operation
//! together with the scratch state needed to run it against documents.

use std::fmt;

use crate::{
    ast::{self, Operation, WireError},
    config::EngineConfig,
    document::Document,
    evaluator::{EvalContext, EvalResult, InitContext, InitError, fold_constants},
    json::ReadError,
    lexer::Lexer,
    parser::{ParseError, Parser},
    path::has_wildcard,
    pool::Reset,
    scalar::Scalar,
};

/// Failure to turn text or wire JSON into a runnable lambda.
#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    Wire(WireError),
    Init(InitError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{}", e),
            CompileError::Wire(e) => write!(f, "{}", e),
            CompileError::Init(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Parse(e) => Some(e),
            CompileError::Wire(e) => Some(e),
            CompileError::Init(e) => Some(e),
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<WireError> for CompileError {
    fn from(e: WireError) -> Self {
        CompileError::Wire(e)
    }
}

impl From<InitError> for CompileError {
    fn from(e: InitError) -> Self {
        CompileError::Init(e)
    }
}

/// Failure at the filter/eval boundary for one document.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The document could not be read
    Read(ReadError),
    /// Evaluation produced an error value; carries its message
    Eval(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Read(e) => write!(f, "{}", e),
            FilterError::Eval(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterError::Read(e) => Some(e),
            FilterError::Eval(_) => None,
        }
    }
}

impl From<ReadError> for FilterError {
    fn from(e: ReadError) -> Self {
        FilterError::Read(e)
    }
}

/// `arg => body`, validated and folded once, evaluated per document.
#[derive(Debug, Clone)]
pub struct Lambda {
    arg: String,
    body: Operation,
    doc: Document,
    cx: EvalContext,
}

impl Reset for Lambda {
    fn reset(&mut self) {
        self.doc.clear();
        self.cx.reset();
    }
}

impl Lambda {
    pub fn new(arg: impl Into<String>, body: Operation) -> Result<Self, InitError> {
        Self::with_config(arg, body, &EngineConfig::default())
    }

    pub fn with_config(
        arg: impl Into<String>,
        mut body: Operation,
        config: &EngineConfig,
    ) -> Result<Self, InitError> {
        let arg = arg.into();
        InitContext::new(&arg).init(&mut body)?;
        fold_constants(&mut body);
        tracing::debug!(arg = %arg, body = %body, "compiled lambda");
        Ok(Lambda {
            arg,
            body,
            doc: Document::with_max_depth(config.max_depth),
            cx: EvalContext::new(),
        })
    }

    /// Compile expression text such as `o => o.price * 2` or `o.price * 2`.
    pub fn parse(text: &str, config: &EngineConfig) -> Result<Self, CompileError> {
        let (arg, body) = Parser::new(Lexer::new(text))?.parse_lambda(&config.root_arg)?;
        Ok(Self::with_config(arg, body, config)?)
    }

    /// Compile wire JSON; the body is bound to the configured root argument.
    pub fn from_wire(json: &str, config: &EngineConfig) -> Result<Self, CompileError> {
        let body = ast::from_wire(json)?;
        Ok(Self::with_config(config.root_arg.clone(), body, config)?)
    }

    pub fn arg(&self) -> &str {
        &self.arg
    }

    pub fn body(&self) -> &Operation {
        &self.body
    }

    /// Evaluate against one document and return the result as JSON.
    ///
    /// A body that is a plain field returns the referenced subtree, so
    /// objects and arrays come back whole rather than as placeholders.
    pub fn eval(&mut self, json: &[u8]) -> Result<serde_json::Value, FilterError> {
        self.load(json)?;
        if let Operation::Field { path: Some(path), .. } = &self.body
            && !has_wildcard(path)
            && let Some(root) = self.doc.root()
        {
            let mut current = Some(root);
            for segment in &path[1..] {
                current = current.and_then(|id| self.doc.step(id, segment));
            }
            return Ok(current.map_or(serde_json::Value::Null, |id| self.doc.to_json(id)));
        }

        let result = self.evaluate();
        if let Some(err) = result.error() {
            return Err(self.failure(err));
        }
        Ok(result.to_json())
    }

    /// Evaluate against one document, keeping the raw result.
    pub fn eval_result(&mut self, json: &[u8]) -> Result<EvalResult, FilterError> {
        self.load(json)?;
        Ok(self.evaluate())
    }

    fn load(&mut self, json: &[u8]) -> Result<(), FilterError> {
        self.cx.reset();
        self.doc.parse(json)?;
        let root = self.doc.root().ok_or_else(|| ReadError {
            message: "empty document".into(),
            position: 0,
        })?;
        self.cx.bind(&self.arg, root);
        Ok(())
    }

    fn evaluate(&mut self) -> EvalResult {
        self.cx.eval(&self.body, &self.doc)
    }

    fn failure(&self, err: &Scalar) -> FilterError {
        let message = err.error_message().unwrap_or_default().to_string();
        tracing::warn!(expr = %self.body, error = %message, "evaluation failed");
        FilterError::Eval(message)
    }
}

/// How a [`Filter`] decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Always passes; the document is never read
    TrueLiteral,
    /// Never passes; the document is never read
    FalseLiteral,
    Lambda,
}

/// A lambda used as a predicate.
#[derive(Debug, Clone)]
pub struct Filter {
    kind: FilterKind,
    lambda: Lambda,
}

impl Reset for Filter {
    fn reset(&mut self) {
        self.lambda.reset();
    }
}

impl From<Lambda> for Filter {
    fn from(lambda: Lambda) -> Self {
        let kind = match lambda.body {
            Operation::True => FilterKind::TrueLiteral,
            Operation::False => FilterKind::FalseLiteral,
            _ => FilterKind::Lambda,
        };
        Filter { kind, lambda }
    }
}

impl Filter {
    pub fn parse(text: &str, config: &EngineConfig) -> Result<Self, CompileError> {
        Ok(Lambda::parse(text, config)?.into())
    }

    /// Compile wire JSON, accepting only predicate kinds.
    pub fn from_wire(json: &str, config: &EngineConfig) -> Result<Self, CompileError> {
        let body = ast::filter_from_wire(json)?.into_operation();
        Ok(Lambda::with_config(config.root_arg.clone(), body, config)?.into())
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    /// `Ok(true)` only when the predicate evaluates to `true`. An error
    /// value is reported as [`FilterError::Eval`].
    pub fn filter(&mut self, json: &[u8]) -> Result<bool, FilterError> {
        match self.kind {
            FilterKind::TrueLiteral => return Ok(true),
            FilterKind::FalseLiteral => return Ok(false),
            FilterKind::Lambda => {}
        }
        let result = self.lambda.eval_result(json)?.into_scalar();
        match result {
            Scalar::Bool(b) => Ok(b),
            Scalar::Error(_) => Err(self.lambda.failure(&result)),
            _ => Ok(false),
        }
    }

    /// Evaluate the underlying lambda as a projection.
    pub fn eval(&mut self, json: &[u8]) -> Result<serde_json::Value, FilterError> {
        self.lambda.eval(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(text: &str) -> Filter {
        Filter::parse(text, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_literal_kinds() {
        assert_eq!(filter("true").kind(), FilterKind::TrueLiteral);
        assert_eq!(filter("1 < 2 && !false").kind(), FilterKind::TrueLiteral);
        assert_eq!(filter("o => 3 == 4").kind(), FilterKind::FalseLiteral);
        assert_eq!(filter("o.a == 1").kind(), FilterKind::Lambda);
    }

    #[test]
    fn test_static_filter_ignores_document() {
        assert_eq!(filter("true").filter(b"{not json"), Ok(true));
        assert_eq!(filter("false").filter(b"{not json"), Ok(false));
        assert!(matches!(
            filter("o.a == 1").filter(b"{not json"),
            Err(FilterError::Read(_))
        ));
    }

    #[test]
    fn test_eval_returns_subtree_for_field() {
        let mut lambda = Lambda::parse("o.b", &EngineConfig::default()).unwrap();
        assert_eq!(
            lambda.eval(br#"{"b":{"c":[1,2]}}"#).unwrap(),
            serde_json::json!({"c": [1, 2]})
        );
    }

    #[test]
    fn test_sequence_is_not_a_filter_result() {
        let mut f = filter("o.items[*].n > 1");
        assert!(matches!(
            f.filter(br#"{"items":[{"n":1},{"n":2}]}"#),
            Err(FilterError::Eval(_))
        ));
    }
}
