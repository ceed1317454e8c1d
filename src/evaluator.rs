use std::fmt;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{
    ast::{AggregateKind, BinaryKind, Operation, QuantifierKind, Shape, UnaryKind},
    document::{Document, NodeId},
    path::{Path, PathError, PathSegment, has_wildcard, parse_path},
    pool::Reset,
    scalar::Scalar,
};

/// Errors found while validating an operation tree, before any document
/// is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    /// A field refers to an argument no enclosing lambda binds
    UnknownArgument { argument: String, field: String },

    /// A variable-arity node has no operands
    InvalidArity { op: &'static str },

    /// A quantifier or aggregate iterates something other than a field
    ExpectedField { op: &'static str },

    InvalidPath(PathError),

    /// A value-producing operation was used as a filter
    NotAFilter { op: &'static str },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::UnknownArgument { argument, field } => {
                write!(f, "unknown argument '{}' in field '{}'", argument, field)
            }
            InitError::InvalidArity { op } => write!(f, "'{}' requires at least one operand", op),
            InitError::ExpectedField { op } => write!(f, "'{}' must iterate a field", op),
            InitError::InvalidPath(e) => write!(f, "{}", e),
            InitError::NotAFilter { op } => {
                write!(f, "operation '{}' does not produce a boolean", op)
            }
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::InvalidPath(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PathError> for InitError {
    fn from(e: PathError) -> Self {
        InitError::InvalidPath(e)
    }
}

/// Validation pass over an operation tree.
///
/// Binds argument names in nested lambda scopes, checks that every field
/// starts with a bound argument and caches the parsed field paths.
pub struct InitContext {
    scopes: Vec<String>,
}

impl InitContext {
    pub fn new(root_arg: &str) -> Self {
        InitContext {
            scopes: vec![root_arg.to_string()],
        }
    }

    pub fn init(&mut self, op: &mut Operation) -> Result<(), InitError> {
        use Operation::*;
        let kind = op.kind();
        match op {
            Field { name, path } => {
                let parsed = parse_path(name)?;
                match parsed.first() {
                    Some(PathSegment::Key(arg)) if self.scopes.iter().any(|s| s == arg) => {}
                    first => {
                        let argument = match first {
                            Some(PathSegment::Key(arg)) => arg.clone(),
                            _ => Default::default(),
                        };
                        return Err(InitError::UnknownArgument {
                            argument,
                            field: name.clone(),
                        });
                    }
                }
                *path = Some(parsed);
                Ok(())
            }
            String { .. } | Double { .. } | Int64 { .. } | Null | True | False => Ok(()),
            Abs { value } | Ceiling { value } | Floor { value } | Exp { value } | Log { value }
            | Sqrt { value } | Negate { value } | Length { value } => self.init(value),
            Add { left, right }
            | Subtract { left, right }
            | Multiply { left, right }
            | Divide { left, right }
            | Modulo { left, right }
            | Equal { left, right }
            | NotEqual { left, right }
            | LessThan { left, right }
            | LessThanOrEqual { left, right }
            | GreaterThan { left, right }
            | GreaterThanOrEqual { left, right }
            | Contains { left, right }
            | StartsWith { left, right }
            | EndsWith { left, right } => {
                self.init(left)?;
                self.init(right)
            }
            Min { field, arg, array }
            | Max { field, arg, array }
            | Sum { field, arg, array }
            | Average { field, arg, array } => {
                self.init_iterated(field, "aggregate")?;
                self.scopes.push(arg.clone());
                let result = self.init(array);
                self.scopes.pop();
                result
            }
            Count { field } => self.init_iterated(field, "count"),
            And { operands } | Or { operands } => {
                if operands.is_empty() {
                    return Err(InitError::InvalidArity { op: kind });
                }
                for operand in operands.iter_mut() {
                    self.init(operand)?;
                }
                Ok(())
            }
            Not { operand } => self.init(operand),
            Any { field, arg, predicate }
            | All { field, arg, predicate }
            | CountWhere { field, arg, predicate } => {
                self.init_iterated(field, "quantifier")?;
                self.scopes.push(arg.clone());
                let result = self.init(predicate);
                self.scopes.pop();
                result
            }
        }
    }

    fn init_iterated(&mut self, field: &mut Operation, op: &'static str) -> Result<(), InitError> {
        if !matches!(field, Operation::Field { .. }) {
            return Err(InitError::ExpectedField { op });
        }
        self.init(field)
    }
}

/// Replace subtrees that do not read the document with their value.
///
/// Subtrees that would evaluate to an error are left alone so the
/// diagnostic is reported when the filter runs.
pub fn fold_constants(op: &mut Operation) {
    use Operation::*;
    match op {
        Abs { value } | Ceiling { value } | Floor { value } | Exp { value } | Log { value }
        | Sqrt { value } | Negate { value } | Length { value } => fold_constants(value),
        Add { left, right }
        | Subtract { left, right }
        | Multiply { left, right }
        | Divide { left, right }
        | Modulo { left, right }
        | Equal { left, right }
        | NotEqual { left, right }
        | LessThan { left, right }
        | LessThanOrEqual { left, right }
        | GreaterThan { left, right }
        | GreaterThanOrEqual { left, right }
        | Contains { left, right }
        | StartsWith { left, right }
        | EndsWith { left, right } => {
            fold_constants(left);
            fold_constants(right);
        }
        And { operands } | Or { operands } => operands.iter_mut().for_each(fold_constants),
        Not { operand } => fold_constants(operand),
        Min { array, .. } | Max { array, .. } | Sum { array, .. } | Average { array, .. } => {
            fold_constants(array)
        }
        Any { predicate, .. } | All { predicate, .. } | CountWhere { predicate, .. } => {
            fold_constants(predicate)
        }
        _ => return,
    }

    let foldable = match op.shape() {
        Shape::Unary(_, value) => value.is_literal(),
        Shape::Binary(_, left, right) => left.is_literal() && right.is_literal(),
        Shape::Logical { operands, .. } => operands.iter().all(Operation::is_literal),
        Shape::Not(operand) => operand.is_literal(),
        _ => false,
    };
    if !foldable {
        return;
    }
    let value = EvalContext::new().eval_single(op, &Document::new());
    if let Some(literal) = literal_of(&value) {
        *op = literal;
    }
}

fn literal_of(value: &Scalar) -> Option<Operation> {
    match value {
        Scalar::String(s) => Some(Operation::string(s.clone())),
        Scalar::Double(n) if n.is_finite() => Some(Operation::double(*n)),
        Scalar::Long(n) => Some(Operation::long(*n)),
        Scalar::Bool(b) => Some(Operation::bool(*b)),
        Scalar::Null => Some(Operation::Null),
        _ => None,
    }
}

/// Outcome of evaluating one node: a single value, or one value per
/// element when a field steps through `[*]`.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Single(Scalar),
    Many(Vec<Scalar>),
}

impl EvalResult {
    /// The single value, or an error for a sequence.
    pub fn into_scalar(self) -> Scalar {
        match self {
            EvalResult::Single(s) => s,
            EvalResult::Many(_) => Scalar::error("expected a single value, got a sequence"),
        }
    }

    /// First error carried by the result.
    pub fn error(&self) -> Option<&Scalar> {
        match self {
            EvalResult::Single(s) => s.is_error().then_some(s),
            EvalResult::Many(items) => items.iter().find(|s| s.is_error()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            EvalResult::Single(s) => s.to_json(),
            EvalResult::Many(items) => {
                serde_json::Value::Array(items.iter().map(Scalar::to_json).collect())
            }
        }
    }

    fn map(self, f: impl Fn(&Scalar) -> Scalar) -> EvalResult {
        match self {
            EvalResult::Single(s) => EvalResult::Single(f(&s)),
            EvalResult::Many(items) => EvalResult::Many(items.iter().map(f).collect()),
        }
    }
}

/// Per-evaluation state: lambda argument bindings for the current document.
///
/// Inner quantifier scopes push their argument on top, shadowing outer
/// bindings of the same name.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    bindings: Vec<(String, NodeId)>,
}

impl Reset for EvalContext {
    fn reset(&mut self) {
        self.bindings.clear();
    }
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `arg` to a node of the current document.
    pub fn bind(&mut self, arg: &str, node: NodeId) {
        self.bindings.push((arg.to_string(), node));
    }

    fn lookup(&self, arg: &str) -> Option<NodeId> {
        self.bindings
            .iter()
            .rev()
            .find(|(name, _)| name == arg)
            .map(|(_, node)| *node)
    }

    pub fn eval_single(&mut self, op: &Operation, doc: &Document) -> Scalar {
        self.eval(op, doc).into_scalar()
    }

    pub fn eval(&mut self, op: &Operation, doc: &Document) -> EvalResult {
        use EvalResult::Single;
        match op {
            Operation::Field { name, path } => self.eval_field(name, path.as_ref(), doc),
            Operation::String { value } => Single(Scalar::String(value.clone())),
            Operation::Double { value } => Single(Scalar::Double(*value)),
            Operation::Int64 { value } => Single(Scalar::Long(*value)),
            Operation::Null => Single(Scalar::NULL),
            Operation::True => Single(Scalar::TRUE),
            Operation::False => Single(Scalar::FALSE),
            _ => match op.shape() {
                Shape::Unary(kind, value) => {
                    let input = self.eval(value, doc);
                    let had_error = input.error().is_some();
                    let result = input.map(|s| apply_unary(kind, s));
                    annotate(result, had_error, op)
                }
                Shape::Binary(kind, left, right) => {
                    let left = self.eval(left, doc);
                    let right = self.eval(right, doc);
                    let had_error = left.error().is_some() || right.error().is_some();
                    let result = broadcast(left, right, |a, b| apply_binary(kind, a, b));
                    annotate(result, had_error, op)
                }
                Shape::Logical { is_and, operands } => {
                    let values: Vec<Scalar> =
                        operands.iter().map(|o| self.eval_single(o, doc)).collect();
                    let had_error = values.iter().any(Scalar::is_error);
                    let result = if is_and {
                        Scalar::and(&values)
                    } else {
                        Scalar::or(&values)
                    };
                    annotate(Single(result), had_error, op)
                }
                Shape::Not(operand) => {
                    let value = self.eval_single(operand, doc);
                    let had_error = value.is_error();
                    annotate(Single(value.not()), had_error, op)
                }
                Shape::Quantifier(kind, field, arg, predicate) => {
                    Single(self.eval_quantifier(kind, field, arg, predicate, doc))
                }
                Shape::Aggregate(kind, field, arg, array) => {
                    Single(self.eval_aggregate(kind, field, arg, array, doc))
                }
                Shape::Count(field) => Single(match self.array_elements(field, doc) {
                    Ok(elements) => Scalar::Long(elements.len() as i64),
                    Err(err) => err,
                }),
                Shape::Field(_) | Shape::Literal => Single(Scalar::Undefined),
            },
        }
    }

    fn eval_field(&self, name: &str, path: Option<&Path>, doc: &Document) -> EvalResult {
        let parsed;
        let segments = match path {
            Some(p) => p,
            None => match parse_path(name) {
                Ok(p) => {
                    parsed = p;
                    &parsed
                }
                Err(e) => return EvalResult::Single(Scalar::error(e.to_string())),
            },
        };
        let Some((PathSegment::Key(arg), rest)) = segments.split_first() else {
            return EvalResult::Single(Scalar::error(format!("invalid field '{}'", name)));
        };
        let Some(handle) = self.lookup(arg) else {
            return EvalResult::Single(Scalar::error(format!(
                "unknown argument '{}' in field '{}'",
                arg, name
            )));
        };

        if has_wildcard(rest) {
            let nodes = resolve_all(doc, handle, rest);
            return EvalResult::Many(
                nodes
                    .into_iter()
                    .map(|n| n.map_or(Scalar::NULL, |id| doc.scalar(id)))
                    .collect(),
            );
        }
        let mut current = handle;
        for segment in rest {
            match doc.step(current, segment) {
                Some(next) => current = next,
                None => return EvalResult::Single(Scalar::NULL),
            }
        }
        EvalResult::Single(doc.scalar(current))
    }

    /// Elements a quantifier or aggregate iterates.
    fn array_elements(&self, field: &Operation, doc: &Document) -> Result<Vec<NodeId>, Scalar> {
        let Operation::Field { name, path } = field else {
            return Err(Scalar::error(format!("'{}' is not a field", field)));
        };
        let parsed;
        let segments = match path {
            Some(p) => p,
            None => {
                parsed = parse_path(name).map_err(|e| Scalar::error(e.to_string()))?;
                &parsed
            }
        };
        let Some((PathSegment::Key(arg), rest)) = segments.split_first() else {
            return Err(Scalar::error(format!("invalid field '{}'", name)));
        };
        let handle = self
            .lookup(arg)
            .ok_or_else(|| Scalar::error(format!("unknown argument '{}' in field '{}'", arg, name)))?;

        if has_wildcard(rest) {
            return Ok(resolve_all(doc, handle, rest).into_iter().flatten().collect());
        }
        let mut current = Some(handle);
        for segment in rest {
            current = current.and_then(|id| doc.step(id, segment));
        }
        current
            .and_then(|id| doc.elements(id))
            .map(<[NodeId]>::to_vec)
            .ok_or_else(|| Scalar::error(format!("{} is not an array", name)))
    }

    /// Evaluate `body` once per element with `arg` bound to it.
    fn per_element(
        &mut self,
        elements: &[NodeId],
        arg: &str,
        body: &Operation,
        doc: &Document,
    ) -> Vec<Scalar> {
        let mut results = Vec::with_capacity(elements.len());
        if elements.is_empty() {
            return results;
        }
        self.bindings.push((arg.to_string(), elements[0]));
        let slot = self.bindings.len() - 1;
        for &element in elements {
            self.bindings[slot].1 = element;
            results.push(self.eval_single(body, doc));
        }
        self.bindings.truncate(slot);
        results
    }

    fn eval_quantifier(
        &mut self,
        kind: QuantifierKind,
        field: &Operation,
        arg: &str,
        predicate: &Operation,
        doc: &Document,
    ) -> Scalar {
        let elements = match self.array_elements(field, doc) {
            Ok(elements) => elements,
            Err(err) => return err,
        };
        let results = self.per_element(&elements, arg, predicate, doc);

        let mut matched = 0i64;
        for result in &results {
            match result {
                Scalar::Error(_) => return result.clone(),
                Scalar::Bool(true) => matched += 1,
                Scalar::Bool(false) | Scalar::Null => {}
                other => {
                    return Scalar::error(format!(
                        "predicate of {}.{} must be bool, got {} ({})",
                        field,
                        kind.name(),
                        other,
                        other.type_name()
                    ));
                }
            }
        }
        match kind {
            QuantifierKind::Any => Scalar::Bool(matched > 0),
            QuantifierKind::All => Scalar::Bool(matched as usize == results.len()),
            QuantifierKind::CountWhere => Scalar::Long(matched),
        }
    }

    fn eval_aggregate(
        &mut self,
        kind: AggregateKind,
        field: &Operation,
        arg: &str,
        array: &Operation,
        doc: &Document,
    ) -> Scalar {
        let elements = match self.array_elements(field, doc) {
            Ok(elements) => elements,
            Err(err) => return err,
        };
        let values = self.per_element(&elements, arg, array, doc);
        if let Some(err) = values.iter().find(|v| v.is_error()) {
            return err.clone();
        }
        let values: Vec<&Scalar> = values.iter().filter(|v| !v.is_null()).collect();

        match kind {
            AggregateKind::Min | AggregateKind::Max => {
                let mut best: Option<&Scalar> = None;
                for value in values {
                    best = match best {
                        None => Some(value),
                        Some(current) => match value.compare_to(current, kind.name()) {
                            Err(err) => return err,
                            Ok(ord) if (kind == AggregateKind::Min) == ord.is_lt() && ord.is_ne() => {
                                Some(value)
                            }
                            Ok(_) => Some(current),
                        },
                    };
                }
                best.cloned().unwrap_or(Scalar::NULL)
            }
            AggregateKind::Sum => sum(&values, field),
            AggregateKind::Average => {
                if values.is_empty() {
                    return Scalar::NULL;
                }
                let count = values.len();
                match decimal_total(&values, field) {
                    Ok(Some(total)) => (total / Decimal::from(count as u64))
                        .to_f64()
                        .map(Scalar::Double)
                        .unwrap_or_else(|| Scalar::Double(float_total(&values) / count as f64)),
                    Ok(None) => Scalar::Double(float_total(&values) / count as f64),
                    Err(err) => err,
                }
            }
        }
    }
}

fn resolve_all(doc: &Document, start: NodeId, segments: &[PathSegment]) -> Vec<Option<NodeId>> {
    let mut frontier = vec![Some(start)];
    for segment in segments {
        let mut next = Vec::with_capacity(frontier.len());
        for node in frontier {
            match (segment, node) {
                (PathSegment::Wildcard, Some(id)) => {
                    if let Some(items) = doc.elements(id) {
                        next.extend(items.iter().map(|i| Some(*i)));
                    }
                }
                (PathSegment::Wildcard, None) => {}
                (_, node) => next.push(node.and_then(|id| doc.step(id, segment))),
            }
        }
        frontier = next;
    }
    frontier
}

fn sum(values: &[&Scalar], field: &Operation) -> Scalar {
    if values.iter().all(|v| matches!(v, Scalar::Long(_))) {
        let mut total = 0i64;
        for value in values {
            if let Scalar::Long(n) = value {
                match total.checked_add(*n) {
                    Some(t) => total = t,
                    None => return Scalar::error(format!("integer overflow in {}.Sum", field)),
                }
            }
        }
        return Scalar::Long(total);
    }
    match decimal_total(values, field) {
        Ok(Some(total)) => Scalar::Double(total.to_f64().unwrap_or_else(|| float_total(values))),
        Ok(None) => Scalar::Double(float_total(values)),
        Err(err) => err,
    }
}

/// Exact accumulation; avoids drift when summing many doubles. `None` when
/// a value or the running total leaves the decimal range.
fn decimal_total(values: &[&Scalar], field: &Operation) -> Result<Option<Decimal>, Scalar> {
    let mut total = Some(Decimal::ZERO);
    for value in values {
        let d = match value {
            Scalar::Long(n) => Some(Decimal::from(*n)),
            Scalar::Double(n) => Decimal::from_f64(*n),
            other => {
                return Err(Scalar::error(format!(
                    "aggregate over {} expects numbers, got {} ({})",
                    field,
                    other,
                    other.type_name()
                )));
            }
        };
        total = match (total, d) {
            (Some(t), Some(d)) => t.checked_add(d),
            _ => None,
        };
    }
    Ok(total)
}

/// Plain double accumulation for totals beyond the decimal range.
fn float_total(values: &[&Scalar]) -> f64 {
    values
        .iter()
        .filter_map(|v| match v {
            Scalar::Long(n) => Some(*n as f64),
            Scalar::Double(n) => Some(*n),
            _ => None,
        })
        .sum()
}

fn apply_unary(kind: UnaryKind, value: &Scalar) -> Scalar {
    match kind {
        UnaryKind::Abs => value.abs(),
        UnaryKind::Ceiling => value.ceiling(),
        UnaryKind::Floor => value.floor(),
        UnaryKind::Exp => value.exp(),
        UnaryKind::Log => value.log(),
        UnaryKind::Sqrt => value.sqrt(),
        UnaryKind::Negate => value.negate(),
        UnaryKind::Length => value.length(),
    }
}

fn apply_binary(kind: BinaryKind, left: &Scalar, right: &Scalar) -> Scalar {
    match kind {
        BinaryKind::Add => left.add(right),
        BinaryKind::Subtract => left.subtract(right),
        BinaryKind::Multiply => left.multiply(right),
        BinaryKind::Divide => left.divide(right),
        BinaryKind::Modulo => left.modulo(right),
        BinaryKind::Equal => left.equals_to(right),
        BinaryKind::NotEqual => left.not_equals_to(right),
        BinaryKind::LessThan => left.less(right),
        BinaryKind::LessThanOrEqual => left.less_or_equal(right),
        BinaryKind::GreaterThan => left.greater(right),
        BinaryKind::GreaterThanOrEqual => left.greater_or_equal(right),
        BinaryKind::Contains => left.contains(right),
        BinaryKind::StartsWith => left.starts_with(right),
        BinaryKind::EndsWith => left.ends_with(right),
    }
}

fn broadcast(left: EvalResult, right: EvalResult, f: impl Fn(&Scalar, &Scalar) -> Scalar) -> EvalResult {
    use EvalResult::*;
    match (left, right) {
        (Single(a), Single(b)) => Single(f(&a, &b)),
        (Many(items), Single(b)) => Many(items.iter().map(|a| f(a, &b)).collect()),
        (Single(a), Many(items)) => Many(items.iter().map(|b| f(&a, b)).collect()),
        (Many(a), Many(b)) if a.len() == b.len() => {
            Many(a.iter().zip(b.iter()).map(|(x, y)| f(x, y)).collect())
        }
        (Many(a), Many(b)) => Single(Scalar::error(format!(
            "sequence length mismatch: {} vs {}",
            a.len(),
            b.len()
        ))),
    }
}

/// Attach the operation text to errors raised by this node. Errors coming
/// from operands pass through unchanged.
fn annotate(result: EvalResult, inputs_had_error: bool, op: &Operation) -> EvalResult {
    if inputs_had_error {
        return result;
    }
    let with_context = |s: &Scalar| match s {
        Scalar::Error(msg) => Scalar::Error(format!("{} in {}", msg, op)),
        other => other.clone(),
    };
    match result {
        EvalResult::Single(s) if s.is_error() => EvalResult::Single(with_context(&s)),
        EvalResult::Many(items) if items.iter().any(Scalar::is_error) => {
            EvalResult::Many(items.iter().map(with_context).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_operation;

    fn eval(text: &str, json: &str) -> Scalar {
        let mut op = parse_operation(text).unwrap();
        InitContext::new("o").init(&mut op).unwrap();
        let doc = Document::from_slice(json.as_bytes()).unwrap();
        let mut cx = EvalContext::new();
        cx.bind("o", doc.root().unwrap());
        cx.eval_single(&op, &doc)
    }

    #[test]
    fn test_missing_field_is_null() {
        assert_eq!(eval("o.missing", r#"{"a":1}"#), Scalar::Null);
        assert_eq!(eval("o.a.b", r#"{"a":1}"#), Scalar::Null);
    }

    #[test]
    fn test_error_names_operation() {
        let r = eval("o.name + o.flag", r#"{"name":"x","flag":true}"#);
        let msg = r.error_message().unwrap();
        assert!(msg.contains("incompatible operands"));
        assert!(msg.ends_with("in o.name + o.flag"), "{}", msg);
    }

    #[test]
    fn test_error_passes_through_unchanged() {
        let inner = eval("o.name + 1", r#"{"name":"x"}"#);
        let outer = eval("(o.name + 1) * 2 == 3", r#"{"name":"x"}"#);
        assert_eq!(inner, outer);
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let mut op = parse_operation("x.name == 1").unwrap();
        let err = InitContext::new("o").init(&mut op).unwrap_err();
        assert!(matches!(err, InitError::UnknownArgument { ref argument, .. } if argument == "x"));
    }

    #[test]
    fn test_inner_scope_shadows() {
        let r = eval(
            "o.groups.Any(o => o.Any(t => t == 2))",
            r#"{"groups":[[1],[2,3]]}"#,
        );
        assert_eq!(r, Scalar::TRUE);
    }

    #[test]
    fn test_fold_constants() {
        let mut op = parse_operation("o.a > 1 + 2 && true").unwrap();
        fold_constants(&mut op);
        assert_eq!(op.to_string(), "o.a > 3 && true");

        let mut whole = parse_operation("2 * 3 == 6").unwrap();
        fold_constants(&mut whole);
        assert_eq!(whole, Operation::True);

        let mut failing = parse_operation("1 / 0").unwrap();
        fold_constants(&mut failing);
        assert!(!failing.is_literal());
    }

    #[test]
    fn test_wildcard_sequence() {
        let mut op = parse_operation("o.items[*].price * 2").unwrap();
        InitContext::new("o").init(&mut op).unwrap();
        let doc = Document::from_slice(br#"{"items":[{"price":1},{"price":2.5},{}]}"#).unwrap();
        let mut cx = EvalContext::new();
        cx.bind("o", doc.root().unwrap());
        assert_eq!(
            cx.eval(&op, &doc),
            EvalResult::Many(vec![Scalar::Long(2), Scalar::Double(5.0), Scalar::Null])
        );
    }
}
