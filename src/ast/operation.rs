use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::Path;

/// Node of the filter/projection expression tree.
///
/// The serde representation is the wire format: a JSON object tagged by
/// `"op"`, e.g. `{"op":"equal","left":{"op":"field","name":"o.name"},"right":{"op":"string","value":"Foo"}}`.
///
/// `Display` renders the textual expression syntax accepted by
/// [`Parser`](crate::Parser), e.g. `o.name == 'Foo'`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    // References
    /// Dotted path whose first segment names a lambda argument
    ///
    /// # Example
    /// ```text
    /// o.address.city
    /// t
    /// ```
    Field {
        name: String,
        /// Parsed `name`, filled in once by validation
        #[serde(skip)]
        path: Option<Path>,
    },

    // Literals
    String { value: String },
    Double { value: f64 },
    Int64 { value: i64 },
    Null,
    True,
    False,

    // Unary math
    Abs { value: Box<Operation> },
    Ceiling { value: Box<Operation> },
    Floor { value: Box<Operation> },
    Exp { value: Box<Operation> },
    Log { value: Box<Operation> },
    Sqrt { value: Box<Operation> },
    Negate { value: Box<Operation> },
    /// String length
    Length { value: Box<Operation> },

    // Binary math
    Add { left: Box<Operation>, right: Box<Operation> },
    Subtract { left: Box<Operation>, right: Box<Operation> },
    Multiply { left: Box<Operation>, right: Box<Operation> },
    Divide { left: Box<Operation>, right: Box<Operation> },
    Modulo { left: Box<Operation>, right: Box<Operation> },

    // Aggregates over an array field
    /// Smallest value of `array` evaluated per element bound to `arg`
    ///
    /// # Example
    /// ```text
    /// o.items.Min(i => i.price)
    /// ```
    Min { field: Box<Operation>, arg: String, array: Box<Operation> },
    Max { field: Box<Operation>, arg: String, array: Box<Operation> },
    Sum { field: Box<Operation>, arg: String, array: Box<Operation> },
    Average { field: Box<Operation>, arg: String, array: Box<Operation> },
    /// Number of elements
    Count { field: Box<Operation> },

    // Comparison
    Equal { left: Box<Operation>, right: Box<Operation> },
    NotEqual { left: Box<Operation>, right: Box<Operation> },
    LessThan { left: Box<Operation>, right: Box<Operation> },
    LessThanOrEqual { left: Box<Operation>, right: Box<Operation> },
    GreaterThan { left: Box<Operation>, right: Box<Operation> },
    GreaterThanOrEqual { left: Box<Operation>, right: Box<Operation> },

    // Logical
    And { operands: Vec<Operation> },
    Or { operands: Vec<Operation> },
    Not { operand: Box<Operation> },

    // Quantifiers
    /// `true` if `predicate` holds for at least one element
    ///
    /// # Example
    /// ```text
    /// o.tags.Any(t => t == 'b')
    /// ```
    Any { field: Box<Operation>, arg: String, predicate: Box<Operation> },
    All { field: Box<Operation>, arg: String, predicate: Box<Operation> },
    /// Number of elements for which `predicate` holds
    CountWhere { field: Box<Operation>, arg: String, predicate: Box<Operation> },

    // String predicates
    Contains { left: Box<Operation>, right: Box<Operation> },
    StartsWith { left: Box<Operation>, right: Box<Operation> },
    EndsWith { left: Box<Operation>, right: Box<Operation> },
}

/// Two-operand variants sharing one shape, used to keep the evaluator,
/// printer and SQL translator to a single match arm each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
}

impl BinaryKind {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryKind::Add => "+",
            BinaryKind::Subtract => "-",
            BinaryKind::Multiply => "*",
            BinaryKind::Divide => "/",
            BinaryKind::Modulo => "%",
            BinaryKind::Equal => "==",
            BinaryKind::NotEqual => "!=",
            BinaryKind::LessThan => "<",
            BinaryKind::LessThanOrEqual => "<=",
            BinaryKind::GreaterThan => ">",
            BinaryKind::GreaterThanOrEqual => ">=",
            BinaryKind::Contains => "Contains",
            BinaryKind::StartsWith => "StartsWith",
            BinaryKind::EndsWith => "EndsWith",
        }
    }

    /// String predicates are written as member calls, not infix.
    pub fn is_method(self) -> bool {
        matches!(self, BinaryKind::Contains | BinaryKind::StartsWith | BinaryKind::EndsWith)
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryKind::Equal
            | BinaryKind::NotEqual
            | BinaryKind::LessThan
            | BinaryKind::LessThanOrEqual
            | BinaryKind::GreaterThan
            | BinaryKind::GreaterThanOrEqual => 3,
            BinaryKind::Add | BinaryKind::Subtract => 4,
            BinaryKind::Multiply | BinaryKind::Divide | BinaryKind::Modulo => 5,
            BinaryKind::Contains | BinaryKind::StartsWith | BinaryKind::EndsWith => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryKind {
    Abs,
    Ceiling,
    Floor,
    Exp,
    Log,
    Sqrt,
    Negate,
    Length,
}

impl UnaryKind {
    pub fn name(self) -> &'static str {
        match self {
            UnaryKind::Abs => "Abs",
            UnaryKind::Ceiling => "Ceiling",
            UnaryKind::Floor => "Floor",
            UnaryKind::Exp => "Exp",
            UnaryKind::Log => "Log",
            UnaryKind::Sqrt => "Sqrt",
            UnaryKind::Negate => "Negate",
            UnaryKind::Length => "Length",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Min,
    Max,
    Sum,
    Average,
}

impl AggregateKind {
    pub fn name(self) -> &'static str {
        match self {
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
            AggregateKind::Sum => "Sum",
            AggregateKind::Average => "Average",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Any,
    All,
    CountWhere,
}

impl QuantifierKind {
    pub fn name(self) -> &'static str {
        match self {
            QuantifierKind::Any => "Any",
            QuantifierKind::All => "All",
            QuantifierKind::CountWhere => "Count",
        }
    }
}

/// Borrowed view of an [`Operation`] grouped by shape.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Field(&'a str),
    Literal,
    Unary(UnaryKind, &'a Operation),
    Binary(BinaryKind, &'a Operation, &'a Operation),
    Aggregate(AggregateKind, &'a Operation, &'a str, &'a Operation),
    Count(&'a Operation),
    Logical { is_and: bool, operands: &'a [Operation] },
    Not(&'a Operation),
    Quantifier(QuantifierKind, &'a Operation, &'a str, &'a Operation),
}

impl Operation {
    // ---------------------------------------------------------------------
    // Builders
    // ---------------------------------------------------------------------

    pub fn field(name: impl Into<String>) -> Self {
        Operation::Field { name: name.into(), path: None }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Operation::String { value: value.into() }
    }

    pub fn long(value: i64) -> Self {
        Operation::Int64 { value }
    }

    pub fn double(value: f64) -> Self {
        Operation::Double { value }
    }

    pub fn bool(value: bool) -> Self {
        if value { Operation::True } else { Operation::False }
    }

    pub fn unary(kind: UnaryKind, value: Operation) -> Self {
        let value = Box::new(value);
        match kind {
            UnaryKind::Abs => Operation::Abs { value },
            UnaryKind::Ceiling => Operation::Ceiling { value },
            UnaryKind::Floor => Operation::Floor { value },
            UnaryKind::Exp => Operation::Exp { value },
            UnaryKind::Log => Operation::Log { value },
            UnaryKind::Sqrt => Operation::Sqrt { value },
            UnaryKind::Negate => Operation::Negate { value },
            UnaryKind::Length => Operation::Length { value },
        }
    }

    pub fn binary(kind: BinaryKind, left: Operation, right: Operation) -> Self {
        let (left, right) = (Box::new(left), Box::new(right));
        match kind {
            BinaryKind::Add => Operation::Add { left, right },
            BinaryKind::Subtract => Operation::Subtract { left, right },
            BinaryKind::Multiply => Operation::Multiply { left, right },
            BinaryKind::Divide => Operation::Divide { left, right },
            BinaryKind::Modulo => Operation::Modulo { left, right },
            BinaryKind::Equal => Operation::Equal { left, right },
            BinaryKind::NotEqual => Operation::NotEqual { left, right },
            BinaryKind::LessThan => Operation::LessThan { left, right },
            BinaryKind::LessThanOrEqual => Operation::LessThanOrEqual { left, right },
            BinaryKind::GreaterThan => Operation::GreaterThan { left, right },
            BinaryKind::GreaterThanOrEqual => Operation::GreaterThanOrEqual { left, right },
            BinaryKind::Contains => Operation::Contains { left, right },
            BinaryKind::StartsWith => Operation::StartsWith { left, right },
            BinaryKind::EndsWith => Operation::EndsWith { left, right },
        }
    }

    pub fn equal(left: Operation, right: Operation) -> Self {
        Self::binary(BinaryKind::Equal, left, right)
    }

    pub fn and(operands: Vec<Operation>) -> Self {
        Operation::And { operands }
    }

    pub fn or(operands: Vec<Operation>) -> Self {
        Operation::Or { operands }
    }

    pub fn not(operand: Operation) -> Self {
        Operation::Not { operand: Box::new(operand) }
    }

    pub fn aggregate(kind: AggregateKind, field: Operation, arg: impl Into<String>, array: Operation) -> Self {
        let (field, arg, array) = (Box::new(field), arg.into(), Box::new(array));
        match kind {
            AggregateKind::Min => Operation::Min { field, arg, array },
            AggregateKind::Max => Operation::Max { field, arg, array },
            AggregateKind::Sum => Operation::Sum { field, arg, array },
            AggregateKind::Average => Operation::Average { field, arg, array },
        }
    }

    pub fn count(field: Operation) -> Self {
        Operation::Count { field: Box::new(field) }
    }

    pub fn quantifier(kind: QuantifierKind, field: Operation, arg: impl Into<String>, predicate: Operation) -> Self {
        let (field, arg, predicate) = (Box::new(field), arg.into(), Box::new(predicate));
        match kind {
            QuantifierKind::Any => Operation::Any { field, arg, predicate },
            QuantifierKind::All => Operation::All { field, arg, predicate },
            QuantifierKind::CountWhere => Operation::CountWhere { field, arg, predicate },
        }
    }

    pub fn any(field: Operation, arg: impl Into<String>, predicate: Operation) -> Self {
        Self::quantifier(QuantifierKind::Any, field, arg, predicate)
    }

    pub fn all(field: Operation, arg: impl Into<String>, predicate: Operation) -> Self {
        Self::quantifier(QuantifierKind::All, field, arg, predicate)
    }

    pub fn count_where(field: Operation, arg: impl Into<String>, predicate: Operation) -> Self {
        Self::quantifier(QuantifierKind::CountWhere, field, arg, predicate)
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    pub fn shape(&self) -> Shape<'_> {
        use Operation::*;
        match self {
            Field { name, .. } => Shape::Field(name),
            String { .. } | Double { .. } | Int64 { .. } | Null | True | False => Shape::Literal,
            Abs { value } => Shape::Unary(UnaryKind::Abs, value),
            Ceiling { value } => Shape::Unary(UnaryKind::Ceiling, value),
            Floor { value } => Shape::Unary(UnaryKind::Floor, value),
            Exp { value } => Shape::Unary(UnaryKind::Exp, value),
            Log { value } => Shape::Unary(UnaryKind::Log, value),
            Sqrt { value } => Shape::Unary(UnaryKind::Sqrt, value),
            Negate { value } => Shape::Unary(UnaryKind::Negate, value),
            Length { value } => Shape::Unary(UnaryKind::Length, value),
            Add { left, right } => Shape::Binary(BinaryKind::Add, left, right),
            Subtract { left, right } => Shape::Binary(BinaryKind::Subtract, left, right),
            Multiply { left, right } => Shape::Binary(BinaryKind::Multiply, left, right),
            Divide { left, right } => Shape::Binary(BinaryKind::Divide, left, right),
            Modulo { left, right } => Shape::Binary(BinaryKind::Modulo, left, right),
            Equal { left, right } => Shape::Binary(BinaryKind::Equal, left, right),
            NotEqual { left, right } => Shape::Binary(BinaryKind::NotEqual, left, right),
            LessThan { left, right } => Shape::Binary(BinaryKind::LessThan, left, right),
            LessThanOrEqual { left, right } => Shape::Binary(BinaryKind::LessThanOrEqual, left, right),
            GreaterThan { left, right } => Shape::Binary(BinaryKind::GreaterThan, left, right),
            GreaterThanOrEqual { left, right } => {
                Shape::Binary(BinaryKind::GreaterThanOrEqual, left, right)
            }
            Contains { left, right } => Shape::Binary(BinaryKind::Contains, left, right),
            StartsWith { left, right } => Shape::Binary(BinaryKind::StartsWith, left, right),
            EndsWith { left, right } => Shape::Binary(BinaryKind::EndsWith, left, right),
            Min { field, arg, array } => Shape::Aggregate(AggregateKind::Min, field, arg, array),
            Max { field, arg, array } => Shape::Aggregate(AggregateKind::Max, field, arg, array),
            Sum { field, arg, array } => Shape::Aggregate(AggregateKind::Sum, field, arg, array),
            Average { field, arg, array } => {
                Shape::Aggregate(AggregateKind::Average, field, arg, array)
            }
            Count { field } => Shape::Count(field),
            And { operands } => Shape::Logical { is_and: true, operands },
            Or { operands } => Shape::Logical { is_and: false, operands },
            Not { operand } => Shape::Not(operand),
            Any { field, arg, predicate } => Shape::Quantifier(QuantifierKind::Any, field, arg, predicate),
            All { field, arg, predicate } => Shape::Quantifier(QuantifierKind::All, field, arg, predicate),
            CountWhere { field, arg, predicate } => {
                Shape::Quantifier(QuantifierKind::CountWhere, field, arg, predicate)
            }
        }
    }

    /// Wire discriminant of this node.
    pub fn kind(&self) -> &'static str {
        use Operation::*;
        match self {
            Field { .. } => "field",
            String { .. } => "string",
            Double { .. } => "double",
            Int64 { .. } => "int64",
            Null => "null",
            True => "true",
            False => "false",
            Abs { .. } => "abs",
            Ceiling { .. } => "ceiling",
            Floor { .. } => "floor",
            Exp { .. } => "exp",
            Log { .. } => "log",
            Sqrt { .. } => "sqrt",
            Negate { .. } => "negate",
            Length { .. } => "length",
            Add { .. } => "add",
            Subtract { .. } => "subtract",
            Multiply { .. } => "multiply",
            Divide { .. } => "divide",
            Modulo { .. } => "modulo",
            Min { .. } => "min",
            Max { .. } => "max",
            Sum { .. } => "sum",
            Average { .. } => "average",
            Count { .. } => "count",
            Equal { .. } => "equal",
            NotEqual { .. } => "notEqual",
            LessThan { .. } => "lessThan",
            LessThanOrEqual { .. } => "lessThanOrEqual",
            GreaterThan { .. } => "greaterThan",
            GreaterThanOrEqual { .. } => "greaterThanOrEqual",
            And { .. } => "and",
            Or { .. } => "or",
            Not { .. } => "not",
            Any { .. } => "any",
            All { .. } => "all",
            CountWhere { .. } => "countWhere",
            Contains { .. } => "contains",
            StartsWith { .. } => "startsWith",
            EndsWith { .. } => "endsWith",
        }
    }

    /// `true` for nodes that always produce a bool (or an error).
    pub fn is_boolean(&self) -> bool {
        use Operation::*;
        matches!(
            self,
            True | False
                | Equal { .. }
                | NotEqual { .. }
                | LessThan { .. }
                | LessThanOrEqual { .. }
                | GreaterThan { .. }
                | GreaterThanOrEqual { .. }
                | And { .. }
                | Or { .. }
                | Not { .. }
                | Any { .. }
                | All { .. }
                | Contains { .. }
                | StartsWith { .. }
                | EndsWith { .. }
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.shape(), Shape::Literal)
    }

    /// Name of a `Field` node.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Operation::Field { name, .. } => Some(name),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self.shape() {
            Shape::Logical { is_and: false, operands } if operands.len() > 1 => 1,
            Shape::Logical { is_and: true, operands } if operands.len() > 1 => 2,
            Shape::Binary(kind, ..) => kind.precedence(),
            Shape::Not(_) | Shape::Unary(UnaryKind::Negate, _) => 6,
            Shape::Literal => match self {
                Operation::Int64 { value } if *value < 0 => 6,
                Operation::Double { value } if value.is_sign_negative() => 6,
                _ => 8,
            },
            _ => 8,
        }
    }
}

struct Child<'a> {
    op: &'a Operation,
    min: u8,
}

impl fmt::Display for Child<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.precedence() < self.min {
            write!(f, "({})", self.op)
        } else {
            write!(f, "{}", self.op)
        }
    }
}

fn child(op: &Operation, min: u8) -> Child<'_> {
    Child { op, min }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape() {
            Shape::Field(name) => f.write_str(name),
            Shape::Literal => match self {
                Operation::String { value } => write_quoted(f, value),
                Operation::Double { value } => write!(f, "{:?}", value),
                Operation::Int64 { value } => write!(f, "{}", value),
                Operation::True => f.write_str("true"),
                Operation::False => f.write_str("false"),
                _ => f.write_str("null"),
            },
            Shape::Unary(UnaryKind::Negate, value) => write!(f, "-{}", child(value, 7)),
            Shape::Unary(UnaryKind::Length, value) => write!(f, "{}.Length()", child(value, 8)),
            Shape::Unary(kind, value) => write!(f, "{}({})", kind.name(), value),
            Shape::Binary(kind, left, right) if kind.is_method() => {
                write!(f, "{}.{}({})", child(left, 8), kind.symbol(), right)
            }
            Shape::Binary(kind, left, right) => {
                let p = kind.precedence();
                // comparisons do not chain
                let left_min = if p == 3 { 4 } else { p };
                write!(f, "{} {} {}", child(left, left_min), kind.symbol(), child(right, p + 1))
            }
            Shape::Aggregate(kind, field, arg, array) => {
                write!(f, "{}.{}({} => {})", field, kind.name(), arg, array)
            }
            Shape::Count(field) => write!(f, "{}.Count()", field),
            Shape::Logical { is_and, operands } => {
                let (symbol, p) = if is_and { ("&&", 2) } else { ("||", 1) };
                if operands.len() == 1 {
                    let name = if is_and { "And" } else { "Or" };
                    return write!(f, "{}({})", name, operands[0]);
                }
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", symbol)?;
                    }
                    write!(f, "{}", child(operand, p + 1))?;
                }
                Ok(())
            }
            Shape::Not(operand) => write!(f, "!{}", child(operand, 7)),
            Shape::Quantifier(kind, field, arg, predicate) => {
                write!(f, "{}.{}({} => {})", field, kind.name(), arg, predicate)
            }
        }
    }
}

/// An [`Operation`] known to produce a boolean, as accepted where only
/// predicates make sense (query filters, patch `test` conditions).
///
/// Shares the wire format of `Operation`; decoding rejects value-producing
/// kinds such as `add` or `field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Operation", into = "Operation")]
pub struct FilterOperation(Operation);

impl FilterOperation {
    pub fn operation(&self) -> &Operation {
        &self.0
    }

    pub fn into_operation(self) -> Operation {
        self.0
    }
}

impl TryFrom<Operation> for FilterOperation {
    type Error = NotAFilter;

    fn try_from(op: Operation) -> Result<Self, Self::Error> {
        if op.is_boolean() {
            Ok(FilterOperation(op))
        } else {
            Err(NotAFilter(op.kind()))
        }
    }
}

impl From<FilterOperation> for Operation {
    fn from(filter: FilterOperation) -> Self {
        filter.0
    }
}

/// A value-producing operation was given where a predicate is required.
#[derive(Debug, Clone, PartialEq)]
pub struct NotAFilter(pub &'static str);

impl fmt::Display for NotAFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation '{}' does not produce a boolean", self.0)
    }
}

impl std::error::Error for NotAFilter {}
