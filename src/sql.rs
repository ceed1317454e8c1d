//! Translation of operation trees into SQL `WHERE` fragments.
//!
//! The core only guarantees a traversable [`Operation`] shape; dialects
//! plug in through [`Traverse`]. [`SqliteTranslator`] targets SQLite's
//! JSON1 functions over a single JSON text column.

use std::fmt::{self, Write};

use crate::{
    ast::{AggregateKind, BinaryKind, Operation, QuantifierKind, Shape, UnaryKind},
    path::{PathSegment, parse_path},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlError {
    /// The dialect cannot express this node
    Unsupported { op: &'static str, reason: String },
    UnknownArgument { argument: String, field: String },
    InvalidField(String),
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlError::Unsupported { op, reason } => write!(f, "cannot translate '{}': {}", op, reason),
            SqlError::UnknownArgument { argument, field } => {
                write!(f, "unknown argument '{}' in field '{}'", argument, field)
            }
            SqlError::InvalidField(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SqlError {}

/// Visitor producing one SQL fragment per node.
pub trait Traverse {
    fn traverse(&mut self, op: &Operation) -> Result<String, SqlError>;
}

/// SQLite dialect: documents live in one JSON column, nested arrays are
/// iterated with `json_each`.
#[derive(Debug, Clone)]
pub struct SqliteTranslator {
    column: String,
    root_arg: String,
    /// Lambda arguments bound to `json_each` aliases, innermost last
    scopes: Vec<(String, String)>,
}

impl SqliteTranslator {
    pub fn new(column: impl Into<String>, root_arg: impl Into<String>) -> Self {
        SqliteTranslator {
            column: column.into(),
            root_arg: root_arg.into(),
            scopes: Vec::new(),
        }
    }

    /// Translate a whole filter.
    pub fn where_clause(&mut self, op: &Operation) -> Result<String, SqlError> {
        self.scopes.clear();
        self.traverse(op)
    }

    /// Base expression and remaining segments for a field.
    fn resolve<'p>(
        &self,
        name: &str,
        path: &'p [PathSegment],
    ) -> Result<(String, &'p [PathSegment]), SqlError> {
        let Some((PathSegment::Key(arg), rest)) = path.split_first() else {
            return Err(SqlError::InvalidField(format!("invalid field '{}'", name)));
        };
        if rest.iter().any(|s| *s == PathSegment::Wildcard) {
            return Err(SqlError::Unsupported {
                op: "field",
                reason: format!("wildcard in '{}'", name),
            });
        }
        if let Some((_, alias)) = self.scopes.iter().rev().find(|(a, _)| a == arg) {
            return Ok((format!("{}.value", alias), rest));
        }
        if *arg == self.root_arg {
            return Ok((self.column.clone(), rest));
        }
        Err(SqlError::UnknownArgument {
            argument: arg.clone(),
            field: name.to_string(),
        })
    }

    fn parsed(field: &Operation) -> Result<(String, Vec<PathSegment>), SqlError> {
        match field {
            Operation::Field { name, path } => {
                let segments = match path {
                    Some(p) => p.clone(),
                    None => parse_path(name).map_err(|e| SqlError::InvalidField(e.to_string()))?,
                };
                Ok((name.clone(), segments))
            }
            other => Err(SqlError::Unsupported {
                op: other.kind(),
                reason: "expected a field".into(),
            }),
        }
    }

    fn field(&self, field: &Operation) -> Result<String, SqlError> {
        let (name, segments) = Self::parsed(field)?;
        let (base, rest) = self.resolve(&name, &segments)?;
        if rest.is_empty() {
            return Ok(base);
        }
        Ok(format!("json_extract({}, {})", base, quote(&json_path(rest))))
    }

    /// `json_each(...)` source for iterating an array field.
    fn each(&self, field: &Operation) -> Result<String, SqlError> {
        let (name, segments) = Self::parsed(field)?;
        let (base, rest) = self.resolve(&name, &segments)?;
        if rest.is_empty() {
            return Ok(format!("json_each({})", base));
        }
        Ok(format!("json_each({}, {})", base, quote(&json_path(rest))))
    }

    /// Run `body` with `arg` bound to a fresh alias.
    fn scoped(
        &mut self,
        arg: &str,
        body: impl FnOnce(&mut Self, &str) -> Result<String, SqlError>,
    ) -> Result<String, SqlError> {
        let alias = format!("j{}", self.scopes.len() + 1);
        self.scopes.push((arg.to_string(), alias.clone()));
        let result = body(self, &alias);
        self.scopes.pop();
        result
    }
}

impl Traverse for SqliteTranslator {
    fn traverse(&mut self, op: &Operation) -> Result<String, SqlError> {
        match op.shape() {
            Shape::Field(_) => self.field(op),
            Shape::Literal => Ok(match op {
                Operation::String { value } => quote(value),
                Operation::Double { value } => format!("{:?}", value),
                Operation::Int64 { value } => value.to_string(),
                Operation::True => "TRUE".into(),
                Operation::False => "FALSE".into(),
                _ => "NULL".into(),
            }),
            Shape::Unary(kind, value) => {
                let value = self.traverse(value)?;
                Ok(match kind {
                    UnaryKind::Abs => format!("abs({})", value),
                    UnaryKind::Ceiling => format!("ceil({})", value),
                    UnaryKind::Floor => format!("floor({})", value),
                    UnaryKind::Exp => format!("exp({})", value),
                    UnaryKind::Log => format!("ln({})", value),
                    UnaryKind::Sqrt => format!("sqrt({})", value),
                    UnaryKind::Negate => format!("-({})", value),
                    UnaryKind::Length => format!("length({})", value),
                })
            }
            Shape::Binary(kind, left, right) => {
                let null_test = match (kind, right) {
                    (BinaryKind::Equal, Operation::Null) => Some("IS NULL"),
                    (BinaryKind::NotEqual, Operation::Null) => Some("IS NOT NULL"),
                    _ => None,
                };
                let l = self.traverse(left)?;
                if let Some(test) = null_test {
                    return Ok(format!("({} {})", l, test));
                }
                let r = self.traverse(right)?;
                Ok(match kind {
                    BinaryKind::Contains => format!("(instr({}, {}) > 0)", l, r),
                    BinaryKind::StartsWith => format!("(substr({}, 1, length({})) = {})", l, r, r),
                    BinaryKind::EndsWith => format!("(substr({}, -length({})) = {})", l, r, r),
                    _ => format!("({} {} {})", l, sql_operator(kind), r),
                })
            }
            Shape::Logical { is_and, operands } => {
                let joiner = if is_and { " AND " } else { " OR " };
                let parts = operands
                    .iter()
                    .map(|o| self.traverse(o))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(joiner)))
            }
            Shape::Not(operand) => Ok(format!("NOT ({})", self.traverse(operand)?)),
            Shape::Count(field) => {
                let (name, segments) = Self::parsed(field)?;
                let (base, rest) = self.resolve(&name, &segments)?;
                if rest.is_empty() {
                    Ok(format!("json_array_length({})", base))
                } else {
                    Ok(format!("json_array_length({}, {})", base, quote(&json_path(rest))))
                }
            }
            Shape::Quantifier(kind, field, arg, predicate) => {
                let source = self.each(field)?;
                self.scoped(arg, |t, alias| {
                    let pred = t.traverse(predicate)?;
                    Ok(match kind {
                        QuantifierKind::Any => {
                            format!("EXISTS(SELECT 1 FROM {} AS {} WHERE {})", source, alias, pred)
                        }
                        QuantifierKind::All => format!(
                            "NOT EXISTS(SELECT 1 FROM {} AS {} WHERE NOT ({}))",
                            source, alias, pred
                        ),
                        QuantifierKind::CountWhere => format!(
                            "(SELECT COUNT(*) FROM {} AS {} WHERE {})",
                            source, alias, pred
                        ),
                    })
                })
            }
            Shape::Aggregate(kind, field, arg, array) => {
                let source = self.each(field)?;
                let function = match kind {
                    AggregateKind::Min => "MIN",
                    AggregateKind::Max => "MAX",
                    AggregateKind::Sum => "SUM",
                    AggregateKind::Average => "AVG",
                };
                self.scoped(arg, |t, alias| {
                    let value = t.traverse(array)?;
                    Ok(format!("(SELECT {}({}) FROM {} AS {})", function, value, source, alias))
                })
            }
        }
    }
}

fn sql_operator(kind: BinaryKind) -> &'static str {
    match kind {
        BinaryKind::Equal => "=",
        BinaryKind::NotEqual => "<>",
        BinaryKind::LessThan => "<",
        BinaryKind::LessThanOrEqual => "<=",
        BinaryKind::GreaterThan => ">",
        BinaryKind::GreaterThanOrEqual => ">=",
        BinaryKind::Add => "+",
        BinaryKind::Subtract => "-",
        BinaryKind::Multiply => "*",
        BinaryKind::Divide => "/",
        BinaryKind::Modulo => "%",
        // handled as functions
        BinaryKind::Contains | BinaryKind::StartsWith | BinaryKind::EndsWith => "",
    }
}

/// SQLite JSON path (`$.a[0]."b c"`) for the given segments.
fn json_path(segments: &[PathSegment]) -> String {
    let mut out = String::from("$");
    for segment in segments {
        match segment {
            PathSegment::Key(key) if key.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                let _ = write!(out, ".{}", key);
            }
            PathSegment::Key(key) => {
                let _ = write!(out, ".\"{}\"", key.replace('"', "\\\""));
            }
            PathSegment::Index(i) => {
                let _ = write!(out, "[{}]", i);
            }
            PathSegment::Wildcard => out.push_str("[*]"),
        }
    }
    out
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_path() {
        let path = parse_path("a[2]['b c']").unwrap();
        assert_eq!(json_path(&path), r#"$.a[2]."b c""#);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), "'it''s'");
    }
}
