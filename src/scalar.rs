use std::{cmp::Ordering, fmt};

/// A runtime value produced while evaluating an [`Operation`](crate::Operation)
/// against a document.
///
/// Unlike a full JSON value, containers are opaque: `Array` and `Object`
/// only mark that a field resolved to a structure. Errors are values too,
/// so a type mismatch deep inside an expression surfaces once at the top
/// instead of aborting the walk.
///
/// # Numeric coercion
///
/// `Long` and `Double` mix freely. Comparisons and arithmetic between them
/// widen the `Long` to `f64`.
///
/// # Examples
///
/// ```
/// use jsonsieve::Scalar;
///
/// let a = Scalar::Long(2);
/// let b = Scalar::Double(2.0);
/// assert_eq!(a.equals_to(&b), Scalar::TRUE);
///
/// let bad = Scalar::String("x".into()).add(&Scalar::Bool(true));
/// assert!(bad.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// UTF-8 string
    String(String),

    /// Floating-point number
    Double(f64),

    /// Integer number, kept apart from `Double`
    Long(i64),

    Bool(bool),

    Null,

    /// Placeholder for an array value; contents are not materialized
    Array,

    /// Placeholder for an object value; contents are not materialized
    Object,

    /// Evaluation error carrying a diagnostic message
    Error(String),

    /// No value was produced
    #[default]
    Undefined,
}

impl Scalar {
    pub const TRUE: Scalar = Scalar::Bool(true);
    pub const FALSE: Scalar = Scalar::Bool(false);
    pub const NULL: Scalar = Scalar::Null;

    pub fn error(message: impl Into<String>) -> Self {
        Scalar::Error(message.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Double(_) => "double",
            Scalar::Long(_) => "long",
            Scalar::Bool(_) => "bool",
            Scalar::Null => "null",
            Scalar::Array => "array",
            Scalar::Object => "object",
            Scalar::Error(_) => "error",
            Scalar::Undefined => "undefined",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Scalar::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Scalar::Long(_) | Scalar::Double(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as float, widening `Long`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Long(n) => Some(*n as f64),
            Scalar::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Scalar::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the first error among `self` and `other`, if any.
    fn first_error<'a>(&'a self, other: &'a Scalar) -> Option<&'a Scalar> {
        if self.is_error() {
            Some(self)
        } else if other.is_error() {
            Some(other)
        } else {
            None
        }
    }

    fn incompatible(&self, symbol: &str, other: &Scalar) -> Scalar {
        Scalar::Error(format!(
            "incompatible operands: {} ({}) {} {} ({})",
            self,
            self.type_name(),
            symbol,
            other,
            other.type_name()
        ))
    }

    // ---------------------------------------------------------------------
    // Comparison
    // ---------------------------------------------------------------------

    /// Equality with three-valued `Null` semantics.
    ///
    /// `Null == Null` is `true`; `Null` against anything else is `Null`.
    pub fn equals_to(&self, other: &Scalar) -> Scalar {
        if let Some(err) = self.first_error(other) {
            return err.clone();
        }
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Scalar::TRUE,
            (Scalar::Null, _) | (_, Scalar::Null) => Scalar::NULL,
            (Scalar::String(a), Scalar::String(b)) => Scalar::Bool(a == b),
            (Scalar::Bool(a), Scalar::Bool(b)) => Scalar::Bool(a == b),
            (Scalar::Long(a), Scalar::Long(b)) => Scalar::Bool(a == b),
            (a, b) if a.is_number() && b.is_number() => {
                Scalar::Bool(a.as_f64() == b.as_f64())
            }
            (a, b) => a.incompatible("==", b),
        }
    }

    pub fn not_equals_to(&self, other: &Scalar) -> Scalar {
        match self.equals_to(other) {
            Scalar::Bool(b) => Scalar::Bool(!b),
            other => other,
        }
    }

    /// Orders two scalars of compatible types.
    ///
    /// Returns `Err` with a `Null` when either side is `Null`, or with an
    /// `Error` for incompatible operands, so callers can return it as is.
    pub fn compare_to(&self, other: &Scalar, symbol: &str) -> Result<Ordering, Scalar> {
        if let Some(err) = self.first_error(other) {
            return Err(err.clone());
        }
        match (self, other) {
            (Scalar::Null, _) | (_, Scalar::Null) => Err(Scalar::NULL),
            (Scalar::String(a), Scalar::String(b)) => Ok(a.cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Ok(a.cmp(b)),
            (Scalar::Long(a), Scalar::Long(b)) => Ok(a.cmp(b)),
            (a, b) if a.is_number() && b.is_number() => {
                let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                x.partial_cmp(&y)
                    .ok_or_else(|| Scalar::error(format!("cannot order {} {} {}", a, symbol, b)))
            }
            (a, b) => Err(a.incompatible(symbol, b)),
        }
    }

    fn compare_with(&self, other: &Scalar, symbol: &str, test: fn(Ordering) -> bool) -> Scalar {
        match self.compare_to(other, symbol) {
            Ok(ord) => Scalar::Bool(test(ord)),
            Err(s) => s,
        }
    }

    pub fn less(&self, other: &Scalar) -> Scalar {
        self.compare_with(other, "<", Ordering::is_lt)
    }

    pub fn less_or_equal(&self, other: &Scalar) -> Scalar {
        self.compare_with(other, "<=", Ordering::is_le)
    }

    pub fn greater(&self, other: &Scalar) -> Scalar {
        self.compare_with(other, ">", Ordering::is_gt)
    }

    pub fn greater_or_equal(&self, other: &Scalar) -> Scalar {
        self.compare_with(other, ">=", Ordering::is_ge)
    }

    // ---------------------------------------------------------------------
    // Arithmetic
    // ---------------------------------------------------------------------

    fn arithmetic(
        &self,
        other: &Scalar,
        symbol: &str,
        long_op: fn(i64, i64) -> Option<i64>,
        double_op: fn(f64, f64) -> f64,
    ) -> Scalar {
        if let Some(err) = self.first_error(other) {
            return err.clone();
        }
        match (self, other) {
            (Scalar::Null, _) | (_, Scalar::Null) => Scalar::NULL,
            (Scalar::Long(a), Scalar::Long(b)) => match long_op(*a, *b) {
                Some(r) => Scalar::Long(r),
                None => Scalar::error(format!("integer overflow: {} {} {}", a, symbol, b)),
            },
            (a, b) if a.is_number() && b.is_number() => Scalar::Double(double_op(
                a.as_f64().unwrap_or_default(),
                b.as_f64().unwrap_or_default(),
            )),
            (a, b) => a.incompatible(symbol, b),
        }
    }

    pub fn add(&self, other: &Scalar) -> Scalar {
        self.arithmetic(other, "+", i64::checked_add, |a, b| a + b)
    }

    pub fn subtract(&self, other: &Scalar) -> Scalar {
        self.arithmetic(other, "-", i64::checked_sub, |a, b| a - b)
    }

    pub fn multiply(&self, other: &Scalar) -> Scalar {
        self.arithmetic(other, "*", i64::checked_mul, |a, b| a * b)
    }

    /// Division. An exact integer quotient stays `Long`; otherwise the
    /// result is `Double`. Dividing by zero is an error.
    pub fn divide(&self, other: &Scalar) -> Scalar {
        if let Some(err) = self.first_error(other) {
            return err.clone();
        }
        if other.as_f64() == Some(0.0) && self.is_number() {
            return Scalar::error(format!("division by zero: {} / {}", self, other));
        }
        match (self, other) {
            (Scalar::Long(a), Scalar::Long(b)) if a.checked_rem(*b) == Some(0) => {
                match a.checked_div(*b) {
                    Some(r) => Scalar::Long(r),
                    None => Scalar::error(format!("integer overflow: {} / {}", a, b)),
                }
            }
            (Scalar::Long(a), Scalar::Long(b)) => Scalar::Double(*a as f64 / *b as f64),
            _ => self.arithmetic(other, "/", |_, _| None, |a, b| a / b),
        }
    }

    pub fn modulo(&self, other: &Scalar) -> Scalar {
        if let Some(err) = self.first_error(other) {
            return err.clone();
        }
        if other.as_f64() == Some(0.0) && self.is_number() {
            return Scalar::error(format!("division by zero: {} % {}", self, other));
        }
        self.arithmetic(other, "%", i64::checked_rem, |a, b| a % b)
    }

    fn unary_math(&self, name: &str, long_op: fn(i64) -> Option<Scalar>, double_op: fn(f64) -> f64) -> Scalar {
        match self {
            Scalar::Error(_) | Scalar::Null => self.clone(),
            Scalar::Long(n) => long_op(*n)
                .unwrap_or_else(|| Scalar::error(format!("integer overflow: {}({})", name, n))),
            Scalar::Double(n) => Scalar::Double(double_op(*n)),
            other => Scalar::error(format!(
                "{} expects a number, got {} ({})",
                name,
                other,
                other.type_name()
            )),
        }
    }

    pub fn abs(&self) -> Scalar {
        self.unary_math("Abs", |n| n.checked_abs().map(Scalar::Long), f64::abs)
    }

    pub fn ceiling(&self) -> Scalar {
        self.unary_math("Ceiling", |n| Some(Scalar::Long(n)), f64::ceil)
    }

    pub fn floor(&self) -> Scalar {
        self.unary_math("Floor", |n| Some(Scalar::Long(n)), f64::floor)
    }

    pub fn exp(&self) -> Scalar {
        self.unary_math("Exp", |n| Some(Scalar::Double((n as f64).exp())), f64::exp)
    }

    pub fn log(&self) -> Scalar {
        self.unary_math("Log", |n| Some(Scalar::Double((n as f64).ln())), f64::ln)
    }

    pub fn sqrt(&self) -> Scalar {
        self.unary_math("Sqrt", |n| Some(Scalar::Double((n as f64).sqrt())), f64::sqrt)
    }

    pub fn negate(&self) -> Scalar {
        self.unary_math("Negate", |n| n.checked_neg().map(Scalar::Long), |n| -n)
    }

    /// Character count of a string
    pub fn length(&self) -> Scalar {
        match self {
            Scalar::Error(_) | Scalar::Null => self.clone(),
            Scalar::String(s) => Scalar::Long(s.chars().count() as i64),
            other => Scalar::error(format!(
                "Length expects a string, got {} ({})",
                other,
                other.type_name()
            )),
        }
    }

    // ---------------------------------------------------------------------
    // String predicates
    // ---------------------------------------------------------------------

    fn string_predicate(&self, other: &Scalar, name: &str, test: fn(&str, &str) -> bool) -> Scalar {
        if let Some(err) = self.first_error(other) {
            return err.clone();
        }
        match (self, other) {
            (Scalar::Null, _) | (_, Scalar::Null) => Scalar::NULL,
            (Scalar::String(a), Scalar::String(b)) => Scalar::Bool(test(a, b)),
            (a, b) => a.incompatible(name, b),
        }
    }

    pub fn contains(&self, other: &Scalar) -> Scalar {
        self.string_predicate(other, "Contains", |a, b| a.contains(b))
    }

    pub fn starts_with(&self, other: &Scalar) -> Scalar {
        self.string_predicate(other, "StartsWith", |a, b| a.starts_with(b))
    }

    pub fn ends_with(&self, other: &Scalar) -> Scalar {
        self.string_predicate(other, "EndsWith", |a, b| a.ends_with(b))
    }

    // ---------------------------------------------------------------------
    // Logical
    // ---------------------------------------------------------------------

    /// Three-valued AND: any `false` wins, then `Null`, else `true`.
    pub fn and<'a>(operands: impl IntoIterator<Item = &'a Scalar>) -> Scalar {
        Self::connective(operands, "&&", false)
    }

    /// Three-valued OR: any `true` wins, then `Null`, else `false`.
    pub fn or<'a>(operands: impl IntoIterator<Item = &'a Scalar>) -> Scalar {
        Self::connective(operands, "||", true)
    }

    fn connective<'a>(operands: impl IntoIterator<Item = &'a Scalar>, symbol: &str, dominant: bool) -> Scalar {
        let mut saw_null = false;
        let mut decided = false;
        for operand in operands {
            match operand {
                Scalar::Error(_) => return operand.clone(),
                Scalar::Bool(b) if *b == dominant => decided = true,
                Scalar::Bool(_) => {}
                Scalar::Null => saw_null = true,
                other => {
                    return Scalar::error(format!(
                        "{} expects bool operands, got {} ({})",
                        symbol,
                        other,
                        other.type_name()
                    ));
                }
            }
        }
        if decided {
            Scalar::Bool(dominant)
        } else if saw_null {
            Scalar::NULL
        } else {
            Scalar::Bool(!dominant)
        }
    }

    pub fn not(&self) -> Scalar {
        match self {
            Scalar::Bool(b) => Scalar::Bool(!b),
            Scalar::Error(_) | Scalar::Null => self.clone(),
            other => Scalar::error(format!(
                "! expects a bool, got {} ({})",
                other,
                other.type_name()
            )),
        }
    }

    // ---------------------------------------------------------------------
    // Conversion
    // ---------------------------------------------------------------------

    /// Convert to a `serde_json::Value`. Placeholders, errors and
    /// non-finite doubles become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::String(s) => serde_json::Value::String(s.clone()),
            Scalar::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Long(n) => serde_json::Value::Number((*n).into()),
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            _ => serde_json::Value::Null,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Scalar {
        match value {
            serde_json::Value::Null => Scalar::Null,
            serde_json::Value::Bool(b) => Scalar::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Long(i),
                None => Scalar::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Scalar::String(s.clone()),
            serde_json::Value::Array(_) => Scalar::Array,
            serde_json::Value::Object(_) => Scalar::Object,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "'{}'", s),
            Scalar::Double(n) => write!(f, "{:?}", n),
            Scalar::Long(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => f.write_str("null"),
            Scalar::Array => f.write_str("[...]"),
            Scalar::Object => f.write_str("{...}"),
            Scalar::Error(msg) => write!(f, "error: {}", msg),
            Scalar::Undefined => f.write_str("undefined"),
        }
    }
}
