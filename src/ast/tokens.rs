/// Lexical tokens of the expression syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Number with a fraction or exponent
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e-3
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "item #1"
    /// ```
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    /// Argument, member or function name
    ///
    /// Must start with letter or underscore, followed by letters, digits, or underscores.
    ///
    /// # Examples
    /// ```text
    /// o
    /// item_count
    /// StartsWith
    /// ```
    Identifier(String),

    /// Lambda arrow
    ///
    /// # Examples
    /// ```text
    /// o => o.age > 18
    /// o.tags.Any(t => t == 'b')
    /// ```
    Arrow,

    // Comparison
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Logical
    /// `&&`
    AndAnd,

    /// `||`
    OrOr,

    /// `!`
    Bang,

    // Delimiters
    /// Left bracket for index and wildcard steps
    LBracket,

    RBracket,

    /// Left parenthesis for grouping or calls
    LParen,

    RParen,

    /// Dot for member access or method calls
    Dot,

    /// Comma separating call arguments
    Comma,

    /// End of input
    Eof,
}
