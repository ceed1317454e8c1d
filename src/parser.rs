use std::{fmt, mem};

use crate::{
    ast::{AggregateKind, BinaryKind, Operation, QuantifierKind, Token, UnaryKind},
    lexer::Lexer,
};

/// Syntax error in expression text, with the character offset where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Precedence-climbing parser for the expression syntax.
///
/// The whole input is tokenized up front so member calls can be told apart
/// from field steps with two tokens of lookahead.
pub struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
    current_token: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let at_end = token == Token::Eof;
            tokens.push((token, lexer.token_start()));
            if at_end {
                break;
            }
        }
        let current_token = tokens[0].0.clone();
        Ok(Parser {
            tokens,
            index: 0,
            current_token,
        })
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        self.current_token = self.tokens[self.index].0.clone();
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.index + offset)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.tokens[self.index].1,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if mem::discriminant(&self.current_token) != mem::discriminant(&expected) {
            return Err(self.error(format!("expected {:?}, got {:?}", expected, self.current_token)));
        }
        self.advance();
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            token => {
                self.current_token = token;
                Err(self.error(format!("expected identifier, got {:?}", self.current_token)))
            }
        }
    }

    /// Parse primary expressions: literals, fields, function calls, '(' ')'
    fn parse_primary(&mut self) -> Result<Operation, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Float(n) => {
                self.advance();
                Ok(Operation::double(n))
            }
            Token::Integer(n) => {
                self.advance();
                Ok(Operation::long(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Operation::string(s))
            }
            Token::Boolean(b) => {
                self.advance();
                Ok(Operation::bool(b))
            }
            Token::Null => {
                self.advance();
                Ok(Operation::Null)
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Identifier(name) => {
                self.advance();
                if self.check(&Token::LParen) {
                    self.parse_function(&name)
                } else {
                    self.parse_field(name)
                }
            }
            token => {
                self.current_token = token;
                Err(self.error(format!("unexpected token {:?}", self.current_token)))
            }
        }
    }

    /// Field steps: `.name` (unless it is a member call) and `[n]` / `[*]`
    fn parse_field(&mut self, mut name: String) -> Result<Operation, ParseError> {
        loop {
            if self.check(&Token::Dot)
                && matches!(self.peek(1), Token::Identifier(_))
                && !matches!(self.peek(2), Token::LParen)
            {
                self.advance();
                let member = self.expect_identifier()?;
                name.push('.');
                name.push_str(&member);
            } else if self.check(&Token::LBracket) {
                self.advance();
                match mem::replace(&mut self.current_token, Token::Eof) {
                    Token::Integer(n) if n >= 0 => name.push_str(&format!("[{}]", n)),
                    Token::Star => name.push_str("[*]"),
                    token => {
                        self.current_token = token;
                        return Err(self.error("expected index or '*' in brackets"));
                    }
                }
                self.advance();
                self.expect(Token::RBracket)?;
            } else {
                return Ok(Operation::field(name));
            }
        }
    }

    fn parse_function(&mut self, name: &str) -> Result<Operation, ParseError> {
        let kind = match name {
            "Abs" => Some(UnaryKind::Abs),
            "Ceiling" => Some(UnaryKind::Ceiling),
            "Floor" => Some(UnaryKind::Floor),
            "Exp" => Some(UnaryKind::Exp),
            "Log" => Some(UnaryKind::Log),
            "Sqrt" => Some(UnaryKind::Sqrt),
            "Negate" => Some(UnaryKind::Negate),
            _ => None,
        };
        let args = self.parse_arguments()?;

        if let Some(kind) = kind {
            let [value] = <[Operation; 1]>::try_from(args)
                .map_err(|_| self.error(format!("{} expects one argument", name)))?;
            return Ok(Operation::unary(kind, value));
        }
        match name {
            "And" if !args.is_empty() => Ok(Operation::and(args)),
            "Or" if !args.is_empty() => Ok(Operation::or(args)),
            _ => Err(self.error(format!("unknown function '{}'", name))),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Operation>, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = vec![];
        while !self.check(&Token::RParen) {
            args.push(self.parse_expression()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    /// `arg => body` inside a member call
    fn parse_lambda_argument(&mut self) -> Result<(String, Operation), ParseError> {
        let arg = self.expect_identifier()?;
        self.expect(Token::Arrow)?;
        let body = self.parse_expression()?;
        Ok((arg, body))
    }

    fn parse_method(&mut self, receiver: Operation) -> Result<Operation, ParseError> {
        let method = self.expect_identifier()?;

        let binary = match method.as_str() {
            "Contains" => Some(BinaryKind::Contains),
            "StartsWith" => Some(BinaryKind::StartsWith),
            "EndsWith" => Some(BinaryKind::EndsWith),
            _ => None,
        };
        if let Some(kind) = binary {
            let [arg] = <[Operation; 1]>::try_from(self.parse_arguments()?)
                .map_err(|_| self.error(format!("{} expects one argument", method)))?;
            return Ok(Operation::binary(kind, receiver, arg));
        }
        if method == "Length" {
            self.expect(Token::LParen)?;
            self.expect(Token::RParen)?;
            return Ok(Operation::unary(UnaryKind::Length, receiver));
        }

        if receiver.field_name().is_none() {
            return Err(self.error(format!("{} must be called on a field", method)));
        }
        self.expect(Token::LParen)?;

        if method == "Count" && self.check(&Token::RParen) {
            self.advance();
            return Ok(Operation::count(receiver));
        }

        let quantifier = match method.as_str() {
            "Any" => Some(QuantifierKind::Any),
            "All" => Some(QuantifierKind::All),
            "Count" => Some(QuantifierKind::CountWhere),
            _ => None,
        };
        let aggregate = match method.as_str() {
            "Min" => Some(AggregateKind::Min),
            "Max" => Some(AggregateKind::Max),
            "Sum" => Some(AggregateKind::Sum),
            "Average" => Some(AggregateKind::Average),
            _ => None,
        };
        if quantifier.is_none() && aggregate.is_none() {
            return Err(self.error(format!("unknown method '{}'", method)));
        }

        let (arg, body) = self.parse_lambda_argument()?;
        self.expect(Token::RParen)?;

        Ok(match (quantifier, aggregate) {
            (Some(kind), _) => Operation::quantifier(kind, receiver, arg, body),
            (_, Some(kind)) => Operation::aggregate(kind, receiver, arg, body),
            _ => unreachable!("checked above"),
        })
    }

    fn parse_postfix(&mut self) -> Result<Operation, ParseError> {
        let mut expr = self.parse_primary()?;

        while self.check(&Token::Dot) {
            self.advance();
            expr = self.parse_method(expr)?;
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Operation, ParseError> {
        if self.check(&Token::Bang) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Operation::not(operand));
        }
        if self.check(&Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Operation::Int64 { value } => Operation::long(-value),
                Operation::Double { value } => Operation::double(-value),
                other => Operation::unary(UnaryKind::Negate, other),
            });
        }
        self.parse_postfix()
    }

    fn parse_multiplicative(&mut self) -> Result<Operation, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Star => BinaryKind::Multiply,
                Token::Slash => BinaryKind::Divide,
                Token::Percent => BinaryKind::Modulo,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;
            left = Operation::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Operation, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinaryKind::Add,
                Token::Minus => BinaryKind::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;
            left = Operation::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Operation, ParseError> {
        let mut left = self.parse_additive()?;

        if let Some(op) = match &self.current_token {
            Token::EqEq => Some(BinaryKind::Equal),
            Token::NotEq => Some(BinaryKind::NotEqual),
            Token::Lt => Some(BinaryKind::LessThan),
            Token::Gt => Some(BinaryKind::GreaterThan),
            Token::LtEq => Some(BinaryKind::LessThanOrEqual),
            Token::GtEq => Some(BinaryKind::GreaterThanOrEqual),
            _ => None,
        } {
            self.advance();
            let right = self.parse_additive()?;
            left = Operation::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Operation, ParseError> {
        let first = self.parse_comparison()?;
        if !self.check(&Token::AndAnd) {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.check(&Token::AndAnd) {
            self.advance();
            operands.push(self.parse_comparison()?);
        }
        Ok(Operation::and(operands))
    }

    fn parse_or(&mut self) -> Result<Operation, ParseError> {
        let first = self.parse_and()?;
        if !self.check(&Token::OrOr) {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.check(&Token::OrOr) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(Operation::or(operands))
    }

    pub fn parse_expression(&mut self) -> Result<Operation, ParseError> {
        self.parse_or()
    }

    /// Parse a complete expression.
    pub fn parse(&mut self) -> Result<Operation, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    /// Parse `arg => body`, or a bare body bound to `default_arg`.
    pub fn parse_lambda(&mut self, default_arg: &str) -> Result<(String, Operation), ParseError> {
        let arg = match (&self.current_token, self.peek(1)) {
            (Token::Identifier(name), Token::Arrow) => {
                let name = name.clone();
                self.advance();
                self.advance();
                name
            }
            _ => default_arg.to_string(),
        };
        let body = self.parse()?;
        Ok((arg, body))
    }
}

/// Parse expression text into an [`Operation`].
pub fn parse_operation(text: &str) -> Result<Operation, ParseError> {
    Parser::new(Lexer::new(text))?.parse()
}
