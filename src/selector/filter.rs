//! Filter expressions for `[?(...)]` selector steps
//!
//! Grammar:
//!
//! ```text
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | compare
//! compare := postfix (('==' | '!=' | '<' | '<=' | '>' | '>=') postfix)?
//! postfix := primary ('.' name | '.' method '(' args ')' | '[' key ']')*
//! primary := '@' | '@property' | '@key' | literal | /regex/flags | '(' or ')'
//! ```
//!
//! Methods: `endsWith`, `startsWith`, `includes`, `match`, `toLowerCase`,
//! `toUpperCase`; `.length` reads string, sequence or mapping size.

use super::SelectorError;
use crate::document::{Node, PathSegment};
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    At,
    AtProperty,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Not,
    And,
    Or,
    Cmp(CmpOp),
    Ident(String),
    Str(String),
    Num(f64),
    Regex(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Method {
    EndsWith,
    StartsWith,
    Includes,
    ToLowerCase,
    ToUpperCase,
}

impl Method {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "endsWith" => Some(Method::EndsWith),
            "startsWith" => Some(Method::StartsWith),
            "includes" => Some(Method::Includes),
            "toLowerCase" => Some(Method::ToLowerCase),
            "toUpperCase" => Some(Method::ToUpperCase),
            _ => None,
        }
    }

    fn arity(self) -> usize {
        match self {
            Method::ToLowerCase | Method::ToUpperCase => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
    Literal(Literal),
    /// `@` followed by key/index accessors
    Current(Vec<PathSegment>),
    Property,
    Call(Box<Expr>, Method, Vec<Expr>),
    Matches(Box<Expr>, Regex),
    Length(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

/// Runtime value of a sub-expression
#[derive(Debug, Clone, PartialEq)]
enum Value<'a> {
    Missing,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Collection(&'a Node),
}

impl<'a> Value<'a> {
    fn from_node(node: Option<&'a Node>) -> Self {
        match node {
            None => Value::Missing,
            Some(Node::Null) => Value::Null,
            Some(Node::Bool(b)) => Value::Bool(*b),
            Some(Node::Number(n)) => n.as_f64().map(Value::Num).unwrap_or(Value::Missing),
            Some(Node::String(s)) => Value::Str(s.clone()),
            Some(node) => Value::Collection(node),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Missing | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Collection(_) => true,
        }
    }

    fn loose_eq(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Missing | Value::Null, Value::Missing | Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Collection(a), Value::Collection(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }

    fn partial_cmp(&self, other: &Value<'_>) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// A compiled filter expression
#[derive(Debug, Clone)]
pub struct Filter {
    source: String,
    expr: Expr,
}

impl Filter {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = ExprParser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.or()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unexpected trailing tokens"));
        }
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against a candidate child and its key or index
    pub fn matches(&self, node: &Node, property: &PathSegment) -> bool {
        eval(&self.expr, node, property).truthy()
    }
}

fn eval<'a>(expr: &Expr, node: &'a Node, property: &PathSegment) -> Value<'a> {
    match expr {
        Expr::Or(a, b) => {
            Value::Bool(eval(a, node, property).truthy() || eval(b, node, property).truthy())
        }
        Expr::And(a, b) => {
            Value::Bool(eval(a, node, property).truthy() && eval(b, node, property).truthy())
        }
        Expr::Not(inner) => Value::Bool(!eval(inner, node, property).truthy()),
        Expr::Compare(a, op, b) => {
            let left = eval(a, node, property);
            let right = eval(b, node, property);
            let result = match op {
                CmpOp::Eq => left.loose_eq(&right),
                CmpOp::Ne => !left.loose_eq(&right),
                CmpOp::Lt => left.partial_cmp(&right) == Some(std::cmp::Ordering::Less),
                CmpOp::Le => matches!(
                    left.partial_cmp(&right),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                ),
                CmpOp::Gt => left.partial_cmp(&right) == Some(std::cmp::Ordering::Greater),
                CmpOp::Ge => matches!(
                    left.partial_cmp(&right),
                    Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                ),
            };
            Value::Bool(result)
        }
        Expr::Literal(literal) => match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Num(n) => Value::Num(*n),
            Literal::Str(s) => Value::Str(s.clone()),
        },
        Expr::Current(accessors) => {
            let target = accessors.iter().try_fold(node, |n, segment| match segment {
                PathSegment::Key(k) => n.get(k),
                PathSegment::Index(i) => n.index(*i),
            });
            Value::from_node(target)
        }
        Expr::Property => match property {
            PathSegment::Key(k) => Value::Str(k.clone()),
            PathSegment::Index(i) => Value::Num(*i as f64),
        },
        Expr::Length(inner) => match eval(inner, node, property) {
            Value::Str(s) => Value::Num(s.chars().count() as f64),
            Value::Collection(Node::Sequence(items)) => Value::Num(items.len() as f64),
            Value::Collection(Node::Mapping(entries)) => Value::Num(entries.len() as f64),
            _ => Value::Missing,
        },
        Expr::Matches(inner, regex) => match eval(inner, node, property) {
            Value::Str(s) => Value::Bool(regex.is_match(&s)),
            _ => Value::Bool(false),
        },
        Expr::Call(inner, method, args) => {
            let receiver = eval(inner, node, property);
            let arg = args.first().map(|a| eval(a, node, property));
            call(method, receiver, arg)
        }
    }
}

fn call<'a>(method: &Method, receiver: Value<'a>, arg: Option<Value<'a>>) -> Value<'a> {
    match (method, receiver, arg) {
        (Method::EndsWith, Value::Str(s), Some(Value::Str(a))) => Value::Bool(s.ends_with(&a)),
        (Method::StartsWith, Value::Str(s), Some(Value::Str(a))) => {
            Value::Bool(s.starts_with(&a))
        }
        (Method::Includes, Value::Str(s), Some(Value::Str(a))) => Value::Bool(s.contains(&a)),
        (Method::Includes, Value::Collection(Node::Sequence(items)), Some(a)) => Value::Bool(
            items
                .iter()
                .any(|item| Value::from_node(Some(item)).loose_eq(&a)),
        ),
        (Method::ToLowerCase, Value::Str(s), _) => Value::Str(s.to_lowercase()),
        (Method::ToUpperCase, Value::Str(s), _) => Value::Str(s.to_uppercase()),
        (Method::ToLowerCase | Method::ToUpperCase, _, _) => Value::Missing,
        _ => Value::Bool(false),
    }
}

/// Compile a JavaScript-style regex literal body and flags
pub(crate) fn compile_regex(pattern: &str, flags: &str) -> Result<Regex, SelectorError> {
    let inline: String = flags.chars().filter(|f| matches!(f, 'i' | 'm' | 's')).collect();
    let full = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", inline, pattern)
    };
    Regex::new(&full).map_err(|e| SelectorError::Regex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

struct Lexer<'s> {
    source: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::Filter {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn tokenize(mut self) -> Result<Vec<Token>, SelectorError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }

            let token = match c {
                '@' => {
                    self.pos += 1;
                    if matches!(self.peek(), Some(n) if n.is_ascii_alphabetic()) {
                        let word = self.ident();
                        match word.as_str() {
                            "property" | "key" => Token::AtProperty,
                            _ => return Err(self.error(format!("unknown variable '@{}'", word))),
                        }
                    } else {
                        Token::At
                    }
                }
                '.' => {
                    self.pos += 1;
                    Token::Dot
                }
                '[' => {
                    self.pos += 1;
                    Token::LBracket
                }
                ']' => {
                    self.pos += 1;
                    Token::RBracket
                }
                '(' => {
                    self.pos += 1;
                    Token::LParen
                }
                ')' => {
                    self.pos += 1;
                    Token::RParen
                }
                ',' => {
                    self.pos += 1;
                    Token::Comma
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.pos += 2;
                    Token::And
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.pos += 2;
                    Token::Or
                }
                '=' if self.peek_at(1) == Some('=') => {
                    self.pos += if self.peek_at(2) == Some('=') { 3 } else { 2 };
                    Token::Cmp(CmpOp::Eq)
                }
                '!' if self.peek_at(1) == Some('=') => {
                    self.pos += if self.peek_at(2) == Some('=') { 3 } else { 2 };
                    Token::Cmp(CmpOp::Ne)
                }
                '!' => {
                    self.pos += 1;
                    Token::Not
                }
                '<' | '>' => {
                    let inclusive = self.peek_at(1) == Some('=');
                    self.pos += if inclusive { 2 } else { 1 };
                    Token::Cmp(match (c, inclusive) {
                        ('<', false) => CmpOp::Lt,
                        ('<', true) => CmpOp::Le,
                        ('>', false) => CmpOp::Gt,
                        _ => CmpOp::Ge,
                    })
                }
                '\'' | '"' => Token::Str(self.delimited(c)?),
                '/' => {
                    let pattern = self.delimited('/')?;
                    let flags = self.ident();
                    Token::Regex(pattern, flags)
                }
                c if c.is_ascii_digit()
                    || (c == '-' && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit())) =>
                {
                    self.number()?
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => Token::Ident(self.ident()),
                other => return Err(self.error(format!("unexpected character '{}'", other))),
            };
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn number(&mut self) -> Result<Token, SelectorError> {
        let start = self.pos;
        self.pos += 1;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Num)
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    /// String or regex body; a backslash before the delimiter escapes it
    fn delimited(&mut self, delimiter: char) -> Result<String, SelectorError> {
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\\' {
                match self.peek() {
                    Some(next) if next == delimiter => {
                        out.push(next);
                        self.pos += 1;
                    }
                    // Keep regex escapes such as `\d` intact
                    Some(next) if delimiter == '/' => {
                        out.push('\\');
                        out.push(next);
                        self.pos += 1;
                    }
                    Some(next) => {
                        out.push(next);
                        self.pos += 1;
                    }
                    None => break,
                }
                continue;
            }
            if c == delimiter {
                return Ok(out);
            }
            out.push(c);
        }
        Err(self.error(format!("unterminated literal starting with {}", delimiter)))
    }
}

struct ExprParser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser<'_> {
    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::Filter {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), SelectorError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {:?}, found {:?}", expected, token))),
            None => Err(self.error(format!("expected {:?}", expected))),
        }
    }

    fn or(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, SelectorError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, SelectorError> {
        let left = self.postfix()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.postfix()?;
            return Ok(Expr::Compare(Box::new(left), op, Box::new(right)));
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expr, SelectorError> {
        let mut expr = self.primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = match self.next() {
                        Some(Token::Ident(name)) => name,
                        other => {
                            return Err(self.error(format!("expected name after '.', found {:?}", other)))
                        }
                    };

                    if self.peek() == Some(&Token::LParen) {
                        expr = self.method(expr, &name)?;
                    } else if name == "length" {
                        expr = Expr::Length(Box::new(expr));
                    } else if let Expr::Current(ref mut accessors) = expr {
                        accessors.push(PathSegment::Key(name));
                    } else {
                        return Err(self.error(format!("cannot access '{}' here", name)));
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let segment = match self.next() {
                        Some(Token::Str(key)) => PathSegment::Key(key),
                        Some(Token::Num(n)) if n >= 0.0 && n.fract() == 0.0 => {
                            PathSegment::Index(n as usize)
                        }
                        other => return Err(self.error(format!("invalid accessor {:?}", other))),
                    };
                    self.expect(Token::RBracket)?;
                    match expr {
                        Expr::Current(ref mut accessors) => accessors.push(segment),
                        _ => return Err(self.error("accessors are only supported on '@'")),
                    }
                }
                _ => return Ok(expr),
            }
        }
    }

    fn method(&mut self, receiver: Expr, name: &str) -> Result<Expr, SelectorError> {
        self.expect(Token::LParen)?;

        if name == "match" || name == "test" {
            let regex = match self.next() {
                Some(Token::Regex(pattern, flags)) => compile_regex(&pattern, &flags)?,
                Some(Token::Str(pattern)) => compile_regex(&pattern, "")?,
                other => return Err(self.error(format!("match() expects a regex, found {:?}", other))),
            };
            self.expect(Token::RParen)?;
            return Ok(Expr::Matches(Box::new(receiver), regex));
        }

        let method =
            Method::from_name(name).ok_or_else(|| self.error(format!("unknown method '{}'", name)))?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.or()?);
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        if args.len() != method.arity() {
            return Err(self.error(format!(
                "{}() takes {} argument(s), got {}",
                name,
                method.arity(),
                args.len()
            )));
        }

        Ok(Expr::Call(Box::new(receiver), method, args))
    }

    fn primary(&mut self) -> Result<Expr, SelectorError> {
        match self.next() {
            Some(Token::At) => Ok(Expr::Current(Vec::new())),
            Some(Token::AtProperty) => Ok(Expr::Property),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Num(n)) => Ok(Expr::Literal(Literal::Num(n))),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Expr::Literal(Literal::Bool(true))),
                "false" => Ok(Expr::Literal(Literal::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Literal::Null)),
                _ => Err(self.error(format!("unexpected identifier '{}'", word))),
            },
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Regex(..)) => Err(self.error("regex literal outside match()")),
            Some(token) => Err(self.error(format!("unexpected token {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}
