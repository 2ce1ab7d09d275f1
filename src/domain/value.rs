//! Node payloads: numeric literals, operators, and named symbols.
//!
//! The printed form of every payload is the parsed form, so a serialized
//! tree tokenizes back to identical values.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Binary operator payload with a fixed precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    /// Binding strength: Add/Sub 1, Mul/Div 2, Pow 3.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div => 2,
            Operator::Pow => 3,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Sub),
            "*" => Some(Operator::Mul),
            "/" => Some(Operator::Div),
            "^" => Some(Operator::Pow),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Numeric literal. Formatted with `Display`, whose shortest
    /// representation parses back to the identical bits.
    Number(f64),
    /// Operator with fixed precedence.
    Operator(Operator),
    /// Named symbol, `[A-Za-z_][A-Za-z0-9_]*`.
    Symbol(String),
}

fn symbol_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid symbol pattern"))
}

impl Value {
    /// Parses one serialized token: operator table first, then numeric
    /// literal, then symbol. Returns `None` for anything else; the caller
    /// turns that into a syntax error with position info.
    pub fn parse_token(token: &str) -> Option<Value> {
        if let Some(op) = Operator::from_token(token) {
            return Some(Value::Operator(op));
        }
        if let Ok(n) = token.parse::<f64>() {
            return Some(Value::Number(n));
        }
        if symbol_pattern().is_match(token) {
            return Some(Value::Symbol(token.to_string()));
        }
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Operator(op) => write!(f, "{}", op),
            Value::Symbol(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}
