//! Sandboxed arithmetic language used by formation probability headers.
//!
//! Expressions are compiled once into a small tree and evaluated per call
//! against a fixed set of bindings: the wave number and a read-only view of
//! the formation being weighed. Evaluation never fails; arithmetic follows
//! IEEE semantics so `1/0` yields infinity and the caller decides what a
//! non-finite weight means.

use std::{f64::consts, fmt};

use formation_defence_core::{Formation, WaveNumber};
use thiserror::Error;

/// Deepest nesting of parentheses, operators and calls the parser accepts.
pub const MAX_NESTING: usize = 128;

/// Longest expression, in tokens, the parser accepts.
pub const MAX_TOKENS: usize = 4096;

/// Errors raised while compiling an expression.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExpressionError {
    /// The source contains a character outside the language.
    #[error("unexpected character `{character}` at offset {offset}")]
    UnexpectedCharacter {
        /// Offending character.
        character: char,
        /// Byte offset into the source.
        offset: usize,
    },
    /// A numeric literal could not be read.
    #[error("malformed number `{literal}` at offset {offset}")]
    InvalidNumber {
        /// Literal text.
        literal: String,
        /// Byte offset into the source.
        offset: usize,
    },
    /// A token appeared where the grammar does not allow it.
    #[error("unexpected `{found}` at offset {offset}")]
    UnexpectedToken {
        /// Rendered token.
        found: String,
        /// Byte offset into the source.
        offset: usize,
    },
    /// The source ended in the middle of an expression.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A name that is not bound.
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    /// A call to a function that does not exist.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// A call with the wrong number of arguments.
    #[error("`{function}` expects {expected} argument(s), found {found}")]
    Arity {
        /// Called function.
        function: &'static str,
        /// Accepted argument count.
        expected: &'static str,
        /// Supplied argument count.
        found: usize,
    },
    /// Nesting went deeper than [`MAX_NESTING`].
    #[error("expression nests deeper than {limit} levels")]
    TooDeep {
        /// Accepted nesting depth.
        limit: usize,
    },
    /// The source holds more than [`MAX_TOKENS`] tokens.
    #[error("expression has {found} tokens, the limit is {limit}")]
    TooLong {
        /// Token count of the source.
        found: usize,
        /// Accepted token count.
        limit: usize,
    },
}

/// Values an expression may read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bindings {
    /// Current wave number.
    pub wave: f64,
    /// Difficulty of the formation being weighed.
    pub difficulty: f64,
    /// First eligible wave of the formation.
    pub min_wave: f64,
    /// Largest ship time offset of the formation.
    pub duration: f64,
    /// Authored gap of the formation, `NaN` when unset.
    pub gap: f64,
    /// Number of ship lines in the formation.
    pub ships: f64,
}

impl Bindings {
    /// Captures the bindings for `formation` at `wave`.
    #[must_use]
    pub fn for_formation(wave: WaveNumber, formation: &Formation) -> Self {
        Self {
            wave: wave.as_f64(),
            difficulty: formation.difficulty(),
            min_wave: formation.min_wave().as_f64(),
            duration: formation.duration(),
            gap: formation.gap().unwrap_or(f64::NAN),
            ships: formation.ships().len() as f64,
        }
    }
}

/// Compiled expression ready for repeated evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Compiles `source` into an evaluable expression.
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.len() > MAX_TOKENS {
            return Err(ExpressionError::TooLong {
                found: tokens.len(),
                limit: MAX_TOKENS,
            });
        }
        let mut parser = Parser {
            tokens,
            cursor: 0,
            depth: 0,
        };
        let root = parser.expression()?;
        if let Some((token, offset)) = parser.peek_with_offset() {
            return Err(ExpressionError::UnexpectedToken {
                found: token.to_string(),
                offset,
            });
        }
        Ok(Self {
            source: source.to_owned(),
            root,
        })
    }

    /// Source text the expression was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against `bindings`.
    #[must_use]
    pub fn evaluate(&self, bindings: &Bindings) -> f64 {
        self.root.evaluate(bindings)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Variable {
    Wave,
    Difficulty,
    MinWave,
    Duration,
    Gap,
    Ships,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Function {
    Max,
    Min,
    Abs,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Exp,
    Log,
    Sign,
    Pow,
    Clamp,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        let name = name.strip_prefix("Math.").unwrap_or(name);
        Some(match name {
            "max" => Self::Max,
            "min" => Self::Min,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "sqrt" => Self::Sqrt,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "sign" => Self::Sign,
            "pow" => Self::Pow,
            "clamp" => Self::Clamp,
            _ => return None,
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Abs => "abs",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sign => "sign",
            Self::Pow => "pow",
            Self::Clamp => "clamp",
        }
    }

    fn check_arity(self, found: usize) -> Result<(), ExpressionError> {
        let (accepted, expected) = match self {
            Self::Max | Self::Min => (true, "any number of"),
            Self::Pow => (found == 2, "2"),
            Self::Clamp => (found == 3, "3"),
            _ => (found == 1, "1"),
        };
        if accepted {
            Ok(())
        } else {
            Err(ExpressionError::Arity {
                function: self.name(),
                expected,
                found,
            })
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        let first = args.first().copied().unwrap_or(f64::NAN);
        match self {
            Self::Max if args.is_empty() => f64::NEG_INFINITY,
            Self::Min if args.is_empty() => f64::INFINITY,
            Self::Max => fold_propagating_nan(args, f64::max),
            Self::Min => fold_propagating_nan(args, f64::min),
            Self::Abs => first.abs(),
            Self::Floor => first.floor(),
            Self::Ceil => first.ceil(),
            Self::Round => round_half_up(first),
            Self::Sqrt => first.sqrt(),
            Self::Exp => first.exp(),
            Self::Log => first.ln(),
            Self::Sign => {
                if first.is_nan() || first == 0.0 {
                    first
                } else {
                    first.signum()
                }
            }
            Self::Pow => first.powf(args.get(1).copied().unwrap_or(f64::NAN)),
            Self::Clamp => {
                let low = args.get(1).copied().unwrap_or(f64::NAN);
                let high = args.get(2).copied().unwrap_or(f64::NAN);
                let raised = fold_propagating_nan(&[first, low], f64::max);
                fold_propagating_nan(&[raised, high], f64::min)
            }
        }
    }
}

fn fold_propagating_nan(values: &[f64], combine: fn(f64, f64) -> f64) -> f64 {
    let mut iter = values.iter().copied();
    let Some(first) = iter.next() else {
        return f64::NAN;
    };
    iter.fold(first, |acc, value| {
        if acc.is_nan() || value.is_nan() {
            f64::NAN
        } else {
            combine(acc, value)
        }
    })
}

fn round_half_up(value: f64) -> f64 {
    if value.fract() == -0.5 {
        value.ceil()
    } else {
        value.round()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Number(f64),
    Variable(Variable),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Logical(LogicalOp, Box<Node>, Box<Node>),
    Conditional(Box<Node>, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl Node {
    fn evaluate(&self, bindings: &Bindings) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Variable(variable) => match variable {
                Variable::Wave => bindings.wave,
                Variable::Difficulty => bindings.difficulty,
                Variable::MinWave => bindings.min_wave,
                Variable::Duration => bindings.duration,
                Variable::Gap => bindings.gap,
                Variable::Ships => bindings.ships,
            },
            Self::Unary(op, operand) => {
                let value = operand.evaluate(bindings);
                match op {
                    UnaryOp::Negate => -value,
                    UnaryOp::Plus => value,
                    UnaryOp::Not => flag(!truthy(value)),
                }
            }
            Self::Logical(op, left, right) => {
                let value = left.evaluate(bindings);
                match (op, truthy(value)) {
                    (LogicalOp::And, true) | (LogicalOp::Or, false) => right.evaluate(bindings),
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => value,
                }
            }
            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(bindings);
                let rhs = right.evaluate(bindings);
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Subtract => lhs - rhs,
                    BinaryOp::Multiply => lhs * rhs,
                    BinaryOp::Divide => lhs / rhs,
                    BinaryOp::Remainder => lhs % rhs,
                    BinaryOp::Power => lhs.powf(rhs),
                    BinaryOp::Less => flag(lhs < rhs),
                    BinaryOp::LessEqual => flag(lhs <= rhs),
                    BinaryOp::Greater => flag(lhs > rhs),
                    BinaryOp::GreaterEqual => flag(lhs >= rhs),
                    BinaryOp::Equal => flag(lhs == rhs),
                    BinaryOp::NotEqual => flag(lhs != rhs),
                }
            }
            Self::Conditional(condition, then, otherwise) => {
                if truthy(condition.evaluate(bindings)) {
                    then.evaluate(bindings)
                } else {
                    otherwise.evaluate(bindings)
                }
            }
            Self::Call(function, args) => {
                let values: Vec<f64> = args.iter().map(|arg| arg.evaluate(bindings)).collect();
                function.apply(&values)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Symbol(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Ident(name) => f.write_str(name),
            Self::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

/// Longest symbols first so that greedy matching picks `===` over `==`.
const SYMBOLS: [&str; 23] = [
    "===", "!==", "**", "<=", ">=", "==", "!=", "&&", "||", "+", "-", "*", "/", "%", "(", ")",
    ",", ".", "?", ":", "<", ">", "!",
];

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ExpressionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let byte = bytes[offset];
        if byte.is_ascii_whitespace() {
            offset += 1;
            continue;
        }

        let starts_number = byte.is_ascii_digit()
            || (byte == b'.' && bytes.get(offset + 1).is_some_and(u8::is_ascii_digit));
        if starts_number {
            let start = offset;
            offset = scan_number(bytes, offset);
            let literal = &source[start..offset];
            let value = literal
                .parse::<f64>()
                .map_err(|_| ExpressionError::InvalidNumber {
                    literal: literal.to_owned(),
                    offset: start,
                })?;
            tokens.push((Token::Number(value), start));
            continue;
        }

        if byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$' {
            let start = offset;
            while offset < bytes.len()
                && (bytes[offset].is_ascii_alphanumeric() || matches!(bytes[offset], b'_' | b'$'))
            {
                offset += 1;
            }
            tokens.push((Token::Ident(source[start..offset].to_owned()), start));
            continue;
        }

        let rest = &source[offset..];
        match SYMBOLS.iter().find(|symbol| rest.starts_with(**symbol)) {
            Some(symbol) => {
                tokens.push((Token::Symbol(*symbol), offset));
                offset += symbol.len();
            }
            None => {
                let character = rest.chars().next().unwrap_or_default();
                return Err(ExpressionError::UnexpectedCharacter { character, offset });
            }
        }
    }

    Ok(tokens)
}

fn scan_number(bytes: &[u8], mut offset: usize) -> usize {
    while offset < bytes.len() && bytes[offset].is_ascii_digit() {
        offset += 1;
    }
    if offset < bytes.len() && bytes[offset] == b'.' {
        offset += 1;
        while offset < bytes.len() && bytes[offset].is_ascii_digit() {
            offset += 1;
        }
    }
    if offset < bytes.len() && matches!(bytes[offset], b'e' | b'E') {
        let mut exponent = offset + 1;
        if exponent < bytes.len() && matches!(bytes[exponent], b'+' | b'-') {
            exponent += 1;
        }
        if exponent < bytes.len() && bytes[exponent].is_ascii_digit() {
            offset = exponent;
            while offset < bytes.len() && bytes[offset].is_ascii_digit() {
                offset += 1;
            }
        }
    }
    offset
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(token, _)| token)
    }

    fn peek_with_offset(&self) -> Option<(&Token, usize)> {
        self.tokens
            .get(self.cursor)
            .map(|(token, offset)| (token, *offset))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(token, _)| token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(found)) if *found == symbol) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, symbol: &str) -> Result<(), ExpressionError> {
        if self.eat(symbol) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ExpressionError {
        match self.peek_with_offset() {
            Some((token, offset)) => ExpressionError::UnexpectedToken {
                found: token.to_string(),
                offset,
            },
            None => ExpressionError::UnexpectedEnd,
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExpressionError::TooDeep { limit: MAX_NESTING });
        }
        Ok(())
    }

    fn nested<F>(&mut self, parse: F) -> Result<Node, ExpressionError>
    where
        F: FnOnce(&mut Self) -> Result<Node, ExpressionError>,
    {
        self.descend()?;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn expression(&mut self) -> Result<Node, ExpressionError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Node, ExpressionError> {
        let condition = self.or()?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let then = self.expression()?;
        self.expect(":")?;
        let otherwise = self.expression()?;
        Ok(Node::Conditional(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn or(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.and()?;
        while self.eat("||") {
            node = Node::Logical(LogicalOp::Or, Box::new(node), Box::new(self.and()?));
        }
        Ok(node)
    }

    fn and(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.equality()?;
        while self.eat("&&") {
            node = Node::Logical(LogicalOp::And, Box::new(node), Box::new(self.equality()?));
        }
        Ok(node)
    }

    fn equality(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.relation()?;
        loop {
            let op = match self.peek() {
                Some(Token::Symbol("==" | "===")) => BinaryOp::Equal,
                Some(Token::Symbol("!=" | "!==")) => BinaryOp::NotEqual,
                _ => return Ok(node),
            };
            self.cursor += 1;
            node = Node::Binary(op, Box::new(node), Box::new(self.relation()?));
        }
    }

    fn relation(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.sum()?;
        loop {
            let op = match self.peek() {
                Some(Token::Symbol("<")) => BinaryOp::Less,
                Some(Token::Symbol("<=")) => BinaryOp::LessEqual,
                Some(Token::Symbol(">")) => BinaryOp::Greater,
                Some(Token::Symbol(">=")) => BinaryOp::GreaterEqual,
                _ => return Ok(node),
            };
            self.cursor += 1;
            node = Node::Binary(op, Box::new(node), Box::new(self.sum()?));
        }
    }

    fn sum(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Symbol("+")) => BinaryOp::Add,
                Some(Token::Symbol("-")) => BinaryOp::Subtract,
                _ => return Ok(node),
            };
            self.cursor += 1;
            node = Node::Binary(op, Box::new(node), Box::new(self.product()?));
        }
    }

    fn product(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Symbol("*")) => BinaryOp::Multiply,
                Some(Token::Symbol("/")) => BinaryOp::Divide,
                Some(Token::Symbol("%")) => BinaryOp::Remainder,
                _ => return Ok(node),
            };
            self.cursor += 1;
            node = Node::Binary(op, Box::new(node), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Node, ExpressionError> {
        let op = match self.peek() {
            Some(Token::Symbol("-")) => UnaryOp::Negate,
            Some(Token::Symbol("+")) => UnaryOp::Plus,
            Some(Token::Symbol("!")) => UnaryOp::Not,
            _ => return self.power(),
        };
        self.cursor += 1;
        let operand = self.nested(Self::unary)?;
        Ok(Node::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Node, ExpressionError> {
        let base = self.primary()?;
        if self.eat("**") {
            let exponent = self.nested(Self::unary)?;
            return Ok(Node::Binary(BinaryOp::Power, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ExpressionError> {
        let offset = self.peek_with_offset().map(|(_, offset)| offset);
        match self.advance() {
            Some(Token::Number(value)) => Ok(Node::Number(value)),
            Some(Token::Symbol("(")) => {
                let inner = self.expression()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(Token::Ident(first)) => {
                let path = self.path(first)?;
                if self.eat("(") {
                    let function = Function::lookup(&path)
                        .ok_or_else(|| ExpressionError::UnknownFunction(path.clone()))?;
                    let args = self.arguments()?;
                    function.check_arity(args.len())?;
                    return Ok(Node::Call(function, args));
                }
                resolve_name(&path)
            }
            Some(token) => Err(ExpressionError::UnexpectedToken {
                found: token.to_string(),
                offset: offset.unwrap_or_default(),
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn path(&mut self, first: String) -> Result<String, ExpressionError> {
        let mut path = first;
        while self.eat(".") {
            match self.advance() {
                Some(Token::Ident(segment)) => {
                    path.push('.');
                    path.push_str(&segment);
                }
                Some(_) => {
                    self.cursor -= 1;
                    return Err(self.unexpected());
                }
                None => return Err(ExpressionError::UnexpectedEnd),
            }
        }
        Ok(path)
    }

    fn arguments(&mut self) -> Result<Vec<Node>, ExpressionError> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(")") {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }
}

fn resolve_name(path: &str) -> Result<Node, ExpressionError> {
    let node = match path {
        "wave" => Node::Variable(Variable::Wave),
        "formation.difficulty" => Node::Variable(Variable::Difficulty),
        "formation.minWave" => Node::Variable(Variable::MinWave),
        "formation.duration" => Node::Variable(Variable::Duration),
        "formation.gap" => Node::Variable(Variable::Gap),
        "formation.ships" | "formation.ships.length" => Node::Variable(Variable::Ships),
        "Math.PI" => Node::Number(consts::PI),
        "Math.E" => Node::Number(consts::E),
        "Infinity" => Node::Number(f64::INFINITY),
        "NaN" => Node::Number(f64::NAN),
        "true" => Node::Number(1.0),
        "false" => Node::Number(0.0),
        _ => return Err(ExpressionError::UnknownIdentifier(path.to_owned())),
    };
    Ok(node)
}
