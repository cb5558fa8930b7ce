/* Copyright (C) 2018 Olivier Goffart <ogoffart@woboq.com>

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

//! GetText plural rules.
//!
//! The `Plural-Forms` attribute of a language looks like
//! `nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<12 || n%100>14) ? 1 : 2);`.
//! The `plural` expression is a small subset of C: the variable `n`, integer literals, the
//! arithmetic, relational, equality and logical operators, `!`, parentheses and the ternary
//! operator. Its value is the index of the plural form to use for the count `n`.

use std::fmt;
use thiserror::Error;

/// Maximum nesting of parentheses, `!` and `?:`. Real plural rules stay well below this.
const MAX_NESTING: usize = 128;

/// Maximum depth of the expression tree, which evaluation walks recursively. A chain of `k`
/// binary operators, such as `n+n+...+n`, is `k + 1` levels deep; longer expressions are
/// rejected like malformed ones.
const MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Unknown,
    Variable,
    Number(i64),
    Bang,
    Mul,
    Div,
    Mod,
    Plus,
    Minus,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    AmpAmp,
    PipePipe,
    LParen,
    RParen,
    Question,
    Colon,
}

/// Splits a plural expression into tokens. Whitespace is skipped, anything that is not part
/// of the grammar becomes [`Token::Unknown`].
pub fn tokenize(expression: &str) -> Vec<Token> {
    let bytes = expression.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(&c) = bytes.get(pos) {
        pos += 1;
        let next = bytes.get(pos).copied();
        let token = match c {
            b'n' => Token::Variable,
            b'*' => Token::Mul,
            b'/' => Token::Div,
            b'%' => Token::Mod,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'?' => Token::Question,
            b':' => Token::Colon,
            b'!' | b'<' | b'>' | b'=' if next == Some(b'=') => {
                pos += 1;
                match c {
                    b'!' => Token::Ne,
                    b'<' => Token::Le,
                    b'>' => Token::Ge,
                    _ => Token::Eq,
                }
            }
            b'!' => Token::Bang,
            b'<' => Token::Lt,
            b'>' => Token::Gt,
            b'&' if next == Some(b'&') => {
                pos += 1;
                Token::AmpAmp
            }
            b'|' if next == Some(b'|') => {
                pos += 1;
                Token::PipePipe
            }
            c if c.is_ascii_whitespace() => continue,
            c if c.is_ascii_digit() => {
                let mut value = Some(i64::from(c - b'0'));
                while let Some(&d) = bytes.get(pos).filter(|d| d.is_ascii_digit()) {
                    value = value
                        .and_then(|v| v.checked_mul(10))
                        .and_then(|v| v.checked_add(i64::from(d - b'0')));
                    pos += 1;
                }
                value.map_or(Token::Unknown, Token::Number)
            }
            _ => Token::Unknown,
        };
        out.push(token);
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Multiply,
    Divide,
    Modulo,
    Plus,
    Minus,
    Smaller,
    SmallerOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Smaller => "<",
            BinaryOp::SmallerOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SubExpression {
    NumberLiteral(i64),
    NVariable,
    Not(u32),
    Condition {
        condition: u32,
        true_expr: u32,
        false_expr: u32,
    },
    BinaryOp {
        op: BinaryOp,
        lhs: u32,
        rhs: u32,
    },
}

/// Failure of a single evaluation of a plural expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
}

impl SubExpression {
    fn evaluate(&self, sub_expressions: &[SubExpression], n: i64) -> Result<i64, EvalError> {
        let eval = |index: u32| sub_expressions[index as usize].evaluate(sub_expressions, n);
        match *self {
            Self::NumberLiteral(value) => Ok(value),
            Self::NVariable => Ok(n),
            Self::Not(arg) => Ok((eval(arg)? == 0) as i64),
            Self::Condition {
                condition,
                true_expr,
                false_expr,
            } => {
                if eval(condition)? != 0 {
                    eval(true_expr)
                } else {
                    eval(false_expr)
                }
            }
            Self::BinaryOp {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => Ok((eval(lhs)? != 0 && eval(rhs)? != 0) as i64),
            Self::BinaryOp {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => Ok((eval(lhs)? != 0 || eval(rhs)? != 0) as i64),
            Self::BinaryOp { op, lhs, rhs } => {
                let lhs_value = eval(lhs)?;
                let rhs_value = eval(rhs)?;
                Ok(match op {
                    BinaryOp::Divide | BinaryOp::Modulo if rhs_value == 0 => {
                        return Err(EvalError::DivisionByZero)
                    }
                    BinaryOp::Multiply => lhs_value.wrapping_mul(rhs_value),
                    BinaryOp::Divide => lhs_value.wrapping_div(rhs_value),
                    BinaryOp::Modulo => lhs_value.wrapping_rem(rhs_value),
                    BinaryOp::Plus => lhs_value.wrapping_add(rhs_value),
                    BinaryOp::Minus => lhs_value.wrapping_sub(rhs_value),
                    BinaryOp::Smaller => (lhs_value < rhs_value) as i64,
                    BinaryOp::SmallerOrEqual => (lhs_value <= rhs_value) as i64,
                    BinaryOp::Greater => (lhs_value > rhs_value) as i64,
                    BinaryOp::GreaterOrEqual => (lhs_value >= rhs_value) as i64,
                    BinaryOp::Equal => (lhs_value == rhs_value) as i64,
                    BinaryOp::NotEqual => (lhs_value != rhs_value) as i64,
                    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                })
            }
        }
    }
}

/// A parsed plural expression.
///
/// The nodes are kept in a flat array, children always before their parents, the root last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    sub_expressions: Box<[SubExpression]>,
}

impl Expression {
    /// Parses the value of the `plural=` clause. Returns `None` for anything which is not a
    /// complete, well-formed expression.
    pub fn parse(expression: &str) -> Option<Self> {
        let tokens = tokenize(expression);
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            nesting: 0,
            builder: ExpressionBuilder::default(),
        };
        parser.ternary()?;
        if parser.pos != tokens.len() {
            return None;
        }
        Some(parser.builder.into())
    }

    /// Evaluates the expression for the count `n`.
    ///
    /// `&&` and `||` only evaluate their right side when it decides the result.
    pub fn evaluate(&self, n: i64) -> Result<i64, EvalError> {
        match self.sub_expressions.last() {
            Some(root) => root.evaluate(&self.sub_expressions, n),
            None => Ok(0),
        }
    }

    fn fmt_sub(&self, index: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_expressions[index as usize] {
            SubExpression::NumberLiteral(value) => write!(f, "{}", value),
            SubExpression::NVariable => write!(f, "n"),
            SubExpression::Not(arg) => {
                write!(f, "!")?;
                self.fmt_sub(*arg, f)
            }
            SubExpression::Condition {
                condition,
                true_expr,
                false_expr,
            } => {
                write!(f, "(")?;
                self.fmt_sub(*condition, f)?;
                write!(f, " ? ")?;
                self.fmt_sub(*true_expr, f)?;
                write!(f, " : ")?;
                self.fmt_sub(*false_expr, f)?;
                write!(f, ")")
            }
            SubExpression::BinaryOp { op, lhs, rhs } => {
                write!(f, "(")?;
                self.fmt_sub(*lhs, f)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_sub(*rhs, f)?;
                write!(f, ")")
            }
        }
    }
}

/// Prints the expression fully parenthesized, showing how it was understood.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_expressions.len() {
            0 => Ok(()),
            len => self.fmt_sub((len - 1) as u32, f),
        }
    }
}

#[derive(Default)]
struct ExpressionBuilder {
    nodes: Vec<SubExpression>,
    depths: Vec<usize>,
}

impl ExpressionBuilder {
    fn add(&mut self, sub_expr: SubExpression) -> Option<u32> {
        let depth = |index: &u32| self.depths[*index as usize];
        let children = match &sub_expr {
            SubExpression::NumberLiteral(_) | SubExpression::NVariable => 0,
            SubExpression::Not(arg) => depth(arg),
            SubExpression::Condition {
                condition,
                true_expr,
                false_expr,
            } => depth(condition).max(depth(true_expr)).max(depth(false_expr)),
            SubExpression::BinaryOp { lhs, rhs, .. } => depth(lhs).max(depth(rhs)),
        };
        if children >= MAX_DEPTH {
            return None;
        }
        let index = u32::try_from(self.nodes.len()).ok()?;
        self.nodes.push(sub_expr);
        self.depths.push(children + 1);
        Some(index)
    }
}

impl From<ExpressionBuilder> for Expression {
    fn from(expression_builder: ExpressionBuilder) -> Self {
        Self {
            sub_expressions: expression_builder.nodes.into_boxed_slice(),
        }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    nesting: usize,
    builder: ExpressionBuilder,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn accept(&mut self, token: Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.nesting >= MAX_NESTING {
            return None;
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    /// `<or> ('?' <ternary> ':' <ternary>)?`
    fn ternary(&mut self) -> Option<u32> {
        let condition = self.logical_or()?;
        if !self.accept(Token::Question) {
            return Some(condition);
        }
        self.nested(|p| {
            let true_expr = p.ternary()?;
            if !p.accept(Token::Colon) {
                return None;
            }
            let false_expr = p.ternary()?;
            p.builder.add(SubExpression::Condition {
                condition,
                true_expr,
                false_expr,
            })
        })
    }

    /// Left-associative chain of `operand (op operand)*`.
    fn binary(
        &mut self,
        operand: fn(&mut Self) -> Option<u32>,
        operator: fn(Token) -> Option<BinaryOp>,
    ) -> Option<u32> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            let rhs = operand(self)?;
            lhs = self.builder.add(SubExpression::BinaryOp { op, lhs, rhs })?;
        }
        Some(lhs)
    }

    /// `<and> ('||' <and>)*`
    fn logical_or(&mut self) -> Option<u32> {
        self.binary(Self::logical_and, |t| match t {
            Token::PipePipe => Some(BinaryOp::Or),
            _ => None,
        })
    }

    /// `<equality> ('&&' <equality>)*`
    fn logical_and(&mut self) -> Option<u32> {
        self.binary(Self::equality, |t| match t {
            Token::AmpAmp => Some(BinaryOp::And),
            _ => None,
        })
    }

    /// `<relation> (('=='|'!=') <relation>)*`
    fn equality(&mut self) -> Option<u32> {
        self.binary(Self::relation, |t| match t {
            Token::Eq => Some(BinaryOp::Equal),
            Token::Ne => Some(BinaryOp::NotEqual),
            _ => None,
        })
    }

    /// `<additive> (('<'|'<='|'>'|'>=') <additive>)*`
    fn relation(&mut self) -> Option<u32> {
        self.binary(Self::additive, |t| match t {
            Token::Lt => Some(BinaryOp::Smaller),
            Token::Le => Some(BinaryOp::SmallerOrEqual),
            Token::Gt => Some(BinaryOp::Greater),
            Token::Ge => Some(BinaryOp::GreaterOrEqual),
            _ => None,
        })
    }

    /// `<multiplicative> (('+'|'-') <multiplicative>)*`
    fn additive(&mut self) -> Option<u32> {
        self.binary(Self::multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Plus),
            Token::Minus => Some(BinaryOp::Minus),
            _ => None,
        })
    }

    /// `<simple> (('*'|'/'|'%') <simple>)*`
    fn multiplicative(&mut self) -> Option<u32> {
        self.binary(Self::simple, |t| match t {
            Token::Mul => Some(BinaryOp::Multiply),
            Token::Div => Some(BinaryOp::Divide),
            Token::Mod => Some(BinaryOp::Modulo),
            _ => None,
        })
    }

    /// `'(' <ternary> ')' | <number> | '!' <simple> | 'n'`
    fn simple(&mut self) -> Option<u32> {
        let token = self.peek()?;
        self.pos += 1;
        match token {
            Token::LParen => self.nested(|p| {
                let content = p.ternary()?;
                p.accept(Token::RParen).then_some(content)
            }),
            Token::Number(value) => self.builder.add(SubExpression::NumberLiteral(value)),
            Token::Bang => self.nested(|p| {
                let arg = p.simple()?;
                p.builder.add(SubExpression::Not(arg))
            }),
            Token::Variable => self.builder.add(SubExpression::NVariable),
            _ => None,
        }
    }
}

/// The decoded `Plural-Forms` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluralForms {
    /// Number of plural forms, `0` when missing or not a number.
    pub nplurals: i64,
    /// The `plural=` expression, `None` when missing or malformed.
    pub plural: Option<Expression>,
}

impl PluralForms {
    /// Decodes `nplurals=...; plural=...` clauses. Unknown clauses are ignored.
    pub fn decode(entry: &str) -> Self {
        let mut out = Self::default();
        for clause in entry.split(';') {
            let Some((name, value)) = clause.split_once('=') else {
                continue;
            };
            match name.trim() {
                "nplurals" => out.nplurals = leading_integer(value.trim()),
                "plural" => out.plural = Expression::parse(value.trim()),
                _ => {}
            }
        }
        out
    }

    /// Index of the plural form for the count `n`.
    ///
    /// A missing expression or a failed evaluation yields `0`.
    pub fn eval(&self, n: i64) -> i64 {
        self.plural
            .as_ref()
            .and_then(|plural| plural.evaluate(n).ok())
            .unwrap_or(0)
    }

    /// Whether the attribute carried a usable `plural=` expression.
    pub fn is_valid(&self) -> bool {
        self.plural.is_some()
    }
}

/// `atoi`-like: optional sign and leading digits, `0` if there are none.
fn leading_integer(value: &str) -> i64 {
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(0);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
