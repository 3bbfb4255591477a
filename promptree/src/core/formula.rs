//! Branch conditions: spreadsheet-style formulas and boolean expressions.
//!
//! A condition is one of:
//! - a JSON boolean (`true` / `false`),
//! - a formula, introduced by a leading `=`:
//!   `=AND(count>5, type="admin")`, `=OR(a="x", NOT(b))`, `=ISBLANK(notes)`,
//!   with `=` / `<>` for (in)equality,
//! - any other string, read as a boolean expression:
//!   `count > 5 && type == "admin" || !skip`.
//!
//! Names are looked up in the current [`Scope`]; a missing name takes the
//! neutral value of whatever it is compared against (`0`, `""`, `false`), so
//! evaluation never fails. Only malformed input is an error.

use serde_json::Value;

use crate::core::error::FormulaError;
use crate::core::scope::{Scope, is_blank, truthy};

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    IsBlank(Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Formula,
    Expression,
}

impl Condition {
    /// Parse a condition prop value.
    pub fn parse(value: &Value) -> Result<Self, FormulaError> {
        match value {
            Value::Bool(_) | Value::Null => Ok(Self {
                source: value.to_string(),
                expr: Expr::Literal(Value::Bool(truthy(value))),
            }),
            Value::String(raw) => Self::parse_str(raw),
            other => Err(FormulaError::new(
                &other.to_string(),
                0,
                "condition must be a string or a boolean",
            )),
        }
    }

    pub fn parse_str(raw: &str) -> Result<Self, FormulaError> {
        let trimmed = raw.trim();
        let leading = raw.len() - raw.trim_start().len();
        let (syntax, body, offset) = match trimmed.strip_prefix('=') {
            Some(rest) => (Syntax::Formula, rest, leading + 1),
            None => (Syntax::Expression, trimmed, leading),
        };
        let mut parser = Parser {
            source: raw,
            input: body,
            base: offset,
            pos: 0,
            syntax,
        };
        let expr = parser.parse_expr()?;
        parser.expect_end()?;
        Ok(Self {
            source: raw.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a scope. Never fails.
    pub fn evaluate(&self, scope: &Scope<'_>) -> bool {
        truthy(&eval(&self.expr, scope))
    }

    /// Names this condition reads, in first-use order.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.expr, &mut names);
        names
    }
}

fn collect_names<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Name(name) => {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        Expr::Not(inner) | Expr::IsBlank(inner) => collect_names(inner, out),
        Expr::And(items) | Expr::Or(items) => {
            for item in items {
                collect_names(item, out);
            }
        }
        Expr::Compare(_, left, right) => {
            collect_names(left, out);
            collect_names(right, out);
        }
    }
}

fn eval(expr: &Expr, scope: &Scope<'_>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Name(name) => scope.get(name),
        Expr::Not(inner) => Value::Bool(!truthy(&eval(inner, scope))),
        Expr::And(items) => Value::Bool(items.iter().all(|item| truthy(&eval(item, scope)))),
        Expr::Or(items) => Value::Bool(items.iter().any(|item| truthy(&eval(item, scope)))),
        Expr::IsBlank(inner) => Value::Bool(is_blank(&eval(inner, scope))),
        Expr::Compare(op, left, right) => {
            Value::Bool(compare(*op, &eval(left, scope), &eval(right, scope)))
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = if left.is_number() || right.is_number() {
        match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    } else if left.is_boolean() || right.is_boolean() {
        Some(as_bool(left).cmp(&as_bool(right)))
    } else if left.is_string() || right.is_string() || (left.is_null() && right.is_null()) {
        Some(as_text(left).cmp(&as_text(right)))
    } else if left == right {
        Some(Ordering::Equal)
    } else {
        None
    };

    match (op, ordering) {
        (CmpOp::Ne, None) => true,
        (_, None) => false,
        (CmpOp::Eq, Some(ord)) => ord == Ordering::Equal,
        (CmpOp::Ne, Some(ord)) => ord != Ordering::Equal,
        (CmpOp::Lt, Some(ord)) => ord == Ordering::Less,
        (CmpOp::Le, Some(ord)) => ord != Ordering::Greater,
        (CmpOp::Gt, Some(ord)) => ord == Ordering::Greater,
        (CmpOp::Ge, Some(ord)) => ord != Ordering::Less,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> bool {
    match value {
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        other => truthy(other),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Recursive descent parser shared by both condition syntaxes.
struct Parser<'a> {
    source: &'a str,
    input: &'a str,
    base: usize,
    pos: usize,
    syntax: Syntax,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::new(self.source, self.base + self.pos, message)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.input[self.pos..].chars().next() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.input[self.pos..].chars().next()
    }

    fn rest(&mut self) -> &'a str {
        self.skip_whitespace();
        &self.input[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), FormulaError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    fn expect_end(&mut self) -> Result<(), FormulaError> {
        match self.peek() {
            None => Ok(()),
            Some(ch) => Err(self.error(format!("unexpected '{ch}'"))),
        }
    }

    /// Lowest precedence: `||`
    fn parse_expr(&mut self) -> Result<Expr, FormulaError> {
        let mut items = vec![self.parse_and()?];
        while self.syntax == Syntax::Expression && self.eat("||") {
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    /// `&&`
    fn parse_and(&mut self) -> Result<Expr, FormulaError> {
        let mut items = vec![self.parse_unary()?];
        while self.syntax == Syntax::Expression && self.eat("&&") {
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    /// Prefix `!` (expressions only).
    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if self.syntax == Syntax::Expression
            && self.rest().starts_with('!')
            && !self.rest().starts_with("!=")
        {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FormulaError> {
        let left = self.parse_primary()?;
        let Some(op) = self.parse_cmp_op()? else {
            return Ok(left);
        };
        let right = self.parse_primary()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_cmp_op(&mut self) -> Result<Option<CmpOp>, FormulaError> {
        let two_char: &[(&str, CmpOp)] = match self.syntax {
            Syntax::Formula => &[("<>", CmpOp::Ne), ("<=", CmpOp::Le), (">=", CmpOp::Ge)],
            Syntax::Expression => &[
                ("==", CmpOp::Eq),
                ("!=", CmpOp::Ne),
                ("<=", CmpOp::Le),
                (">=", CmpOp::Ge),
            ],
        };
        for (token, op) in two_char {
            if self.eat(token) {
                return Ok(Some(*op));
            }
        }
        match self.peek() {
            Some('<') => {
                self.pos += 1;
                Ok(Some(CmpOp::Lt))
            }
            Some('>') => {
                self.pos += 1;
                Ok(Some(CmpOp::Gt))
            }
            Some('=') if self.syntax == Syntax::Formula => {
                self.pos += 1;
                Ok(Some(CmpOp::Eq))
            }
            Some('=') => Err(self.error("use '==' for equality")),
            _ => Ok(None),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(quote @ ('"' | '\'')) => self.parse_string(quote),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => self.parse_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.parse_word(),
            Some(ch) => Err(self.error(format!("unexpected '{ch}'"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Expr, FormulaError> {
        self.pos += quote.len_utf8();
        let mut out = String::new();
        let mut chars = self.input[self.pos..].char_indices();
        while let Some((idx, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos += idx + c.len_utf8();
                    return Ok(Expr::Literal(Value::String(out)));
                }
                c => out.push(c),
            }
        }
        self.pos = self.input.len();
        Err(self.error("unterminated string literal"))
    }

    fn parse_number(&mut self) -> Result<Expr, FormulaError> {
        let start = self.pos;
        let mut end = start;
        for (idx, ch) in self.input[start..].char_indices() {
            let sign = idx == 0 && ch == '-';
            if ch.is_ascii_digit() || ch == '.' || sign {
                end = start + idx + ch.len_utf8();
            } else {
                break;
            }
        }
        let raw = &self.input[start..end];
        let number: f64 = raw
            .parse()
            .map_err(|_| self.error(format!("invalid number '{raw}'")))?;
        self.pos = end;
        let value = serde_json::Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(|| self.error(format!("invalid number '{raw}'")))?;
        Ok(Expr::Literal(value))
    }

    fn parse_word(&mut self) -> Result<Expr, FormulaError> {
        let start = self.pos;
        let end = self.input[start..]
            .char_indices()
            .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '.'))
            .map(|(idx, _)| start + idx)
            .unwrap_or(self.input.len());
        let word = &self.input[start..end];
        self.pos = end;

        if self.peek() == Some('(') {
            return self.parse_call(word, start);
        }
        match (self.syntax, word) {
            (Syntax::Formula, w) if w.eq_ignore_ascii_case("true") => {
                Ok(Expr::Literal(Value::Bool(true)))
            }
            (Syntax::Formula, w) if w.eq_ignore_ascii_case("false") => {
                Ok(Expr::Literal(Value::Bool(false)))
            }
            (Syntax::Expression, "true") => Ok(Expr::Literal(Value::Bool(true))),
            (Syntax::Expression, "false") => Ok(Expr::Literal(Value::Bool(false))),
            (Syntax::Expression, "null") => Ok(Expr::Literal(Value::Null)),
            _ if word.ends_with('.') || word.contains("..") => {
                Err(self.error(format!("invalid name '{word}'")))
            }
            _ => Ok(Expr::Name(word.to_string())),
        }
    }

    fn parse_call(&mut self, name: &str, start: usize) -> Result<Expr, FormulaError> {
        self.expect("(")?;
        let mut args = Vec::new();
        if !self.eat(")") {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(")") {
                    break;
                }
                self.expect(",")?;
            }
        }

        let upper = name.to_ascii_uppercase();
        let unary = |args: Vec<Expr>, parser: &Parser<'_>| {
            let count = args.len();
            let mut args = args.into_iter();
            match (args.next(), count) {
                (Some(arg), 1) => Ok(Box::new(arg)),
                _ => Err(FormulaError::new(
                    parser.source,
                    parser.base + start,
                    format!("{upper} takes exactly one argument"),
                )),
            }
        };
        match upper.as_str() {
            "AND" | "OR" if args.is_empty() => Err(FormulaError::new(
                self.source,
                self.base + start,
                format!("{upper} needs at least one argument"),
            )),
            "AND" => Ok(Expr::And(args)),
            "OR" => Ok(Expr::Or(args)),
            "NOT" => Ok(Expr::Not(unary(args, self)?)),
            "ISBLANK" => Ok(Expr::IsBlank(unary(args, self)?)),
            _ => Err(FormulaError::new(
                self.source,
                self.base + start,
                format!("unknown function '{name}'"),
            )),
        }
    }
}
