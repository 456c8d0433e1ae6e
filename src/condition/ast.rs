// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for condition sentences
//!
//! The grammar is right-recursive: a sentence's tail always holds another
//! full sentence, so `a and b or c` is the tree `a and (b or c)`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::ConditionError;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
}

impl Comparator {
    /// True for `<`, `>`, `<=`, `>=`
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Comparator::Lt | Comparator::Gt | Comparator::Lte | Comparator::Gte
        )
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Eq => write!(f, "=="),
            Comparator::NotEq => write!(f, "!="),
            Comparator::Lt => write!(f, "<"),
            Comparator::Gt => write!(f, ">"),
            Comparator::Lte => write!(f, "<="),
            Comparator::Gte => write!(f, ">="),
        }
    }
}

/// Conjunction keywords joining clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => write!(f, "and"),
            Conjunction::Or => write!(f, "or"),
        }
    }
}

/// `identifier comparator literal`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub identifier: String,
    pub comparator: Comparator,
    /// Literal text, interpreted only once the identifier's type is known
    pub literal: String,
}

/// Conjunction plus the rest of the chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tail {
    pub conjunction: Conjunction,
    pub rest: Box<Sentence>,
}

/// A complete parsed condition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Sentence {
    Simple {
        expression: Expression,
        tail: Option<Tail>,
    },
    Grouped {
        inner: Box<Sentence>,
        tail: Option<Tail>,
    },
}

impl Sentence {
    pub fn tail(&self) -> Option<&Tail> {
        match self {
            Sentence::Simple { tail, .. } | Sentence::Grouped { tail, .. } => tail.as_ref(),
        }
    }

    /// Identifiers referenced by this sentence, in source order, with repeats
    pub fn identifiers<'a>(&'a self) -> Vec<&'a str> {
        let mut out = Vec::new();
        self.collect_expressions(&mut |expr: &'a Expression| out.push(expr.identifier.as_str()));
        out
    }

    /// Every expression in the tree, in source order
    pub fn expressions<'a>(&'a self) -> Vec<&'a Expression> {
        let mut out = Vec::new();
        self.collect_expressions(&mut |expr: &'a Expression| out.push(expr));
        out
    }

    fn collect_expressions<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        match self {
            Sentence::Simple { expression, .. } => visit(expression),
            Sentence::Grouped { inner, .. } => inner.collect_expressions(visit),
        }
        if let Some(tail) = self.tail() {
            tail.rest.collect_expressions(visit);
        }
    }
}

impl FromStr for Sentence {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse_condition(s)
    }
}

/// Characters that end a bare run in the lexer
pub(crate) fn is_reserved_char(c: char) -> bool {
    matches!(c, '=' | '!' | '<' | '>' | '(' | ')' | '"')
}

/// Render a literal, quoting it when it would not lex back as one bare run
fn fmt_literal(literal: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let needs_quotes = literal.is_empty()
        || literal == "and"
        || literal == "or"
        || literal
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || is_reserved_char(c));

    if !needs_quotes {
        return write!(f, "{}", literal);
    }

    write!(f, "\"")?;
    for c in literal.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            other => write!(f, "{}", other)?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.identifier, self.comparator)?;
        fmt_literal(&self.literal, f)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentence::Simple { expression, .. } => write!(f, "{}", expression)?,
            Sentence::Grouped { inner, .. } => write!(f, "({})", inner)?,
        }
        if let Some(tail) = self.tail() {
            write!(f, " {} {}", tail.conjunction, tail.rest)?;
        }
        Ok(())
    }
}
