// SPDX-License-Identifier: MIT

//! Error types for lexing, parsing and evaluating conditions

use std::error::Error;
use std::fmt;
use thiserror::Error;

use super::ast::Comparator;

/// Boxed failure raised by a response context while resolving an identifier
pub type ResolveError = Box<dyn Error + Send + Sync>;

/// Lexical errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// A character that cannot start any token
    #[error("unrecognized character '{character}' at position {position}")]
    UnrecognizedCharacter { position: usize, character: char },

    /// A quoted literal with no closing quote
    #[error("unterminated quoted literal starting at position {position}")]
    UnterminatedToken { position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnrecognizedCharacter { position, .. } => *position,
            LexError::UnterminatedToken { position } => *position,
        }
    }
}

/// What the parser was looking for when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Identifier,
    Comparator,
    Literal,
    ClosingParen,
    /// An expression or a parenthesized sentence
    Clause,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Identifier => write!(f, "an identifier"),
            Expected::Comparator => write!(f, "a comparator (==, !=, <, >, <=, >=)"),
            Expected::Literal => write!(f, "a literal value"),
            Expected::ClosingParen => write!(f, "')'"),
            Expected::Clause => write!(f, "an expression or '('"),
        }
    }
}

/// Syntax errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected} at position {position}, found '{found}'")]
    UnexpectedToken {
        position: usize,
        expected: Expected,
        found: String,
    },

    /// A complete sentence was followed by more tokens
    #[error("unexpected trailing input '{found}' at position {position}")]
    TrailingInput { position: usize, found: String },

    #[error("unexpected end of input at position {position}, expected {expected}")]
    UnexpectedEndOfInput { position: usize, expected: Expected },

    #[error("condition nests groups deeper than {limit} levels at position {position}")]
    NestingTooDeep { position: usize, limit: usize },

    #[error("condition chains more than {limit} conjunctions at position {position}")]
    ChainTooLong { position: usize, limit: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::TrailingInput { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::NestingTooDeep { position, .. }
            | ParseError::ChainTooLong { position, .. } => *position,
        }
    }
}

/// Semantic errors raised while evaluating a parsed condition
#[derive(Debug, Error)]
pub enum EvalError {
    /// The identifier does not name any prompt in the context
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Ordering comparator applied to a non-numeric value
    #[error("comparator '{comparator}' cannot be applied to '{identifier}'")]
    InvalidComparison {
        identifier: String,
        comparator: Comparator,
    },

    #[error("literal '{literal}' does not match the type of '{identifier}'")]
    LiteralTypeMismatch { identifier: String, literal: String },

    /// The response context failed to resolve an identifier
    #[error("response context failure: {0}")]
    ContextFailure(#[source] ResolveError),
}

/// Any failure of the text-to-boolean entry point
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

impl ConditionError {
    /// Source position of a lexical or syntactic failure
    pub fn position(&self) -> Option<usize> {
        match self {
            ConditionError::Lex(e) => Some(e.position()),
            ConditionError::Parse(e) => Some(e.position()),
            ConditionError::Eval(_) => None,
        }
    }
}
