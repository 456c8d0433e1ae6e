// SPDX-License-Identifier: MIT

//! Skip-logic condition language
//!
//! Conditions decide whether a prompt is shown, based on earlier answers:
//! - `age<30`
//! - `status==active or status==pending`
//! - `(mood==1 and slept<6) or stressed==true`
//!
//! Conjunction chains are right-associative and `and`/`or` share one
//! precedence level, so `a and b or c` means `a and (b or c)`.

mod ast;
mod cache;
mod context;
mod error;
mod evaluator;
mod lexer;
mod parser;

pub use ast::{Comparator, Conjunction, Expression, Sentence, Tail};
pub use cache::ConditionCache;
pub use context::{
    AsyncResponseContext, ContextValue, ResolveResult, ResponseContext, ResponseSet, TypedValue,
    ValueType,
};
pub use error::{ConditionError, EvalError, Expected, LexError, ParseError, ResolveError};
pub use evaluator::{coerce_literal, compare, evaluate, evaluate_async};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, MAX_CHAIN, MAX_DEPTH};

/// Tokenize and parse condition text
pub fn parse_condition(text: &str) -> Result<Sentence, ConditionError> {
    let tokens = tokenize(text)?;
    let sentence = parse(&tokens)?;
    log::debug!("parsed condition '{}' as '{}'", text, sentence);
    Ok(sentence)
}

/// Parse and evaluate condition text in one step
pub fn evaluate_condition(
    text: &str,
    ctx: &dyn ResponseContext,
) -> Result<bool, ConditionError> {
    let sentence = parse_condition(text)?;
    Ok(evaluate(&sentence, ctx)?)
}
