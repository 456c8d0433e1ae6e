// SPDX-License-Identifier: MIT

//! Condition evaluator
//!
//! Walks a parsed sentence against a response context. The left clause is
//! always evaluated first and the tail only when it can change the result.

use futures::future::{BoxFuture, FutureExt};

use super::ast::{Comparator, Conjunction, Expression, Sentence};
use super::context::{AsyncResponseContext, ContextValue, ResponseContext, TypedValue, ValueType};
use super::error::EvalError;

/// Evaluate a sentence against a synchronous response context
pub fn evaluate<C>(sentence: &Sentence, ctx: &C) -> Result<bool, EvalError>
where
    C: ResponseContext + ?Sized,
{
    let mut current = sentence;
    loop {
        let left = match current {
            Sentence::Simple { expression, .. } => {
                let resolved = ctx
                    .resolve(&expression.identifier)
                    .map_err(EvalError::ContextFailure)?;
                compare(expression, &resolved)?
            }
            Sentence::Grouped { inner, .. } => evaluate(inner, ctx)?,
        };

        match continue_with(current, left) {
            Some(rest) => current = rest,
            None => return Ok(left),
        }
    }
}

/// Evaluate a sentence against a context whose lookups are asynchronous
pub fn evaluate_async<'a, C>(sentence: &'a Sentence, ctx: &'a C) -> BoxFuture<'a, Result<bool, EvalError>>
where
    C: AsyncResponseContext + ?Sized,
{
    async move {
        let mut current = sentence;
        loop {
            let left = match current {
                Sentence::Simple { expression, .. } => {
                    let resolved = ctx
                        .resolve(&expression.identifier)
                        .await
                        .map_err(EvalError::ContextFailure)?;
                    compare(expression, &resolved)?
                }
                Sentence::Grouped { inner, .. } => evaluate_async(inner, ctx).await?,
            };

            match continue_with(current, left) {
                Some(rest) => current = rest,
                None => return Ok(left),
            }
        }
    }
    .boxed()
}

/// The tail sentence whose value decides the result, if `left` does not
///
/// `left and rest` is `rest` when left is true; `left or rest` is `rest`
/// when left is false.
fn continue_with(sentence: &Sentence, left: bool) -> Option<&Sentence> {
    let tail = sentence.tail()?;
    match (tail.conjunction, left) {
        (Conjunction::And, false) | (Conjunction::Or, true) => {
            log::trace!("short-circuit at '{}' with {}", tail.conjunction, left);
            None
        }
        _ => Some(&tail.rest),
    }
}

/// Compare one expression against the resolved value of its identifier
pub fn compare(expression: &Expression, resolved: &ContextValue) -> Result<bool, EvalError> {
    let value = match resolved {
        ContextValue::Unknown => {
            return Err(EvalError::UnknownIdentifier(expression.identifier.clone()))
        }
        ContextValue::NotDisplayed => {
            log::trace!("'{}' was not displayed", expression.identifier);
            return Ok(false);
        }
        ContextValue::Value(value) => value,
    };

    let literal = coerce_literal(
        value.value_type(),
        &expression.identifier,
        expression.comparator,
        &expression.literal,
    )?;

    let result = match (value, &literal) {
        (TypedValue::Number(a), TypedValue::Number(b)) => compare_numbers(*a, *b, expression.comparator),
        (TypedValue::Text(a), TypedValue::Text(b)) | (TypedValue::Choice(a), TypedValue::Choice(b)) => {
            compare_equality(a == b, expression.comparator)
        }
        (TypedValue::Boolean(a), TypedValue::Boolean(b)) => {
            compare_equality(a == b, expression.comparator)
        }
        // coerce_literal always yields the value's own type
        _ => false,
    };

    log::trace!("{} => {}", expression, result);
    Ok(result)
}

/// Interpret literal text as a value of the given declared type
///
/// Ordering comparators are rejected for every non-numeric type before the
/// literal itself is examined.
pub fn coerce_literal(
    value_type: ValueType,
    identifier: &str,
    comparator: Comparator,
    literal: &str,
) -> Result<TypedValue, EvalError> {
    if value_type != ValueType::Number && comparator.is_ordering() {
        return Err(EvalError::InvalidComparison {
            identifier: identifier.to_string(),
            comparator,
        });
    }

    let mismatch = || EvalError::LiteralTypeMismatch {
        identifier: identifier.to_string(),
        literal: literal.to_string(),
    };

    match value_type {
        ValueType::Number => literal
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(TypedValue::Number)
            .ok_or_else(mismatch),
        ValueType::Text => Ok(TypedValue::Text(literal.to_string())),
        ValueType::Choice => Ok(TypedValue::Choice(literal.to_string())),
        ValueType::Boolean => match literal {
            "true" => Ok(TypedValue::Boolean(true)),
            "false" => Ok(TypedValue::Boolean(false)),
            _ => Err(mismatch()),
        },
    }
}

/// Equality tolerates rounding relative to the operands' magnitude;
/// ordering compares exactly.
fn compare_numbers(a: f64, b: f64, comparator: Comparator) -> bool {
    let equal = a == b || (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs());
    match comparator {
        Comparator::Eq => equal,
        Comparator::NotEq => !equal,
        Comparator::Lt => a < b,
        Comparator::Gt => a > b,
        Comparator::Lte => a <= b,
        Comparator::Gte => a >= b,
    }
}

fn compare_equality(equal: bool, comparator: Comparator) -> bool {
    match comparator {
        Comparator::Eq => equal,
        Comparator::NotEq => !equal,
        // rejected by coerce_literal
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::context::ResponseSet;
    use crate::condition::error::ResolveError;
    use crate::condition::parse_condition;
    use async_trait::async_trait;
    use std::cell::RefCell;

    fn eval(text: &str, ctx: &ResponseSet) -> Result<bool, EvalError> {
        evaluate(&parse_condition(text).unwrap(), ctx)
    }

    fn flags(pairs: &[(&str, bool)]) -> ResponseSet {
        let mut set = ResponseSet::new();
        for (id, value) in pairs {
            set.insert(*id, TypedValue::Boolean(*value));
        }
        set
    }

    /// Records every identifier it is asked to resolve
    struct RecordingContext {
        inner: ResponseSet,
        seen: RefCell<Vec<String>>,
    }

    impl ResponseContext for RecordingContext {
        fn resolve(&self, identifier: &str) -> Result<ContextValue, ResolveError> {
            self.seen.borrow_mut().push(identifier.to_string());
            ResponseContext::resolve(&self.inner, identifier)
        }
    }

    struct FailingContext;

    impl ResponseContext for FailingContext {
        fn resolve(&self, _identifier: &str) -> Result<ContextValue, ResolveError> {
            Err("database unavailable".into())
        }
    }

    #[async_trait]
    impl AsyncResponseContext for FailingContext {
        async fn resolve(&self, _identifier: &str) -> Result<ContextValue, ResolveError> {
            Err("database unavailable".into())
        }
    }

    #[test]
    fn test_number_comparisons() {
        let mut ctx = ResponseSet::new();
        ctx.insert("age", TypedValue::Number(29.0));

        assert!(eval("age<30", &ctx).unwrap());
        assert!(!eval("age>30", &ctx).unwrap());
        assert!(eval("age<=29", &ctx).unwrap());
        assert!(eval("age>=29.0", &ctx).unwrap());
        assert!(!eval("age>29", &ctx).unwrap());
        assert!(eval("age==29", &ctx).unwrap());
        assert!(eval("age!=30", &ctx).unwrap());
        assert!(eval("age>-1.5", &ctx).unwrap());
    }

    #[test]
    fn test_small_magnitudes_order_exactly() {
        let mut ctx = ResponseSet::new();
        ctx.insert("x", TypedValue::Number(1e-17));

        assert!(eval("x<2e-17", &ctx).unwrap());
        assert!(eval("x<=2e-17", &ctx).unwrap());
        assert!(!eval("x>=2e-17", &ctx).unwrap());
        assert!(!eval("x==2e-17", &ctx).unwrap());
        assert!(eval("x!=2e-17", &ctx).unwrap());
        assert!(eval("x==1e-17", &ctx).unwrap());
    }

    #[test]
    fn test_equality_tolerates_rounding() {
        let mut ctx = ResponseSet::new();
        ctx.insert("total", TypedValue::Number(0.1 + 0.2));

        assert!(eval("total==0.3", &ctx).unwrap());
        assert!(!eval("total!=0.3", &ctx).unwrap());
        // ordering stays exact: 0.1 + 0.2 is just above 0.3
        assert!(eval("total>0.3", &ctx).unwrap());
    }

    #[test]
    fn test_long_chain_evaluates() {
        let text = (0..1000)
            .map(|i| format!("x{}==true", i))
            .collect::<Vec<_>>()
            .join(" and ");
        let sentence = parse_condition(&text).unwrap();

        let mut ctx = ResponseSet::new();
        for i in 0..1000 {
            ctx.insert(format!("x{}", i), TypedValue::Boolean(true));
        }
        assert!(evaluate(&sentence, &ctx).unwrap());
    }

    #[test]
    fn test_text_and_choice_equality() {
        let mut ctx = ResponseSet::new();
        ctx.insert("status", TypedValue::Text("active".to_string()));
        ctx.insert("mood", TypedValue::Choice("2".to_string()));

        assert!(eval("status==active", &ctx).unwrap());
        assert!(eval("status!=pending", &ctx).unwrap());
        assert!(!eval("status==Active", &ctx).unwrap());
        assert!(eval("mood==2", &ctx).unwrap());
        assert!(!eval("mood==02", &ctx).unwrap());
    }

    #[test]
    fn test_boolean_equality() {
        let ctx = flags(&[("consented", true)]);
        assert!(eval("consented==true", &ctx).unwrap());
        assert!(eval("consented!=false", &ctx).unwrap());
        assert!(!eval("consented==false", &ctx).unwrap());
    }

    #[test]
    fn test_ordering_on_text_is_invalid() {
        let mut ctx = ResponseSet::new();
        ctx.insert("status", TypedValue::Text("active".to_string()));

        let err = eval("status<b", &ctx).unwrap_err();
        assert!(matches!(
            err,
            EvalError::InvalidComparison { ref identifier, comparator: Comparator::Lt } if identifier == "status"
        ));
    }

    #[test]
    fn test_ordering_on_boolean_checked_before_literal() {
        let ctx = flags(&[("done", true)]);
        assert!(matches!(
            eval("done>=maybe", &ctx),
            Err(EvalError::InvalidComparison { .. })
        ));
    }

    #[test]
    fn test_literal_type_mismatch() {
        let mut ctx = ResponseSet::new();
        ctx.insert("age", TypedValue::Number(29.0));
        ctx.insert("done", TypedValue::Boolean(false));

        assert!(matches!(
            eval("age==thirty", &ctx),
            Err(EvalError::LiteralTypeMismatch { ref literal, .. }) if literal == "thirty"
        ));
        assert!(matches!(
            eval("age==inf", &ctx),
            Err(EvalError::LiteralTypeMismatch { .. })
        ));
        assert!(matches!(
            eval("done==yes", &ctx),
            Err(EvalError::LiteralTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_right_associative_chain() {
        // a and (b or c) = false; (a and b) or c would be true
        let ctx = flags(&[("A", false), ("B", true), ("C", true)]);
        assert!(!eval("A==true and B==true or C==true", &ctx).unwrap());
        assert!(eval("(A==true and B==true) or C==true", &ctx).unwrap());
    }

    #[test]
    fn test_not_displayed_is_false() {
        let mut ctx = ResponseSet::new();
        ctx.mark_not_displayed("skipped_id");

        assert!(!eval("skipped_id==1", &ctx).unwrap());
        assert!(!eval("skipped_id!=1", &ctx).unwrap());
        assert!(!eval("skipped_id<anything", &ctx).unwrap());
    }

    #[test]
    fn test_not_displayed_left_operand_short_circuits_and() {
        let mut inner = ResponseSet::new();
        inner.mark_not_displayed("skipped_id");
        let ctx = RecordingContext {
            inner,
            seen: RefCell::new(Vec::new()),
        };

        let sentence = parse_condition("skipped_id==1 and ghost==1").unwrap();
        assert!(!evaluate(&sentence, &ctx).unwrap());
        assert_eq!(*ctx.seen.borrow(), vec!["skipped_id".to_string()]);
    }

    #[test]
    fn test_or_short_circuits() {
        let ctx = flags(&[("done", true)]);
        assert!(eval("done==true or ghost==1", &ctx).unwrap());
        assert!(matches!(
            eval("done==false or ghost==1", &ctx),
            Err(EvalError::UnknownIdentifier(ref id)) if id == "ghost"
        ));
    }

    #[test]
    fn test_unknown_identifier() {
        let ctx = ResponseSet::new();
        assert!(matches!(
            eval("ghost==1", &ctx),
            Err(EvalError::UnknownIdentifier(ref id)) if id == "ghost"
        ));
    }

    #[test]
    fn test_context_failure() {
        let sentence = parse_condition("age<30").unwrap();
        let err = evaluate(&sentence, &FailingContext).unwrap_err();
        assert!(matches!(err, EvalError::ContextFailure(_)));
        assert!(err.to_string().contains("database unavailable"));
    }

    #[test]
    fn test_dyn_context() {
        let ctx = flags(&[("done", true)]);
        let dyn_ctx: &dyn ResponseContext = &ctx;
        let sentence = parse_condition("done==true").unwrap();
        assert!(evaluate(&sentence, dyn_ctx).unwrap());
    }

    #[test]
    fn test_rendered_sentence_evaluates_identically() {
        let mut ctx = ResponseSet::new();
        ctx.insert("age", TypedValue::Number(40.0));
        ctx.insert("status", TypedValue::Text("on hold".to_string()));
        ctx.mark_not_displayed("pet");

        let text = r#"age<30 or (status=="on hold" and pet!=cat) or age>=40"#;
        let original = parse_condition(text).unwrap();
        let reparsed = parse_condition(&original.to_string()).unwrap();

        assert_eq!(
            evaluate(&original, &ctx).unwrap(),
            evaluate(&reparsed, &ctx).unwrap()
        );
        assert_eq!(original, reparsed);
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let ctx = flags(&[("A", false), ("B", true), ("C", true)]);
        for text in [
            "A==true and B==true or C==true",
            "(A==true and B==true) or C==true",
            "B==true and (A==true or C==true)",
        ] {
            let sentence = parse_condition(text).unwrap();
            assert_eq!(
                evaluate_async(&sentence, &ctx).await.unwrap(),
                evaluate(&sentence, &ctx).unwrap(),
                "{}",
                text
            );
        }
    }

    #[tokio::test]
    async fn test_async_context_failure() {
        let sentence = parse_condition("x==1").unwrap();
        let result = evaluate_async(&sentence, &FailingContext).await;
        assert!(matches!(result, Err(EvalError::ContextFailure(_))));
    }
}
