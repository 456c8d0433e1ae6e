// SPDX-License-Identifier: MIT

//! Uploaded survey responses and the response context built on them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{PromptDef, PromptType, RepeatableSetDef, SurveyDefinition};
use crate::condition::{
    evaluate, parse_condition, ConditionError, ContextValue, ResolveResult, ResponseContext,
    TypedValue,
};
use crate::error::{SkiplogicError, SurveyError};

/// Sentinel for a prompt the client never showed
pub const NOT_DISPLAYED: &str = "NOT_DISPLAYED";
/// Sentinel for a prompt the participant chose to skip
pub const SKIPPED: &str = "SKIPPED";

/// One completed survey as uploaded by a client
///
/// `responses` maps prompt ids to raw values and repeatable set ids to an
/// array of per-iteration objects.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurveyResponse {
    pub survey_id: String,
    #[serde(default)]
    pub responses: Map<String, Value>,
}

impl SurveyResponse {
    pub fn raw(&self, id: &str) -> Option<&Value> {
        self.responses.get(id)
    }

    /// Uploaded iterations of a repeatable set; none when the set is absent
    pub fn iterations(&self, set_id: &str) -> Result<Vec<&Map<String, Value>>, SurveyError> {
        iterations_in(&self.responses, set_id)
    }
}

fn iterations_in<'a>(
    answers: &'a Map<String, Value>,
    set_id: &str,
) -> Result<Vec<&'a Map<String, Value>>, SurveyError> {
    match answers.get(set_id) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if is_sentinel(s) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| SurveyError::MalformedIterations(set_id.to_string()))
            })
            .collect(),
        Some(_) => Err(SurveyError::MalformedIterations(set_id.to_string())),
    }
}

/// True for the NOT_DISPLAYED and SKIPPED markers
pub fn is_sentinel(raw: &str) -> bool {
    raw == NOT_DISPLAYED || raw == SKIPPED
}

/// Decode a raw uploaded value according to the prompt's declared type
///
/// Absent values, `null` and both sentinels decode to not-displayed.
pub fn decode_response(prompt: &PromptDef, raw: Option<&Value>) -> Result<ContextValue, SurveyError> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(ContextValue::NotDisplayed),
        Some(Value::String(s)) if is_sentinel(s) => return Ok(ContextValue::NotDisplayed),
        Some(raw) => raw,
    };

    let invalid = |reason: &str| SurveyError::InvalidResponse {
        prompt_id: prompt.id.clone(),
        reason: reason.to_string(),
    };

    let value = match prompt.prompt_type {
        PromptType::Number => {
            let number = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(n) if n.is_finite() => TypedValue::Number(n),
                _ => return Err(invalid("expected a number")),
            }
        }
        PromptType::Text => match raw {
            Value::String(s) => TypedValue::Text(s.clone()),
            _ => return Err(invalid("expected a string")),
        },
        PromptType::SingleChoice => match raw {
            Value::String(s) => TypedValue::Choice(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => TypedValue::Choice(n.to_string()),
            _ => return Err(invalid("expected a choice key")),
        },
        PromptType::Boolean => match raw {
            Value::Bool(b) => TypedValue::Boolean(*b),
            Value::String(s) if s == "true" => TypedValue::Boolean(true),
            Value::String(s) if s == "false" => TypedValue::Boolean(false),
            _ => return Err(invalid("expected true or false")),
        },
    };

    Ok(ContextValue::Value(value))
}

/// Response context over a survey definition and one uploaded response
///
/// Identifiers resolve against the top-level prompts, or, for an iteration
/// scope, against the set's prompts first.
pub struct SurveyContext<'a> {
    survey: &'a SurveyDefinition,
    answers: &'a Map<String, Value>,
    iteration: Option<(&'a RepeatableSetDef, &'a Map<String, Value>)>,
}

impl<'a> SurveyContext<'a> {
    pub fn new(survey: &'a SurveyDefinition, response: &'a SurveyResponse) -> Result<Self, SurveyError> {
        if survey.id != response.survey_id {
            return Err(SurveyError::SurveyMismatch {
                expected: survey.id.clone(),
                found: response.survey_id.clone(),
            });
        }
        Ok(Self {
            survey,
            answers: &response.responses,
            iteration: None,
        })
    }

    /// Scope to the `index`th uploaded iteration of a repeatable set
    pub fn iteration(&self, set_id: &str, index: usize) -> Result<SurveyContext<'a>, SurveyError> {
        let set = self
            .survey
            .repeatable_set(set_id)
            .ok_or_else(|| SurveyError::NotARepeatableSet(set_id.to_string()))?;
        let iterations = iterations_in(self.answers, set_id)?;
        let answers = iterations
            .get(index)
            .copied()
            .ok_or_else(|| SurveyError::IterationOutOfRange {
                set_id: set_id.to_string(),
                index,
            })?;

        Ok(SurveyContext {
            survey: self.survey,
            answers: self.answers,
            iteration: Some((set, answers)),
        })
    }
}

impl ResponseContext for SurveyContext<'_> {
    fn resolve(&self, identifier: &str) -> ResolveResult {
        if let Some((set, answers)) = self.iteration {
            if let Some(prompt) = set.prompt(identifier) {
                return Ok(decode_response(prompt, answers.get(identifier))?);
            }
        }

        match self.survey.prompt(identifier) {
            Some(prompt) => Ok(decode_response(prompt, self.answers.get(identifier))?),
            None => Ok(ContextValue::Unknown),
        }
    }
}

/// Evaluate condition text against one uploaded response
///
/// `iteration` scopes the evaluation to one repeatable set iteration.
pub fn evaluate_response(
    survey: &SurveyDefinition,
    response: &SurveyResponse,
    iteration: Option<(&str, usize)>,
    condition: &str,
) -> Result<bool, SkiplogicError> {
    let sentence = parse_condition(condition)?;
    let mut ctx = SurveyContext::new(survey, response)?;
    if let Some((set_id, index)) = iteration {
        ctx = ctx.iteration(set_id, index)?;
    }
    let result = evaluate(&sentence, &ctx).map_err(ConditionError::from)?;
    log::debug!("'{}' on survey '{}' is {}", condition, survey.id, result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{evaluate_condition, ConditionError, EvalError};
    use serde_json::json;

    fn survey() -> SurveyDefinition {
        serde_yaml::from_str(
            r#"
id: checkin
items:
  - kind: prompt
    id: age
    type: number
  - kind: prompt
    id: status
    type: text
  - kind: prompt
    id: mood
    type: single_choice
    choices:
      - { key: "1", label: Good }
      - { key: "2", label: Bad }
  - kind: prompt
    id: smoker
    type: boolean
  - kind: repeatable_set
    id: meals
    prompts:
      - id: calories
        type: number
"#,
        )
        .unwrap()
    }

    fn prompt(def: &SurveyDefinition, id: &str) -> PromptDef {
        def.all_prompts().find(|p| p.id == id).unwrap().clone()
    }

    #[test]
    fn test_decode_by_type() {
        let def = survey();

        assert_eq!(
            decode_response(&prompt(&def, "age"), Some(&json!(31))).unwrap(),
            ContextValue::Value(TypedValue::Number(31.0))
        );
        assert_eq!(
            decode_response(&prompt(&def, "age"), Some(&json!("31.5"))).unwrap(),
            ContextValue::Value(TypedValue::Number(31.5))
        );
        assert_eq!(
            decode_response(&prompt(&def, "mood"), Some(&json!(2))).unwrap(),
            ContextValue::Value(TypedValue::Choice("2".to_string()))
        );
        assert_eq!(
            decode_response(&prompt(&def, "smoker"), Some(&json!("false"))).unwrap(),
            ContextValue::Value(TypedValue::Boolean(false))
        );
        assert_eq!(
            decode_response(&prompt(&def, "status"), Some(&json!("active"))).unwrap(),
            ContextValue::Value(TypedValue::Text("active".to_string()))
        );
    }

    #[test]
    fn test_decode_sentinels() {
        let def = survey();
        let age = prompt(&def, "age");

        for raw in [json!(NOT_DISPLAYED), json!(SKIPPED), json!(null)] {
            assert_eq!(
                decode_response(&age, Some(&raw)).unwrap(),
                ContextValue::NotDisplayed
            );
        }
        assert_eq!(decode_response(&age, None).unwrap(), ContextValue::NotDisplayed);
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let def = survey();
        assert!(matches!(
            decode_response(&prompt(&def, "age"), Some(&json!("old"))),
            Err(SurveyError::InvalidResponse { ref prompt_id, .. }) if prompt_id == "age"
        ));
        assert!(decode_response(&prompt(&def, "smoker"), Some(&json!(1))).is_err());
        assert!(decode_response(&prompt(&def, "status"), Some(&json!(["a"]))).is_err());
    }

    #[test]
    fn test_survey_context_resolution() {
        let def = survey();
        let response: SurveyResponse = serde_json::from_value(json!({
            "survey_id": "checkin",
            "responses": { "age": 25, "status": "NOT_DISPLAYED", "smoker": "oops" }
        }))
        .unwrap();
        let ctx = SurveyContext::new(&def, &response).unwrap();

        assert!(evaluate_condition("age<30", &ctx).unwrap());
        assert!(!evaluate_condition("status==active", &ctx).unwrap());
        // declared but unanswered
        assert!(!evaluate_condition("mood==1", &ctx).unwrap());
        assert!(matches!(
            evaluate_condition("ghost==1", &ctx),
            Err(ConditionError::Eval(EvalError::UnknownIdentifier(_)))
        ));
        assert!(matches!(
            evaluate_condition("smoker==true", &ctx),
            Err(ConditionError::Eval(EvalError::ContextFailure(_)))
        ));
        // inner prompts are not visible from the top level
        assert!(matches!(
            evaluate_condition("calories>10", &ctx),
            Err(ConditionError::Eval(EvalError::UnknownIdentifier(_)))
        ));
    }

    #[test]
    fn test_iteration_scope() {
        let def = survey();
        let response: SurveyResponse = serde_json::from_value(json!({
            "survey_id": "checkin",
            "responses": {
                "age": 40,
                "meals": [ { "calories": 300 }, { "calories": 900 } ]
            }
        }))
        .unwrap();
        let ctx = SurveyContext::new(&def, &response).unwrap();

        let second = ctx.iteration("meals", 1).unwrap();
        assert!(evaluate_condition("calories>500 and age>=40", &second).unwrap());

        let first = ctx.iteration("meals", 0).unwrap();
        assert!(!evaluate_condition("calories>500", &first).unwrap());

        assert!(matches!(
            ctx.iteration("meals", 2),
            Err(SurveyError::IterationOutOfRange { index: 2, .. })
        ));
        assert!(matches!(
            ctx.iteration("age", 0),
            Err(SurveyError::NotARepeatableSet(_))
        ));
    }

    #[test]
    fn test_survey_id_mismatch() {
        let def = survey();
        let response = SurveyResponse {
            survey_id: "other".to_string(),
            responses: Map::new(),
        };
        assert!(matches!(
            SurveyContext::new(&def, &response),
            Err(SurveyError::SurveyMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_iterations() {
        let response: SurveyResponse = serde_json::from_value(json!({
            "survey_id": "checkin",
            "responses": { "meals": { "calories": 1 } }
        }))
        .unwrap();
        assert!(matches!(
            response.iterations("meals"),
            Err(SurveyError::MalformedIterations(_))
        ));
        assert!(response.iterations("absent").unwrap().is_empty());
    }

    #[test]
    fn test_evaluate_response_errors() {
        let def = survey();
        let response: SurveyResponse = serde_json::from_value(json!({
            "survey_id": "checkin",
            "responses": { "age": 40, "meals": [ { "calories": 900 } ] }
        }))
        .unwrap();

        assert!(evaluate_response(&def, &response, None, "age>=40").unwrap());
        assert!(evaluate_response(&def, &response, Some(("meals", 0)), "calories>500").unwrap());

        assert!(matches!(
            evaluate_response(&def, &response, None, "age>=").unwrap_err(),
            SkiplogicError::Condition(ConditionError::Parse(_))
        ));
        assert!(matches!(
            evaluate_response(&def, &response, None, "calories>500").unwrap_err(),
            SkiplogicError::Condition(ConditionError::Eval(EvalError::UnknownIdentifier(_)))
        ));
        assert!(matches!(
            evaluate_response(&def, &response, Some(("meals", 3)), "calories>500").unwrap_err(),
            SkiplogicError::Survey(SurveyError::IterationOutOfRange { index: 3, .. })
        ));
    }
}
