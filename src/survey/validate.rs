// SPDX-License-Identifier: MIT

//! Static validation of the conditions in a survey definition
//!
//! Run when a survey is registered, so configuration errors surface before
//! any participant sees the survey.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::schema::{PromptDef, PromptType, SurveyDefinition, SurveyItem};
use crate::condition::{coerce_literal, parse_condition, EvalError, Expression};

/// A problem found in one item of a survey
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub item_id: String,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IssueKind {
    #[error("id is declared more than once")]
    DuplicateId,

    #[error("condition does not parse: {message}")]
    Unparsable { message: String },

    #[error("condition references unknown prompt '{identifier}'")]
    UnknownReference { identifier: String },

    /// The referenced prompt comes at or after the referencing item
    #[error("condition references '{identifier}' before it is declared")]
    ForwardReference { identifier: String },

    #[error("condition references '{identifier}' from outside its repeatable set")]
    OutsideRepeatableSet { identifier: String },

    #[error("condition references repeatable set '{identifier}', which has no value")]
    NotAPrompt { identifier: String },

    #[error("comparator '{comparator}' cannot be applied to '{identifier}'")]
    InvalidComparison {
        identifier: String,
        comparator: String,
    },

    #[error("literal '{literal}' does not match the type of '{identifier}'")]
    LiteralTypeMismatch { identifier: String, literal: String },

    #[error("'{literal}' is not a choice of '{identifier}'")]
    UnknownChoice { identifier: String, literal: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.item_id, self.kind)
    }
}

enum Location<'a> {
    Prompt,
    Set,
    Inner(&'a str),
}

/// Check every condition in `survey`; an empty result means the survey is valid
pub fn validate_survey(survey: &SurveyDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut locations: HashMap<&str, Location> = HashMap::new();
    let mut seen = HashSet::new();

    let mut note_id = |id: &str, issues: &mut Vec<ValidationIssue>| {
        if !seen.insert(id.to_string()) {
            issues.push(ValidationIssue {
                item_id: id.to_string(),
                kind: IssueKind::DuplicateId,
            });
        }
    };

    for item in &survey.items {
        note_id(item.id(), &mut issues);
        match item {
            SurveyItem::Prompt(p) => {
                locations.entry(&p.id).or_insert(Location::Prompt);
            }
            SurveyItem::RepeatableSet(set) => {
                locations.entry(&set.id).or_insert(Location::Set);
                for p in &set.prompts {
                    note_id(&p.id, &mut issues);
                    locations.entry(&p.id).or_insert(Location::Inner(&set.id));
                }
            }
        }
    }

    let mut declared: HashMap<&str, &PromptDef> = HashMap::new();
    for item in &survey.items {
        match item {
            SurveyItem::Prompt(p) => {
                if let Some(condition) = &p.condition {
                    let scope = Scope {
                        outer: &declared,
                        inner: None,
                        set_id: None,
                        locations: &locations,
                    };
                    check_condition(&p.id, condition, &scope, &mut issues);
                }
                declared.entry(&p.id).or_insert(p);
            }
            SurveyItem::RepeatableSet(set) => {
                if let Some(condition) = &set.condition {
                    let scope = Scope {
                        outer: &declared,
                        inner: None,
                        set_id: None,
                        locations: &locations,
                    };
                    check_condition(&set.id, condition, &scope, &mut issues);
                }

                let mut inner: HashMap<&str, &PromptDef> = HashMap::new();
                for p in &set.prompts {
                    if let Some(condition) = &p.condition {
                        let scope = Scope {
                            outer: &declared,
                            inner: Some(&inner),
                            set_id: Some(&set.id),
                            locations: &locations,
                        };
                        check_condition(&p.id, condition, &scope, &mut issues);
                    }
                    inner.entry(&p.id).or_insert(p);
                }
            }
        }
    }

    if !issues.is_empty() {
        log::debug!(
            "survey '{}' has {} validation issue(s)",
            survey.id,
            issues.len()
        );
    }
    issues
}

/// Prompts visible to one condition
struct Scope<'s, 'a> {
    outer: &'s HashMap<&'a str, &'a PromptDef>,
    inner: Option<&'s HashMap<&'a str, &'a PromptDef>>,
    set_id: Option<&'a str>,
    locations: &'s HashMap<&'a str, Location<'a>>,
}

impl<'s, 'a> Scope<'s, 'a> {
    fn lookup(&self, id: &str) -> Option<&'a PromptDef> {
        self.inner
            .and_then(|inner| inner.get(id))
            .or_else(|| self.outer.get(id))
            .copied()
    }

    /// Why `id` is not visible here
    fn unresolved(&self, id: &str) -> IssueKind {
        let identifier = id.to_string();
        match self.locations.get(id) {
            None => IssueKind::UnknownReference { identifier },
            Some(Location::Set) => IssueKind::NotAPrompt { identifier },
            Some(Location::Prompt) => IssueKind::ForwardReference { identifier },
            Some(Location::Inner(set_id)) if Some(*set_id) == self.set_id => {
                IssueKind::ForwardReference { identifier }
            }
            Some(Location::Inner(_)) => IssueKind::OutsideRepeatableSet { identifier },
        }
    }
}

fn check_condition(item_id: &str, condition: &str, scope: &Scope<'_, '_>, issues: &mut Vec<ValidationIssue>) {
    let mut report = |kind: IssueKind| {
        issues.push(ValidationIssue {
            item_id: item_id.to_string(),
            kind,
        })
    };

    let sentence = match parse_condition(condition) {
        Ok(sentence) => sentence,
        Err(e) => {
            report(IssueKind::Unparsable {
                message: e.to_string(),
            });
            return;
        }
    };

    for expression in sentence.expressions() {
        match scope.lookup(&expression.identifier) {
            Some(prompt) => {
                if let Some(kind) = check_literal(prompt, expression) {
                    report(kind);
                }
            }
            None => report(scope.unresolved(&expression.identifier)),
        }
    }
}

fn check_literal(prompt: &PromptDef, expression: &Expression) -> Option<IssueKind> {
    let coerced = coerce_literal(
        prompt.prompt_type.value_type(),
        &expression.identifier,
        expression.comparator,
        &expression.literal,
    );

    match coerced {
        Err(EvalError::InvalidComparison {
            identifier,
            comparator,
        }) => Some(IssueKind::InvalidComparison {
            identifier,
            comparator: comparator.to_string(),
        }),
        Err(EvalError::LiteralTypeMismatch {
            identifier,
            literal,
        }) => Some(IssueKind::LiteralTypeMismatch {
            identifier,
            literal,
        }),
        Err(_) => None,
        Ok(_) => {
            let unknown_choice = prompt.prompt_type == PromptType::SingleChoice
                && !prompt.choices.is_empty()
                && !prompt.has_choice(&expression.literal);
            unknown_choice.then(|| IssueKind::UnknownChoice {
                identifier: expression.identifier.clone(),
                literal: expression.literal.clone(),
            })
        }
    }
}
