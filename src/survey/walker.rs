// SPDX-License-Identifier: MIT

//! Survey walker
//!
//! Replays one uploaded response in declaration order, deciding which
//! prompts should have been displayed and checking the upload against that.
//! A prompt judged not displayed exposes the not-displayed sentinel to later
//! conditions, whatever value was uploaded for it.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use super::responses::{decode_response, SurveyResponse, NOT_DISPLAYED, SKIPPED};
use super::schema::{PromptDef, RepeatableSetDef, SurveyDefinition, SurveyItem};
use crate::condition::{
    evaluate, ConditionCache, ConditionError, ContextValue, ResolveResult, ResponseContext,
    ResponseSet, Sentence,
};
use crate::config::{ErrorPolicy, Settings};
use crate::error::SurveyError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DisplayStatus {
    Displayed,
    Hidden,
    /// The condition could not be evaluated; `applied` decided the outcome
    Undetermined { error: String, applied: ErrorPolicy },
}

impl DisplayStatus {
    pub fn is_displayed(&self) -> bool {
        match self {
            DisplayStatus::Displayed => true,
            DisplayStatus::Hidden => false,
            DisplayStatus::Undetermined { applied, .. } => *applied == ErrorPolicy::Show,
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayStatus::Displayed => write!(f, "displayed"),
            DisplayStatus::Hidden => write!(f, "hidden"),
            DisplayStatus::Undetermined { error, applied } => {
                write!(f, "undetermined ({}), applied '{}'", error, applied)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    /// Prompt or repeatable set id
    pub item_id: String,
    /// Iteration index for prompts inside a repeatable set
    pub iteration: Option<usize>,
    pub status: DisplayStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ResponseIssueKind {
    #[error("answered although its condition hides it")]
    AnsweredWhileHidden,

    #[error("uploaded {count} iteration(s) although its condition hides it")]
    IterationsWhileHidden { count: usize },

    #[error("marked {} although its condition shows it", NOT_DISPLAYED)]
    MarkedNotDisplayed,

    #[error("no answer although its condition shows it")]
    MissingAnswer,

    #[error("marked {} but the prompt is not skippable", SKIPPED)]
    SkippedNotSkippable,

    #[error("{reason}")]
    InvalidValue { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseIssue {
    pub item_id: String,
    pub iteration: Option<usize>,
    pub kind: ResponseIssueKind,
}

impl std::fmt::Display for ResponseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.iteration {
            Some(i) => write!(f, "{}[{}]: {}", self.item_id, i, self.kind),
            None => write!(f, "{}: {}", self.item_id, self.kind),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkReport {
    pub survey_id: String,
    pub outcomes: Vec<ItemOutcome>,
    pub issues: Vec<ResponseIssue>,
}

impl WalkReport {
    pub fn status(&self, item_id: &str, iteration: Option<usize>) -> Option<&DisplayStatus> {
        self.outcomes
            .iter()
            .find(|o| o.item_id == item_id && o.iteration == iteration)
            .map(|o| &o.status)
    }

    /// True when the upload agrees with every condition
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }

    fn outcome(&mut self, item_id: &str, iteration: Option<usize>, status: DisplayStatus) {
        self.outcomes.push(ItemOutcome {
            item_id: item_id.to_string(),
            iteration,
            status,
        });
    }

    fn issue(&mut self, item_id: &str, iteration: Option<usize>, kind: ResponseIssueKind) {
        let issue = ResponseIssue {
            item_id: item_id.to_string(),
            iteration,
            kind,
        };
        log::warn!("response issue in survey '{}': {}", self.survey_id, issue);
        self.issues.push(issue);
    }
}

/// Answers of one repeatable set iteration layered over the survey's
struct IterationScope<'a> {
    iteration: &'a ResponseSet,
    survey: &'a ResponseSet,
}

impl ResponseContext for IterationScope<'_> {
    fn resolve(&self, identifier: &str) -> ResolveResult {
        match self.iteration.get(identifier) {
            Some(value) => Ok(value.clone()),
            None => ResponseContext::resolve(self.survey, identifier),
        }
    }
}

pub struct SurveyWalker {
    settings: Settings,
    cache: ConditionCache,
}

impl SurveyWalker {
    pub fn new(settings: Settings) -> Self {
        let cache = ConditionCache::new(settings.cache_capacity);
        Self { settings, cache }
    }

    /// Share an existing cache, e.g. across walkers of different surveys
    pub fn with_cache(settings: Settings, cache: ConditionCache) -> Self {
        Self { settings, cache }
    }

    pub fn cache(&self) -> &ConditionCache {
        &self.cache
    }

    /// Walk every item of `survey` against one uploaded response
    pub async fn walk(
        &self,
        survey: &SurveyDefinition,
        response: &SurveyResponse,
    ) -> Result<WalkReport, SurveyError> {
        if survey.id != response.survey_id {
            return Err(SurveyError::SurveyMismatch {
                expected: survey.id.clone(),
                found: response.survey_id.clone(),
            });
        }

        let mut report = WalkReport {
            survey_id: survey.id.clone(),
            ..WalkReport::default()
        };
        let mut established = ResponseSet::new();

        for item in &survey.items {
            match item {
                SurveyItem::Prompt(prompt) => {
                    let parsed = self.parsed(prompt.condition.as_deref()).await;
                    let status = self.decide(&prompt.id, parsed, &established);
                    settle(
                        prompt,
                        response.raw(&prompt.id),
                        status,
                        None,
                        &mut established,
                        &mut report,
                    );
                }
                SurveyItem::RepeatableSet(set) => {
                    self.walk_set(set, response, &established, &mut report)
                        .await;
                }
            }
        }

        log::debug!(
            "walked survey '{}': {} outcome(s), {} issue(s)",
            survey.id,
            report.outcomes.len(),
            report.issues.len()
        );
        Ok(report)
    }

    async fn walk_set(
        &self,
        set: &RepeatableSetDef,
        response: &SurveyResponse,
        established: &ResponseSet,
        report: &mut WalkReport,
    ) {
        let parsed = self.parsed(set.condition.as_deref()).await;
        let status = self.decide(&set.id, parsed, established);
        let displayed = status.is_displayed();
        report.outcome(&set.id, None, status);

        let iterations: Vec<&Map<String, Value>> = match response.iterations(&set.id) {
            Ok(iterations) => iterations,
            Err(e) => {
                report.issue(
                    &set.id,
                    None,
                    ResponseIssueKind::InvalidValue {
                        reason: e.to_string(),
                    },
                );
                Vec::new()
            }
        };

        if !displayed {
            if !iterations.is_empty() {
                report.issue(
                    &set.id,
                    None,
                    ResponseIssueKind::IterationsWhileHidden {
                        count: iterations.len(),
                    },
                );
            }
            for prompt in &set.prompts {
                report.outcome(&prompt.id, None, DisplayStatus::Hidden);
            }
            return;
        }

        for (index, answers) in iterations.into_iter().enumerate() {
            let mut scope = ResponseSet::new();
            for prompt in &set.prompts {
                let parsed = self.parsed(prompt.condition.as_deref()).await;
                let status = {
                    let ctx = IterationScope {
                        iteration: &scope,
                        survey: established,
                    };
                    self.decide(&prompt.id, parsed, &ctx)
                };
                settle(
                    prompt,
                    answers.get(&prompt.id),
                    status,
                    Some(index),
                    &mut scope,
                    report,
                );
            }
        }
    }

    /// Fetch a parsed condition; `None` when the item is unconditional
    async fn parsed(
        &self,
        condition: Option<&str>,
    ) -> Option<Result<Arc<Sentence>, ConditionError>> {
        match condition {
            Some(text) => Some(self.cache.get_or_parse(text).await),
            None => None,
        }
    }

    fn decide(
        &self,
        item_id: &str,
        parsed: Option<Result<Arc<Sentence>, ConditionError>>,
        ctx: &dyn ResponseContext,
    ) -> DisplayStatus {
        let result = match parsed {
            None => return DisplayStatus::Displayed,
            Some(Ok(sentence)) => evaluate(&sentence, ctx).map_err(ConditionError::from),
            Some(Err(e)) => Err(e),
        };

        match result {
            Ok(true) => DisplayStatus::Displayed,
            Ok(false) => DisplayStatus::Hidden,
            Err(e) => {
                let applied = self.settings.on_error;
                log::warn!(
                    "condition of '{}' could not be determined ({}); applying '{}'",
                    item_id,
                    e,
                    applied
                );
                DisplayStatus::Undetermined {
                    error: e.to_string(),
                    applied,
                }
            }
        }
    }
}

/// Record a prompt's outcome and expose its value to later conditions
fn settle(
    prompt: &PromptDef,
    raw: Option<&Value>,
    status: DisplayStatus,
    iteration: Option<usize>,
    scope: &mut ResponseSet,
    report: &mut WalkReport,
) {
    let displayed = status.is_displayed();
    let determined = !matches!(status, DisplayStatus::Undetermined { .. });
    report.outcome(&prompt.id, iteration, status);

    let raw = raw.filter(|v| !v.is_null());

    if !displayed {
        scope.mark_not_displayed(&prompt.id);
        if let Some(raw) = raw {
            if raw.as_str() != Some(NOT_DISPLAYED) && raw.as_str() != Some(SKIPPED) {
                report.issue(&prompt.id, iteration, ResponseIssueKind::AnsweredWhileHidden);
            }
        }
        return;
    }

    match raw.and_then(Value::as_str) {
        _ if raw.is_none() => {
            if determined {
                report.issue(&prompt.id, iteration, ResponseIssueKind::MissingAnswer);
            }
        }
        Some(NOT_DISPLAYED) => {
            if determined {
                report.issue(&prompt.id, iteration, ResponseIssueKind::MarkedNotDisplayed);
            }
        }
        Some(SKIPPED) => {
            if !prompt.skippable {
                report.issue(&prompt.id, iteration, ResponseIssueKind::SkippedNotSkippable);
            }
        }
        _ => match decode_response(prompt, raw) {
            Ok(ContextValue::Value(value)) => {
                scope.insert(prompt.id.clone(), value);
                return;
            }
            Ok(_) => {}
            Err(e) => report.issue(
                &prompt.id,
                iteration,
                ResponseIssueKind::InvalidValue {
                    reason: e.to_string(),
                },
            ),
        },
    }

    scope.mark_not_displayed(&prompt.id);
}
