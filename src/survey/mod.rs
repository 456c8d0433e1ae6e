// SPDX-License-Identifier: MIT

//! Surveys built on the condition language
//!
//! This module provides:
//! - `SurveyDefinition` - prompts and repeatable sets, loaded from YAML
//! - `SurveyResponse` - one uploaded response and its `SurveyContext`
//! - `validate_survey` - static checks run when a survey is registered
//! - `SurveyWalker` - replays a response to decide what was displayed

mod loader;
mod responses;
mod schema;
mod validate;
mod walker;

pub use loader::SurveyLoader;
pub use responses::{
    decode_response, evaluate_response, is_sentinel, SurveyContext, SurveyResponse,
    NOT_DISPLAYED, SKIPPED,
};
pub use schema::{ChoiceDef, PromptDef, PromptType, RepeatableSetDef, SurveyDefinition, SurveyItem};
pub use validate::{validate_survey, IssueKind, ValidationIssue};
pub use walker::{
    DisplayStatus, ItemOutcome, ResponseIssue, ResponseIssueKind, SurveyWalker, WalkReport,
};
