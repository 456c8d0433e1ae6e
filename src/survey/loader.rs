// SPDX-License-Identifier: MIT

//! Survey loader - YAML definitions and JSON responses from disk

use super::responses::SurveyResponse;
use super::schema::SurveyDefinition;
use crate::error::SkiplogicError;
use std::fs;
use std::path::Path;

/// Loads survey definitions and uploaded responses
pub struct SurveyLoader;

impl SurveyLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a survey definition from a YAML file
    pub fn load_survey<P: AsRef<Path>>(&self, path: P) -> Result<SurveyDefinition, SkiplogicError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a survey definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<SurveyDefinition, SkiplogicError> {
        let def: SurveyDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }

    /// Load one survey response from a JSON file
    pub fn load_response<P: AsRef<Path>>(&self, path: P) -> Result<SurveyResponse, SkiplogicError> {
        let content = fs::read_to_string(path)?;
        Self::parse_response_json(&content)
    }

    pub fn parse_response_json(content: &str) -> Result<SurveyResponse, SkiplogicError> {
        let response: SurveyResponse = serde_json::from_str(content)?;
        Ok(response)
    }
}

impl Default for SurveyLoader {
    fn default() -> Self {
        Self::new()
    }
}
