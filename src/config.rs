// SPDX-License-Identifier: MIT

//! Runtime settings
//!
//! Read from an optional YAML file, then overridden by environment
//! variables (a `.env` file is honoured by the binary).

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::SkiplogicError;

pub const ENV_CONFIG: &str = "SKIPLOGIC_CONFIG";
pub const ENV_ON_ERROR: &str = "SKIPLOGIC_ON_ERROR";
pub const ENV_CACHE_CAPACITY: &str = "SKIPLOGIC_CACHE_CAPACITY";

/// What to do with a prompt whose condition cannot be determined
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Treat the prompt as displayed
    #[default]
    Show,
    /// Treat the prompt as not displayed
    Hide,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Show => write!(f, "show"),
            ErrorPolicy::Hide => write!(f, "hide"),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = SkiplogicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "show" => Ok(ErrorPolicy::Show),
            "hide" => Ok(ErrorPolicy::Hide),
            other => Err(SkiplogicError::config(format!(
                "invalid error policy '{}', expected 'show' or 'hide'",
                other
            ))),
        }
    }
}

fn default_cache_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Maximum number of parsed conditions kept in the cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::default(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, SkiplogicError> {
        let mut settings = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                Self::parse_yaml(&content)?
            }
            None => Self::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        log::debug!("loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, SkiplogicError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SkiplogicError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup(ENV_ON_ERROR) {
            self.on_error = policy.parse()?;
        }
        if let Some(capacity) = lookup(ENV_CACHE_CAPACITY) {
            self.cache_capacity = capacity.trim().parse().map_err(|_| {
                SkiplogicError::config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_CACHE_CAPACITY, capacity
                ))
            })?;
        }
        Ok(())
    }
}
