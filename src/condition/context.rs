// SPDX-License-Identifier: MIT

//! Response contexts: how the evaluator resolves identifiers
//!
//! The surrounding application implements `ResponseContext` (or
//! `AsyncResponseContext` when resolution needs I/O). `ResponseSet` is a
//! plain in-memory implementation.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::error::ResolveError;

/// Declared type of a referenced prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Number,
    Text,
    Choice,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Number => write!(f, "number"),
            ValueType::Text => write!(f, "text"),
            ValueType::Choice => write!(f, "single_choice"),
            ValueType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A response value tagged with its declared type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum TypedValue {
    Number(f64),
    Text(String),
    /// Key of the selected choice
    Choice(String),
    Boolean(bool),
}

impl TypedValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Number(_) => ValueType::Number,
            TypedValue::Text(_) => ValueType::Text,
            TypedValue::Choice(_) => ValueType::Choice,
            TypedValue::Boolean(_) => ValueType::Boolean,
        }
    }
}

/// Outcome of resolving one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Value(TypedValue),
    /// The referenced prompt was itself skipped in this survey instance
    NotDisplayed,
    /// No prompt with this identifier exists
    Unknown,
}

pub type ResolveResult = Result<ContextValue, ResolveError>;

/// Synchronous identifier resolution
pub trait ResponseContext {
    fn resolve(&self, identifier: &str) -> ResolveResult;
}

/// Identifier resolution that may suspend, e.g. a database-backed lookup
#[async_trait]
pub trait AsyncResponseContext: Send + Sync {
    async fn resolve(&self, identifier: &str) -> ResolveResult;
}

/// In-memory response context
#[derive(Debug, Clone, Default)]
pub struct ResponseSet {
    values: HashMap<String, ContextValue>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a typed answer
    pub fn insert(&mut self, identifier: impl Into<String>, value: TypedValue) {
        self.values
            .insert(identifier.into(), ContextValue::Value(value));
    }

    /// Record that a prompt was not displayed
    pub fn mark_not_displayed(&mut self, identifier: impl Into<String>) {
        self.values
            .insert(identifier.into(), ContextValue::NotDisplayed);
    }

    pub fn get(&self, identifier: &str) -> Option<&ContextValue> {
        self.values.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ResponseContext for ResponseSet {
    fn resolve(&self, identifier: &str) -> ResolveResult {
        Ok(self
            .values
            .get(identifier)
            .cloned()
            .unwrap_or(ContextValue::Unknown))
    }
}

#[async_trait]
impl AsyncResponseContext for ResponseSet {
    async fn resolve(&self, identifier: &str) -> ResolveResult {
        ResponseContext::resolve(self, identifier)
    }
}
