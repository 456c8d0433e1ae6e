// SPDX-License-Identifier: MIT

//! Survey definition types

use serde::{Deserialize, Serialize};

use crate::condition::ValueType;

/// A survey: an ordered list of prompts and repeatable sets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurveyDefinition {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub items: Vec<SurveyItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurveyItem {
    Prompt(PromptDef),
    RepeatableSet(RepeatableSetDef),
}

impl SurveyItem {
    pub fn id(&self) -> &str {
        match self {
            SurveyItem::Prompt(p) => &p.id,
            SurveyItem::RepeatableSet(s) => &s.id,
        }
    }

    pub fn condition(&self) -> Option<&str> {
        match self {
            SurveyItem::Prompt(p) => p.condition.as_deref(),
            SurveyItem::RepeatableSet(s) => s.condition.as_deref(),
        }
    }
}

/// A single question
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptDef {
    pub id: String,
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    /// Skip-logic condition; the prompt is always displayed when absent
    #[serde(default)]
    pub condition: Option<String>,
    /// Whether the participant may skip the prompt
    #[serde(default)]
    pub skippable: bool,
    /// Choices for `single_choice` prompts
    #[serde(default)]
    pub choices: Vec<ChoiceDef>,
}

impl PromptDef {
    pub fn has_choice(&self, key: &str) -> bool {
        self.choices.iter().any(|c| c.key == key)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChoiceDef {
    pub key: String,
    pub label: String,
}

/// A group of prompts the participant may answer several times
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepeatableSetDef {
    pub id: String,
    /// Gates the whole set
    #[serde(default)]
    pub condition: Option<String>,
    pub prompts: Vec<PromptDef>,
}

impl RepeatableSetDef {
    pub fn prompt(&self, id: &str) -> Option<&PromptDef> {
        self.prompts.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Number,
    Text,
    SingleChoice,
    Boolean,
}

impl PromptType {
    pub fn value_type(self) -> ValueType {
        match self {
            PromptType::Number => ValueType::Number,
            PromptType::Text => ValueType::Text,
            PromptType::SingleChoice => ValueType::Choice,
            PromptType::Boolean => ValueType::Boolean,
        }
    }
}

impl SurveyDefinition {
    /// Top-level prompt by id; prompts inside repeatable sets are not included
    pub fn prompt(&self, id: &str) -> Option<&PromptDef> {
        self.items.iter().find_map(|item| match item {
            SurveyItem::Prompt(p) if p.id == id => Some(p),
            _ => None,
        })
    }

    pub fn repeatable_set(&self, id: &str) -> Option<&RepeatableSetDef> {
        self.items.iter().find_map(|item| match item {
            SurveyItem::RepeatableSet(s) if s.id == id => Some(s),
            _ => None,
        })
    }

    /// Declared value type of a top-level prompt
    pub fn declared_type(&self, id: &str) -> Option<ValueType> {
        self.prompt(id).map(|p| p.prompt_type.value_type())
    }

    /// Every prompt, including those inside repeatable sets, in declaration order
    pub fn all_prompts(&self) -> impl Iterator<Item = &PromptDef> {
        self.items.iter().flat_map(|item| match item {
            SurveyItem::Prompt(p) => std::slice::from_ref(p).iter(),
            SurveyItem::RepeatableSet(s) => s.prompts.iter(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVEY: &str = r#"
id: sleep
title: Sleep diary
items:
  - kind: prompt
    id: slept
    type: number
  - kind: prompt
    id: rested
    type: boolean
    condition: "slept<6"
    skippable: true
  - kind: repeatable_set
    id: naps
    condition: "rested==false"
    prompts:
      - kind: prompt
        id: nap_length
        type: number
      - id: nap_place
        type: single_choice
        choices:
          - { key: "0", label: Bed }
          - { key: "1", label: Couch }
"#;

    #[test]
    fn test_deserialize_survey() {
        let def: SurveyDefinition = serde_yaml::from_str(SURVEY).unwrap();

        assert_eq!(def.id, "sleep");
        assert_eq!(def.title.as_deref(), Some("Sleep diary"));
        assert_eq!(def.items.len(), 3);

        let rested = def.prompt("rested").unwrap();
        assert_eq!(rested.prompt_type, PromptType::Boolean);
        assert_eq!(rested.condition.as_deref(), Some("slept<6"));
        assert!(rested.skippable);

        let naps = def.repeatable_set("naps").unwrap();
        assert_eq!(naps.condition.as_deref(), Some("rested==false"));
        assert!(naps.prompt("nap_place").unwrap().has_choice("1"));
        assert!(!naps.prompt("nap_place").unwrap().has_choice("2"));
    }

    #[test]
    fn test_lookups() {
        let def: SurveyDefinition = serde_yaml::from_str(SURVEY).unwrap();

        assert_eq!(def.declared_type("slept"), Some(ValueType::Number));
        assert_eq!(def.declared_type("rested"), Some(ValueType::Boolean));
        // inner prompts are not top-level
        assert_eq!(def.declared_type("nap_length"), None);

        let ids: Vec<&str> = def.all_prompts().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["slept", "rested", "nap_length", "nap_place"]);
    }

    #[test]
    fn test_unknown_prompt_type_rejected() {
        let yaml = r#"
id: bad
items:
  - kind: prompt
    id: q
    type: photo
"#;
        assert!(serde_yaml::from_str::<SurveyDefinition>(yaml).is_err());
    }
}
