// SPDX-License-Identifier: MIT

//! Skip-logic conditions for survey prompts
//!
//! - `condition` - lexer, parser, AST and evaluator for condition text
//! - `survey` - survey definitions, uploaded responses, validation and walking
//! - `config` - runtime settings

pub mod condition;
pub mod config;
pub mod error;
pub mod survey;

pub use error::SkiplogicError;
