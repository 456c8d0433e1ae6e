// SPDX-License-Identifier: MIT

//! Condition lexer
//!
//! Turns condition text into a flat token stream. Identifiers and literals
//! are both opaque runs here; which role a run plays is decided by the parser.

use super::ast::{is_reserved_char, Comparator, Conjunction};
use super::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare run of non-whitespace, non-operator characters
    Text,
    /// Double-quoted literal; `text` holds the unescaped contents
    Quoted,
    Comparator(Comparator),
    Conjunction(Conjunction),
    LParen,
    RParen,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token's first character
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

/// Tokenize condition text. The last token is always `EndOfInput`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '(' => {
                chars.next();
                tokens.push(Token::new(TokenKind::LParen, "(", pos));
            }
            ')' => {
                chars.next();
                tokens.push(Token::new(TokenKind::RParen, ")", pos));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                let comparator = match (c, followed_by_eq) {
                    ('=', true) => Comparator::Eq,
                    ('!', true) => Comparator::NotEq,
                    ('<', true) => Comparator::Lte,
                    ('>', true) => Comparator::Gte,
                    ('<', false) => Comparator::Lt,
                    ('>', false) => Comparator::Gt,
                    // bare '=' or '!'
                    _ => {
                        return Err(LexError::UnrecognizedCharacter {
                            position: pos,
                            character: c,
                        })
                    }
                };
                if followed_by_eq {
                    chars.next();
                }
                tokens.push(Token::new(
                    TokenKind::Comparator(comparator),
                    comparator.to_string(),
                    pos,
                ));
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped)) => text.push(escaped),
                            None => break,
                        },
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(LexError::UnterminatedToken { position: pos });
                }
                tokens.push(Token::new(TokenKind::Quoted, text, pos));
            }
            c if c.is_control() => {
                return Err(LexError::UnrecognizedCharacter {
                    position: pos,
                    character: c,
                });
            }
            _ => {
                let mut end = input.len();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || c.is_control() || is_reserved_char(c) {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                let run = &input[pos..end];
                let kind = match run {
                    "and" => TokenKind::Conjunction(Conjunction::And),
                    "or" => TokenKind::Conjunction(Conjunction::Or),
                    _ => TokenKind::Text,
                };
                tokens.push(Token::new(kind, run, pos));
            }
        }
    }

    tokens.push(Token::new(TokenKind::EndOfInput, "", input.len()));
    Ok(tokens)
}
