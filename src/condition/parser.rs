// SPDX-License-Identifier: MIT

//! Recursive-descent parser for condition sentences
//!
//! ```text
//! Sentence    := Clause ( Conjunction Sentence )?
//! Clause      := Expression | "(" Sentence ")"
//! Expression  := Identifier Comparator Literal
//! ```
//!
//! Every chain is right-associative with no precedence between `and` and
//! `or`: the tail after a conjunction is the whole rest of the chain.

use super::ast::{Comparator, Expression, Sentence, Tail};
use super::error::{Expected, ParseError};
use super::lexer::{Token, TokenKind};

/// Maximum number of nested parenthesized groups
pub const MAX_DEPTH: usize = 256;

/// Maximum number of conjunctions in one chain
pub const MAX_CHAIN: usize = 1024;

/// Parse a token stream produced by `tokenize` into a sentence
pub fn parse(tokens: &[Token]) -> Result<Sentence, ParseError> {
    let mut parser = Parser::new(tokens);
    let sentence = parser.sentence(0)?;

    let next = parser.peek();
    match next.kind {
        TokenKind::EndOfInput => Ok(sentence),
        _ => Err(ParseError::TrailingInput {
            position: next.position,
            found: next.text.clone(),
        }),
    }
}

enum Clause {
    Expression(Expression),
    Group(Sentence),
}

impl Clause {
    fn into_sentence(self, tail: Option<Tail>) -> Sentence {
        match self {
            Clause::Expression(expression) => Sentence::Simple { expression, tail },
            Clause::Group(inner) => Sentence::Grouped {
                inner: Box::new(inner),
                tail,
            },
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    /// Stand-in for a stream missing its end marker
    end: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let end_position = tokens
            .last()
            .map(|t| t.position + t.text.len())
            .unwrap_or(0);
        Self {
            tokens,
            cursor: 0,
            end: Token {
                kind: TokenKind::EndOfInput,
                text: String::new(),
                position: end_position,
            },
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.cursor).unwrap_or(&self.end)
    }

    fn advance(&mut self) -> &Token {
        let index = self.cursor;
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        self.tokens.get(index).unwrap_or(&self.end)
    }

    /// A clause followed by its conjunction chain
    ///
    /// The chain is collected left to right, then folded from the right so
    /// the last clause becomes the innermost tail.
    fn sentence(&mut self, depth: usize) -> Result<Sentence, ParseError> {
        if depth >= MAX_DEPTH {
            return Err(ParseError::NestingTooDeep {
                position: self.peek().position,
                limit: MAX_DEPTH,
            });
        }

        let first = self.clause(depth)?;
        let mut links = Vec::new();
        while let TokenKind::Conjunction(conjunction) = self.peek().kind {
            if links.len() >= MAX_CHAIN {
                return Err(ParseError::ChainTooLong {
                    position: self.peek().position,
                    limit: MAX_CHAIN,
                });
            }
            self.advance();
            links.push((conjunction, self.clause(depth)?));
        }

        let mut tail = None;
        for (conjunction, clause) in links.into_iter().rev() {
            tail = Some(Tail {
                conjunction,
                rest: Box::new(clause.into_sentence(tail)),
            });
        }
        Ok(first.into_sentence(tail))
    }

    fn clause(&mut self, depth: usize) -> Result<Clause, ParseError> {
        if self.peek().kind == TokenKind::LParen {
            self.advance();
            let inner = self.sentence(depth + 1)?;
            self.expect_closing_paren()?;
            Ok(Clause::Group(inner))
        } else {
            Ok(Clause::Expression(self.expression()?))
        }
    }

    fn expect_closing_paren(&mut self) -> Result<(), ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::RParen => Ok(()),
            _ => Err(unexpected(token, Expected::ClosingParen)),
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let identifier = {
            let token = self.advance();
            match token.kind {
                TokenKind::Text => token.text.clone(),
                // A clause can start with an identifier or '(' only
                _ => return Err(unexpected(token, Expected::Clause)),
            }
        };

        let comparator = self.comparator()?;

        let token = self.advance();
        let literal = match token.kind {
            TokenKind::Text | TokenKind::Quoted => token.text.clone(),
            _ => return Err(unexpected(token, Expected::Literal)),
        };

        Ok(Expression {
            identifier,
            comparator,
            literal,
        })
    }

    fn comparator(&mut self) -> Result<Comparator, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Comparator(comparator) => Ok(comparator),
            _ => Err(unexpected(token, Expected::Comparator)),
        }
    }
}

fn unexpected(token: &Token, expected: Expected) -> ParseError {
    match token.kind {
        TokenKind::EndOfInput => ParseError::UnexpectedEndOfInput {
            position: token.position,
            expected,
        },
        TokenKind::Quoted if expected == Expected::Clause => ParseError::UnexpectedToken {
            position: token.position,
            expected: Expected::Identifier,
            found: token.text.clone(),
        },
        _ => ParseError::UnexpectedToken {
            position: token.position,
            expected,
            found: token.text.clone(),
        },
    }
}
