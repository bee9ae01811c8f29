//! Core parser struct and token helpers.

use crate::ast::Program;
use crate::error::ParserError;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

pub type ParseResult<T> = Result<T, ParserError>;

/// A recursive-descent parser over a pre-lexed token stream. The stream
/// always ends in an Eof token, which the cursor never moves past.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete program.
    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program::new(statements))
    }

    /// Parse a single statement, then require end of input.
    #[cfg(test)]
    pub(crate) fn parse_single(&mut self) -> ParseResult<crate::ast::Node> {
        let node = self.parse_statement()?;
        if !self.is_at_end() {
            return Err(ParserError::unexpected_token(
                "end of input",
                self.peek().kind.to_string(),
                self.current_span(),
            ));
        }
        Ok(node)
    }

    // ===== Cursor =====

    /// The token `offset` positions ahead, clamped to the trailing Eof.
    fn token_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    pub(crate) fn peek(&self) -> &Token {
        self.token_at(0)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    /// Consume the current token and return it. The Eof token is returned
    /// without moving the cursor.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    /// True when the current token is exactly `kind`. Callers only probe
    /// for payload-free kinds, so plain equality suffices.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    /// Consume the current token iff it is `kind`.
    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        let hit = self.check(kind);
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// Consume a token of the given kind or fail with what was found.
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if !self.check(kind) {
            return Err(ParserError::unexpected_token(
                format!("'{}'", kind),
                self.peek().kind.to_string(),
                self.current_span(),
            ));
        }
        Ok(self.advance())
    }

    /// Consume an identifier token and return its name.
    pub(crate) fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            self.pos += 1;
            return Ok(name);
        }
        Err(ParserError::unexpected_token(
            "identifier",
            self.peek().kind.to_string(),
            self.current_span(),
        ))
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Span of the most recently consumed token.
    pub(crate) fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }
}
