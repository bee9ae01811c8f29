//! Statement parsing.

use crate::ast::{Initializer, Node, NodeKind};
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Node> {
        match &self.peek().kind {
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if(),
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::Do => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                let span = expr.span;
                Ok(Node::new(NodeKind::DoExpr(Box::new(expr)), span))
            }
            TokenKind::Yield => {
                let start = self.current_span();
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                let span = start.merge(&expr.span);
                Ok(Node::new(NodeKind::Yield(Box::new(expr)), span))
            }
            TokenKind::While => Err(ParserError::Reserved("while", self.current_span())),
            TokenKind::Func => Err(ParserError::Reserved("func", self.current_span())),
            TokenKind::Return => Err(ParserError::Reserved("return", self.current_span())),
            TokenKind::Const => Err(ParserError::Reserved("const", self.current_span())),
            TokenKind::Unique => Err(ParserError::Reserved("Unique", self.current_span())),
            TokenKind::Shared => Err(ParserError::Reserved("Shared", self.current_span())),
            _ => {
                // A bare expression statement is an implicit DoExpr.
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                let span = expr.span;
                Ok(Node::new(NodeKind::DoExpr(Box::new(expr)), span))
            }
        }
    }

    /// let [lock] [ref] TYPE NAME (= expr | [ctor, ...])? ;
    fn parse_let(&mut self) -> ParseResult<Node> {
        let start = self.current_span();
        self.advance(); // consume 'let'

        let mut locked = false;
        let mut is_ref = false;
        loop {
            if !locked && self.check(&TokenKind::Lock) {
                self.advance();
                locked = true;
            } else if !is_ref && self.check(&TokenKind::Ref) {
                self.advance();
                is_ref = true;
            } else {
                break;
            }
        }

        let mut ty = self.parse_type()?;
        ty.locked = locked;
        ty.is_ref = is_ref;

        let name = self.expect_identifier()?;

        let init = if self.match_token(&TokenKind::Equal) {
            let expr = self.parse_expression()?;
            Some(Initializer::Expr(Box::new(expr)))
        } else if self.match_token(&TokenKind::LeftBracket) {
            let mut elements = Vec::new();
            if !self.check(&TokenKind::RightBracket) {
                elements.push(self.parse_expression_no_comma()?);
                while self.match_token(&TokenKind::Comma) {
                    elements.push(self.parse_expression_no_comma()?);
                }
            }
            self.expect(&TokenKind::RightBracket)?;
            Some(Initializer::Constructor(elements))
        } else {
            None
        };

        self.expect(&TokenKind::Semicolon)?;
        let span = start.merge(&self.previous_span());
        Ok(Node::new(NodeKind::VarDecl { ty, name, init }, span))
    }

    /// if (cond) statement [else statement]
    fn parse_if(&mut self) -> ParseResult<Node> {
        let start = self.current_span();
        self.advance(); // consume 'if'

        self.expect(&TokenKind::LeftParen)?;
        let cond = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;

        let then_branch = self.parse_statement()?;
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        let span = start.merge(&self.previous_span());
        Ok(Node::new(
            NodeKind::IfElse {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            span,
        ))
    }

    /// { statement* }
    fn parse_block(&mut self) -> ParseResult<Node> {
        let start = self.current_span();
        self.advance(); // consume '{'

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(ParserError::Unterminated {
                    what: "code block",
                    span: self.current_span(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.advance(); // consume '}'

        let span = start.merge(&self.previous_span());
        Ok(Node::new(NodeKind::CodeBlock(statements), span))
    }
}
