//! Expression parsing: precedence climbing over the operator table.

use crate::ast::{BinaryOp, Node, NodeKind, TypeExpr, UnaryOp};
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

/// Binary precedence, ascending. `None` means "not a binary operator".
fn precedence(kind: &TokenKind) -> Option<u8> {
    let prec = match kind {
        TokenKind::Comma => 0,
        TokenKind::Equal
        | TokenKind::PlusEqual
        | TokenKind::MinusEqual
        | TokenKind::StarEqual
        | TokenKind::SlashEqual => 1,
        TokenKind::PipePipe => 2,
        TokenKind::AmpAmp => 3,
        TokenKind::Pipe => 4,
        TokenKind::Caret => 5,
        TokenKind::Amp => 6,
        TokenKind::EqualEqual | TokenKind::BangEqual => 7,
        TokenKind::Greater | TokenKind::Less | TokenKind::GreaterEqual | TokenKind::LessEqual => 8,
        TokenKind::Plus | TokenKind::Minus => 9,
        TokenKind::Star | TokenKind::Slash => 10,
        TokenKind::Dot => 11,
        _ => return None,
    };
    Some(prec)
}

fn binary_op(kind: &TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Comma => BinaryOp::Comma,
        TokenKind::Equal => BinaryOp::Assign,
        TokenKind::PlusEqual => BinaryOp::AddAssign,
        TokenKind::MinusEqual => BinaryOp::SubAssign,
        TokenKind::StarEqual => BinaryOp::MulAssign,
        TokenKind::SlashEqual => BinaryOp::DivAssign,
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::BangEqual => BinaryOp::NotEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Dot => BinaryOp::Member,
        _ => unreachable!("not a binary operator"),
    }
}

impl Parser {
    /// Parse a full expression, including the comma operator.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Node> {
        let left = self.parse_unary()?;
        self.parse_binary_rhs(0, left)
    }

    /// Parse an expression that stops at the comma operator, for use in
    /// comma-delimited lists.
    pub(crate) fn parse_expression_no_comma(&mut self) -> ParseResult<Node> {
        let left = self.parse_unary()?;
        self.parse_binary_rhs(1, left)
    }

    /// Precedence climbing: fold operators of at least `min_prec` onto `lhs`.
    /// All levels are left-associative.
    fn parse_binary_rhs(&mut self, min_prec: u8, mut lhs: Node) -> ParseResult<Node> {
        loop {
            let Some(op_prec) = precedence(&self.peek().kind) else {
                break;
            };
            if op_prec < min_prec {
                break;
            }

            let op = binary_op(&self.peek().kind);
            self.advance();

            let mut rhs = self.parse_unary()?;
            if let Some(next_prec) = precedence(&self.peek().kind) {
                if op_prec < next_prec {
                    rhs = self.parse_binary_rhs(op_prec + 1, rhs)?;
                }
            }

            let span = lhs.span.merge(&rhs.span);
            lhs = Node::new(
                NodeKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    /// Unary prefix operators bind tighter than any binary operator.
    fn parse_unary(&mut self) -> ParseResult<Node> {
        let op = match &self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };

        if let Some(op) = op {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span);
            return Ok(Node::new(
                NodeKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let span = self.current_span();

        match &self.peek().kind {
            TokenKind::Number(lexeme) => {
                let lexeme = lexeme.clone();
                self.advance();
                Ok(Node::new(NodeKind::Number(lexeme), span))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                // Type : { ... } is an expression block; a bare identifier
                // is a variable reference.
                if self.check(&TokenKind::Colon) {
                    self.advance();
                    self.parse_expr_block(TypeExpr::new(name), span)
                } else {
                    Ok(Node::new(NodeKind::Identifier(name), span))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(inner)
            }
            _ => Err(ParserError::InvalidExpression(span)),
        }
    }

    /// Parse the body of an expression block after its `type :` prefix.
    fn parse_expr_block(
        &mut self,
        ty: TypeExpr,
        start: crate::span::Span,
    ) -> ParseResult<Node> {
        self.expect(&TokenKind::LeftBrace)?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(ParserError::Unterminated {
                    what: "expression block",
                    span: self.current_span(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.advance(); // consume '}'

        let span = start.merge(&self.previous_span());
        Ok(Node::new(NodeKind::ExprBlock { ty, statements }, span))
    }
}
