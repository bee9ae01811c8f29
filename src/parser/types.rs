//! Type expression parsing.

use crate::ast::TypeExpr;
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    /// TYPE := IDENT ('<' TYPE (',' TYPE)* '>')? ('[' NUMBER ']')?
    ///
    /// Lock/ref qualifiers are handled by the declaration parser.
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let name = self.expect_identifier()?;
        let mut ty = TypeExpr::new(name);

        if self.match_token(&TokenKind::Less) {
            ty.args.push(self.parse_type()?);
            while self.match_token(&TokenKind::Comma) {
                ty.args.push(self.parse_type()?);
            }
            self.expect(&TokenKind::Greater)?;
        }

        if self.match_token(&TokenKind::LeftBracket) {
            ty.array_size = self.parse_array_size()?;
            self.expect(&TokenKind::RightBracket)?;
        }

        Ok(ty)
    }

    fn parse_array_size(&mut self) -> ParseResult<u32> {
        let span = self.current_span();
        match &self.peek().kind {
            TokenKind::Number(lexeme) => {
                let size = lexeme.parse::<u32>().map_err(|_| {
                    ParserError::general(format!("Invalid array size '{}'", lexeme), span)
                })?;
                self.advance();
                Ok(size)
            }
            _ => Err(ParserError::unexpected_token(
                "array size",
                format!("{}", self.peek().kind),
                span,
            )),
        }
    }
}
