//! Scanner for descent source code.

use crate::error::LexerError;
use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;

/// The scanner transforms source text into a stream of tokens.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    start_pos: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scan all tokens from the source, ending with Eof.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Scan the next token.
    pub fn scan_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments()?;
        self.mark_start();

        let Some(c) = self.advance() else {
            return Ok(Token::eof(self.current_pos, self.line, self.column));
        };

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            '.' => Ok(self.make_token(TokenKind::Dot)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            '^' => Ok(self.make_token(TokenKind::Caret)),
            '~' => Ok(self.make_token(TokenKind::Tilde)),
            '?' => Ok(self.make_token(TokenKind::Question)),
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::BangEqual))
                } else {
                    Ok(self.make_token(TokenKind::Bang))
                }
            }
            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::EqualEqual))
                } else {
                    Ok(self.make_token(TokenKind::Equal))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::GreaterEqual))
                } else {
                    Ok(self.make_token(TokenKind::Greater))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::LessEqual))
                } else {
                    Ok(self.make_token(TokenKind::Less))
                }
            }
            '-' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::MinusEqual))
                } else {
                    Ok(self.make_token(TokenKind::Minus))
                }
            }
            '+' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::PlusEqual))
                } else {
                    Ok(self.make_token(TokenKind::Plus))
                }
            }
            '*' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::StarEqual))
                } else {
                    Ok(self.make_token(TokenKind::Star))
                }
            }
            '/' => {
                // Comments are consumed above, so this is division
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::SlashEqual))
                } else {
                    Ok(self.make_token(TokenKind::Slash))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::AmpAmp))
                } else {
                    Ok(self.make_token(TokenKind::Amp))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::PipePipe))
                } else {
                    Ok(self.make_token(TokenKind::Pipe))
                }
            }
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
            _ => Err(LexerError::UnexpectedChar(c, self.current_span())),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance(); // consume /
                    self.advance(); // consume *
                    loop {
                        match self.peek() {
                            None => {
                                return Err(LexerError::UnterminatedComment(self.current_span()))
                            }
                            Some('*') if self.peek_next() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Scan a double-quoted string. Escapes pass through verbatim: a
    /// backslash keeps the following character raw, including a quote.
    fn scan_string(&mut self) -> Result<Token, LexerError> {
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(LexerError::UnterminatedString(self.current_span())),
                Some('\n') => return Err(LexerError::NewlineInString(self.current_span())),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    value.push('\\');
                    self.advance();
                    match self.peek() {
                        None => return Err(LexerError::UnterminatedString(self.current_span())),
                        Some(c) => {
                            value.push(c);
                            self.advance();
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(self.make_token(TokenKind::String(value)))
    }

    /// Scan a numeric literal: digits, optional fraction, optional f/d suffix.
    /// The raw lexeme is kept; the compiler types it from value and suffix.
    fn scan_number(&mut self) -> Result<Token, LexerError> {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.')
            && matches!(self.peek_next(), Some(c) if c.is_ascii_digit())
        {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.peek(), Some('f') | Some('d')) {
            self.advance();
        }

        let lexeme = self.source[self.start_pos..self.current_pos].to_string();
        Ok(self.make_token(TokenKind::Number(lexeme)))
    }

    fn scan_identifier(&mut self) -> Result<Token, LexerError> {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = &self.source[self.start_pos..self.current_pos];
        let kind = TokenKind::keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Ok(self.make_token(kind))
    }

    // ===== Cursor helpers =====

    fn mark_start(&mut self) {
        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.current_pos = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&mut self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next().map(|(_, c)| c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.start_pos,
                self.current_pos,
                self.start_line,
                self.start_column,
            ),
        )
    }

    fn current_span(&self) -> Span {
        Span::new(self.start_pos, self.current_pos, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ += == = != && & || | ^ ~ !"),
            vec![
                TokenKind::Plus,
                TokenKind::PlusEqual,
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::BangEqual,
                TokenKind::AmpAmp,
                TokenKind::Amp,
                TokenKind::PipePipe,
                TokenKind::Pipe,
                TokenKind::Caret,
                TokenKind::Tilde,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("let ref lock u16 yield yields"),
            vec![
                TokenKind::Let,
                TokenKind::Ref,
                TokenKind::Lock,
                TokenKind::Identifier("u16".to_string()),
                TokenKind::Yield,
                TokenKind::Identifier("yields".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_lexemes() {
        assert_eq!(
            kinds("42 3.25 1f 2d 1.5f"),
            vec![
                TokenKind::Number("42".to_string()),
                TokenKind::Number("3.25".to_string()),
                TokenKind::Number("1f".to_string()),
                TokenKind::Number("2d".to_string()),
                TokenKind::Number("1.5f".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dot_without_leading_digit_is_not_fraction() {
        // "1." followed by non-digit: the dot is its own token
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Number("1".to_string()),
                TokenKind::Dot,
                TokenKind::Identifier("x".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("1 // comment\n2 /* block\ncomment */ 3"),
            vec![
                TokenKind::Number("1".to_string()),
                TokenKind::Number("2".to_string()),
                TokenKind::Number("3".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        // The first */ closes the comment
        assert_eq!(
            kinds("/* a /* b */ 7"),
            vec![TokenKind::Number("7".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escape_passthrough() {
        assert_eq!(
            kinds(r#""a\"b\n""#),
            vec![
                TokenKind::String(r#"a\"b\n"#.to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_newline_is_error() {
        assert!(matches!(
            Scanner::new("\"ab\ncd\"").scan_tokens(),
            Err(LexerError::NewlineInString(_))
        ));
    }

    #[test]
    fn test_line_tracking() {
        let tokens = Scanner::new("1\n  2").scan_tokens().unwrap();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }
}
