//! Error types for all pipeline phases.

use crate::span::Span;
use thiserror::Error;

/// Lexer errors.
#[derive(Debug, Error)]
pub enum LexerError {
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedChar(char, Span),

    #[error("Unterminated string at {0}")]
    UnterminatedString(Span),

    #[error("Newline inside string literal at {0}")]
    NewlineInString(Span),

    #[error("Unterminated block comment at {0}")]
    UnterminatedComment(Span),
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar(_, span) => *span,
            Self::UnterminatedString(span) => *span,
            Self::NewlineInString(span) => *span,
            Self::UnterminatedComment(span) => *span,
        }
    }
}

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Unexpected token '{found}', expected {expected} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unterminated {what} at {span}")]
    Unterminated { what: &'static str, span: Span },

    #[error("'{0}' is reserved and not yet supported at {1}")]
    Reserved(&'static str, Span),

    #[error("Invalid expression at {0}")]
    InvalidExpression(Span),

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn general(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::Unterminated { span, .. } => *span,
            Self::Reserved(_, span) => *span,
            Self::InvalidExpression(span) => *span,
            Self::General { span, .. } => *span,
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        Self::General {
            message: err.to_string(),
            span: err.span(),
        }
    }
}

/// Bytecode compilation errors.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unknown variable '{0}' at {1}")]
    UnknownVariable(String, Span),

    #[error("Variable '{0}' already declared at {1}")]
    Redeclaration(String, Span),

    #[error("Type mismatch: expected {expected}, found {found} at {span}")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Non-primitive operands '{left}' and '{right}' do not match at {span}")]
    NonPrimitiveMismatch {
        left: String,
        right: String,
        span: Span,
    },

    #[error("Cannot assign to a value that is not a reference at {0}")]
    AssignToValue(Span),

    #[error("Cannot assign through a locked reference at {0}")]
    AssignToLocked(Span),

    #[error("Reference declaration requires an initializer at {0}")]
    MissingReferenceInit(Span),

    #[error("Reference initializer must be a '{expected}' reference, found {found} at {span}")]
    ReferenceInitMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("'yield' outside of an expression block at {0}")]
    YieldOutsideBlock(Span),

    #[error("Cannot convert yielded '{found}' to block type '{expected}' at {span}")]
    YieldTypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Invalid numeric literal '{0}' at {1}")]
    InvalidNumber(String, Span),

    #[error("{feature} is reserved and not yet supported at {span}")]
    Unsupported { feature: &'static str, span: Span },

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl CompileError {
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unsupported(feature: &'static str, span: Span) -> Self {
        Self::Unsupported { feature, span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnknownVariable(_, span) => *span,
            Self::Redeclaration(_, span) => *span,
            Self::TypeMismatch { span, .. } => *span,
            Self::NonPrimitiveMismatch { span, .. } => *span,
            Self::AssignToValue(span) => *span,
            Self::AssignToLocked(span) => *span,
            Self::MissingReferenceInit(span) => *span,
            Self::ReferenceInitMismatch { span, .. } => *span,
            Self::YieldOutsideBlock(span) => *span,
            Self::YieldTypeMismatch { span, .. } => *span,
            Self::InvalidNumber(_, span) => *span,
            Self::Unsupported { span, .. } => *span,
            Self::General { span, .. } => *span,
        }
    }
}

/// Runtime faults. Each maps onto a documented process exit code.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("Stack bounds violated at pc {0}")]
    StackBounds(i64),

    #[error("Bad argument: {0}")]
    BadArgument(String),

    #[error("Stack allocation failed at pc {0}")]
    Allocation(i64),

    #[error("Invalid opcode {opcode:#04x} at pc {pc}")]
    InvalidOpcode { opcode: u8, pc: i64 },

    #[error("Invalid host call id {0}")]
    InvalidSpecCall(u8),

    #[error("Invalid operand {operand:#04x} for {opcode} at pc {pc}")]
    InvalidOperand {
        opcode: &'static str,
        operand: u8,
        pc: i64,
    },

    #[error("Program counter {0} outside instruction bytes")]
    BadState(i64),
}

impl VmError {
    /// The process exit code documented for this fault class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StackBounds(_) => 1,
            Self::BadArgument(_) => 2,
            Self::Allocation(_) => 3,
            Self::InvalidOpcode { .. } => 10,
            Self::InvalidSpecCall(_) => 11,
            Self::InvalidOperand { .. } => 12,
            Self::BadState(_) => 20,
        }
    }
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum DescentError {
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] VmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
