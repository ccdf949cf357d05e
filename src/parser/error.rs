//! Ошибки парсера.

use super::token::{Span, Token};
use thiserror::Error;

/// Ошибка парсинга.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Неожиданный токен.
    #[error("Unexpected token at position {}: expected {expected}, found {found}", .span.start)]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    /// Неожиданный конец ввода.
    #[error("Unexpected end of input at position {}: {message}", .span.start)]
    UnexpectedEof { span: Span, message: String },

    /// Ошибка лексера.
    #[error("Lexer error at position {}: unexpected character", .span.start)]
    LexerError { span: Span },

    /// Неверный путь пространства имён.
    #[error("Invalid namespace path '{text}' at position {}", .span.start)]
    InvalidPath { span: Span, text: String },
}

impl ParseError {
    /// Создать ошибку "неожиданный токен".
    pub fn unexpected_token(span: Span, expected: impl Into<String>, found: &Token) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Создать ошибку "неожиданный конец".
    pub fn unexpected_eof(span: Span, message: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            span,
            message: message.into(),
        }
    }

    /// Получить позицию ошибки.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof { span, .. } => *span,
            Self::LexerError { span } => *span,
            Self::InvalidPath { span, .. } => *span,
        }
    }
}
