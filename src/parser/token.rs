//! Токены и позиции языка объявлений.

use serde::{Deserialize, Serialize};

/// Позиция в исходном коде.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Начальная позиция (байт).
    pub start: usize,
    /// Конечная позиция (байт).
    pub end: usize,
}

impl Span {
    /// Создать новый Span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Объединить два Span.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Токен с позицией.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Типы токенов.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `module`
    Module,
    /// `using`
    Using,
    /// `import`
    Import,
    /// `def`
    Def,
    /// `end`
    End,

    /// Идентификатор
    Ident(String),

    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `:`
    Colon,

    /// Конец строки — разделитель операторов
    Newline,
    /// Конец файла
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Module => write!(f, "module"),
            Token::Using => write!(f, "using"),
            Token::Import => write!(f, "import"),
            Token::Def => write!(f, "def"),
            Token::End => write!(f, "end"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Newline => write!(f, "newline"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
