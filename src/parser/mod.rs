//! Парсер языка объявлений эталонного хоста.
//!
//! Каждый файл объявляет ровно одно пространство имён:
//!
//! ```text
//! # комментарий
//! module Helper
//!   using App.Sub, .Other        # несколько путей
//!   import ..Util: parse, render # имена из одного пути
//!   def greet                    # имя, определяемое модулем
//! end
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::ParseError;
pub use lexer::Lexer;
pub use parser::{Parser, SourceUnit, Statement};
pub use token::{Span, Spanned, Token};

/// Распарсить исходник файла.
pub fn parse(source: &str) -> Result<SourceUnit, ParseError> {
    Parser::new(source).parse_unit()
}
