//! Лексер языка объявлений.

use logos::Logos;

use super::error::ParseError;
use super::token::{Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Пробелы, но не переводы строк
#[logos(skip r"#[^\n]*")] // Комментарии # до конца строки
enum LogosToken {
    // Ключевые слова (до идентификаторов!)
    #[token("module")]
    Module,
    #[token("using")]
    Using,
    #[token("import")]
    Import,
    #[token("def")]
    Def,
    #[token("end")]
    End,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("\n")]
    Newline,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Лексер.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    peeked: Option<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    /// Создать новый лексер.
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
            peeked: None,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }

        self.read_token()
    }

    /// Посмотреть на следующий токен без его потребления.
    pub fn peek_token(&mut self) -> Result<&Spanned<Token>, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.read_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Прочитать токен из logos.
    fn read_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        match self.logos.next() {
            Some(Ok(logos_token)) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Ok(Spanned::new(convert_token(logos_token), span))
            }
            Some(Err(())) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Err(ParseError::LexerError { span })
            }
            None => {
                let pos = self.source.len();
                Ok(Spanned::new(Token::Eof, Span::new(pos, pos)))
            }
        }
    }
}

/// Конвертировать внутренний токен logos в публичный Token.
fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::Module => Token::Module,
        LogosToken::Using => Token::Using,
        LogosToken::Import => Token::Import,
        LogosToken::Def => Token::Def,
        LogosToken::End => Token::End,
        LogosToken::Dot => Token::Dot,
        LogosToken::Comma => Token::Comma,
        LogosToken::Colon => Token::Colon,
        LogosToken::Newline => Token::Newline,
        LogosToken::Ident(s) => Token::Ident(s),
    }
}
