//! Парсер языка объявлений.
//!
//! ```text
//! unit      := 'module' IDENT NL body 'end'
//! body      := (stmt NL | NL)*
//! stmt      := ('using' | 'import') ref (',' ref)* [':' name (',' name)*]
//!            | 'def' IDENT
//! ref       := '.'* IDENT ('.' IDENT)*
//! ```

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};
use crate::modules::{ImportKind, ImportSpec, ImportStatement, NamespaceRef};

/// Оператор тела модуля.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `using ...` / `import ...`
    Import(ImportStatement),
    /// `def name`
    Def(String),
}

/// Разобранный файл: одно объявление пространства имён.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    /// Объявленное имя
    pub name: Spanned<String>,
    pub statements: Vec<Spanned<Statement>>,
}

/// Парсер.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Создать новый парсер.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Распарсить файл целиком.
    pub fn parse_unit(&mut self) -> Result<SourceUnit, ParseError> {
        self.skip_newlines()?;
        self.expect(Token::Module, "'module'")?;
        let name = self.expect_ident()?;
        self.expect_line_end()?;

        let mut statements = Vec::new();
        loop {
            self.skip_newlines()?;
            let token = self.lexer.next_token()?;
            let statement = match token.value {
                Token::End => break,
                Token::Using => self.parse_import(ImportKind::Using, token.span)?,
                Token::Import => self.parse_import(ImportKind::Import, token.span)?,
                Token::Def => {
                    let name = self.expect_ident()?;
                    Spanned::new(Statement::Def(name.value), token.span.merge(name.span))
                }
                Token::Eof => return Err(ParseError::unexpected_eof(token.span, "expected 'end'")),
                other => return Err(ParseError::unexpected_token(token.span, "statement", &other)),
            };
            statements.push(statement);
            self.expect_line_end()?;
        }

        self.skip_newlines()?;
        self.expect(Token::Eof, "end of file")?;

        Ok(SourceUnit { name, statements })
    }

    /// Распарсить импорт (после ключевого слова).
    fn parse_import(
        &mut self,
        kind: ImportKind,
        start: Span,
    ) -> Result<Spanned<Statement>, ParseError> {
        let mut span = start;
        let mut specs = Vec::new();

        loop {
            let path = self.parse_ref()?;
            span = span.merge(path.span);
            specs.push(ImportSpec::plain(path.value));
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        if self.eat(&Token::Colon)? {
            let mut items = Vec::new();
            loop {
                let item = self.parse_dotted()?;
                span = span.merge(item.span);
                items.push(item.value);
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
            if let Some(last) = specs.last_mut() {
                last.items = Some(items);
            }
        }

        Ok(Spanned::new(
            Statement::Import(ImportStatement { kind, specs }),
            span,
        ))
    }

    /// Распарсить ссылку на пространство имён.
    fn parse_ref(&mut self) -> Result<Spanned<NamespaceRef>, ParseError> {
        let start = self.lexer.peek_token()?.span;
        let mut text = String::new();
        while self.eat(&Token::Dot)? {
            text.push('.');
        }

        let dotted = self.parse_dotted()?;
        text.push_str(&dotted.value);
        let span = start.merge(dotted.span);

        text.parse::<NamespaceRef>()
            .map(|r| Spanned::new(r, span))
            .map_err(|_| ParseError::InvalidPath { span, text })
    }

    /// Распарсить `IDENT ('.' IDENT)*`.
    fn parse_dotted(&mut self) -> Result<Spanned<String>, ParseError> {
        let first = self.expect_ident()?;
        let mut text = first.value;
        let mut span = first.span;

        while self.eat(&Token::Dot)? {
            let next = self.expect_ident()?;
            text.push('.');
            text.push_str(&next.value);
            span = span.merge(next.span);
        }

        Ok(Spanned::new(text, span))
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, ParseError> {
        let token = self.lexer.next_token()?;
        match token.value {
            Token::Ident(name) => Ok(Spanned::new(name, token.span)),
            Token::Eof => Err(ParseError::unexpected_eof(token.span, "expected identifier")),
            other => Err(ParseError::unexpected_token(token.span, "identifier", &other)),
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<Span, ParseError> {
        let token = self.lexer.next_token()?;
        if token.value == expected {
            return Ok(token.span);
        }
        match token.value {
            Token::Eof => Err(ParseError::unexpected_eof(
                token.span,
                format!("expected {}", description),
            )),
            other => Err(ParseError::unexpected_token(token.span, description, &other)),
        }
    }

    /// Оператор заканчивается переводом строки или концом файла.
    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        let token = self.lexer.peek_token()?.clone();
        match token.value {
            Token::Newline => {
                self.lexer.next_token()?;
                Ok(())
            }
            Token::Eof => Ok(()),
            other => Err(ParseError::unexpected_token(token.span, "end of line", &other)),
        }
    }

    fn skip_newlines(&mut self) -> Result<(), ParseError> {
        while self.eat(&Token::Newline)? {}
        Ok(())
    }

    /// Потребить токен, если он совпадает.
    fn eat(&mut self, expected: &Token) -> Result<bool, ParseError> {
        if &self.lexer.peek_token()?.value == expected {
            self.lexer.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SourceUnit {
        Parser::new(source).parse_unit().unwrap()
    }

    #[test]
    fn test_parse_minimal_unit() {
        let unit = parse("module App\nend\n");
        assert_eq!(unit.name.value, "App");
        assert!(unit.statements.is_empty());
    }

    #[test]
    fn test_parse_statements() {
        let unit = parse(
            "# header\n\nmodule Helper\n  using App.Sub, .Other\n  def greet\n\n  import ..Util: parse, Json.read\nend",
        );
        assert_eq!(unit.name.value, "Helper");
        assert_eq!(unit.statements.len(), 3);

        match &unit.statements[0].value {
            Statement::Import(stmt) => {
                assert_eq!(stmt.kind, ImportKind::Using);
                assert_eq!(stmt.to_string(), "using App.Sub, .Other");
            }
            other => panic!("Expected import, got {:?}", other),
        }
        assert_eq!(unit.statements[1].value, Statement::Def("greet".to_string()));
        match &unit.statements[2].value {
            Statement::Import(stmt) => {
                assert_eq!(stmt.to_string(), "import ..Util: parse, Json.read");
            }
            other => panic!("Expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_colon_binds_to_last_spec() {
        let unit = parse("module M\nusing App.A, App.B: x\nend");
        match &unit.statements[0].value {
            Statement::Import(stmt) => {
                assert_eq!(stmt.specs[0].items, None);
                assert_eq!(stmt.specs[1].items, Some(vec!["x".to_string()]));
            }
            other => panic!("Expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_end() {
        let result = Parser::new("module App\ndef x\n").parse_unit();
        assert!(matches!(result, Err(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_missing_module_header() {
        let result = Parser::new("def x\nend").parse_unit();
        assert!(matches!(result, Err(ParseError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_two_statements_on_one_line() {
        let err = Parser::new("module App\ndef x def y\nend")
            .parse_unit()
            .unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
        assert_eq!(err.span(), Span::new(17, 20));
    }

    #[test]
    fn test_trailing_content_after_end() {
        let result = Parser::new("module App\nend\nmodule Other\nend").parse_unit();
        assert!(matches!(result, Err(ParseError::UnexpectedToken { .. })));
    }
}
