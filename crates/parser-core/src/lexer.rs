use crate::error::LexError;
use crate::token::{Token, TokenKind};

/// Tokenizes corpusql query text. Whitespace is skipped; `//` starts a
/// line comment. The lexer is total: every character is either
/// consumed into a token or reported via `LexError`.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        log::trace!("tokenizing {} bytes of query text", self.src.len());
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let (line, col) = (self.line, self.col);
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", line, col));
                break;
            };
            let token = match c {
                b'(' => self.single(TokenKind::LParen, line, col),
                b')' => self.single(TokenKind::RParen, line, col),
                b',' => self.single(TokenKind::Comma, line, col),
                b'*' => self.single(TokenKind::Star, line, col),
                b'"' => self.lex_string(line, col)?,
                b'?' => self.lex_variable(line, col)?,
                b'<' | b'>' | b'=' => self.lex_operator(line, col)?,
                b'0'..=b'9' | b'-' => self.lex_number(line, col)?,
                c if c.is_ascii_alphabetic() || c == b'_' => self.lex_ident_or_keyword(line, col),
                other => {
                    return Err(LexError::new(
                        line,
                        col,
                        format!("unexpected character '{}'", other as char),
                    ));
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn single(&mut self, kind: TokenKind, line: usize, col: usize) -> Token {
        let c = self.advance().unwrap();
        Token::new(kind, (c as char).to_string(), line, col)
    }

    fn lex_string(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::new(line, col, "unterminated string literal")),
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(other) => value.push(other as char),
                    None => return Err(LexError::new(line, col, "unterminated escape sequence")),
                },
                Some(c) => value.push(c as char),
            }
        }
        Ok(Token::new(TokenKind::String, value, line, col))
    }

    fn lex_variable(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        self.advance(); // '?'
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == b'_') {
            return Err(LexError::new(line, col, "expected identifier after '?'"));
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let raw = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        Ok(Token::new(TokenKind::Variable, format!("?{raw}"), line, col))
    }

    fn lex_operator(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        let first = self.advance().unwrap();
        match first {
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Le, "<=", line, col))
                } else {
                    Ok(Token::new(TokenKind::Lt, "<", line, col))
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Ge, ">=", line, col))
                } else {
                    Ok(Token::new(TokenKind::Gt, ">", line, col))
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::new(TokenKind::EqEq, "==", line, col))
                } else {
                    Ok(Token::new(TokenKind::Eq, "=", line, col))
                }
            }
            other => Err(LexError::new(
                line,
                col,
                format!("unexpected operator character '{}'", other as char),
            )),
        }
    }

    fn lex_number(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.advance();
        }
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(LexError::new(line, col, "expected digit"));
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let raw = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        Ok(Token::new(TokenKind::Int, raw, line, col))
    }

    fn lex_ident_or_keyword(&mut self, line: usize, col: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let raw = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match TokenKind::keyword_from_str(raw) {
            Some(kind) => Token::new(kind, raw, line, col),
            None => Token::new(TokenKind::Ident, raw, line, col),
        }
    }
}
