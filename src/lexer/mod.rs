//! Byte-stream lexer with a specialized string mode (§4.1).
//!
//! Tokens are produced one at a time by [`Lexer::next_token`]. String
//! literals are scanned in a dedicated loop that splits on `{{ expr }}`
//! interpolation markers into ordered template parts (§3.1/§3.2).

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::errors::{ErrorKind, JayError, JayResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Ident,
    Keyword(Keyword),
    Number,
    String,
    Template,
    // punctuation / operators
    Plus, Minus, Star, Slash, Percent, StarStar,
    PlusPlus, MinusMinus,
    Assign, PlusAssign, MinusAssign, StarAssign, SlashAssign, PercentAssign,
    Eq, NotEq, Lt, Gt, Le, Ge,
    AndAnd, OrOr, Bang,
    LParen, RParen, LBracket, RBracket, LBrace, RBrace,
    Comma, Colon, Semicolon, Dot, DotDot, Question, Arrow, FatArrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If, Else, For, In, While, Func, Return, Break, Continue, Const, Let,
    Null, True, False, Case, Default, Class, New, This, Extends, Super,
    Import, As, Export,
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = {
        let mut m = HashMap::new();
        m.insert("if", Keyword::If);
        m.insert("else", Keyword::Else);
        m.insert("for", Keyword::For);
        m.insert("in", Keyword::In);
        m.insert("while", Keyword::While);
        m.insert("func", Keyword::Func);
        m.insert("fn", Keyword::Func);
        m.insert("function", Keyword::Func);
        m.insert("return", Keyword::Return);
        m.insert("break", Keyword::Break);
        m.insert("continue", Keyword::Continue);
        m.insert("const", Keyword::Const);
        m.insert("let", Keyword::Let);
        m.insert("null", Keyword::Null);
        m.insert("nil", Keyword::Null);
        m.insert("undefined", Keyword::Null);
        m.insert("true", Keyword::True);
        m.insert("false", Keyword::False);
        m.insert("case", Keyword::Case);
        m.insert("default", Keyword::Default);
        m.insert("class", Keyword::Class);
        m.insert("new", Keyword::New);
        m.insert("this", Keyword::This);
        m.insert("extends", Keyword::Extends);
        m.insert("super", Keyword::Super);
        m.insert("import", Keyword::Import);
        m.insert("as", Keyword::As);
        m.insert("export", Keyword::Export);
        m
    };
}

/// One chunk of a (possibly interpolated) string literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenPayload {
    None,
    Text(String),
    Number(f64),
    Template(Vec<TemplatePart>),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub payload: TokenPayload,
}

impl Token {
    pub fn text(&self) -> &str {
        match &self.payload {
            TokenPayload::Text(s) => s.as_str(),
            _ => "",
        }
    }

    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Ident => format!("identifier '{}'", self.text()),
            TokenKind::Number => "number".to_string(),
            TokenKind::String | TokenKind::Template => "string".to_string(),
            _ => format!("{:?}", self.kind),
        }
    }
}

#[derive(Clone)]
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    pub line: usize,
    file: String,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, file: impl Into<String>) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1, file: file.into() }
    }

    /// The unconsumed tail of the source, used by the parser's arrow-function
    /// lookahead (it has no backtracking buffer of its own).
    pub fn remaining_source(&self) -> &'a str {
        std::str::from_utf8(&self.src[self.pos..]).unwrap_or("")
    }

    fn peek(&self) -> u8 {
        *self.src.get(self.pos).unwrap_or(&0)
    }

    fn peek_at(&self, off: usize) -> u8 {
        *self.src.get(self.pos + off).unwrap_or(&0)
    }

    fn bump(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        c
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while self.peek() != b'\n' && self.peek() != 0 {
                        self.pos += 1;
                    }
                }
                b'#' => {
                    while self.peek() != b'\n' && self.peek() != 0 {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    self.pos += 2;
                    while self.pos < self.src.len() {
                        if self.peek() == b'*' && self.peek_at(1) == b'/' {
                            self.pos += 2;
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> f64 {
        let start = self.pos;
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
        }
        if self.peek() == b'e' || self.peek() == b'E' {
            let save = self.pos;
            self.pos += 1;
            if self.peek() == b'+' || self.peek() == b'-' {
                self.pos += 1;
            }
            if self.peek().is_ascii_digit() {
                while self.peek().is_ascii_digit() {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("0");
        text.parse::<f64>().unwrap_or(0.0)
    }

    fn lex_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    /// Scans a quoted string starting just after the opening quote has been
    /// consumed. Returns either a plain literal token or a template token,
    /// matching §4.1's "String lexing is the unusual part" rule.
    fn lex_string_body(&mut self, quote: u8) -> JayResult<(TokenKind, TokenPayload)> {
        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut plain = String::new();
        let mut interpolated = false;

        loop {
            let c = self.peek();
            if c == 0 {
                return Err(JayError::new(
                    self.file.clone(),
                    self.line,
                    ErrorKind::UnexpectedToken("unterminated string".into()),
                ));
            }
            if c == quote {
                self.bump();
                break;
            }
            if c == b'\\' {
                self.bump();
                let e = self.bump();
                plain.push(match e {
                    b'n' => '\n',
                    b't' => '\t',
                    b'r' => '\r',
                    b'\\' => '\\',
                    b'"' => '"',
                    b'\'' => '\'',
                    b'{' => '{',
                    other => other as char,
                });
                continue;
            }
            if c == b'{' && self.peek_at(1) == b'{' {
                self.pos += 2;
                let mut depth = 1usize;
                let start = self.pos;
                while depth > 0 {
                    let cc = self.peek();
                    if cc == 0 {
                        return Err(JayError::new(
                            self.file.clone(),
                            self.line,
                            ErrorKind::UnexpectedToken("unterminated interpolation".into()),
                        ));
                    }
                    if cc == b'{' {
                        depth += 1;
                    } else if cc == b'}' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    self.bump();
                }
                let expr_src = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                // consume the matching "}}"
                self.bump();
                if self.peek() == b'}' {
                    self.bump();
                }
                interpolated = true;
                if !plain.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut plain)));
                }
                parts.push(TemplatePart::Expr(expr_src));
                continue;
            }
            plain.push(self.bump() as char);
        }

        if interpolated {
            if !plain.is_empty() {
                parts.push(TemplatePart::Literal(plain));
            }
            Ok((TokenKind::Template, TokenPayload::Template(parts)))
        } else {
            Ok((TokenKind::String, TokenPayload::Text(plain)))
        }
    }

    pub fn next_token(&mut self) -> JayResult<Token> {
        self.skip_ws_and_comments();
        let line = self.line;
        let c = self.peek();

        if c == 0 {
            return Ok(Token { kind: TokenKind::Eof, line, payload: TokenPayload::None });
        }

        if c.is_ascii_digit() {
            let n = self.lex_number();
            return Ok(Token { kind: TokenKind::Number, line, payload: TokenPayload::Number(n) });
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            let ident = self.lex_ident();
            if let Some(kw) = KEYWORDS.get(ident.as_str()) {
                return Ok(Token { kind: TokenKind::Keyword(*kw), line, payload: TokenPayload::Text(ident) });
            }
            return Ok(Token { kind: TokenKind::Ident, line, payload: TokenPayload::Text(ident) });
        }

        if c == b'"' || c == b'\'' || c == b'`' {
            self.bump();
            let (kind, payload) = self.lex_string_body(c)?;
            return Ok(Token { kind, line, payload });
        }

        macro_rules! two {
            ($second:expr, $two_kind:expr, $one_kind:expr) => {{
                self.bump();
                if self.peek() == $second {
                    self.bump();
                    $two_kind
                } else {
                    $one_kind
                }
            }};
        }

        let kind = match c {
            b'+' => {
                self.bump();
                match self.peek() {
                    b'+' => { self.bump(); TokenKind::PlusPlus }
                    b'=' => { self.bump(); TokenKind::PlusAssign }
                    _ => TokenKind::Plus,
                }
            }
            b'-' => {
                self.bump();
                match self.peek() {
                    b'-' => { self.bump(); TokenKind::MinusMinus }
                    b'=' => { self.bump(); TokenKind::MinusAssign }
                    b'>' => { self.bump(); TokenKind::Arrow }
                    _ => TokenKind::Minus,
                }
            }
            b'*' => {
                self.bump();
                match self.peek() {
                    b'*' => { self.bump(); TokenKind::StarStar }
                    b'=' => { self.bump(); TokenKind::StarAssign }
                    _ => TokenKind::Star,
                }
            }
            b'/' => two!(b'=', TokenKind::SlashAssign, TokenKind::Slash),
            b'%' => two!(b'=', TokenKind::PercentAssign, TokenKind::Percent),
            b'=' => {
                self.bump();
                match self.peek() {
                    b'=' => { self.bump(); TokenKind::Eq }
                    b'>' => { self.bump(); TokenKind::FatArrow }
                    _ => TokenKind::Assign,
                }
            }
            b'!' => two!(b'=', TokenKind::NotEq, TokenKind::Bang),
            b'<' => two!(b'=', TokenKind::Le, TokenKind::Lt),
            b'>' => two!(b'=', TokenKind::Ge, TokenKind::Gt),
            b'&' => {
                self.bump();
                if self.peek() == b'&' {
                    self.bump();
                    TokenKind::AndAnd
                } else {
                    return Err(JayError::new(self.file.clone(), line, ErrorKind::UnexpectedToken("'&'".into())));
                }
            }
            b'|' => {
                self.bump();
                if self.peek() == b'|' {
                    self.bump();
                    TokenKind::OrOr
                } else {
                    return Err(JayError::new(self.file.clone(), line, ErrorKind::UnexpectedToken("'|'".into())));
                }
            }
            b'(' => { self.bump(); TokenKind::LParen }
            b')' => { self.bump(); TokenKind::RParen }
            b'[' => { self.bump(); TokenKind::LBracket }
            b']' => { self.bump(); TokenKind::RBracket }
            b'{' => { self.bump(); TokenKind::LBrace }
            b'}' => { self.bump(); TokenKind::RBrace }
            b',' => { self.bump(); TokenKind::Comma }
            b':' => { self.bump(); TokenKind::Colon }
            b';' => { self.bump(); TokenKind::Semicolon }
            b'.' => two!(b'.', TokenKind::DotDot, TokenKind::Dot),
            b'?' => { self.bump(); TokenKind::Question }
            other => {
                return Err(JayError::new(
                    self.file.clone(),
                    line,
                    ErrorKind::UnexpectedToken(format!("'{}'", other as char)),
                ));
            }
        };

        Ok(Token { kind, line, payload: TokenPayload::None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lx = Lexer::new(src, "<test>");
        let mut out = Vec::new();
        loop {
            let t = lx.next_token().unwrap();
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn plain_string_round_trips() {
        let mut lx = Lexer::new(r#""hello\nworld""#, "<test>");
        let t = lx.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.text(), "hello\nworld");
    }

    #[test]
    fn interpolated_string_splits_parts() {
        let mut lx = Lexer::new(r#""a {{ 1 + 2 }} b""#, "<test>");
        let t = lx.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::Template);
        match t.payload {
            TokenPayload::Template(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], TemplatePart::Literal("a ".into()));
                assert!(matches!(&parts[1], TemplatePart::Expr(e) if e.trim() == "1 + 2"));
                assert_eq!(parts[2], TemplatePart::Literal(" b".into()));
            }
            _ => panic!("expected template payload"),
        }
    }

    #[test]
    fn numeric_literals() {
        let mut lx = Lexer::new("42 3.5 1e3", "<test>");
        let a = lx.next_token().unwrap();
        assert_eq!(a.payload, TokenPayload::Number(42.0));
        lx.skip_ws_and_comments();
        let b = lx.next_token().unwrap();
        assert_eq!(b.payload, TokenPayload::Number(3.5));
        let c = lx.next_token().unwrap();
        assert_eq!(c.payload, TokenPayload::Number(1000.0));
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("if else myVar"),
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Keyword(Keyword::Else),
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("1 // comment\n2 # also\n/* block\ncomment */ 3"), vec![
            TokenKind::Number,
            TokenKind::Number,
            TokenKind::Number,
        ]);
    }
}
