//! Lexical analysis: turns source bytes into a flat, eagerly tokenized
//! stream the parser consumes.

use cbc_util::CompileError;

/// A lexical token, stripped of whitespace and comments.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Literals and identifiers
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Ident(String),

    // Keywords
    Fn,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Try,
    Catch,
    Return,
    Throw,
    Yield,
    Goto,
    Continue,
    Break,
    Spawn,
    Class,
    Del,
    And,
    Or,
    True,
    False,
    None,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Assign,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,

    Eof,
}

/// A token paired with the 1-based source line it started on.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenAt {
    pub token: Token,
    pub line: u32,
}

/// Failure to tokenize. Converts into [`CompileError::Lex`].
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::lex(e.message, e.line)
    }
}

fn keyword(ident: &str) -> Option<Token> {
    Some(match ident {
        "fn" => Token::Fn,
        "if" => Token::If,
        "elif" => Token::Elif,
        "else" => Token::Else,
        "while" => Token::While,
        "for" => Token::For,
        "in" => Token::In,
        "try" => Token::Try,
        "catch" => Token::Catch,
        "return" => Token::Return,
        "throw" => Token::Throw,
        "yield" => Token::Yield,
        "goto" => Token::Goto,
        "continue" => Token::Continue,
        "break" => Token::Break,
        "spawn" => Token::Spawn,
        "class" => Token::Class,
        "del" => Token::Del,
        "and" => Token::And,
        "or" => Token::Or,
        "true" => Token::True,
        "false" => Token::False,
        "none" => Token::None,
        _ => return std::option::Option::None,
    })
}

/// Tokenizes the entirety of `source` up front, mirroring the way the
/// parser is handed a complete `Vec<Token>` rather than pulling one at
/// a time.
pub struct Lexer<'source> {
    source: &'source [u8],
    position: usize,
    line: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self { source: source.as_bytes(), position: 0, line: 1 }
    }

    /// Tokenizes the whole source, returning the token stream terminated
    /// by a trailing [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<TokenAt>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            if self.position >= self.source.len() {
                tokens.push(TokenAt { token: Token::Eof, line });
                return Ok(tokens);
            }
            let token = self.next_token()?;
            tokens.push(TokenAt { token, line });
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.position += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let c = self.peek().expect("checked by caller");

        if c.is_ascii_digit() {
            return self.lex_number();
        }
        if c == b'.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            return self.lex_number();
        }
        if c == b'"' || c == b'\'' {
            return self.lex_bytes(c);
        }
        if c == b'_' || c.is_ascii_alphabetic() {
            return Ok(self.lex_ident());
        }

        self.lex_punct()
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let line = self.line;

        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.advance();
            self.advance();
            let hex_start = self.position;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = std::str::from_utf8(&self.source[hex_start..self.position]).unwrap();
            if digits.is_empty() {
                return Err(LexError { message: "expected hex digits after `0x`".into(), line });
            }
            let value = i64::from_str_radix(digits, 16)
                .map_err(|e| LexError { message: format!("invalid hex integer: {e}"), line })?;
            return Ok(Token::Int(value));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = std::str::from_utf8(&self.source[start..self.position]).unwrap();
        if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|e| LexError { message: format!("invalid float literal: {e}"), line })?;
            Ok(Token::Float(value))
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|e| LexError { message: format!("invalid integer literal: {e}"), line })?;
            Ok(Token::Int(value))
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.position;
        while self.peek().is_some_and(|c| c == b'_' || c.is_ascii_alphanumeric()) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[start..self.position]).unwrap();
        keyword(text).unwrap_or_else(|| Token::Ident(text.to_string()))
    }

    fn lex_bytes(&mut self, quote: u8) -> Result<Token, LexError> {
        let line = self.line;
        self.advance();
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                None => return Err(LexError { message: "unterminated bytes literal".into(), line }),
                Some(c) if c == quote => break,
                Some(b'\\') => {
                    let esc = self.advance().ok_or_else(|| LexError {
                        message: "unterminated escape in bytes literal".into(),
                        line,
                    })?;
                    let decoded = match esc {
                        b'\\' => b'\\',
                        b'"' => b'"',
                        b'\'' => b'\'',
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'x' => {
                            let hi = self
                                .advance()
                                .ok_or_else(|| LexError { message: "incomplete \\x escape".into(), line })?;
                            let lo = self
                                .advance()
                                .ok_or_else(|| LexError { message: "incomplete \\x escape".into(), line })?;
                            let hex = [hi, lo];
                            let hex = std::str::from_utf8(&hex)
                                .map_err(|_| LexError { message: "invalid \\x escape".into(), line })?;
                            u8::from_str_radix(hex, 16)
                                .map_err(|_| LexError { message: "invalid \\x escape".into(), line })?
                        }
                        other => {
                            return Err(LexError {
                                message: format!("unknown escape `\\{}`", other as char),
                                line,
                            })
                        }
                    };
                    bytes.push(decoded);
                }
                Some(c) => bytes.push(c),
            }
        }
        Ok(Token::Bytes(bytes))
    }

    fn lex_punct(&mut self) -> Result<Token, LexError> {
        let line = self.line;
        let c = self.advance().expect("checked by caller");
        let two = |lexer: &mut Self, expect: u8, then: Token, otherwise: Token| -> Token {
            if lexer.peek() == Some(expect) {
                lexer.advance();
                then
            } else {
                otherwise
            }
        };

        Ok(match c {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b',' => Token::Comma,
            b';' => Token::Semicolon,
            b':' => Token::Colon,
            b'.' => Token::Dot,
            b'=' => two(self, b'=', Token::Eq, Token::Assign),
            b'!' => two(self, b'=', Token::Ne, Token::Bang),
            b'<' => {
                if self.peek() == Some(b'<') {
                    self.advance();
                    Token::Shl
                } else {
                    two(self, b'=', Token::Le, Token::Lt)
                }
            }
            b'>' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    Token::Shr
                } else {
                    two(self, b'=', Token::Ge, Token::Gt)
                }
            }
            b'+' => two(self, b'=', Token::PlusEq, Token::Plus),
            b'-' => two(self, b'=', Token::MinusEq, Token::Minus),
            b'*' => two(self, b'=', Token::StarEq, Token::Star),
            b'/' => two(self, b'=', Token::SlashEq, Token::Slash),
            b'%' => two(self, b'=', Token::PercentEq, Token::Percent),
            b'&' => two(self, b'=', Token::AmpEq, Token::Amp),
            b'|' => two(self, b'=', Token::PipeEq, Token::Pipe),
            b'^' => two(self, b'=', Token::CaretEq, Token::Caret),
            b'~' => Token::Tilde,
            other => {
                return Err(LexError { message: format!("unexpected character `{}`", other as char), line })
            }
        })
    }
}

/// Convenience entry point: tokenize `source` in one call.
pub fn lex(source: &str) -> Result<Vec<TokenAt>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn skips_whitespace_and_comments() {
        assert_eq!(tokens("  # a comment\n  1"), vec![Token::Int(1), Token::Eof]);
    }

    #[test]
    fn compound_operators_outrank_their_prefixes() {
        assert_eq!(tokens("<= < == = != !"), vec![
            Token::Le,
            Token::Lt,
            Token::Eq,
            Token::Assign,
            Token::Ne,
            Token::Bang,
            Token::Eof
        ]);
        assert_eq!(tokens("<<>>"), vec![Token::Shl, Token::Shr, Token::Eof]);
        assert_eq!(tokens("+= -= *= /= %= &= |= ^="), vec![
            Token::PlusEq,
            Token::MinusEq,
            Token::StarEq,
            Token::SlashEq,
            Token::PercentEq,
            Token::AmpEq,
            Token::PipeEq,
            Token::CaretEq,
            Token::Eof
        ]);
    }

    #[test]
    fn integers_floats_and_hex() {
        assert_eq!(tokens("42"), vec![Token::Int(42), Token::Eof]);
        assert_eq!(tokens("0x2A"), vec![Token::Int(42), Token::Eof]);
        assert_eq!(tokens("3.25"), vec![Token::Float(3.25), Token::Eof]);
        assert_eq!(tokens(".5"), vec![Token::Float(0.5), Token::Eof]);
    }

    #[test]
    fn bytes_literal_decodes_escapes() {
        assert_eq!(tokens(r#""a\nb\x41\"""#), vec![Token::Bytes(b"a\nbA\"".to_vec()), Token::Eof]);
    }

    #[test]
    fn identifiers_vs_keywords() {
        assert_eq!(tokens("while x"), vec![Token::While, Token::Ident("x".into()), Token::Eof]);
        assert_eq!(tokens("whiley"), vec![Token::Ident("whiley".into()), Token::Eof]);
    }

    #[test]
    fn line_numbers_advance_on_newline() {
        let toks = lex("1\n2\n3").unwrap();
        let lines: Vec<u32> = toks.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 3]);
    }

    #[test]
    fn unknown_character_is_a_lex_error() {
        assert!(lex("1 @ 2").is_err());
    }

    #[test]
    fn unterminated_bytes_literal_is_a_lex_error() {
        assert!(lex("\"abc").is_err());
    }

    // ------------------------------------------------------------------
    // PROPERTY-BASED TESTS - arbitrary inputs via proptest
    // ------------------------------------------------------------------

    #[test]
    fn property_arbitrary_identifiers_lex_to_a_single_ident_token() {
        use proptest::prelude::*;

        proptest!(|(input in "[a-zA-Z_][a-zA-Z0-9_]{0,30}")| {
            let toks = tokens(&input);
            prop_assert_eq!(toks.len(), 2); // the identifier, plus Eof
            if keyword(&input).is_none() {
                prop_assert!(matches!(toks[0], Token::Ident(_)));
            }
        });
    }

    #[test]
    fn property_arbitrary_decimal_digit_runs_lex_to_a_single_int() {
        use proptest::prelude::*;

        proptest!(|(input in "[0-9]{1,18}")| {
            let toks = tokens(&input);
            prop_assert_eq!(toks.len(), 2);
            prop_assert!(matches!(toks[0], Token::Int(_)));
        });
    }

    #[test]
    fn property_whitespace_runs_never_change_the_following_token() {
        use proptest::prelude::*;

        proptest!(|(spaces in 0..20usize)| {
            let padded = format!("{}42", " ".repeat(spaces));
            prop_assert_eq!(tokens(&padded), vec![Token::Int(42), Token::Eof]);
        });
    }
}
