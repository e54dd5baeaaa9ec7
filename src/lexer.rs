use crate::error::LexError;
use miette::NamedSource;
use std::fmt;

/// Represents the different kinds of tokens that the lexer can produce.
/// Whitespace and comments never become tokens.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // == Special Tokens ==
    /// Represents the end of the input.
    Eof,
    /// An `@include "path"` directive. The parser splices the named file in its place.
    Include(String),

    // == Literals ==
    /// A setting name. Examples: `port`, `_private`, `level2`.
    Identifier(String),
    /// A string literal with its escapes already decoded.
    String(String),
    /// An integer literal. `hex` records whether it was written with a `0x` prefix.
    Integer { value: i64, hex: bool },
    /// A floating-point literal; always written with a decimal point or an exponent.
    Float(f64),
    /// `true` or `false`, in any letter case.
    Boolean(bool),

    // == Punctuation ==
    /// Left Brace: `{`
    LBrace,
    /// Right Brace: `}`
    RBrace,
    /// Left Bracket: `[`
    LBracket,
    /// Right Bracket: `]`
    RBracket,
    /// Left Parenthesis: `(`
    LParen,
    /// Right Parenthesis: `)`
    RParen,
    /// Comma: `,`
    Comma,
    /// Semicolon: `;`
    Semicolon,
    /// Colon: `:`
    Colon,
    /// Equals: `=`
    Equals,
}

impl TokenType {
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TokenType::String(_)
                | TokenType::Integer { .. }
                | TokenType::Float(_)
                | TokenType::Boolean(_)
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Eof => write!(f, "end of input"),
            TokenType::Include(path) => write!(f, "@include \"{path}\""),
            TokenType::Identifier(name) => write!(f, "name `{name}`"),
            TokenType::String(_) => write!(f, "string"),
            TokenType::Integer { .. } => write!(f, "integer"),
            TokenType::Float(_) => write!(f, "float"),
            TokenType::Boolean(_) => write!(f, "boolean"),
            TokenType::LBrace => write!(f, "'{{'"),
            TokenType::RBrace => write!(f, "'}}'"),
            TokenType::LBracket => write!(f, "'['"),
            TokenType::RBracket => write!(f, "']'"),
            TokenType::LParen => write!(f, "'('"),
            TokenType::RParen => write!(f, "')'"),
            TokenType::Comma => write!(f, "','"),
            TokenType::Semicolon => write!(f, "';'"),
            TokenType::Colon => write!(f, "':'"),
            TokenType::Equals => write!(f, "'='"),
        }
    }
}

/// A token with its type, byte span and starting line.
#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
    /// 1-based line on which the token starts.
    pub line: usize,
    /// Index of the source the token came from; `0` is the main document,
    /// included files are numbered by the parser.
    pub source: usize,
}

impl Token {
    pub fn new(ttype: TokenType, pos_start: usize, pos_end: usize, line: usize) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
            line,
            source: 0,
        }
    }
}

/// Turns configuration text into tokens, one at a time through [`Iterator`]
/// or all at once through [`Lexer::lex`].
pub struct Lexer<'a> {
    input: &'a str,
    name: String,
    position: usize,
    line: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_name(input, "<input>")
    }

    pub fn with_name(input: &'a str, name: impl Into<String>) -> Self {
        Self {
            input,
            name: name.into(),
            position: 0,
            line: 1,
            done: false,
        }
    }

    /// Tokenizes the whole input. The last token is always [`TokenType::Eof`].
    pub fn lex(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.ttype == TokenType::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start_pos = self.position;
        let line = self.line;

        let ttype = if let Some(char) = self.advance() {
            match char {
                '{' => TokenType::LBrace,
                '}' => TokenType::RBrace,
                '[' => TokenType::LBracket,
                ']' => TokenType::RBracket,
                '(' => TokenType::LParen,
                ')' => TokenType::RParen,
                ',' => TokenType::Comma,
                ';' => TokenType::Semicolon,
                ':' => TokenType::Colon,
                '=' => TokenType::Equals,
                '"' => TokenType::String(self.read_string(start_pos)?),
                '@' => self.read_directive(start_pos)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(start_pos),
                c if c.is_ascii_digit() => self.read_number(start_pos)?,
                '-' | '+' if self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') => {
                    self.read_number(start_pos)?
                }
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number(start_pos)?
                }
                c => {
                    return Err(self.error(
                        format!("unexpected character `{}`", c.escape_default()),
                        start_pos,
                    ))
                }
            }
        } else {
            TokenType::Eof
        };

        Ok(Token::new(ttype, start_pos, self.position, line))
    }

    fn advance(&mut self) -> Option<char> {
        let char = self.input[self.position..].chars().next();
        if let Some(c) = char {
            self.position += c.len_utf8();
            if c == '\n' {
                self.line += 1;
            }
        }
        char
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    fn error(&self, message: String, start: usize) -> LexError {
        LexError {
            message,
            line: self.line,
            src: NamedSource::new(self.name.clone(), self.input.to_string()),
            span: (start, self.position.saturating_sub(start)).into(),
        }
    }

    /// Skips whitespace, `#` and `//` line comments and `/* */` block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' || (c == '/' && self.peek_second() == Some('/')) {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if c == '/' && self.peek_second() == Some('*') {
                let start = self.position;
                let start_line = self.line;
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        Some(_) => {}
                        None => {
                            let mut err = self.error("unterminated block comment".into(), start);
                            err.line = start_line;
                            return Err(err);
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Reads a string body; the opening quote has been consumed.
    fn read_string(&mut self, start: usize) -> Result<String, LexError> {
        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated string".into(), start));
            };
            match c {
                '"' => {
                    self.advance();
                    return Ok(value);
                }
                '\n' => return Err(self.error("unterminated string".into(), start)),
                '\\' => {
                    let escape_start = self.position;
                    self.advance();
                    match self.advance() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('f') => value.push('\u{000C}'),
                        Some('x') => value.push(self.read_hex_escape(escape_start)?),
                        Some(other) => {
                            return Err(self.error(
                                format!("unknown escape sequence `\\{}`", other.escape_default()),
                                escape_start,
                            ))
                        }
                        None => return Err(self.error("unterminated string".into(), start)),
                    }
                }
                _ => {
                    self.advance();
                    value.push(c);
                }
            }
        }
    }

    fn read_hex_escape(&mut self, escape_start: usize) -> Result<char, LexError> {
        let mut code = 0u32;
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    self.advance();
                    code = code * 16 + d;
                }
                None => {
                    return Err(self.error(
                        "`\\x` must be followed by two hex digits".into(),
                        escape_start,
                    ))
                }
            }
        }
        // Two hex digits always form a valid scalar value.
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
    }

    fn read_identifier(&mut self, start: usize) -> TokenType {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let ident = &self.input[start..self.position];
        if ident.eq_ignore_ascii_case("true") {
            TokenType::Boolean(true)
        } else if ident.eq_ignore_ascii_case("false") {
            TokenType::Boolean(false)
        } else {
            TokenType::Identifier(ident.to_string())
        }
    }

    /// `@include "file"`; the `@` has been consumed.
    fn read_directive(&mut self, start: usize) -> Result<TokenType, LexError> {
        let word_start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        let word = &self.input[word_start..self.position];
        if word != "include" {
            return Err(self.error(format!("unknown directive `@{word}`"), start));
        }
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.advance();
        }
        if self.peek() != Some('"') {
            return Err(self.error("`@include` must be followed by a quoted path".into(), start));
        }
        self.advance();
        let path = self.read_string(start)?;
        Ok(TokenType::Include(path))
    }

    /// Reads an integer or float; the first character (digit, sign or dot) has been consumed.
    fn read_number(&mut self, start: usize) -> Result<TokenType, LexError> {
        let first = self.input[start..].chars().next().unwrap_or('0');
        let negative = first == '-';
        let digits_start = if first == '-' || first == '+' {
            start + 1
        } else {
            start
        };

        if self.input[digits_start..].starts_with("0x") || self.input[digits_start..].starts_with("0X")
        {
            if self.position == digits_start + 1 {
                // `0` consumed, `x` next
                self.advance();
            } else {
                // sign consumed, `0x` next
                self.advance();
                self.advance();
            }
            return self.read_hex(start, negative);
        }

        let mut is_float = first == '.';
        let mut has_exponent = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !is_float && !has_exponent {
                is_float = true;
                self.advance();
            } else if (c == 'e' || c == 'E') && !has_exponent {
                has_exponent = true;
                is_float = true;
                self.advance();
                if let Some('+' | '-') = self.peek() {
                    self.advance();
                }
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("exponent has no digits".into(), start));
                }
            } else {
                break;
            }
        }

        let input = self.input;
        let text = &input[start..self.position];
        if is_float {
            self.reject_trailing_ident(start)?;
            let value = text
                .parse::<f64>()
                .map_err(|_| self.error(format!("invalid float literal `{text}`"), start))?;
            if !value.is_finite() {
                return Err(self.error(format!("float literal `{text}` out of range"), start));
            }
            return Ok(TokenType::Float(value));
        }

        let text = text.to_string();
        self.skip_long_suffix();
        self.reject_trailing_ident(start)?;
        text.parse::<i64>()
            .map(|value| TokenType::Integer { value, hex: false })
            .map_err(|_| self.error(format!("integer literal `{text}` out of range"), start))
    }

    fn read_hex(&mut self, start: usize, negative: bool) -> Result<TokenType, LexError> {
        let hex_start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.advance();
        }
        let hex = self.input[hex_start..self.position].to_string();
        if hex.is_empty() {
            return Err(self.error("hex literal has no digits".into(), start));
        }
        self.skip_long_suffix();
        self.reject_trailing_ident(start)?;
        let bits = u64::from_str_radix(&hex, 16)
            .map_err(|_| self.error(format!("hex literal `0x{hex}` out of range"), start))?;
        // Hex literals spell the 64-bit two's complement pattern.
        let value = bits as i64;
        Ok(TokenType::Integer {
            value: if negative { value.wrapping_neg() } else { value },
            hex: true,
        })
    }

    fn skip_long_suffix(&mut self) {
        if let Some('L' | 'l') = self.peek() {
            self.advance();
            if let Some('L' | 'l') = self.peek() {
                self.advance();
            }
        }
    }

    fn reject_trailing_ident(&mut self, start: usize) -> Result<(), LexError> {
        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                self.advance();
            }
            let text = &self.input[start..self.position];
            return Err(self.error(format!("malformed number `{text}`"), start));
        }
        Ok(())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.ttype == TokenType::Eof => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(result)
    }
}
