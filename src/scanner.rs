use tracing::trace;

use crate::{
    token::{Span, Token, TokenKind, KEYWORDS, TYPE_NAMES},
    util::TokenStreamExt,
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Scans the whole source, returning every token up to (and including) the
/// first end-of-input token.
pub fn scan_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY.min(src.len() + 1));
    tokens.extend(Scanner::new(src).until_eof());
    tokens
}

/// What the scanner is looking at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    /// Code: whitespace and comments are insignificant.
    Normal,
    /// The inside of a string literal, where every character counts.
    String,
}

/// An incremental scanner: each call to [`Scanner::scan_next_token`] produces
/// exactly one token. Once the input is exhausted it keeps producing
/// [`TokenKind::Eof`].
pub struct Scanner<'src> {
    src: &'src str,
    cursor: usize,
    current_lo: usize,
    line: u32,
    line_start: usize,
    /// Line and column where the current token starts.
    token_line: u32,
    token_col: u32,
    mode: Mode,
    /// How many string literals are currently open. Interpolated expressions
    /// may contain strings of their own, so this can go beyond one.
    string_depth: u32,
    text: String,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Scanner<'src> {
        Scanner {
            src,
            cursor: 0,
            current_lo: 0,
            line: 1,
            line_start: 0,
            token_line: 1,
            token_col: 1,
            mode: Mode::Normal,
            string_depth: 0,
            text: String::new(),
        }
    }

    /// Replaces the source, resetting every cursor and mode.
    pub fn load_source(&mut self, src: &'src str) {
        *self = Scanner {
            text: std::mem::take(&mut self.text),
            ..Scanner::new(src)
        };
        self.text.clear();
    }

    /// Scans the next token.
    pub fn scan_next_token(&mut self) -> Token {
        if self.mode == Mode::Normal {
            if let Some(error) = self.skip_whitespace() {
                return self.produce(error);
            }
        }
        self.mark();

        if self.is_at_end() {
            if self.string_depth != 0 {
                self.string_depth = 0;
                self.mode = Mode::Normal;
                return self.produce(error("Unterminated string."));
            }
            return self.produce(TokenKind::Eof);
        }

        let kind = match self.mode {
            Mode::String => self.string_segment(),
            Mode::Normal => self.scan_token_kind(),
        };
        self.produce(kind)
    }

    /// Tries to scan the current character (in normal mode).
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.advance() {
            '(' => LeftParen,
            ')' => RightParen,
            '[' => LeftBracket,
            ']' => RightBracket,
            '{' => LeftBrace,
            '}' => {
                // Closes an interpolated expression: back to the string.
                if self.string_depth > 0 {
                    self.mode = Mode::String;
                }
                RightBrace
            }
            ';' => Semicolon,
            ',' => Comma,
            '.' => Dot,
            '-' => Minus,
            '+' => Plus,
            '/' => Slash,
            '*' => Star,
            '!' => self.if_next('=', BangEqual, Bang),
            '=' => self.if_next('=', EqualEqual, Equal),
            '<' => self.if_next('=', LessEqual, Less),
            '>' => self.if_next('=', GreaterEqual, Greater),
            '"' => {
                self.string_depth += 1;
                self.mode = Mode::String;
                Quote
            }
            '\'' => self.char_literal(),
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            _ => error("Unexpected character."),
        }
    }

    /// Skips whitespace and comments. Block comments nest.
    ///
    /// Returns an error token kind if a block comment is never closed.
    fn skip_whitespace(&mut self) -> Option<TokenKind> {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.new_line();
                }
                '/' if self.peek_next() == '/' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == '*' => {
                    self.mark();
                    self.advance();
                    self.advance();
                    let mut depth = 1_u32;
                    while depth > 0 {
                        if self.is_at_end() {
                            return Some(error("Unterminated comment."));
                        }
                        match (self.advance(), self.peek()) {
                            ('/', '*') => {
                                self.advance();
                                depth += 1;
                            }
                            ('*', '/') => {
                                self.advance();
                                depth -= 1;
                            }
                            ('\n', _) => self.new_line(),
                            _ => (),
                        }
                    }
                }
                _ => return None,
            }
        }
    }

    /// Scans string contents up to the next delimiter.
    ///
    /// Literal characters are accumulated and flushed as a single
    /// [`TokenKind::Text`] token as soon as a delimiter (closing quote, `${`)
    /// or the end of input is reached. The delimiter itself is produced by the
    /// following call.
    fn string_segment(&mut self) -> TokenKind {
        self.text.clear();
        while !self.is_at_end() {
            match self.peek() {
                '"' => {
                    if !self.text.is_empty() {
                        break;
                    }
                    self.advance();
                    self.string_depth -= 1;
                    self.mode = Mode::Normal;
                    return TokenKind::Quote;
                }
                '$' if self.peek_next() == '{' => {
                    if !self.text.is_empty() {
                        break;
                    }
                    self.advance();
                    self.advance();
                    self.mode = Mode::Normal;
                    return TokenKind::DollarBrace;
                }
                '\\' => {
                    self.advance();
                    if self.is_at_end() {
                        break;
                    }
                    let escaped = self.escape();
                    self.text.push(escaped);
                }
                '\n' => {
                    self.advance();
                    self.new_line();
                    self.text.push('\n');
                }
                c => {
                    self.advance();
                    self.text.push(c);
                }
            }
        }
        TokenKind::Text(self.text.as_str().into())
    }

    /// Decodes the character following a backslash.
    fn escape(&mut self) -> char {
        match self.advance() {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\x08',
            'f' => '\x0c',
            '0' => '\0',
            // Quotes, backslashes, `$` and anything else stand for themselves.
            other => other,
        }
    }

    fn char_literal(&mut self) -> TokenKind {
        let value = match self.advance() {
            '\\' if !self.is_at_end() => self.escape(),
            '\'' => return error("Empty character literal."),
            '\n' => {
                self.new_line();
                return error("Unterminated character literal.");
            }
            c if !self.is_at_end() || c != '\0' => c,
            _ => return error("Unterminated character literal."),
        };
        if self.peek() != '\'' {
            return error("Unterminated character literal.");
        }
        self.advance();
        TokenKind::Char(value)
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        while self.peek().is_ascii_alphabetic() {
            self.advance();
        }
        let substr = self.substr();
        if let Some(keyword) = KEYWORDS.get(substr) {
            return keyword.clone();
        }
        if let Some(&ty) = TYPE_NAMES.get(substr) {
            return TokenKind::primitive(ty);
        }
        TokenKind::Identifier(substr.into())
    }

    fn number(&mut self) -> TokenKind {
        let first = self.src.as_bytes()[self.current_lo];
        let mut value = Some(i32::from(first - b'0'));
        while self.peek().is_ascii_digit() {
            let digit = digit_value(self.advance());
            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add_unsigned(digit));
        }

        if self.peek() != '.' {
            return match value {
                Some(value) => TokenKind::Int(value),
                None => error("Integer literal too large."),
            };
        }
        self.advance();
        if !self.peek().is_ascii_digit() {
            return error("Expected a digit after decimal in literal.");
        }

        // The integral part is re-read so that literals too large for an
        // integer are still valid reals.
        let integral = self.substr().trim_end_matches('.');
        let mut real = integral
            .bytes()
            .fold(0.0_f64, |acc, b| acc * 10.0 + f64::from(b - b'0'));
        let mut weight = 10.0_f64;
        while self.peek().is_ascii_digit() {
            let digit = digit_value(self.advance());
            real += f64::from(digit) / weight;
            weight *= 10.0;
        }
        TokenKind::Real(real)
    }
}

impl<'src> Scanner<'src> {
    fn is_at_end(&self) -> bool {
        self.cursor >= self.src.len()
    }

    /// Returns the next char and advances the cursor. Yields `'\0'` (without
    /// advancing) once the input is exhausted.
    fn advance(&mut self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        let c = self.peek();
        self.cursor += c.len_utf8();
        c
    }

    /// Marks the start of a new token at the cursor.
    fn mark(&mut self) {
        self.current_lo = self.cursor;
        self.token_line = self.line;
        let col = self.cursor - self.line_start + 1;
        self.token_col = u32::try_from(col).unwrap_or(u32::MAX);
    }

    /// Advances (consuming `expected`) and returns `then` if the next char is
    /// `expected`; otherwise returns `otherwise`.
    fn if_next<T>(&mut self, expected: char, then: T, otherwise: T) -> T {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            then
        } else {
            otherwise
        }
    }

    /// Returns the next char without advancing the cursor.
    fn peek(&self) -> char {
        self.src[self.cursor.min(self.src.len())..]
            .chars()
            .next()
            .unwrap_or('\0')
    }

    /// Returns the char after the next one without advancing the cursor.
    fn peek_next(&self) -> char {
        let mut chars = self.src[self.cursor.min(self.src.len())..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.line_start = self.cursor;
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &'src str {
        let span = self.span();
        &self.src[span.lo..span.hi()]
    }

    /// Produces a token using the marked bounds.
    fn produce(&self, kind: TokenKind) -> Token {
        let token = Token::new(kind, self.span(), self.token_line, self.token_col);
        trace!(kind = ?token.kind, line = token.line, col = token.col, "scanned token");
        token
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        Some(self.scan_next_token())
    }
}

fn error(message: &str) -> TokenKind {
    TokenKind::Error(message.into())
}

fn digit_value(c: char) -> u32 {
    c.to_digit(10).unwrap_or(0)
}
