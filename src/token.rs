use std::{fmt, ops::Range};

use crate::types::PrimitiveType;

#[derive(Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
    pub line: u32,
    pub col: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, line: u32, col: u32) -> Token {
        Token {
            kind,
            lo: span.lo,
            len: span.len,
            line,
            col,
        }
    }

    /// A token without a meaningful position, for hand-built token streams.
    pub fn dummy(kind: TokenKind) -> Token {
        Token::new(kind, Span::new_of_length(0, 0), 0, 0)
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn site(&self) -> Site {
        Site {
            span: self.span(),
            line: self.line,
            col: self.col,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({:?}, {}, {}:{})",
            self.kind,
            self.span(),
            self.line,
            self.col
        )
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap_or(u32::MAX))
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(self) -> usize {
        self.lo + self.len as usize
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

/// Where something originated in the source: byte span plus line and column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Site {
    pub span: Span,
    pub line: u32,
    pub col: u32,
}

impl Site {
    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned {
            span: self.span,
            line: self.line,
            inner,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub line: u32,
    pub inner: T,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    /// Opens or closes a string literal.
    Quote,

    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    /// `${`, which opens an interpolated expression inside a string.
    DollarBrace,

    Identifier(Box<str>),
    /// A run of literal characters inside a string, with escapes decoded.
    Text(Box<str>),
    Int(i32),
    Real(f64),
    Char(char),

    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    /// A reserved type name.
    Primitive {
        ty: PrimitiveType,
        width: u8,
    },

    /// Malformed input. Holds the diagnostic message.
    Error(Box<str>),
    Eof,
}

impl TokenKind {
    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::Error(_))
    }

    pub fn primitive(ty: PrimitiveType) -> TokenKind {
        TokenKind::Primitive {
            ty,
            width: ty.width(),
        }
    }

    /// Whether this token can only start a statement (or declaration).
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::LeftBrace
                | TokenKind::Primitive { .. }
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let punct = match self {
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Comma => ",",
            Dot => ".",
            Minus => "-",
            Plus => "+",
            Semicolon => ";",
            Slash => "/",
            Star => "*",
            Quote => "\"",
            Bang => "!",
            BangEqual => "!=",
            Equal => "=",
            EqualEqual => "==",
            Greater => ">",
            GreaterEqual => ">=",
            Less => "<",
            LessEqual => "<=",
            DollarBrace => "${",
            And => "and",
            Class => "class",
            Else => "else",
            False => "false",
            For => "for",
            Fun => "func",
            If => "if",
            Nil => "nil",
            Or => "or",
            Print => "print",
            Return => "return",
            Super => "super",
            This => "this",
            True => "true",
            Var => "var",
            While => "while",
            Identifier(name) => return write!(f, "identifier '{name}'"),
            Text(text) => return write!(f, "text {text:?}"),
            Int(value) => return write!(f, "integer {value}"),
            Real(value) => return write!(f, "real {value:?}"),
            Char(value) => return write!(f, "character {value:?}"),
            Primitive { ty, .. } => return write!(f, "type '{ty}'"),
            Error(message) => return write!(f, "error ({message})"),
            Eof => return f.write_str("end of input"),
        };
        write!(f, "'{punct}'")
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "and" => TokenKind::And,
    "class" => TokenKind::Class,
    "else" => TokenKind::Else,
    "false" => TokenKind::False,
    "for" => TokenKind::For,
    "func" => TokenKind::Fun,
    "if" => TokenKind::If,
    "nil" => TokenKind::Nil,
    "or" => TokenKind::Or,
    "print" => TokenKind::Print,
    "return" => TokenKind::Return,
    "super" => TokenKind::Super,
    "this" => TokenKind::This,
    "true" => TokenKind::True,
    "var" => TokenKind::Var,
    "while" => TokenKind::While,
};

pub static TYPE_NAMES: phf::Map<&'static str, PrimitiveType> = phf::phf_map! {
    "int" => PrimitiveType::Int,
    "real" => PrimitiveType::Real,
    "char" => PrimitiveType::Char,
    "bool" => PrimitiveType::Bool,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_cover_every_primitive() {
        for ty in PrimitiveType::ALL {
            assert_eq!(TYPE_NAMES.get(ty.name()), Some(ty));
        }
    }

    #[test]
    fn display_for_diagnostics() {
        assert_eq!(TokenKind::Semicolon.to_string(), "';'");
        assert_eq!(TokenKind::Fun.to_string(), "'func'");
        assert_eq!(TokenKind::Identifier("abc".into()).to_string(), "identifier 'abc'");
        assert_eq!(TokenKind::Real(7.0).to_string(), "real 7.0");
        assert_eq!(TokenKind::primitive(PrimitiveType::Real).to_string(), "type 'real'");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn structural_equality_compares_payloads() {
        let int = |v| Token::dummy(TokenKind::Int(v));
        assert_eq!(int(12), int(12));
        assert_ne!(int(12), int(13));
        assert_ne!(
            Token::dummy(TokenKind::primitive(PrimitiveType::Int)),
            Token::dummy(TokenKind::primitive(PrimitiveType::Real)),
        );
        assert_ne!(
            Token::dummy(TokenKind::Eof),
            Token::new(TokenKind::Eof, Span::new_of_length(3, 0), 1, 4),
        );
    }
}
