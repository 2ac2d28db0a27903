use std::iter::FusedIterator;

use crate::token::Token;

/// Adaptors for token streams that don't end on their own, such as
/// [`crate::scanner::Scanner`], which keeps producing `Eof` once the source is
/// exhausted.
pub trait TokenStreamExt: Iterator<Item = Token> + Sized {
    /// Yields tokens up to and including the first `Eof`, then stops. A stream
    /// that runs dry without an `Eof` simply ends there.
    fn until_eof(self) -> UntilEof<Self> {
        UntilEof {
            tokens: self,
            seen_eof: false,
        }
    }
}

impl<I> TokenStreamExt for I where I: Iterator<Item = Token> {}

pub struct UntilEof<I> {
    tokens: I,
    seen_eof: bool,
}

impl<I> Iterator for UntilEof<I>
where
    I: Iterator<Item = Token>,
{
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.seen_eof {
            return None;
        }
        let token = self.tokens.next()?;
        self.seen_eof = token.is_eof();
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.seen_eof {
            (0, Some(0))
        } else {
            (0, self.tokens.size_hint().1)
        }
    }
}

impl<I> FusedIterator for UntilEof<I> where I: Iterator<Item = Token> {}
