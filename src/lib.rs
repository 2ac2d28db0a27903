/// The scanner takes the source input, mapping it into a sequence of tokens.
pub mod scanner;

/// The parser takes a sequence of tokens, checking types and emitting
/// three-address instructions in a single pass.
pub mod parser;

/// Typing rules the parser consults for every operation.
pub mod type_checker;

/// The code generator appends instructions and pools their constants.
pub mod code_gen;

pub mod constant_pool;
pub mod ir;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;

    mod iter;
    pub use iter::*;
}
