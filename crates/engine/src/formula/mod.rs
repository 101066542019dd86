// Formula construction and evaluation

pub mod eval;
pub mod parse;
pub mod token;

pub use eval::EvalError;
pub use parse::Formula;
pub use token::{is_valid_variable, Op, Token, Tokenizer};
