//! Compiler for the behavior definition language.
//!
//! Turns textual behavior definitions into [`BehaviorNet`]s in two stages:
//! [`lexer`] splits the source into tokens, [`parser`] builds the net and
//! type checks constraint expressions.

pub mod lexer;
pub mod parser;

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::net::BehaviorNet;

/// Compiles a behavior definition from a string.
pub fn compile_str(source: &str) -> Result<BehaviorNet> {
    let tokens = lexer::tokenize(source)?;
    parser::Parser::new(tokens).parse()
}

/// Compiles a behavior definition read from a file.
pub fn compile_file(path: impl AsRef<Path>) -> Result<BehaviorNet> {
    compile_str(&fs::read_to_string(path)?)
}
