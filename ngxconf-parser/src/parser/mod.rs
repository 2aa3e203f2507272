//! Parser module for nginx-style configuration
//!
//! This module provides the tokenizer, tree types, and block parser.

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;

pub use ast::{Config, Statement, INDENT};
pub use diagnostic::render_report;
pub use lexer::{tokenize, LexError, Location, Spanned, Token, Tokenizer};
pub use parser::{parse, ParseError, ParseResult, Parser};
