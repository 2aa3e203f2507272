//! nginx-style configuration parser
//!
//! This crate tokenizes and parses configuration files made of
//! `;`-terminated directives and nested `{ }` blocks into a [`Config`] tree
//! that can be inspected and rendered back to canonical text.
//!
//! # Example
//!
//! ```rust
//! use ngxconf_parser::parse;
//!
//! let source = r#"
//!     http {
//!         server {
//!             listen 80;
//!             server_name "example.com";
//!         }
//!     }
//! "#;
//!
//! let config = parse(source).unwrap();
//! let listen = config.path(&["http", "server", "listen"]).unwrap();
//! assert_eq!(listen.args(), ["80"]);
//! ```

pub mod parser;

pub use parser::{
    parse, render_report, tokenize,
    Config, Statement, INDENT,
    LexError, Location, ParseError, Parser, Spanned, Token, Tokenizer,
};

use std::io::Read;
use std::path::Path;

/// Read all of `reader` and parse it
pub fn parse_reader(mut reader: impl Read) -> Result<Config, LoadError> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    Ok(parse(&source)?)
}

/// Load and parse a configuration file from a path
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config, LoadError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading configuration file");
    let source = std::fs::read_to_string(path)?;
    Ok(parse(&source)?)
}

/// Error from the reader/file entry points
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reader() {
        let config = parse_reader("foo bar;\nbaz { qux; }\n".as_bytes()).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.statements[1].block().unwrap().statements[0].tokens, ["qux"]);
    }

    #[test]
    fn test_parse_reader_rejects_invalid() {
        let err = parse_reader("foo bar".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(ParseError::UnterminatedStatement { .. })));
    }

    #[test]
    fn test_parse_reader_rejects_non_utf8() {
        let bytes: &[u8] = &[b'a', 0xff, b';'];
        assert!(matches!(parse_reader(bytes), Err(LoadError::Io(_))));
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/definitely/not/here/nginx.conf").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
