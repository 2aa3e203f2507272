//! Configuration parser
//!
//! Block parser that pulls tokens from the [`Tokenizer`] and builds a
//! [`Config`] tree. Each `{` pushes the config being built onto a stack of
//! open blocks and each `}` pops it; the first structural violation aborts
//! the parse.

use crate::parser::ast::{Config, Statement};
use crate::parser::lexer::{LexError, Location, Spanned, Token, Tokenizer};
use std::mem;
use thiserror::Error;

/// Parser error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Lexer error at position {}: {source}", location.start)]
    Lex {
        source: LexError,
        location: Location,
    },

    #[error("Unexpected ';' at position {}: statement has no directive", location.start)]
    StrayTerminator { location: Location },

    #[error("Unexpected '{{' at position {}: block has no directive name", location.start)]
    MissingBlockName { location: Location },

    #[error("Unexpected '}}' at position {}: no block is open", location.start)]
    UnmatchedBlockEnd { location: Location },

    #[error("Unexpected end of input: block opened at position {} is never closed", location.start)]
    UnclosedBlock { location: Location },

    #[error("Statement at position {} is missing its terminating ';'", location.start)]
    UnterminatedStatement { location: Location },

    #[error("Empty block at position {}: a block needs at least one statement", location.start)]
    EmptyBlock { location: Location },
}

impl ParseError {
    /// Source span of the offending token(s)
    pub fn location(&self) -> Location {
        match self {
            ParseError::Lex { location, .. }
            | ParseError::StrayTerminator { location }
            | ParseError::MissingBlockName { location }
            | ParseError::UnmatchedBlockEnd { location }
            | ParseError::UnclosedBlock { location }
            | ParseError::UnterminatedStatement { location }
            | ParseError::EmptyBlock { location } => *location,
        }
    }

    /// Short description attached to the highlighted span in reports
    pub fn label(&self) -> &'static str {
        match self {
            ParseError::Lex { source, .. } => match source {
                LexError::UnexpectedCharacter => "unexpected character",
                LexError::UnterminatedString => "string starts here",
                LexError::InvalidEscape(_) => "invalid escape",
            },
            ParseError::StrayTerminator { .. } => "nothing to terminate",
            ParseError::MissingBlockName { .. } => "block without a name",
            ParseError::UnmatchedBlockEnd { .. } => "unmatched closing brace",
            ParseError::UnclosedBlock { .. } => "block opened here",
            ParseError::UnterminatedStatement { .. } => "statement not terminated",
            ParseError::EmptyBlock { .. } => "empty block",
        }
    }

    pub fn help(&self) -> Option<&'static str> {
        match self {
            ParseError::Lex { source: LexError::UnterminatedString, .. } => {
                Some("add a closing '\"'")
            }
            ParseError::Lex { source: LexError::InvalidEscape(_), .. } => {
                Some("supported escapes are \\\" \\\\ \\n \\t \\r")
            }
            ParseError::UnclosedBlock { .. } => Some("add a closing '}'"),
            ParseError::UnterminatedStatement { .. } => Some("end the statement with ';'"),
            ParseError::EmptyBlock { .. } => {
                Some("add a statement to the block or end the directive with ';'")
            }
            _ => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A block whose `{` has been read but whose `}` has not
struct OpenBlock {
    /// Statements of the enclosing config parsed so far
    parent: Config,
    /// Directive name and arguments preceding the `{`
    tokens: Vec<String>,
    /// Span of those tokens
    start: Location,
    /// Span of the `{`
    brace: Location,
}

/// Parser state
pub struct Parser<'src> {
    tokens: Tokenizer<'src>,
}

impl<'src> Parser<'src> {
    /// Create a new parser over source text
    pub fn new(source: &'src str) -> Self {
        Self::from_tokenizer(Tokenizer::new(source))
    }

    pub fn from_tokenizer(tokens: Tokenizer<'src>) -> Self {
        Self { tokens }
    }

    /// Parse the whole document.
    ///
    /// Open blocks are kept on an explicit stack, so nesting depth is
    /// bounded by memory rather than by the native call stack.
    pub fn parse(mut self) -> ParseResult<Config> {
        let mut open: Vec<OpenBlock> = Vec::new();
        let mut config = Config::new();
        let mut pending: Vec<String> = Vec::new();
        let mut pending_span: Option<Location> = None;

        loop {
            let Spanned { value, span } = self.tokens.next_token();
            match value {
                Token::Word(text) | Token::QuotedString(text) => {
                    pending_span = Some(pending_span.map_or(span, |s| s.to(span)));
                    pending.push(text);
                }
                Token::Comment(_) => {}
                Token::StatementEnd => {
                    let Some(start) = pending_span.take() else {
                        return Err(ParseError::StrayTerminator { location: span });
                    };
                    let statement = Statement::from_tokens(mem::take(&mut pending));
                    config.push(statement.with_span(start.to(span)));
                }
                Token::BlockStart => {
                    let Some(start) = pending_span.take() else {
                        return Err(ParseError::MissingBlockName { location: span });
                    };
                    tracing::trace!(depth = open.len() + 1, directive = pending[0].as_str(), "entering block");
                    open.push(OpenBlock {
                        parent: mem::take(&mut config),
                        tokens: mem::take(&mut pending),
                        start,
                        brace: span,
                    });
                }
                Token::BlockEnd => {
                    if let Some(location) = pending_span {
                        return Err(ParseError::UnterminatedStatement { location });
                    }
                    let Some(block) = open.pop() else {
                        return Err(ParseError::UnmatchedBlockEnd { location: span });
                    };
                    let body = mem::replace(&mut config, block.parent);
                    tracing::trace!(depth = open.len() + 1, statements = body.len(), "leaving block");

                    if body.is_empty() {
                        return Err(ParseError::EmptyBlock {
                            location: block.brace.to(span),
                        });
                    }
                    let statement = Statement::from_tokens(block.tokens).with_block(body);
                    config.push(statement.with_span(block.start.to(span)));
                }
                Token::EndOfInput => {
                    // The innermost unclosed block is reported
                    if let Some(block) = open.last() {
                        return Err(ParseError::UnclosedBlock { location: block.brace });
                    }
                    if let Some(location) = pending_span {
                        return Err(ParseError::UnterminatedStatement { location });
                    }
                    return Ok(config);
                }
                Token::Error(source) => {
                    return Err(ParseError::Lex {
                        source,
                        location: span,
                    });
                }
            }
        }
    }
}

/// Parse a configuration source string into a [`Config`] tree
pub fn parse(source: &str) -> ParseResult<Config> {
    tracing::debug!(bytes = source.len(), "parsing configuration");

    match Parser::new(source).parse() {
        Ok(config) => {
            tracing::debug!(statements = config.len(), "configuration parsed");
            Ok(config)
        }
        Err(e) => {
            let (line, column) = e.location().line_col(source);
            tracing::debug!(line, column, error = %e, "configuration rejected");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let config = parse("").unwrap();
        assert!(config.is_empty());

        let config = parse("  # nothing but a comment\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_simple_statement() {
        let config = parse("foo bar;").unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.statements[0].tokens[0], "foo");
        assert_eq!(config.statements[0].tokens, ["foo", "bar"]);
        assert!(config.statements[0].block.is_none());
        assert_eq!(config.statements[0].span, Location::new(0, 8));
    }

    #[test]
    fn test_missing_terminator() {
        assert!(matches!(
            parse("foo bar"),
            Err(ParseError::UnterminatedStatement { location }) if location == Location::new(0, 7)
        ));
    }

    #[test]
    fn test_nested() {
        let config = parse("baz { foo bar; }").unwrap();
        assert_eq!(config.len(), 1);
        let baz = &config.statements[0];
        assert_eq!(baz.tokens, ["baz"]);
        let block = baz.block().unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(block.statements[0].tokens, ["foo", "bar"]);
        assert_eq!(baz.span, Location::new(0, 16));
    }

    #[test]
    fn test_double_nested() {
        let config = parse("qux { baz { foo bar; } }").unwrap();
        let qux = &config.statements[0];
        let baz = &qux.block().unwrap().statements[0];
        assert_eq!(baz.name(), Some("baz"));
        assert_eq!(baz.block().unwrap().statements[0].tokens, ["foo", "bar"]);
    }

    #[test]
    fn test_missing_end_brace() {
        let err = parse("qux { baz { foo bar; } ").unwrap_err();
        assert_eq!(err, ParseError::UnclosedBlock { location: Location::new(4, 5) });
    }

    #[test]
    fn test_extra_end_brace() {
        let err = parse("qux { baz { foo bar; } } }").unwrap_err();
        assert_eq!(err, ParseError::UnmatchedBlockEnd { location: Location::new(25, 26) });
    }

    #[test]
    fn test_empty_block() {
        let err = parse("foo {}").unwrap_err();
        assert_eq!(err, ParseError::EmptyBlock { location: Location::new(4, 6) });

        assert!(matches!(
            parse("foo { # only a comment\n }"),
            Err(ParseError::EmptyBlock { .. })
        ));
    }

    #[test]
    fn test_braces_must_nest() {
        assert!(matches!(
            parse("} foo { bar; "),
            Err(ParseError::UnmatchedBlockEnd { .. })
        ));
    }

    #[test]
    fn test_stray_terminator() {
        assert!(matches!(parse(";"), Err(ParseError::StrayTerminator { .. })));
        assert!(matches!(
            parse("foo; ;"),
            Err(ParseError::StrayTerminator { location }) if location == Location::new(5, 6)
        ));
    }

    #[test]
    fn test_block_without_name() {
        assert!(matches!(
            parse("{ foo; }"),
            Err(ParseError::MissingBlockName { .. })
        ));
    }

    #[test]
    fn test_unterminated_statement_before_close() {
        assert!(matches!(
            parse("server { listen 80 }"),
            Err(ParseError::UnterminatedStatement { location }) if location == Location::new(9, 18)
        ));
    }

    #[test]
    fn test_semicolon_after_block_is_stray() {
        assert!(matches!(
            parse("events { worker_connections 1024; };"),
            Err(ParseError::StrayTerminator { .. })
        ));
    }

    #[test]
    fn test_lex_errors_propagate() {
        assert!(matches!(
            parse("root \"/var/www;"),
            Err(ParseError::Lex { source: LexError::UnterminatedString, .. })
        ));
        assert!(matches!(
            parse("server { root \"a\\zb\"; }"),
            Err(ParseError::Lex { source: LexError::InvalidEscape('z'), .. })
        ));
    }

    #[test]
    fn test_first_error_wins() {
        // The unterminated statement comes before the empty block.
        assert!(matches!(
            parse("a { b } c {}"),
            Err(ParseError::UnterminatedStatement { .. })
        ));
    }

    #[test]
    fn test_quoted_strings_are_single_tokens() {
        let config = parse(r#"log_format main "$remote_addr - [$time_local]" 'x';"#).unwrap();
        assert_eq!(
            config.statements[0].tokens,
            ["log_format", "main", "$remote_addr - [$time_local]", "'x'"]
        );
    }

    #[test]
    fn test_comments_are_ignored() {
        let config = parse(
            "# leading\nhttp { # after brace\n  sendfile on; # trailing\n}\n# end",
        )
        .unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.statements[0].block().unwrap().len(), 1);
    }

    #[test]
    fn test_block_with_arguments() {
        let config = parse("location ~* \\.(gif|jpg)$ { expires 30d; }").unwrap();
        let location = &config.statements[0];
        assert_eq!(location.name(), Some("location"));
        assert_eq!(location.args(), ["~*", "\\.(gif|jpg)$"]);
        assert_eq!(location.block().unwrap().statements[0].tokens, ["expires", "30d"]);
    }

    #[test]
    fn test_siblings_keep_order() {
        let config = parse("a 1; b { c; } d 2;").unwrap();
        let names: Vec<_> = config.iter().filter_map(Statement::name).collect();
        assert_eq!(names, ["a", "b", "d"]);
    }

    #[test]
    fn test_deep_nesting() {
        for depth in [1usize, 10, 100, 500] {
            let source = format!("{}leaf;{}", "b {".repeat(depth), "}".repeat(depth));
            let config = parse(&source).unwrap();

            let mut current = &config;
            for _ in 0..depth {
                assert_eq!(current.len(), 1);
                current = current.statements[0].block().unwrap();
            }
            assert_eq!(current.statements[0].tokens, ["leaf"]);
        }
    }

    #[test]
    fn test_deep_nesting_missing_one_brace() {
        let source = format!("{}leaf;{}", "b {".repeat(50), "}".repeat(49));
        assert!(matches!(parse(&source), Err(ParseError::UnclosedBlock { .. })));
    }
}
