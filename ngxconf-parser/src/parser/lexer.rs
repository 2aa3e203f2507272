//! Tokenizer for nginx-style configuration files
//!
//! Key features:
//! - Whitespace separates tokens and is otherwise insignificant
//! - `{` / `}` open and close blocks, `;` ends a statement
//! - "..." for quoted strings, with `\"` `\\` `\n` `\t` `\r` escapes
//! - # for comments (until end of line)
//!
//! Tokens are produced lazily, one per call, by [`Tokenizer`].

use logos::{Logos, Span};
use std::fmt;
use std::ops::Range;

/// Source location for error reporting (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering `self` through the end of `other`
    pub fn to(self, other: Location) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// 1-based line and column of the start of this location.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut offset = self.start.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

/// A token with its location in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Location,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: impl Into<Location>) -> Self {
        Self {
            value,
            span: span.into(),
        }
    }
}

/// Lexer error
#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
pub enum LexError {
    /// Required by logos as the default error. The lexemes together match
    /// every character, so the tokenizer never produces it.
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
}

/// Raw lexemes recognised by logos. Comments, end of input and errors are
/// folded into [`Token`] by the [`Tokenizer`].
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"\s+")]
enum Lexeme {
    #[regex(r"#[^\n]*", |lex| lex.slice()[1..].trim_end().to_string())]
    Comment(String),

    // ============================================================
    // Structural
    // ============================================================
    #[token("{")]
    BlockStart,

    #[token("}")]
    BlockEnd,

    #[token(";")]
    StatementEnd,

    // ============================================================
    // Values
    // ============================================================
    #[token("\"", lex_quoted)]
    QuotedString(String),

    /// Anything up to whitespace, a brace, `;` or `#`. A `"` is only
    /// special at the start of a token.
    #[regex(r#"[^\s{};#"][^\s{};#]*"#, |lex| lex.slice().to_string())]
    Word(String),
}

/// Scan the body of a quoted string after the opening `"`, resolving escapes.
fn lex_quoted(lex: &mut logos::Lexer<'_, Lexeme>) -> Result<String, LexError> {
    let rest = lex.remainder();
    let mut text = String::new();
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                lex.bump(i + 1);
                return Ok(text);
            }
            '\\' => match chars.next() {
                Some((_, '"')) => text.push('"'),
                Some((_, '\\')) => text.push('\\'),
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, 'r')) => text.push('\r'),
                Some((j, other)) => {
                    lex.bump(j + other.len_utf8());
                    return Err(LexError::InvalidEscape(other));
                }
                None => break,
            },
            c => text.push(c),
        }
    }

    lex.bump(rest.len());
    Err(LexError::UnterminatedString)
}

/// Token types produced by the [`Tokenizer`]
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted word (directive names, paths, numbers, ...)
    Word(String),
    /// Quoted string with escapes resolved
    QuotedString(String),
    BlockStart,
    BlockEnd,
    StatementEnd,
    /// Comment text without the leading `#`
    Comment(String),
    EndOfInput,
    Error(LexError),
}

impl Token {
    /// The text carried by a word or quoted string
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::QuotedString(s) => Some(s),
            _ => None,
        }
    }

    /// `EndOfInput` and `Error` end the token sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Token::EndOfInput | Token::Error(_))
    }
}

impl From<Lexeme> for Token {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Comment(s) => Token::Comment(s),
            Lexeme::BlockStart => Token::BlockStart,
            Lexeme::BlockEnd => Token::BlockEnd,
            Lexeme::StatementEnd => Token::StatementEnd,
            Lexeme::QuotedString(s) => Token::QuotedString(s),
            Lexeme::Word(s) => Token::Word(s),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(s) => write!(f, "{}", s),
            Token::QuotedString(s) => write!(f, "\"{}\"", s),
            Token::BlockStart => write!(f, "{{"),
            Token::BlockEnd => write!(f, "}}"),
            Token::StatementEnd => write!(f, ";"),
            Token::Comment(s) => write!(f, "#{}", s),
            Token::EndOfInput => write!(f, "end of input"),
            Token::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Lazy, non-restartable token source over a configuration string.
///
/// Every call to [`Tokenizer::next_token`] yields exactly one token. The
/// sequence ends with a single [`Token::EndOfInput`] or [`Token::Error`];
/// once reached, further calls keep returning that terminal token and the
/// [`Iterator`] implementation yields `None`.
pub struct Tokenizer<'src> {
    lexer: logos::Lexer<'src, Lexeme>,
    terminal: Option<Spanned<Token>>,
    exhausted: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexeme::lexer(source),
            terminal: None,
            exhausted: false,
        }
    }

    pub fn next_token(&mut self) -> Spanned<Token> {
        if let Some(terminal) = &self.terminal {
            return terminal.clone();
        }

        let token = match self.lexer.next() {
            Some(Ok(lexeme)) => Spanned::new(Token::from(lexeme), self.lexer.span()),
            Some(Err(err)) => Spanned::new(Token::Error(err), self.lexer.span()),
            None => {
                let end = self.lexer.source().len();
                Spanned::new(Token::EndOfInput, end..end)
            }
        };

        if token.value.is_terminal() {
            self.terminal = Some(token.clone());
        }
        token
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Spanned<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let token = self.next_token();
        self.exhausted = token.value.is_terminal();
        Some(token)
    }
}

/// Tokenize a whole source string, dropping comments and the trailing
/// end-of-input marker.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Spanned<LexError>> {
    let mut tokens = Vec::new();

    for token in Tokenizer::new(source) {
        match token.value {
            Token::Comment(_) | Token::EndOfInput => continue,
            Token::Error(err) => return Err(Spanned::new(err, token.span)),
            _ => tokens.push(token),
        }
    }

    Ok(tokens)
}
