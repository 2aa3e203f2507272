//! Configuration tree
//!
//! - [`Statement`]: directive name + arguments, optionally owning a block
//! - [`Config`]: ordered list of statements (a document or a block body)

use crate::parser::lexer::Location;
use serde::Serialize;
use std::fmt;

/// Indentation emitted per nesting level when rendering
pub const INDENT: &str = "  ";

/// An ordered list of statements: the whole document or one block's body.
///
/// Rendering, equality and drop walk the tree with an explicit work list,
/// so arbitrarily deep trees do not exhaust the call stack.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub statements: Vec<Statement>,
}

/// One directive: its tokens and, when terminated by `{ ... }`, the block.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statement {
    /// Directive name followed by its arguments
    pub tokens: Vec<String>,

    /// Nested block, present iff the statement was closed by a block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<Config>>,

    /// Where the statement was parsed from; default for hand-built statements
    #[serde(skip)]
    pub span: Location,
}

// Structural equality: source positions are ignored.
impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens && self.block == other.block
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        let mut work = vec![(self, other)];
        while let Some((a, b)) = work.pop() {
            if a.statements.len() != b.statements.len() {
                return false;
            }
            for (x, y) in a.statements.iter().zip(&b.statements) {
                if x.tokens != y.tokens {
                    return false;
                }
                match (x.block(), y.block()) {
                    (None, None) => {}
                    (Some(xb), Some(yb)) => work.push((xb, yb)),
                    _ => return false,
                }
            }
        }
        true
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        // Detach child blocks so each Config is dropped with a flat body.
        let mut detached: Vec<Box<Config>> = self
            .statements
            .iter_mut()
            .filter_map(|s| s.block.take())
            .collect();
        while let Some(mut config) = detached.pop() {
            detached.extend(config.statements.iter_mut().filter_map(|s| s.block.take()));
        }
    }
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn push_token(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    pub fn with_block(mut self, block: Config) -> Self {
        self.block = Some(Box::new(block));
        self
    }

    pub fn with_span(mut self, span: Location) -> Self {
        self.span = span;
        self
    }

    /// Directive name (the first token)
    pub fn name(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Arguments following the directive name
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    pub fn block(&self) -> Option<&Config> {
        self.block.as_deref()
    }

    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }

    /// Render this statement at the given nesting depth.
    ///
    /// Leaf statements end in `;\n`; block statements open with ` {\n`,
    /// render their children one level deeper and close with `}\n`.
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        render_statements(&mut out, std::slice::from_ref(self), depth);
        out
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Direct children whose directive name is `name`
    pub fn find<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Statement> {
        self.statements
            .iter()
            .filter(move |s| s.name() == Some(name))
    }

    /// Follow a chain of directive names through nested blocks.
    ///
    /// Every name but the last must match a block statement; the first
    /// statement matching the last name is returned.
    pub fn path(&self, names: &[&str]) -> Option<&Statement> {
        let (last, parents) = names.split_last()?;
        let mut current = self;
        for name in parents {
            current = current.find(name).find_map(Statement::block)?;
        }
        current.find(last).next()
    }

    /// Render every statement at the given nesting depth.
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        render_statements(&mut out, &self.statements, depth);
        out
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}

/// Pending rendering work
enum Step<'a> {
    Statement(&'a Statement, usize),
    Close(usize),
}

fn render_statements(out: &mut String, statements: &[Statement], depth: usize) {
    let mut work: Vec<Step<'_>> = statements
        .iter()
        .rev()
        .map(|s| Step::Statement(s, depth))
        .collect();

    while let Some(step) = work.pop() {
        match step {
            Step::Close(depth) => {
                push_indent(out, depth);
                out.push_str("}\n");
            }
            Step::Statement(statement, depth) => {
                push_indent(out, depth);
                for (i, token) in statement.tokens.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    push_token(out, token);
                }

                match statement.block() {
                    None => out.push_str(";\n"),
                    Some(block) => {
                        if !statement.tokens.is_empty() {
                            out.push(' ');
                        }
                        out.push_str("{\n");
                        work.push(Step::Close(depth));
                        work.extend(
                            block
                                .statements
                                .iter()
                                .rev()
                                .map(|s| Step::Statement(s, depth + 1)),
                        );
                    }
                }
            }
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Tokens that would not lex back as a single word are written quoted.
fn needs_quotes(token: &str) -> bool {
    token.is_empty()
        || token.starts_with('"')
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | ';' | '#'))
}

fn push_token(out: &mut String, token: &str) {
    if !needs_quotes(token) {
        out.push_str(token);
        return;
    }

    out.push('"');
    for c in token.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}
