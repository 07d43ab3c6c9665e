//! Block and statement scanner for the ISC `dhcpd.conf` / `dhcpd.leases` grammar.
//!
//! Text is split into words, quoted strings and the punctuation `;`, `{` and `}`. A `#` outside
//! of a quoted string starts a comment that runs to the end of the line. Words are folded into a
//! tree of [`Node`]s: `;`-terminated statements and `{ ... }` blocks.
//!
//! The scanner never fails. Input that ends inside a block produces a [`Node::Block`] with
//! `closed == false` and a stray top-level `}` is dropped. Consumers decide what to do with
//! such nodes.

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{anychar, char, none_of},
    combinator::{opt, recognize, value},
    multi::{many0, many0_count, many1_count},
    sequence::{preceded, terminated},
    IResult, Parser,
};
use std::fmt::Write;

const INDENT: &str = "    ";

/// One node of a parsed `dhcpd` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A `;`-terminated statement, e.g. `option routers 10.0.0.1;`.
    Statement { words: Vec<String>, line: usize },
    /// A `header { body }` block, e.g. `host printer { ... }`.
    Block {
        header: Vec<String>,
        body: Vec<Node>,
        line: usize,
        closed: bool,
    },
}

impl Node {
    /// The 1-based line number the node starts on.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Node::Statement { line, .. } | Node::Block { line, .. } => *line,
        }
    }

    /// Render the node back to `dhcpd` syntax at the given nesting depth.
    pub fn render(&self, out: &mut String, depth: usize) {
        let indent = INDENT.repeat(depth);
        match self {
            Node::Statement { words, .. } => {
                let _ = writeln!(out, "{indent}{};", words.join(" "));
            }
            Node::Block { header, body, .. } => {
                let _ = writeln!(out, "{indent}{} {{", header.join(" "));
                for child in body {
                    child.render(out, depth + 1);
                }
                let _ = writeln!(out, "{indent}}}");
            }
        }
    }
}

/// Parse `text` into a tree of top-level nodes.
#[must_use]
pub fn parse(text: &str) -> Vec<Node> {
    let scanner = Scanner::new(text);
    let mut out = Vec::new();
    let mut rest = match blank(text) {
        Ok((rest, ())) => rest,
        Err(_) => text,
    };
    loop {
        if let Ok((after, nodes)) = scanner.body(rest) {
            out.extend(nodes);
            rest = after;
        }
        if rest.is_empty() {
            break;
        }
        // Only an unbalanced `}` stops a top-level body.
        let line = scanner.line(rest);
        match token('}').parse(rest) {
            Ok((after, _)) => {
                tracing::debug!("ignoring unbalanced '}}' at line {line}");
                rest = after;
            }
            Err(_) => break,
        }
    }
    out
}

/// Remove one layer of surrounding double quotes, if present.
#[must_use]
pub fn unquote(word: &str) -> &str {
    word.strip_prefix('"')
        .and_then(|w| w.strip_suffix('"'))
        .unwrap_or(word)
}

/// Whether `words` starts with the keyword sequence `keyword`.
#[must_use]
pub fn starts_with(words: &[String], keyword: &[&str]) -> bool {
    words.len() >= keyword.len() && words.iter().zip(keyword).all(|(w, k)| w == k)
}

fn is_bare(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ';' | '{' | '}' | '#' | '"')
}

/// Whitespace and `#` comments.
fn blank(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            take_while1(char::is_whitespace),
            recognize(preceded(char('#'), take_till(|c: char| c == '\n'))),
        ))),
    )
    .parse(input)
}

/// `"..."` with backslash escapes. A string still open at the end of input runs to the end.
fn quoted(input: &str) -> IResult<&str, &str> {
    recognize((
        char('"'),
        many0_count(alt((
            recognize(preceded(char('\\'), anychar)),
            recognize(none_of("\\\"")),
        ))),
        opt(char('"')),
    ))
    .parse(input)
}

/// Bare characters and quoted strings with nothing between them, e.g. `"a b"` or `x"y"`.
fn word(input: &str) -> IResult<&str, &str> {
    recognize(many1_count(alt((take_while1(is_bare), quoted)))).parse(input)
}

/// A punctuation character and the blanks after it.
fn token<'a>(
    c: char,
) -> impl Parser<&'a str, Output = char, Error = nom::error::Error<&'a str>> {
    terminated(char(c), blank)
}

/// Maps input positions to line numbers.
struct Scanner {
    len: usize,
    newlines: Vec<usize>,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            len: text.len(),
            newlines: text.match_indices('\n').map(|(i, _)| i).collect(),
        }
    }

    /// The 1-based line `rest` starts on.
    fn line(&self, rest: &str) -> usize {
        let offset = self.len - rest.len();
        self.newlines.partition_point(|&nl| nl < offset) + 1
    }

    /// Nodes up to a `}` or the end of input.
    fn body<'a>(&self, input: &'a str) -> IResult<&'a str, Vec<Node>> {
        let (input, nodes) = many0(|i: &'a str| self.node(i)).parse(input)?;
        Ok((input, nodes.into_iter().flatten().collect()))
    }

    /// One statement or block. An empty statement (`;`) yields `None`.
    fn node<'a>(&self, input: &'a str) -> IResult<&'a str, Option<Node>> {
        let line = self.line(input);
        let (input, words) = many0(terminated(word, blank)).parse(input)?;
        let words: Vec<String> = words.into_iter().map(str::to_string).collect();

        if let Ok((input, _)) = token(';').parse(input) {
            let statement = (!words.is_empty()).then_some(Node::Statement { words, line });
            return Ok((input, statement));
        }
        if let Ok((input, _)) = token('{').parse(input) {
            let (input, body) = self.body(input)?;
            let (input, close) = opt(token('}')).parse(input)?;
            let block = Node::Block {
                header: words,
                body,
                line,
                closed: close.is_some(),
            };
            return Ok((input, Some(block)));
        }
        if words.is_empty() {
            // At a `}` or the end of input.
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Many0,
            )));
        }
        // A final statement missing its `;` is still a statement.
        Ok((input, Some(Node::Statement { words, line })))
    }
}
