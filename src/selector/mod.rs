//! JSONPath-like selectors
//!
//! A [`Selector`] resolves to zero or more `(NodePath, &Node)` matches inside a
//! [`Node`] tree. Supported syntax:
//!
//! ```text
//! $                       root
//! .name  ['name']         child by key
//! ['a','b']  [0,2]        union
//! [0]  [-1]               sequence index
//! .*  [*]                 all children
//! ..name  ..*  ..[...]    recursive descent (current node included)
//! [?(expr)]  [?expr]      filter children, see [`filter`]
//! ```
//!
//! Selecting into a scalar yields nothing. Results keep document order and each
//! path appears at most once.

pub mod filter;

use crate::document::{Node, NodePath, PathSegment};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub use filter::Filter;

/// Maximum nesting followed by recursive descent
pub const MAX_DEPTH: usize = 512;

/// Errors raised while parsing a selector or filter expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("selector must start with '$': {0}")]
    MissingRoot(String),

    #[error("unexpected '{found}' at offset {offset} in {selector}")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },

    #[error("unexpected end of selector: {0}")]
    UnexpectedEnd(String),

    #[error("empty key at offset {offset} in {selector}")]
    EmptyKey { selector: String, offset: usize },

    #[error("invalid filter expression '{expression}': {reason}")]
    Filter { expression: String, reason: String },

    #[error("invalid regular expression /{pattern}/: {reason}")]
    Regex { pattern: String, reason: String },
}

#[derive(Debug, Clone)]
enum Step {
    Child(String),
    Wildcard,
    Index(i64),
    Union(Vec<Member>),
    Filter(Filter),
    /// The following step applies to every descendant, self included
    Descend,
}

#[derive(Debug, Clone, PartialEq)]
enum Member {
    Key(String),
    Index(i64),
}

/// A node matched by a selector
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub path: NodePath,
    pub node: &'a Node,
}

/// A compiled selector expression
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    steps: Vec<Step>,
}

impl Selector {
    /// Parse a selector; syntax errors are reported eagerly
    pub fn parse(expression: &str) -> Result<Self, SelectorError> {
        Parser::new(expression).parse()
    }

    /// The expression this selector was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Resolve against a tree
    pub fn select<'a>(&self, root: &'a Node) -> Vec<Match<'a>> {
        let mut current = vec![Match {
            path: NodePath::root(),
            node: root,
        }];
        let mut descend = false;

        for step in &self.steps {
            if let Step::Descend = step {
                descend = true;
                continue;
            }

            let sources = if descend {
                let mut expanded = Vec::new();
                for m in &current {
                    collect_descendants(m.node, &m.path, 0, &mut expanded);
                }
                dedup(expanded)
            } else {
                current
            };
            descend = false;

            let mut next = Vec::new();
            for m in &sources {
                apply_step(step, m, &mut next);
            }
            current = dedup(next);
        }

        current
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn collect_descendants<'a>(node: &'a Node, path: &NodePath, depth: usize, out: &mut Vec<Match<'a>>) {
    out.push(Match {
        path: path.clone(),
        node,
    });
    if depth >= MAX_DEPTH {
        return;
    }
    match node {
        Node::Mapping(entries) => {
            for (key, child) in entries {
                let child_path = path.child(PathSegment::Key(key.clone()));
                collect_descendants(child, &child_path, depth + 1, out);
            }
        }
        Node::Sequence(items) => {
            for (i, child) in items.iter().enumerate() {
                let child_path = path.child(PathSegment::Index(i));
                collect_descendants(child, &child_path, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn dedup(matches: Vec<Match<'_>>) -> Vec<Match<'_>> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.path.clone()))
        .collect()
}

fn push_key<'a>(m: &Match<'a>, key: &str, out: &mut Vec<Match<'a>>) {
    if let Some(child) = m.node.get(key) {
        out.push(Match {
            path: m.path.child(PathSegment::Key(key.to_string())),
            node: child,
        });
    }
}

fn push_index<'a>(m: &Match<'a>, index: i64, out: &mut Vec<Match<'a>>) {
    if let Node::Sequence(items) = m.node {
        let len = items.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if (0..len).contains(&resolved) {
            let i = resolved as usize;
            out.push(Match {
                path: m.path.child(PathSegment::Index(i)),
                node: &items[i],
            });
        }
    }
}

fn children<'a>(m: &Match<'a>) -> Vec<(PathSegment, &'a Node)> {
    match m.node {
        Node::Mapping(entries) => entries
            .iter()
            .map(|(k, v)| (PathSegment::Key(k.clone()), v))
            .collect(),
        Node::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (PathSegment::Index(i), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn apply_step<'a>(step: &Step, m: &Match<'a>, out: &mut Vec<Match<'a>>) {
    match step {
        Step::Child(key) => push_key(m, key, out),
        Step::Index(index) => push_index(m, *index, out),
        Step::Union(members) => {
            for member in members {
                match member {
                    Member::Key(key) => push_key(m, key, out),
                    Member::Index(index) => push_index(m, *index, out),
                }
            }
        }
        Step::Wildcard => {
            // A literal "*" key wins over the wildcard
            if m.node.get("*").is_some() {
                push_key(m, "*", out);
                return;
            }
            for (segment, child) in children(m) {
                out.push(Match {
                    path: m.path.child(segment),
                    node: child,
                });
            }
        }
        Step::Filter(filter) => {
            for (segment, child) in children(m) {
                if filter.matches(child, &segment) {
                    out.push(Match {
                        path: m.path.child(segment),
                        node: child,
                    });
                }
            }
        }
        Step::Descend => {}
    }
}

struct Parser<'s> {
    source: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        if self.chars.first() != Some(&'$') {
            return Err(SelectorError::MissingRoot(self.source.to_string()));
        }
        self.pos = 1;

        let mut steps = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' if self.peek_at(1) == Some('.') => {
                    self.pos += 2;
                    steps.push(Step::Descend);
                    match self.peek() {
                        None => return Err(self.end()),
                        // Bracket handled by the next iteration
                        Some('[') => {}
                        Some('*') => {
                            self.pos += 1;
                            steps.push(Step::Wildcard);
                        }
                        Some(_) => steps.push(Step::Child(self.name()?)),
                    }
                }
                '.' => {
                    self.pos += 1;
                    match self.peek() {
                        None => return Err(self.end()),
                        Some('*') => {
                            self.pos += 1;
                            steps.push(Step::Wildcard);
                        }
                        Some(_) => steps.push(Step::Child(self.name()?)),
                    }
                }
                '[' => steps.push(self.bracket()?),
                other => return Err(self.unexpected(other)),
            }
        }

        Ok(Selector {
            source: self.source.trim().to_string(),
            steps,
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn end(&self) -> SelectorError {
        SelectorError::UnexpectedEnd(self.source.to_string())
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            offset: self.pos,
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Unquoted key after `.`; runs to the next `.` or `[`
    fn name(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' {
                break;
            }
            if c == ']' {
                return Err(self.unexpected(c));
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(SelectorError::EmptyKey {
                selector: self.source.to_string(),
                offset: start,
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn bracket(&mut self) -> Result<Step, SelectorError> {
        // consume '['
        self.pos += 1;
        self.skip_whitespace();

        match self.peek() {
            None => Err(self.end()),
            Some('?') => {
                self.pos += 1;
                let text = self.filter_text()?;
                let filter = Filter::parse(&text)?;
                Ok(Step::Filter(filter))
            }
            Some('*') => {
                self.pos += 1;
                self.skip_whitespace();
                self.expect(']')?;
                Ok(Step::Wildcard)
            }
            Some(_) => {
                let mut members = Vec::new();
                loop {
                    self.skip_whitespace();
                    members.push(self.member()?);
                    self.skip_whitespace();
                    match self.peek() {
                        Some(',') => self.pos += 1,
                        Some(']') => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => return Err(self.unexpected(c)),
                        None => return Err(self.end()),
                    }
                }
                Ok(match members.as_slice() {
                    [Member::Key(key)] => Step::Child(key.clone()),
                    [Member::Index(index)] => Step::Index(*index),
                    _ => Step::Union(members),
                })
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.end()),
        }
    }

    fn member(&mut self) -> Result<Member, SelectorError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let mut key = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.end()),
                        Some('\\') => {
                            self.pos += 1;
                            match self.peek() {
                                Some(c) => key.push(c),
                                None => return Err(self.end()),
                            }
                        }
                        Some(c) if c == quote => break,
                        Some(c) => key.push(c),
                    }
                    self.pos += 1;
                }
                self.pos += 1;
                Ok(Member::Key(key))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                self.pos += 1;
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse::<i64>()
                    .map(Member::Index)
                    .map_err(|_| self.unexpected(c))
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.end()),
        }
    }

    /// Text of a filter up to its closing `]`, skipping strings and regex literals
    fn filter_text(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(c) = self.peek() {
            match c {
                '\'' | '"' | '/' => self.skip_quoted(c)?,
                '(' | '[' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ']' if depth == 0 => {
                    let text: String = self.chars[start..self.pos].iter().collect();
                    self.pos += 1;
                    return Ok(text);
                }
                ']' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }

        Err(self.end())
    }

    /// Leaves `pos` on the closing delimiter
    fn skip_quoted(&mut self, delimiter: char) -> Result<(), SelectorError> {
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 2;
                continue;
            }
            if c == delimiter {
                return Ok(());
            }
            self.pos += 1;
        }
        Err(self.end())
    }
}
