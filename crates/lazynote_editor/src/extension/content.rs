//! Content expression grammar and matcher.
//!
//! Grammar (whitespace separates sequence terms):
//!
//! ```text
//! expr   := term*
//! term   := atom ('+' | '*' | '?')?
//! atom   := NAME | '(' expr ('|' expr)* ')'
//! ```
//!
//! `NAME` is a node type name or a group name. Matching simulates the
//! expression over the set of reachable child positions, so nested
//! quantifiers never backtrack exponentially.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    Name(String),
    Choice(Vec<ContentExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    atom: Atom,
    quantifier: Quantifier,
}

/// Parsed content expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentExpr {
    terms: Vec<Term>,
}

/// Content expression parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentExprError {
    UnexpectedToken { expr: String, token: String },
    UnbalancedParen(String),
    EmptyChoice(String),
}

impl Display for ContentExprError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken { expr, token } => {
                write!(f, "unexpected token `{token}` in content expression `{expr}`")
            }
            Self::UnbalancedParen(expr) => {
                write!(f, "unbalanced parenthesis in content expression `{expr}`")
            }
            Self::EmptyChoice(expr) => {
                write!(f, "empty alternative in content expression `{expr}`")
            }
        }
    }
}

impl Error for ContentExprError {}

impl ContentExpr {
    /// Parses an expression such as `"paragraph block*"`.
    pub fn parse(source: &str) -> Result<Self, ContentExprError> {
        let tokens = tokenize(source);
        let mut cursor = 0;
        let expr = parse_seq(source, &tokens, &mut cursor)?;
        if cursor < tokens.len() {
            return Err(match tokens[cursor].as_str() {
                ")" => ContentExprError::UnbalancedParen(source.to_string()),
                other => ContentExprError::UnexpectedToken {
                    expr: source.to_string(),
                    token: other.to_string(),
                },
            });
        }
        Ok(expr)
    }

    /// Whether the expression admits no children at all (atom node).
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every name referenced by this expression.
    pub fn names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_names(self, &mut out);
        out
    }

    /// Checks whether `children` (a sequence of child descriptors) conforms.
    ///
    /// `accepts(name, child)` decides whether an expression name (type or
    /// group) admits one child.
    pub fn matches<T, F>(&self, children: &[T], accepts: &F) -> bool
    where
        F: Fn(&str, &T) -> bool,
    {
        let start = BTreeSet::from([0]);
        self.advance(&start, children, accepts)
            .contains(&children.len())
    }

    fn advance<T, F>(&self, positions: &BTreeSet<usize>, children: &[T], accepts: &F) -> BTreeSet<usize>
    where
        F: Fn(&str, &T) -> bool,
    {
        let mut current = positions.clone();
        for term in &self.terms {
            if current.is_empty() {
                break;
            }
            current = term.advance(&current, children, accepts);
        }
        current
    }
}

impl Term {
    fn advance<T, F>(&self, positions: &BTreeSet<usize>, children: &[T], accepts: &F) -> BTreeSet<usize>
    where
        F: Fn(&str, &T) -> bool,
    {
        match self.quantifier {
            Quantifier::One => self.step(positions, children, accepts),
            Quantifier::Optional => {
                let mut out = positions.clone();
                out.extend(self.step(positions, children, accepts));
                out
            }
            Quantifier::ZeroOrMore => self.closure(positions.clone(), children, accepts),
            Quantifier::OneOrMore => {
                let first = self.step(positions, children, accepts);
                self.closure(first, children, accepts)
            }
        }
    }

    fn closure<T, F>(&self, seed: BTreeSet<usize>, children: &[T], accepts: &F) -> BTreeSet<usize>
    where
        F: Fn(&str, &T) -> bool,
    {
        let mut reached = seed.clone();
        let mut frontier = seed;
        while !frontier.is_empty() {
            let next = self.step(&frontier, children, accepts);
            frontier = next.difference(&reached).copied().collect();
            reached.extend(frontier.iter().copied());
        }
        reached
    }

    fn step<T, F>(&self, positions: &BTreeSet<usize>, children: &[T], accepts: &F) -> BTreeSet<usize>
    where
        F: Fn(&str, &T) -> bool,
    {
        match &self.atom {
            Atom::Name(name) => positions
                .iter()
                .filter(|pos| {
                    children
                        .get(**pos)
                        .is_some_and(|child| accepts(name.as_str(), child))
                })
                .map(|pos| pos + 1)
                .collect(),
            Atom::Choice(alternatives) => alternatives
                .iter()
                .flat_map(|alt| alt.advance(positions, children, accepts))
                .collect(),
        }
    }
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut name = String::new();
    for c in source.chars() {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
            continue;
        }
        if !name.is_empty() {
            tokens.push(std::mem::take(&mut name));
        }
        if !c.is_whitespace() {
            tokens.push(c.to_string());
        }
    }
    if !name.is_empty() {
        tokens.push(name);
    }
    tokens
}

fn parse_seq(
    source: &str,
    tokens: &[String],
    cursor: &mut usize,
) -> Result<ContentExpr, ContentExprError> {
    let mut terms = Vec::new();
    while let Some(token) = tokens.get(*cursor) {
        let atom = match token.as_str() {
            ")" | "|" => break,
            "(" => {
                *cursor += 1;
                parse_choice(source, tokens, cursor)?
            }
            "+" | "*" | "?" => {
                return Err(ContentExprError::UnexpectedToken {
                    expr: source.to_string(),
                    token: token.clone(),
                })
            }
            name if name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                *cursor += 1;
                Atom::Name(name.to_string())
            }
            other => {
                return Err(ContentExprError::UnexpectedToken {
                    expr: source.to_string(),
                    token: other.to_string(),
                })
            }
        };

        let quantifier = match tokens.get(*cursor).map(String::as_str) {
            Some("+") => Quantifier::OneOrMore,
            Some("*") => Quantifier::ZeroOrMore,
            Some("?") => Quantifier::Optional,
            _ => Quantifier::One,
        };
        if quantifier != Quantifier::One {
            *cursor += 1;
        }
        terms.push(Term { atom, quantifier });
    }
    Ok(ContentExpr { terms })
}

fn parse_choice(
    source: &str,
    tokens: &[String],
    cursor: &mut usize,
) -> Result<Atom, ContentExprError> {
    let mut alternatives = Vec::new();
    loop {
        let alt = parse_seq(source, tokens, cursor)?;
        if alt.is_empty() {
            return Err(ContentExprError::EmptyChoice(source.to_string()));
        }
        alternatives.push(alt);
        match tokens.get(*cursor).map(String::as_str) {
            Some("|") => *cursor += 1,
            Some(")") => {
                *cursor += 1;
                return Ok(Atom::Choice(alternatives));
            }
            _ => return Err(ContentExprError::UnbalancedParen(source.to_string())),
        }
    }
}

fn collect_names(expr: &ContentExpr, out: &mut BTreeSet<String>) {
    for term in &expr.terms {
        match &term.atom {
            Atom::Name(name) => {
                out.insert(name.clone());
            }
            Atom::Choice(alternatives) => {
                for alt in alternatives {
                    collect_names(alt, out);
                }
            }
        }
    }
}
