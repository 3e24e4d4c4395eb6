//! A small CSS selector engine.
//!
//! Supports the subset galleries are addressed with:
//!
//! ```text
//! div            type
//! *              universal
//! #gallery       id
//! .gallery-1     class (any number)
//! [href]         attribute present
//! [rel=lightbox] attribute equals (value may be quoted)
//! ul li          descendant combinator
//! ul > li        child combinator
//! a, b           selector list
//! ```
//!
//! Pseudo-classes and the sibling combinators are not supported and are
//! reported as [`SelectorError::Unexpected`].

use super::{Document, NodeId};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unexpected '{found}' at position {position} in selector `{selector}`")]
    Unexpected {
        selector: String,
        found: char,
        position: usize,
    },
    #[error("Unterminated attribute selector in `{0}`")]
    UnterminatedAttribute(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    steps: Vec<Step>,
}

/// One compound selector and how it relates to the step before it.
#[derive(Debug, Clone, PartialEq)]
struct Step {
    combinator: Option<Combinator>,
    compound: Compound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser {
            source: trimmed,
            chars: trimmed.char_indices().collect(),
            pos: 0,
        };
        let mut alternatives = vec![parser.complex()?];
        while parser.eat(',') {
            alternatives.push(parser.complex()?);
        }
        if let Some(found) = parser.peek() {
            return Err(parser.unexpected(found));
        }
        Ok(Self {
            source: trimmed.to_string(),
            alternatives,
        })
    }

    /// The selector text as written (trimmed).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches any alternative of this selector list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node)
            && self
                .alternatives
                .iter()
                .any(|complex| match_steps(doc, &complex.steps, node))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Right-to-left match: the last step must match `node`, earlier steps are
/// checked against its parent (child) or any ancestor (descendant).
fn match_steps(doc: &Document, steps: &[Step], node: NodeId) -> bool {
    let Some((last, rest)) = steps.split_last() else {
        return true;
    };
    if !last.compound.matches(doc, node) {
        return false;
    }
    match last.combinator {
        None => true,
        Some(Combinator::Child) => doc
            .parent(node)
            .is_some_and(|parent| match_steps(doc, rest, parent)),
        Some(Combinator::Descendant) => doc
            .ancestors(node)
            .any(|ancestor| match_steps(doc, rest, ancestor)),
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != "*" && t != tag) {
            return false;
        }
        if self.id.as_deref().is_some_and(|id| doc.attr(node, "id") != Some(id)) {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, doc.attr(node, &a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            self.skip_whitespace();
            true
        } else {
            false
        }
    }

    /// Skip whitespace, reporting whether any was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        let position = self
            .chars
            .get(self.pos)
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len());
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            position,
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut steps = vec![Step {
            combinator: None,
            compound: self.compound()?,
        }];
        loop {
            let spaced = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if spaced => Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            };
            steps.push(Step {
                combinator: Some(combinator),
                compound: self.compound()?,
            });
        }
        Ok(Complex { steps })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            out.push(c);
            self.pos += 1;
        }
        if out.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttrMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.bump() {
            Some(']') => return Ok(AttrMatch { name, value: None }),
            Some('=') => {
                self.skip_whitespace();
                self.attribute_value()?
            }
            Some(c) => {
                self.pos -= 1;
                return Err(self.unexpected(c));
            }
            None => return Err(SelectorError::UnterminatedAttribute(self.source.to_string())),
        };
        self.skip_whitespace();
        match self.bump() {
            Some(']') => Ok(AttrMatch {
                name,
                value: Some(value),
            }),
            Some(c) => {
                self.pos -= 1;
                Err(self.unexpected(c))
            }
            None => Err(SelectorError::UnterminatedAttribute(self.source.to_string())),
        }
    }

    fn attribute_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(out),
                        Some(c) => out.push(c),
                        None => {
                            return Err(SelectorError::UnterminatedAttribute(
                                self.source.to_string(),
                            ));
                        }
                    }
                }
            }
            _ => self.ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
