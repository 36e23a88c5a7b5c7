use std::fmt::{Display, Formatter};

use crate::TraitParseError;

/// A syntactically valid trait expression that has not yet been resolved to
/// a known trait.
///
/// Parsing is purely structural: `fooBar(a, b)` is a valid expression even
/// though no such trait exists. Resolution happens in
/// [`InstanceTrait::from_expression`](crate::InstanceTrait::from_expression).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitExpression<'a> {
    /// The trait name, e.g. `isLinux`.
    pub name: &'a str,
    /// Arguments between the parentheses, in order.
    pub arguments: Vec<&'a str>,
}

impl<'a> TraitExpression<'a> {
    /// An expression without arguments.
    pub fn nullary(name: &'a str) -> Self {
        Self {
            name,
            arguments: Vec::new(),
        }
    }

    /// Parse an expression, tolerating whitespace around every token.
    pub fn parse(input: &'a str) -> Result<Self, TraitParseError> {
        if input.trim().is_empty() {
            return Err(TraitParseError::Empty);
        }

        let mut cursor = Cursor { input, offset: 0 };

        cursor.skip_whitespace();
        let name = cursor.take_while(|index, c| {
            if index == 0 {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            }
        });
        if name.is_empty() {
            return Err(cursor.expected("trait name"));
        }

        cursor.skip_whitespace();
        if !cursor.eat('(') {
            return Err(cursor.expected("'('"));
        }

        cursor.skip_whitespace();
        let mut arguments = Vec::new();
        if !cursor.eat(')') {
            loop {
                let argument = cursor.take_while(|_, c| {
                    !c.is_whitespace() && !matches!(c, ',' | '(' | ')')
                });
                if argument.is_empty() {
                    return Err(cursor.expected("argument"));
                }
                arguments.push(argument);

                cursor.skip_whitespace();
                if cursor.eat(',') {
                    cursor.skip_whitespace();
                } else if cursor.eat(')') {
                    break;
                } else {
                    return Err(cursor.expected("',' or ')'"));
                }
            }
        }

        cursor.skip_whitespace();
        if !cursor.rest().is_empty() {
            return Err(cursor.expected("end of expression"));
        }

        Ok(Self { name, arguments })
    }
}

impl Display for TraitExpression<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments.join(", "))
    }
}

struct Cursor<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.offset += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.offset += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, predicate: impl Fn(usize, char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(index, c)| !predicate(*index, *c))
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        self.offset += end;
        &rest[..end]
    }

    fn expected(&self, expected: &'static str) -> TraitParseError {
        TraitParseError::Syntax {
            offset: self.offset,
            expected,
        }
    }
}
