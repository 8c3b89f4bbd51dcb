//! Dice expression parsing.
//!
//! Finds the first dice expression in free-form text and parses it into terms.
//! Grammar (case-insensitive):
//!
//! ```text
//! expression := dice (('+' | '-') term)*
//! term       := dice | integer
//! dice       := [count] 'd' (sides | '%' | 'F') modifier*
//! modifier   := '!' | 'k' N | 'kh' N | 'kl' N | 'd' N | 'dl' N | 'dh' N
//! ```
//!
//! Whatever follows the expression is the roll's reason.

use std::fmt;

use fancy_regex::Regex;

use crate::common::error::EvaluationError;

/// Locates an expression. The first term must be a dice term and must not be
/// glued to a preceding word.
const EXPRESSION_PATTERN: &str = r"(?i)(?<![a-z0-9])\d*d(?:\d+|%|f)(?:!|k[hl]?\d+|d[hl]?\d+)*(?:\s*[+-]\s*(?:\d*d(?:\d+|%|f)(?:!|k[hl]?\d+|d[hl]?\d+)*|\d+))*";

/// Die size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sides {
    Number(u32),
    /// Fudge/Fate die: -1, 0 or +1.
    Fudge,
}

/// Which dice of a pool count towards the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    KeepHighest(u32),
    KeepLowest(u32),
    DropHighest(u32),
    DropLowest(u32),
}

impl Selection {
    pub fn amount(&self) -> u32 {
        match *self {
            Selection::KeepHighest(n)
            | Selection::KeepLowest(n)
            | Selection::DropHighest(n)
            | Selection::DropLowest(n) => n,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Selection::KeepHighest(_) | Selection::KeepLowest(_) => "keep",
            Selection::DropHighest(_) | Selection::DropLowest(_) => "drop",
        }
    }
}

/// `NdS` with optional modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: Sides,
    pub explode: bool,
    pub selection: Option<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Dice(DiceTerm),
    Constant(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

/// A parsed expression plus the trailing reason text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub terms: Vec<(Sign, Term)>,
    pub reason: Option<String>,
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sides {
            Sides::Number(sides) => write!(f, "{}d{}", self.count, sides)?,
            Sides::Fudge => write!(f, "{}dF", self.count)?,
        }
        if self.explode {
            write!(f, "!")?;
        }
        match self.selection {
            Some(Selection::KeepHighest(n)) => write!(f, "kh{}", n),
            Some(Selection::KeepLowest(n)) => write!(f, "kl{}", n),
            Some(Selection::DropHighest(n)) => write!(f, "dh{}", n),
            Some(Selection::DropLowest(n)) => write!(f, "dl{}", n),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Dice(dice) => write!(f, "{}", dice),
            Term::Constant(value) => write!(f, "{}", value),
        }
    }
}

impl fmt::Display for Expression {
    /// Normalized form: lowercase, no whitespace, explicit counts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (sign, term)) in self.terms.iter().enumerate() {
            match (i, sign) {
                (0, Sign::Plus) => {}
                (_, Sign::Plus) => write!(f, "+")?,
                (_, Sign::Minus) => write!(f, "-")?,
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

/// Finds and parses dice expressions.
#[derive(Debug)]
pub struct ExpressionParser {
    pattern: Regex,
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(EXPRESSION_PATTERN).expect("dice expression pattern is valid"),
        }
    }

    /// Parse the first dice expression in `input`.
    pub fn parse(&self, input: &str) -> Result<Expression, EvaluationError> {
        let found = self
            .pattern
            .find(input)
            .map_err(|e| EvaluationError::Syntax {
                expression: input.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| EvaluationError::NoExpression {
                input: input.to_string(),
            })?;

        let terms = parse_terms(found.as_str())?;
        Ok(Expression {
            terms,
            reason: parse_reason(&input[found.end()..]),
        })
    }
}

/// Text after the expression, without surrounding whitespace or a leading `#`.
fn parse_reason(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let rest = rest.strip_prefix('#').unwrap_or(rest).trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn parse_terms(text: &str) -> Result<Vec<(Sign, Term)>, EvaluationError> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let mut cursor = Cursor::new(&compact);
    let mut terms = Vec::new();

    let mut sign = Sign::Plus;
    loop {
        terms.push((sign, cursor.term()?));
        sign = match cursor.next() {
            Some('+') => Sign::Plus,
            Some('-') => Sign::Minus,
            Some(other) => return Err(cursor.error(format!("unexpected '{}'", other))),
            None => break,
        };
    }

    Ok(terms)
}

/// Character cursor over a compacted, lowercased expression.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> EvaluationError {
        EvaluationError::Syntax {
            expression: self.text.to_string(),
            message: message.into(),
        }
    }

    /// Digits at the cursor, if any.
    fn number(&mut self) -> Result<Option<u32>, EvaluationError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        let digits = &self.text[start..self.pos];
        digits
            .parse()
            .map(Some)
            .map_err(|_| self.error(format!("number {} is too large", digits)))
    }

    fn required_number(&mut self, after: &str) -> Result<u32, EvaluationError> {
        self.number()?
            .ok_or_else(|| self.error(format!("expected a number after '{}'", after)))
    }

    fn term(&mut self) -> Result<Term, EvaluationError> {
        let count = self.number()?;
        if !self.eat('d') {
            return count
                .map(Term::Constant)
                .ok_or_else(|| self.error("expected a number or dice"));
        }

        let sides = if self.eat('%') {
            Sides::Number(100)
        } else if self.eat('f') {
            Sides::Fudge
        } else {
            Sides::Number(self.required_number("d")?)
        };

        let mut dice = DiceTerm {
            count: count.unwrap_or(1),
            sides,
            explode: false,
            selection: None,
        };

        loop {
            let selection = if self.eat('!') {
                dice.explode = true;
                continue;
            } else if self.eat('k') {
                if self.eat('l') {
                    Selection::KeepLowest(self.required_number("kl")?)
                } else {
                    self.eat('h');
                    Selection::KeepHighest(self.required_number("k")?)
                }
            } else if self.eat('d') {
                if self.eat('h') {
                    Selection::DropHighest(self.required_number("dh")?)
                } else {
                    self.eat('l');
                    Selection::DropLowest(self.required_number("d")?)
                }
            } else {
                break;
            };

            if dice.selection.replace(selection).is_some() {
                return Err(self.error("only one keep/drop modifier is allowed per dice term"));
            }
        }

        Ok(Term::Dice(dice))
    }
}
