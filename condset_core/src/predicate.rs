use crate::error::{DecodeError, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A relational operator applied as `lhs OP rhs`.
///
/// The discriminants are the wire codes used by the binary encoding and must
/// not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Predicate {
    Equals = 0,
    NotEquals = 1,
    LessThan = 2,
    GreaterThan = 3,
    LessThanOrEqual = 4,
    GreaterThanOrEqual = 5,
    /// No constraint; always satisfied.
    #[default]
    Unspecified = 6,
}

impl Predicate {
    pub const ALL: [Predicate; 7] = [
        Predicate::Equals,
        Predicate::NotEquals,
        Predicate::LessThan,
        Predicate::GreaterThan,
        Predicate::LessThanOrEqual,
        Predicate::GreaterThanOrEqual,
        Predicate::Unspecified,
    ];

    /// Wire code of this predicate.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Predicate for a wire code, or `None` for codes above 6.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Applies the predicate as `lhs OP rhs`.
    pub fn evaluate(self, lhs: u16, rhs: u16) -> bool {
        match self {
            Predicate::Equals => lhs == rhs,
            Predicate::NotEquals => lhs != rhs,
            Predicate::LessThan => lhs < rhs,
            Predicate::GreaterThan => lhs > rhs,
            Predicate::LessThanOrEqual => lhs <= rhs,
            Predicate::GreaterThanOrEqual => lhs >= rhs,
            Predicate::Unspecified => true,
        }
    }

    /// Textual operator: `==`, `!=`, `<`, `>`, `<=`, `>=`, or `*` for unspecified.
    pub fn symbol(self) -> &'static str {
        match self {
            Predicate::Equals => "==",
            Predicate::NotEquals => "!=",
            Predicate::LessThan => "<",
            Predicate::GreaterThan => ">",
            Predicate::LessThanOrEqual => "<=",
            Predicate::GreaterThanOrEqual => ">=",
            Predicate::Unspecified => "*",
        }
    }

    /// Splits a leading operator off `s`, returning the predicate and the rest.
    ///
    /// Two-character operators are tried before their one-character prefixes.
    pub(crate) fn split_prefix(s: &str) -> Option<(Self, &str)> {
        const BY_LENGTH: [Predicate; 7] = [
            Predicate::Equals,
            Predicate::NotEquals,
            Predicate::LessThanOrEqual,
            Predicate::GreaterThanOrEqual,
            Predicate::LessThan,
            Predicate::GreaterThan,
            Predicate::Unspecified,
        ];
        BY_LENGTH
            .iter()
            .find_map(|p| s.strip_prefix(p.symbol()).map(|rest| (*p, rest)))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl From<Predicate> for u8 {
    fn from(predicate: Predicate) -> Self {
        predicate.code()
    }
}

impl TryFrom<u8> for Predicate {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code).ok_or_else(|| DecodeError::InvalidPredicateCode(code).into())
    }
}

impl FromStr for Predicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match Self::split_prefix(s) {
            Some((predicate, "")) => Ok(predicate),
            _ => Err(Error::Parse(format!("unknown predicate: {s:?}"))),
        }
    }
}
