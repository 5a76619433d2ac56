use crate::error::{Error, Result};
use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single predicate paired with its `u16` operand.
///
/// When a condition is used as data (the argument of a comparison) only
/// `value` matters; [`Condition::data`] builds such a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Condition {
    pub predicate: Predicate,
    pub value: u16,
}

impl Condition {
    pub fn new(predicate: Predicate, value: u16) -> Self {
        Self { predicate, value }
    }

    /// A data-only condition with an unspecified predicate.
    pub fn data(value: u16) -> Self {
        Self::new(Predicate::Unspecified, value)
    }

    /// Whether `value` satisfies this condition, evaluated as
    /// `value PREDICATE self.value`.
    pub fn is_satisfied_by(&self, value: u16) -> bool {
        self.predicate.evaluate(value, self.value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.predicate, self.value)
    }
}

/// Parses `<op><value>`, e.g. `==56`, `<90`, `*78`. A bare number is a data
/// condition.
impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (predicate, rest) = Predicate::split_prefix(s).unwrap_or((Predicate::Unspecified, s));
        let value = rest
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::Parse(format!("invalid condition {s:?}: {e}")))?;
        Ok(Self::new(predicate, value))
    }
}

/// Parses a comma-separated list of conditions. Blank input yields an empty list.
pub fn parse_conditions(text: &str) -> Result<Vec<Condition>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',').map(str::parse).collect()
}
