//! Ordered sets of relational predicates over `u16` values.
//!
//! A [`ConditionSet`] holds a fixed-length sequence of [`Condition`]s. One set
//! supplies predicates and right-hand operands, another supplies data, and
//! [`ConditionSet::compare`] checks the data against the predicates position
//! by position. Sets have a compact big-endian wire encoding:
//!
//! ```text
//! offset 0       : u16 BE  number of conditions (L)
//! offset 2+3*i   : u8      predicate code of condition i
//! offset 2+3*i+1 : u16 BE  value of condition i
//! total          : 2 + 3*L bytes
//! ```
//!
//! ```
//! use condset_core::{Condition, ConditionSet, Predicate};
//!
//! let pattern = [
//!     Condition::new(Predicate::Equals, 56),
//!     Condition::new(Predicate::LessThan, 90),
//! ];
//! let data = [Condition::data(56), Condition::data(78)];
//!
//! let pattern = ConditionSet::borrowed(&pattern).unwrap();
//! let data = ConditionSet::borrowed(&data).unwrap();
//! assert!(pattern.compare(&data).unwrap());
//!
//! let decoded = ConditionSet::from_bytes(&pattern.to_bytes()).unwrap();
//! assert_eq!(decoded, pattern);
//! ```

pub mod condition;
pub mod condition_set;
mod const_vars;
pub mod error;
pub mod observer;
pub mod predicate;

pub use condition::*;
pub use condition_set::*;
pub use const_vars::*;
pub use error::*;
pub use observer::*;
pub use predicate::*;
