//! Facade over [`condset_core`].
pub use condset_core::*;
