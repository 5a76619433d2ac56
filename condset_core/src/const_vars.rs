/// Size of the big-endian length prefix.
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Size of one encoded condition: predicate code followed by a big-endian `u16`.
pub const CONDITION_SIZE: usize = 3;

/// Largest number of conditions the length prefix can describe.
pub const MAX_CONDITIONS: usize = u16::MAX as usize;

/// Number of bytes needed to encode a set of `len` conditions.
pub const fn encoded_size_for(len: usize) -> usize {
    LENGTH_FIELD_SIZE + CONDITION_SIZE * len
}
