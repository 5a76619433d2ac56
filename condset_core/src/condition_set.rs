use crate::condition::Condition;
use crate::const_vars::{encoded_size_for, CONDITION_SIZE, LENGTH_FIELD_SIZE, MAX_CONDITIONS};
use crate::error::{DecodeError, Error, Result};
use crate::observer::{EvalObserver, NoopObserver};
use crate::predicate::Predicate;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::fmt;
use std::io::{Read, Write};
use std::ops::Deref;
use tracing::{debug, trace, warn};

/// Backing storage of a [`ConditionSet`], fixed at construction.
#[derive(Debug, Clone)]
enum Storage<'a> {
    /// View over a caller-owned slice; never released by the set.
    Borrowed(&'a [Condition]),
    /// Allocated and released by the set.
    Owned(Box<[Condition]>),
}

impl Deref for Storage<'_> {
    type Target = [Condition];

    fn deref(&self) -> &[Condition] {
        match self {
            Storage::Borrowed(conditions) => conditions,
            Storage::Owned(conditions) => conditions,
        }
    }
}

/// Options for decoding a binary condition set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Accept input longer than the declared size and ignore the excess.
    pub allow_trailing_bytes: bool,
}

/// An immutable, ordered, fixed-length sequence of conditions.
///
/// A set is either a borrowed view over caller-owned conditions
/// ([`ConditionSet::borrowed`]) or owns its conditions
/// ([`ConditionSet::owned`], [`ConditionSet::from_bytes`]). The length never
/// exceeds [`MAX_CONDITIONS`].
#[derive(Debug, Clone)]
pub struct ConditionSet<'a> {
    conditions: Storage<'a>,
}

fn check_len(len: usize) -> Result<()> {
    if len > MAX_CONDITIONS {
        return Err(Error::TooManyConditions(len));
    }
    Ok(())
}

/// Decodes packed conditions; `body.len()` is a multiple of `CONDITION_SIZE`.
fn decode_conditions(body: &[u8]) -> Result<Box<[Condition]>> {
    body.chunks_exact(CONDITION_SIZE)
        .enumerate()
        .map(|(index, chunk)| -> Result<Condition> {
            let code = chunk[0];
            let predicate =
                Predicate::from_code(code).ok_or(DecodeError::UnknownPredicate { index, code })?;
            Ok(Condition::new(predicate, BigEndian::read_u16(&chunk[1..])))
        })
        .collect()
}

impl<'a> ConditionSet<'a> {
    /// Creates a view over `conditions` without copying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyConditions`] if the slice is longer than
    /// [`MAX_CONDITIONS`].
    pub fn borrowed(conditions: &'a [Condition]) -> Result<Self> {
        check_len(conditions.len())?;
        Ok(Self {
            conditions: Storage::Borrowed(conditions),
        })
    }

    /// Returns true if the set owns its conditions.
    pub fn is_owned(&self) -> bool {
        matches!(self.conditions, Storage::Owned(_))
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn get(&self, index: usize) -> Option<&Condition> {
        self.conditions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.conditions.iter()
    }

    /// Checks whether `other`'s values satisfy this set's conditions.
    ///
    /// For each index `i` in order, evaluates
    /// `other[i].value self[i].predicate self[i].value`; the predicates of
    /// `other` are ignored. Returns `false` at the first unsatisfied
    /// condition without evaluating the rest. An empty set is satisfied by
    /// another empty set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the lengths differ.
    pub fn compare(&self, other: &ConditionSet<'_>) -> Result<bool> {
        self.compare_observed(other, &mut NoopObserver)
    }

    /// Same as [`compare`](Self::compare), reporting every evaluated index
    /// to `observer`.
    pub fn compare_observed<O>(&self, other: &ConditionSet<'_>, observer: &mut O) -> Result<bool>
    where
        O: EvalObserver + ?Sized,
    {
        if self.len() != other.len() {
            return Err(Error::LengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }

        for (index, (condition, data)) in self.iter().zip(other.iter()).enumerate() {
            let satisfied = condition.is_satisfied_by(data.value);
            observer.evaluated(index, condition, data.value, satisfied);
            if !satisfied {
                trace!(index, %condition, value = data.value, "condition not satisfied");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Size in bytes of the binary encoding: `2 + 3 * len`.
    pub fn encoded_size(&self) -> usize {
        encoded_size_for(self.len())
    }

    /// Writes the binary encoding into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferSizeMismatch`] unless
    /// `dest.len() == self.encoded_size()`. Nothing is written in that case.
    pub fn encode(&self, dest: &mut [u8]) -> Result<()> {
        let expected = self.encoded_size();
        if dest.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: dest.len(),
            });
        }
        self.encode_into(dest);
        Ok(())
    }

    /// Returns the binary encoding as a new vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.encoded_size()];
        self.encode_into(&mut bytes);
        bytes
    }

    /// Writes the binary encoding to `writer`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(self.len() as u16)?;
        for condition in self.iter() {
            writer.write_u8(condition.predicate.code())?;
            writer.write_u16::<BigEndian>(condition.value)?;
        }
        debug!(len = self.len(), bytes = self.encoded_size(), "wrote condition set");
        Ok(())
    }

    /// `dest` must be exactly `encoded_size()` bytes.
    fn encode_into(&self, dest: &mut [u8]) {
        // len() <= MAX_CONDITIONS is upheld by every constructor
        BigEndian::write_u16(&mut dest[..LENGTH_FIELD_SIZE], self.len() as u16);
        for (condition, chunk) in self
            .iter()
            .zip(dest[LENGTH_FIELD_SIZE..].chunks_exact_mut(CONDITION_SIZE))
        {
            chunk[0] = condition.predicate.code();
            BigEndian::write_u16(&mut chunk[1..], condition.value);
        }
    }

    /// Detaches the set from any borrowed storage, copying if needed.
    pub fn into_owned(self) -> ConditionSet<'static> {
        let conditions = match self.conditions {
            Storage::Borrowed(conditions) => conditions.into(),
            Storage::Owned(conditions) => conditions,
        };
        ConditionSet {
            conditions: Storage::Owned(conditions),
        }
    }
}

impl ConditionSet<'static> {
    /// Creates a set that owns `conditions`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyConditions`] if there are more than
    /// [`MAX_CONDITIONS`] conditions.
    pub fn owned(conditions: Vec<Condition>) -> Result<Self> {
        check_len(conditions.len())?;
        Ok(Self {
            conditions: Storage::Owned(conditions.into_boxed_slice()),
        })
    }

    /// Decodes a set produced by [`encode`](ConditionSet::encode). The input
    /// must be exactly `2 + 3L` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] when the input is shorter or longer
    /// than its declared size, or holds an unknown predicate code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with(bytes, DecodeOptions::default())
    }

    /// Decodes a set with explicit [`DecodeOptions`].
    pub fn from_bytes_with(bytes: &[u8], options: DecodeOptions) -> Result<Self> {
        if bytes.len() < LENGTH_FIELD_SIZE {
            return Err(DecodeError::Truncated {
                required: LENGTH_FIELD_SIZE,
                actual: bytes.len(),
            }
            .into());
        }

        let len = BigEndian::read_u16(&bytes[..LENGTH_FIELD_SIZE]) as usize;
        let required = encoded_size_for(len);
        if bytes.len() < required {
            return Err(DecodeError::Truncated {
                required,
                actual: bytes.len(),
            }
            .into());
        }
        if bytes.len() > required {
            if !options.allow_trailing_bytes {
                return Err(DecodeError::TrailingBytes {
                    expected: required,
                    actual: bytes.len(),
                }
                .into());
            }
            warn!(
                declared = required,
                actual = bytes.len(),
                "ignoring trailing bytes after condition set"
            );
        }

        let conditions = decode_conditions(&bytes[LENGTH_FIELD_SIZE..required])?;
        debug!(len, bytes = required, "decoded condition set");
        Ok(Self {
            conditions: Storage::Owned(conditions),
        })
    }

    /// Reads one encoded set from `reader`, consuming exactly `2 + 3L` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the stream ends early or holds an
    /// unknown predicate code, and [`Error::Io`] if reading fails.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header = Vec::with_capacity(LENGTH_FIELD_SIZE);
        reader
            .by_ref()
            .take(LENGTH_FIELD_SIZE as u64)
            .read_to_end(&mut header)?;
        if header.len() < LENGTH_FIELD_SIZE {
            return Err(DecodeError::Truncated {
                required: LENGTH_FIELD_SIZE,
                actual: header.len(),
            }
            .into());
        }

        let len = BigEndian::read_u16(&header) as usize;
        let required = encoded_size_for(len);
        let body_len = required - LENGTH_FIELD_SIZE;
        let mut body = Vec::with_capacity(body_len);
        reader.by_ref().take(body_len as u64).read_to_end(&mut body)?;
        if body.len() < body_len {
            return Err(DecodeError::Truncated {
                required,
                actual: LENGTH_FIELD_SIZE + body.len(),
            }
            .into());
        }

        let conditions = decode_conditions(&body)?;
        debug!(len, bytes = required, "read condition set");
        Ok(Self {
            conditions: Storage::Owned(conditions),
        })
    }
}

impl<'a> TryFrom<&'a [Condition]> for ConditionSet<'a> {
    type Error = Error;

    fn try_from(conditions: &'a [Condition]) -> Result<Self> {
        ConditionSet::borrowed(conditions)
    }
}

impl TryFrom<Vec<Condition>> for ConditionSet<'static> {
    type Error = Error;

    fn try_from(conditions: Vec<Condition>) -> Result<Self> {
        ConditionSet::owned(conditions)
    }
}

/// Sets are equal when their conditions are, regardless of ownership.
impl PartialEq<ConditionSet<'_>> for ConditionSet<'_> {
    fn eq(&self, other: &ConditionSet<'_>) -> bool {
        self.conditions() == other.conditions()
    }
}

impl Eq for ConditionSet<'_> {}

impl<'s> IntoIterator for &'s ConditionSet<'_> {
    type Item = &'s Condition;
    type IntoIter = std::slice::Iter<'s, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ConditionSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, condition) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{condition}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use std::io::Cursor;

    fn pattern() -> [Condition; 2] {
        [
            Condition::new(Predicate::Equals, 56),
            Condition::new(Predicate::LessThan, 90),
        ]
    }

    #[test]
    fn test_reference_scenario() -> Result<()> {
        let cs = pattern();
        let cs2 = [Condition::data(56), Condition::data(78)];
        let cs3 = [Condition::data(78), Condition::data(890)];

        let c = ConditionSet::borrowed(&cs)?;
        let c2 = ConditionSet::borrowed(&cs2)?;
        let c3 = ConditionSet::borrowed(&cs3)?;

        assert!(c.compare(&c2)?);
        assert!(!c.compare(&c3)?);
        Ok(())
    }

    #[test]
    fn test_compare_ignores_argument_predicates() -> Result<()> {
        let pattern = [Condition::new(Predicate::GreaterThan, 10)];
        let data = [Condition::new(Predicate::LessThan, 11)];
        let pattern = ConditionSet::borrowed(&pattern)?;
        let data = ConditionSet::borrowed(&data)?;

        // 11 > 10
        assert!(pattern.compare(&data)?);
        // 10 < 11
        assert!(data.compare(&pattern)?);

        let data = [Condition::new(Predicate::GreaterThan, 0)];
        let data = ConditionSet::borrowed(&data)?;
        // 10 > 10 fails; the argument's GreaterThan is not consulted
        assert!(!pattern.compare(&ConditionSet::borrowed(&[Condition::data(10)])?)?);
        assert!(!pattern.compare(&data)?);
        Ok(())
    }

    #[test]
    fn test_compare_length_mismatch() -> Result<()> {
        let a = pattern();
        let b = [Condition::data(1)];
        let a = ConditionSet::borrowed(&a)?;
        let b = ConditionSet::borrowed(&b)?;

        let err = a.compare(&b).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(err.is_usage_error());
        Ok(())
    }

    #[test]
    fn test_compare_empty_sets() -> Result<()> {
        let empty = ConditionSet::borrowed(&[])?;
        let other = ConditionSet::owned(Vec::new())?;
        assert!(empty.compare(&other)?);
        Ok(())
    }

    #[test]
    fn test_compare_short_circuits() -> Result<()> {
        let pattern = [
            Condition::new(Predicate::Equals, 1),
            Condition::new(Predicate::Equals, 2),
            Condition::new(Predicate::Equals, 3),
        ];
        let data = [Condition::data(9), Condition::data(2), Condition::data(3)];
        let pattern = ConditionSet::borrowed(&pattern)?;
        let data = ConditionSet::borrowed(&data)?;

        let mut observer = RecordingObserver::new();
        assert!(!pattern.compare_observed(&data, &mut observer)?);
        assert_eq!(observer.evaluations, vec![(0, false)]);
        Ok(())
    }

    #[test]
    fn test_compare_observes_every_index_when_satisfied() -> Result<()> {
        let pattern = [
            Condition::new(Predicate::NotEquals, 1),
            Condition::data(0),
            Condition::new(Predicate::GreaterThanOrEqual, 3),
        ];
        let data = [Condition::data(2), Condition::data(40), Condition::data(3)];
        let pattern = ConditionSet::borrowed(&pattern)?;
        let data = ConditionSet::borrowed(&data)?;

        let mut observer = RecordingObserver::new();
        assert!(pattern.compare_observed(&data, &mut observer)?);
        assert_eq!(observer.indices(), vec![0, 1, 2]);
        // the unspecified condition at index 1 is reported as satisfied
        assert_eq!(observer.evaluations, vec![(0, true), (1, true), (2, true)]);
        Ok(())
    }

    #[test]
    fn test_encode_layout() -> Result<()> {
        let cs = pattern();
        let set = ConditionSet::borrowed(&cs)?;
        assert_eq!(set.encoded_size(), 8);

        let mut buf = [0u8; 8];
        set.encode(&mut buf)?;
        assert_eq!(buf, [0x00, 0x02, 0x00, 0x00, 0x38, 0x02, 0x00, 0x5A]);
        assert_eq!(set.to_bytes(), buf);
        Ok(())
    }

    #[test]
    fn test_encode_buffer_size_mismatch() -> Result<()> {
        let cs = pattern();
        let set = ConditionSet::borrowed(&cs)?;

        let mut small = [0xFFu8; 7];
        let err = set.encode(&mut small).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSizeMismatch {
                expected: 8,
                actual: 7
            }
        ));
        assert_eq!(small, [0xFF; 7]);
        assert!(err.is_usage_error());
        assert!(!err.is_format_error());

        let mut large = [0u8; 9];
        assert!(set.encode(&mut large).is_err());
        Ok(())
    }

    #[test]
    fn test_from_bytes_is_owned() -> Result<()> {
        let cs = pattern();
        let borrowed = ConditionSet::borrowed(&cs)?;
        assert!(!borrowed.is_owned());

        let decoded = ConditionSet::from_bytes(&borrowed.to_bytes())?;
        assert!(decoded.is_owned());
        assert_eq!(decoded, borrowed);
        assert_eq!(decoded.to_bytes(), borrowed.to_bytes());
        Ok(())
    }

    #[test]
    fn test_from_bytes_truncated() {
        let err = ConditionSet::from_bytes(&[0x00]).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(DecodeError::Truncated {
                required: 2,
                actual: 1
            })
        ));

        // declares two conditions, carries one
        let err = ConditionSet::from_bytes(&[0x00, 0x02, 0x00, 0x00, 0x38]).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(DecodeError::Truncated {
                required: 8,
                actual: 5
            })
        ));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_from_bytes_unknown_predicate() {
        let bytes = [0x00, 0x02, 0x00, 0x00, 0x01, 0x07, 0x00, 0x02];
        let err = ConditionSet::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(DecodeError::UnknownPredicate { index: 1, code: 7 })
        ));
    }

    #[test]
    fn test_from_bytes_trailing_bytes() -> Result<()> {
        let bytes = [0x00, 0x01, 0x03, 0x00, 0x0A, 0xEE];
        let err = ConditionSet::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(DecodeError::TrailingBytes {
                expected: 5,
                actual: 6
            })
        ));

        let lenient = DecodeOptions {
            allow_trailing_bytes: true,
        };
        let set = ConditionSet::from_bytes_with(&bytes, lenient)?;
        assert_eq!(set.conditions(), &[Condition::new(Predicate::GreaterThan, 10)]);
        Ok(())
    }

    #[test]
    fn test_read_from_consumes_exactly_one_set() -> Result<()> {
        let first = ConditionSet::owned(vec![Condition::new(Predicate::Equals, 1)])?;
        let second = ConditionSet::owned(vec![Condition::data(2), Condition::data(3)])?;

        let mut stream = Vec::new();
        first.write_to(&mut stream)?;
        second.write_to(&mut stream)?;

        let mut cursor = Cursor::new(stream);
        assert_eq!(ConditionSet::read_from(&mut cursor)?, first);
        assert_eq!(ConditionSet::read_from(&mut cursor)?, second);

        let err = ConditionSet::read_from(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(DecodeError::Truncated {
                required: 2,
                actual: 0
            })
        ));
        Ok(())
    }

    #[test]
    fn test_read_from_truncated_body() {
        let mut cursor = Cursor::new(vec![0x00, 0x03, 0x00, 0x00, 0x01]);
        let err = ConditionSet::read_from(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(DecodeError::Truncated {
                required: 11,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_too_many_conditions() {
        let conditions = vec![Condition::default(); MAX_CONDITIONS + 1];
        assert!(matches!(
            ConditionSet::borrowed(&conditions),
            Err(Error::TooManyConditions(65536))
        ));
        assert!(ConditionSet::borrowed(&conditions[..MAX_CONDITIONS]).is_ok());
        assert!(matches!(
            ConditionSet::owned(conditions),
            Err(Error::TooManyConditions(_))
        ));
    }

    #[test]
    fn test_ownership_modes() -> Result<()> {
        let cs = pattern();
        let view = ConditionSet::borrowed(&cs)?;

        let cloned = view.clone();
        assert!(!cloned.is_owned());
        assert_eq!(cloned.conditions().as_ptr(), cs.as_ptr());

        let owned = view.into_owned();
        assert!(owned.is_owned());
        assert_ne!(owned.conditions().as_ptr(), cs.as_ptr());

        let owned_clone = owned.clone();
        assert!(owned_clone.is_owned());
        assert_ne!(owned_clone.conditions().as_ptr(), owned.conditions().as_ptr());
        assert_eq!(owned_clone, owned);
        Ok(())
    }

    #[test]
    fn test_display() -> Result<()> {
        let cs = pattern();
        let set = ConditionSet::borrowed(&cs)?;
        assert_eq!(set.to_string(), "[==56, <90]");
        assert_eq!(ConditionSet::borrowed(&[])?.to_string(), "[]");
        Ok(())
    }
}
