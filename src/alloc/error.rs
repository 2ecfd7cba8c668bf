//! Arena error types.

use core::fmt;
use std::error::Error;

/// Errors reported by run allocators.
///
/// Every failing operation leaves the allocator exactly as it was before the
/// call: no run is partially reserved or released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArenaError {
    /// A run longer than a chunk was requested.
    CapacityExceeded {
        /// Requested run length, in slots.
        requested: usize,
        /// Slots per chunk.
        capacity: usize,
    },
    /// The system allocator could not provide memory for new storage.
    AllocationFailure {
        /// Size of the failed request in bytes (0 if the layout overflowed).
        bytes: usize,
    },
    /// The pointer does not address a slot owned by this allocator.
    ForeignPointer,
    /// The run `[offset, offset + len)` would extend past the end of its chunk.
    RunOutOfBounds {
        /// Slot offset of the run within its chunk.
        offset: usize,
        /// Run length passed by the caller.
        len: usize,
        /// Slots per chunk.
        capacity: usize,
    },
    /// Some slot in `[offset, offset + len)` is not currently reserved.
    NotReserved {
        /// Slot offset of the run within its chunk.
        offset: usize,
        /// Run length passed by the caller.
        len: usize,
    },
    /// The run does not match the one recorded at allocation time.
    RunMismatch {
        /// Slot offset of the run within its chunk.
        offset: usize,
        /// Recorded run length starting at `offset`, or `None` if no run starts there.
        expected: Option<usize>,
        /// Run length passed by the caller.
        actual: usize,
    },
    /// The slot already holds a constructed value.
    AlreadyConstructed {
        /// Slot offset within its chunk.
        offset: usize,
    },
    /// The slot does not hold a constructed value.
    NotConstructed {
        /// Slot offset within its chunk.
        offset: usize,
    },
}

impl ArenaError {
    /// Returns `true` for errors caused by arguments that do not describe a
    /// valid run or slot of this allocator.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(
            self,
            Self::CapacityExceeded { .. } | Self::AllocationFailure { .. }
        )
    }
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "run of {requested} slots exceeds chunk capacity of {capacity} slots"
            ),
            Self::AllocationFailure { bytes } => {
                write!(f, "memory allocation of {bytes} bytes failed")
            }
            Self::ForeignPointer => f.write_str("pointer is not a slot owned by this allocator"),
            Self::RunOutOfBounds {
                offset,
                len,
                capacity,
            } => write!(
                f,
                "run of {len} slots at offset {offset} crosses the end of a {capacity}-slot chunk"
            ),
            Self::NotReserved { offset, len } => {
                write!(f, "run of {len} slots at offset {offset} is not fully reserved")
            }
            Self::RunMismatch {
                offset,
                expected: Some(expected),
                actual,
            } => write!(
                f,
                "run at offset {offset} was allocated with {expected} slots, released with {actual}"
            ),
            Self::RunMismatch {
                offset,
                expected: None,
                actual,
            } => write!(
                f,
                "no run starts at offset {offset} (released with {actual} slots)"
            ),
            Self::AlreadyConstructed { offset } => {
                write!(f, "slot at offset {offset} already holds a value")
            }
            Self::NotConstructed { offset } => {
                write!(f, "slot at offset {offset} holds no value")
            }
        }
    }
}

impl Error for ArenaError {}

/// A failed `construct`: the error together with the value that was not placed.
pub struct ConstructError<T> {
    error: ArenaError,
    value: T,
}

impl<T> ConstructError<T> {
    pub(crate) fn new(error: ArenaError, value: T) -> Self {
        Self { error, value }
    }

    /// The reason the value was rejected.
    pub fn error(&self) -> ArenaError {
        self.error
    }

    /// Recovers the rejected value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Splits into the error and the rejected value.
    pub fn into_parts(self) -> (ArenaError, T) {
        (self.error, self.value)
    }
}

impl<T> From<ConstructError<T>> for ArenaError {
    fn from(err: ConstructError<T>) -> Self {
        err.error
    }
}

impl<T> fmt::Debug for ConstructError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for ConstructError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "construct rejected: {}", self.error)
    }
}

impl<T> Error for ConstructError<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_classification() {
        assert!(!ArenaError::CapacityExceeded { requested: 11, capacity: 10 }.is_invalid_argument());
        assert!(!ArenaError::AllocationFailure { bytes: 80 }.is_invalid_argument());
        assert!(ArenaError::ForeignPointer.is_invalid_argument());
        assert!(ArenaError::RunOutOfBounds { offset: 8, len: 4, capacity: 10 }.is_invalid_argument());
    }

    #[test]
    fn display_mentions_lengths() {
        let err = ArenaError::RunMismatch { offset: 6, expected: Some(2), actual: 3 };
        assert_eq!(
            err.to_string(),
            "run at offset 6 was allocated with 2 slots, released with 3"
        );
    }

    #[test]
    fn construct_error_returns_value() {
        let err = ConstructError::new(ArenaError::ForeignPointer, String::from("payload"));
        assert_eq!(err.error(), ArenaError::ForeignPointer);
        assert_eq!(err.into_value(), "payload");
    }
}
