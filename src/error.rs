use std::fmt;

use serde::{de, ser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The buffer doesn't start with the bookmark magic. Legacy alias records (`alis`) are
    /// rejected here as well, since they use an unrelated layout.
    WrongFormat { magic: [u8; 4] },
    /// The buffer ended before a length it declared.
    TruncatedInput {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// A slot or table of contents points outside the buffer, overruns it, or otherwise can't be
    /// part of a well-formed store. Fatal for the whole decode.
    MalformedStore(String),
    /// A single record's tag and payload disagree. Decoding recovers from this by keeping the raw
    /// record as an opaque value.
    InvalidRecord {
        slot: u32,
        tag: u32,
        reason: String,
    },
    /// A composite record refers back to a slot that is still being resolved.
    CyclicReference { slot: u32 },
    /// A value has no representation in the bookmark format.
    UnencodableValue(String),
    /// Nesting depth or buffer size went past a configured limit.
    ParseLimit(String),
    /// Occurs when serde serialization or deserialization fails
    SerdeFail(String),
}

impl Error {
    /// Soft errors only affect a single record or subtree; decoding carries on past them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidRecord { .. } | Error::CyclicReference { .. }
        )
    }

    pub(crate) fn invalid(slot: u32, tag: u32, reason: impl Into<String>) -> Self {
        Error::InvalidRecord {
            slot,
            tag,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::WrongFormat { ref magic } => {
                if magic == b"alis" {
                    f.write_str("Legacy alias record, not a bookmark")
                } else {
                    write!(f, "Not a bookmark (magic was {:02x?})", magic)
                }
            }
            Error::TruncatedInput {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::MalformedStore(ref err) => write!(f, "Malformed record store: {}", err),
            Error::InvalidRecord {
                slot,
                tag,
                ref reason,
            } => write!(
                f,
                "Invalid record at slot 0x{:x} (tag 0x{:08x}): {}",
                slot, tag, reason
            ),
            Error::CyclicReference { slot } => {
                write!(f, "Record at slot 0x{:x} refers back to itself", slot)
            }
            Error::UnencodableValue(ref err) => write!(f, "Can't encode value: {}", err),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::SerdeFail(ref msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
