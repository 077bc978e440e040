use core::fmt;

/// Errors that can occur while decoding a base-36 ID.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Base36Error {
    /// The input had no digits.
    Empty,
    /// The input contained a byte outside `[0-9a-zA-Z]`.
    InvalidChar {
        /// The offending byte.
        byte: u8,
    },
    /// The decoded value does not fit in a `u64`.
    Overflow,
}

impl fmt::Display for Base36Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty base-36 string"),
            Self::InvalidChar { byte } => write!(f, "invalid base-36 byte: {byte:#04x}"),
            Self::Overflow => write!(f, "base-36 value overflows u64"),
        }
    }
}

impl core::error::Error for Base36Error {}
