use std::fmt;

use serde::{de, ser};

use crate::compress::CompressionError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed failure produced by a [`Blob`][crate::Blob] capability.
pub type CapabilityError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where inside a composite value a nested failure happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    /// The n-th element of a sequence.
    Element(usize),
    /// The key of the n-th pair in a map.
    MapKey(usize),
    /// The value of the n-th pair in a map.
    MapValue(usize),
    /// The name of the n-th pair in a record.
    FieldName(usize),
    /// The value of a named record field.
    Field(String),
    /// The n-th top-level value read from a stream.
    Stream(u64),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Location::Element(i) => write!(f, "element {}", i),
            Location::MapKey(i) => write!(f, "key of map pair {}", i),
            Location::MapValue(i) => write!(f, "value of map pair {}", i),
            Location::FieldName(i) => write!(f, "name of record pair {}", i),
            Location::Field(name) => write!(f, "field `{}`", name),
            Location::Stream(i) => write!(f, "stream value {}", i),
        }
    }
}

/// The root cause category of an [`Error`], with any positional wrapping removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnexpectedEof,
    InvalidType,
    MalformedData,
    Capability,
    Serde,
    ParseLimit,
    LengthTooLong,
    Compression,
    Io,
}

#[derive(Debug)]
pub enum Error {
    /// Fewer bytes remain than a header declares.
    UnexpectedEof {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// The byte pattern matches no valid encoding for the expected shape, or the value doesn't
    /// fit the shape it is being encoded with.
    InvalidType(String),
    /// The encoding is internally inconsistent: a disallowed negative length, invalid UTF-8, an
    /// unknown field name, a misaligned composite payload, a non-minimal integer...
    MalformedData(String),
    /// A nil/indirection header ran past the end of the input. Reported as
    /// [`ErrorKind::MalformedData`].
    TruncatedHeader { step: &'static str },
    /// A blob's own serialize/deserialize logic failed. The inner error is passed through as-is.
    Capability(CapabilityError),
    /// Occurs when serde serialization or deserialization fails
    SerdeFail(String),
    /// Hit the nesting depth limit.
    ParseLimit(String),
    /// Input or output was greater than the maximum allowed size.
    LengthTooLong { max: usize, actual: usize },
    /// The compression wrapper failed.
    Compression(CompressionError),
    /// The underlying reader or writer failed.
    Io(std::io::Error),
    /// A failure inside a composite value. `offset` is the number of bytes between the start of
    /// the enclosing unit and the start of the failing one.
    Nested {
        offset: usize,
        location: Location,
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn nested(self, offset: usize, location: Location) -> Self {
        Error::Nested {
            offset,
            location,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all positional wrapping stripped off.
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Error::Nested { source, .. } = err {
            err = source;
        }
        err
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::UnexpectedEof { .. } => ErrorKind::UnexpectedEof,
            Error::InvalidType(_) => ErrorKind::InvalidType,
            Error::MalformedData(_) | Error::TruncatedHeader { .. } => ErrorKind::MalformedData,
            Error::Capability(_) => ErrorKind::Capability,
            Error::SerdeFail(_) => ErrorKind::Serde,
            Error::ParseLimit(_) => ErrorKind::ParseLimit,
            Error::LengthTooLong { .. } => ErrorKind::LengthTooLong,
            Error::Compression(_) => ErrorKind::Compression,
            Error::Io(_) => ErrorKind::Io,
            Error::Nested { .. } => unreachable!("root() never returns a nested error"),
        }
    }

    /// Absolute byte offset of the failing unit, measured from the start of the outermost value
    /// that was being decoded (or, for stream readers, from the start of the stream).
    pub fn offset(&self) -> usize {
        let mut total = 0;
        let mut err = self;
        while let Error::Nested { offset, source, .. } = err {
            total += offset;
            err = source;
        }
        total
    }

    pub fn is_eof(&self) -> bool {
        self.kind() == ErrorKind::UnexpectedEof
    }

    /// Decoding stopped at the end of the input, so more bytes appended to it could let it
    /// finish.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self.root(),
            Error::UnexpectedEof { .. } | Error::TruncatedHeader { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnexpectedEof {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Unexpected end of data: expected {} bytes, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::InvalidType(ref err) => write!(f, "Invalid type: {}", err),
            Error::MalformedData(ref err) => write!(f, "Malformed data: {}", err),
            Error::TruncatedHeader { step } => {
                write!(f, "Malformed data: nil header cut short on step [{}]", step)
            }
            Error::Capability(ref err) => write!(f, "Blob capability failed: {}", err),
            Error::SerdeFail(ref msg) => f.write_str(msg),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Data too long: was {} bytes, maximum allowed is {}",
                actual, max
            ),
            Error::Compression(ref err) => write!(f, "Compression failure: {}", err),
            Error::Io(ref err) => write!(f, "I/O failure: {}", err),
            Error::Nested {
                offset,
                ref location,
                ref source,
            } => write!(f, "at +{} ({}): {}", offset, location, source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Capability(ref err) => Some(err.as_ref()),
            Error::Compression(ref err) => Some(err),
            Error::Io(ref err) => Some(err),
            Error::Nested { ref source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<CompressionError> for Error {
    fn from(e: CompressionError) -> Self {
        Self::Compression(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

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
