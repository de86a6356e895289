//! Error types, one per pipeline stage.
//!
//! Every stage reports the position in the source where things went wrong. The umbrella
//! [`YamlError`] is what the [`Engine`](crate::Engine) entry points return.

use std::fmt;

use thiserror::Error;

use crate::reader::Marker;

/// Renders ` at line L column C` (1-based, as editors show them).
struct At<'a>(&'a Marker);

impl fmt::Display for At<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {} column {}", self.0.line(), self.0.col() + 1)
    }
}

/// The input could not be decoded, or it contains a character YAML does not allow.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{info}: {encoding} stream, byte offset {offset}, at {}", At(.mark))]
pub struct ReaderError {
    /// Position (in characters) of the offending character.
    pub mark: Marker,
    /// Byte offset in the undecoded input, when the source was bytes.
    pub offset: usize,
    /// Name of the encoding the stream was decoded with.
    pub encoding: &'static str,
    /// Human readable description.
    pub info: String,
}

/// A malformed token.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ScanError {
    #[error("{info} at {}", At(.mark))]
    Token { mark: Marker, info: String },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl ScanError {
    /// Creates a new error from a location and an error string.
    #[must_use]
    pub fn new(mark: Marker, info: &str) -> ScanError {
        ScanError::Token {
            mark,
            info: info.to_owned(),
        }
    }

    /// Return the marker pointing to the error in the source.
    #[must_use]
    pub fn marker(&self) -> &Marker {
        match self {
            ScanError::Token { mark, .. } | ScanError::Reader(ReaderError { mark, .. }) => mark,
        }
    }

    /// Return the information string describing the error that happened.
    #[must_use]
    pub fn info(&self) -> &str {
        match self {
            ScanError::Token { info, .. } | ScanError::Reader(ReaderError { info, .. }) => info,
        }
    }
}

/// A structurally invalid event sequence.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParserError {
    #[error("{info} at {}", At(.mark))]
    Grammar { mark: Marker, info: String },
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl ParserError {
    #[must_use]
    pub fn new(mark: Marker, info: &str) -> ParserError {
        ParserError::Grammar {
            mark,
            info: info.to_owned(),
        }
    }

    #[must_use]
    pub fn marker(&self) -> &Marker {
        match self {
            ParserError::Grammar { mark, .. } => mark,
            ParserError::Scan(e) => e.marker(),
        }
    }
}

impl From<ReaderError> for ParserError {
    fn from(e: ReaderError) -> Self {
        ParserError::Scan(ScanError::Reader(e))
    }
}

/// Node graph could not be assembled (e.g. an alias to an unknown anchor).
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ComposerError {
    #[error("{info} at {}", At(.mark))]
    Graph { mark: Marker, info: String },
    #[error(transparent)]
    Parse(#[from] ParserError),
}

impl ComposerError {
    #[must_use]
    pub fn new(mark: Marker, info: &str) -> ComposerError {
        ComposerError::Graph {
            mark,
            info: info.to_owned(),
        }
    }
}

/// A node could not be turned into a native value.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{info} (tag {tag}) at {}", At(.mark))]
pub struct ConstructorError {
    pub mark: Marker,
    pub tag: String,
    pub info: String,
}

impl ConstructorError {
    #[must_use]
    pub fn new(mark: Marker, tag: &str, info: &str) -> ConstructorError {
        ConstructorError {
            mark,
            tag: tag.to_owned(),
            info: info.to_owned(),
        }
    }
}

/// A native value could not be turned into a node.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{info}")]
pub struct RepresenterError {
    pub info: String,
}

impl RepresenterError {
    #[must_use]
    pub fn new(info: &str) -> RepresenterError {
        RepresenterError {
            info: info.to_owned(),
        }
    }
}

/// Writing the YAML text failed.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmitError {
    #[error("formatting error: {0}")]
    FmtError(#[from] fmt::Error),
    #[error("indentation of {0} is out of the 1 to 9 range")]
    BadIndent(usize),
}

/// Any failure of a load or dump through [`Engine`](crate::Engine).
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum YamlError {
    #[error(transparent)]
    Reader(ReaderError),
    #[error(transparent)]
    Scanner(ScanError),
    #[error(transparent)]
    Parser(ParserError),
    #[error(transparent)]
    Composer(ComposerError),
    #[error(transparent)]
    Constructor(#[from] ConstructorError),
    #[error(transparent)]
    Representer(#[from] RepresenterError),
    #[error(transparent)]
    Emitter(#[from] EmitError),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<ReaderError> for YamlError {
    fn from(e: ReaderError) -> Self {
        YamlError::Reader(e)
    }
}

impl From<ScanError> for YamlError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Reader(e) => YamlError::Reader(e),
            e => YamlError::Scanner(e),
        }
    }
}

impl From<ParserError> for YamlError {
    fn from(e: ParserError) -> Self {
        match e {
            ParserError::Scan(e) => e.into(),
            e => YamlError::Parser(e),
        }
    }
}

impl From<ComposerError> for YamlError {
    fn from(e: ComposerError) -> Self {
        match e {
            ComposerError::Parse(e) => e.into(),
            e => YamlError::Composer(e),
        }
    }
}

impl From<std::io::Error> for YamlError {
    fn from(e: std::io::Error) -> Self {
        YamlError::Io(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flatten_nested_errors() {
        let e = ComposerError::Parse(ParserError::Scan(ScanError::new(
            Marker::new(3, 1, 3),
            "bad",
        )));
        let e: YamlError = e.into();
        assert!(matches!(e, YamlError::Scanner(_)));
        assert_eq!(e.to_string(), "bad at line 1 column 4");
    }
}
