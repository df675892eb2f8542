use std::fmt;
use std::io;


/// Errors raised by the outer surfaces of the crate: reading datasets,
/// loading configuration and persisting parameters.
///
/// Shape mismatches and contract violations inside the training path
/// are assertions instead, since they indicate a defect rather than bad input.

#[derive(Debug)]
pub enum Error {
  /// Reading or writing a file failed.
  Io(io::Error),

  /// A data file does not follow the expected IDX layout.
  Format(String),

  /// A configuration or report file could not be (de)serialized.
  Json(serde_json::Error),

  /// A binary checkpoint could not be (de)serialized.
  Encoding(postcard::Error),

  /// A checkpoint does not match the function it gets loaded into.
  Checkpoint(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Io(e) => write!(f, "io error: {e}"),
      Error::Format(msg) => write!(f, "malformed data file: {msg}"),
      Error::Json(e) => write!(f, "json error: {e}"),
      Error::Encoding(e) => write!(f, "checkpoint encoding error: {e}"),
      Error::Checkpoint(msg) => write!(f, "checkpoint mismatch: {msg}"),
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Error::Io(e) => Some(e),
      Error::Json(e) => Some(e),
      Error::Encoding(e) => Some(e),
      Error::Format(_) | Error::Checkpoint(_) => None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(e: io::Error) -> Self {
    Error::Io(e)
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Json(e)
  }
}

impl From<postcard::Error> for Error {
  fn from(e: postcard::Error) -> Self {
    Error::Encoding(e)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn io_errors_convert() {
    let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.to_string(), "io error: gone");
  }

  #[test]
  fn format_message() {
    let err = Error::Format("bad magic 0x1".into());
    assert_eq!(err.to_string(), "malformed data file: bad magic 0x1");
    assert!(std::error::Error::source(&err).is_none());
  }
}
