use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use glob::{GlobError, PatternError};

/// The error type for `hdf5-io` operations.
pub enum Error {
    /// An error reported by the HDF5 library bindings.
    HDF5(hdf5::Error),
    /// A filesystem error (listing directories, creating fixture folders).
    Io(io::Error),
    /// A user error in the high-level API (e.g., unknown key or mismatched dtype).
    Internal(String),
    /// An error that occurred while processing the given file.
    File(PathBuf, Box<Error>),
}

/// A type for results generated by `hdf5-io` functions where the `Err` type is
/// set to `hdf5_io::Error`.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

impl Error {
    /// Annotates the error with the file it occurred in.
    ///
    /// An error that already carries a path is returned unchanged.
    pub fn in_file<P: AsRef<Path>>(self, path: P) -> Self {
        match self {
            err @ Self::File(..) => err,
            err => Self::File(path.as_ref().to_path_buf(), Box::new(err)),
        }
    }

    /// Returns the file this error is attributed to, if any.
    pub fn path(&self) -> Option<&Path> {
        match *self {
            Self::File(ref path, _) => Some(path),
            _ => None,
        }
    }
}

impl From<hdf5::Error> for Error {
    fn from(err: hdf5::Error) -> Self {
        Self::HDF5(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<&str> for Error {
    fn from(desc: &str) -> Self {
        Self::Internal(desc.into())
    }
}

impl From<String> for Error {
    fn from(desc: String) -> Self {
        Self::Internal(desc)
    }
}

impl From<PatternError> for Error {
    fn from(err: PatternError) -> Self {
        format!("invalid glob pattern: {err}").into()
    }
}

impl From<GlobError> for Error {
    fn from(err: GlobError) -> Self {
        let path = err.path().to_path_buf();
        Self::Io(err.into_error()).in_file(path)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HDF5(ref err) => write!(f, "{err}"),
            Self::Io(ref err) => write!(f, "{err}"),
            Self::Internal(ref desc) => f.write_str(desc),
            Self::File(ref path, ref err) => write!(f, "{}: {}", path.display(), err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Self::HDF5(ref err) => Some(err),
            Self::Io(ref err) => Some(err),
            Self::Internal(_) => None,
            Self::File(_, ref err) => Some(err.as_ref()),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            err => Self::new(io::ErrorKind::Other, err),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::error::Error as StdError;
    use std::io;

    use super::{Error, Result};

    #[test]
    pub fn test_display() {
        let err = Error::from("unknown key: /foo");
        assert_eq!(err.to_string(), "unknown key: /foo");
        assert_eq!(format!("{err:?}"), "unknown key: /foo");

        let err = err.in_file("runs/file_0.h5");
        assert_eq!(err.to_string(), "runs/file_0.h5: unknown key: /foo");
    }

    #[test]
    pub fn test_in_file_keeps_innermost_path() {
        let err = Error::from("bad").in_file("a.h5").in_file("b.h5");
        assert_eq!(err.path().unwrap().to_str(), Some("a.h5"));
        assert!(err.source().is_some());
    }

    #[test]
    pub fn test_macros() {
        fn f(x: usize) -> Result<usize> {
            ensure!(x > 0, "x must be positive, got {}", x);
            if x > 10 {
                fail!("x too large");
            }
            Ok(x)
        }
        assert_eq!(f(1).unwrap(), 1);
        assert_eq!(f(0).unwrap_err().to_string(), "x must be positive, got 0");
        assert_eq!(f(11).unwrap_err().to_string(), "x too large");
    }

    #[test]
    pub fn test_glob_conversion() {
        let err = Error::from(glob::Pattern::new("runs/[").unwrap_err());
        assert!(err.to_string().starts_with("invalid glob pattern: "));
        assert!(err.path().is_none());
    }

    #[test]
    pub fn test_io_conversion() {
        let err: io::Error = Error::from(io::Error::new(io::ErrorKind::NotFound, "gone")).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let err: io::Error = Error::from("oops").into();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
