use std::error::Error as StdError;
use std::fmt;
use std::result::Result as StdResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    BadConfiguration,
    BadOperation,
    ImageError,
    InconsistentState,
    IoError,
    MalformedData,
    UnsupportedFeature,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub description: String,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, description: String) -> Error {
        Error {
            kind,
            description,
            source: None,
        }
    }

    pub fn with_source<E: StdError + Send + Sync + 'static>(
        kind: ErrorKind,
        description: String,
        source: E,
    ) -> Error {
        Error {
            kind,
            description,
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{} ({})", self.description, source)
        } else {
            write!(f, "{}", self.description)
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        let description = err.to_string();
        Error::with_source(ErrorKind::IoError, description, err)
    }
}

pub type Result<T> = StdResult<T, Error>;

pub trait IntoResult<T> {
    fn into_result_as<F: FnOnce() -> String>(
        self,
        kind: ErrorKind,
        desc: F,
    ) -> Result<T>;

    fn into_result<F: FnOnce() -> String>(self, desc: F) -> Result<T>
    where
        Self: Sized,
    {
        self.into_result_as(ErrorKind::IoError, desc)
    }

    fn res<F: FnOnce() -> String>(self, desc: F) -> Result<T>
    where
        Self: Sized,
    {
        self.into_result(desc)
    }
}

impl<T, E: StdError + Send + Sync + 'static> IntoResult<T> for StdResult<T, E> {
    fn into_result_as<F: FnOnce() -> String>(
        self,
        kind: ErrorKind,
        desc: F,
    ) -> Result<T> {
        self.map_err(|err| Error::with_source(kind, desc(), err))
    }
}

#[macro_export]
macro_rules! assert_eq_f32 {
    ($a:expr, $b:expr) => {
        $crate::assert_eq_f32!($a, $b, 1e-6)
    };
    ($a:expr, $b:expr, $eps:expr) => {{
        let (a, b) = ($a as f64, $b as f64);
        assert!(
            (a - b).abs() <= $eps as f64,
            "assertion failed: `{} ~= {}` (tolerance {})",
            a,
            b,
            $eps
        );
    }};
}
