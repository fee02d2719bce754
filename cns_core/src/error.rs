//! Structured error taxonomy for the recipe builder core.
//!
//! Follows the same `failure`-based wrapping pattern used elsewhere in this
//! codebase (see the vault and helm error types): a private `Context`-backed
//! struct implements `Fail`/`Display`, and an `ErrorKind` enum carries the
//! four kinds callers need to branch on.

use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};

/// The error taxonomy surfaced by the core. HTTP/CLI layers map these to
/// status codes / exit codes.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "{}", _0)]
    InvalidRequest(String),

    #[fail(display = "{}", _0)]
    NotFound(String),

    #[fail(display = "{}", _0)]
    Timeout(String),

    #[fail(display = "{}", _0)]
    Internal(String),
}

impl ErrorKind {
    /// Short machine-readable label, used by HTTP/CLI mapping and by tests.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest(_) => "invalid-request",
            ErrorKind::NotFound(_) => "not-found",
            ErrorKind::Timeout(_) => "timeout",
            ErrorKind::Internal(_) => "internal",
        }
    }
}

#[derive(Debug)]
pub struct CnsError {
    inner: Context<ErrorKind>,
    /// Stage name the failure happened in, e.g. "store.load", "builder.merge".
    pub stage: Option<String>,
    /// Recipe/overlay name in play when the failure happened, if any.
    pub overlay: Option<String>,
    /// File/data path in play when the failure happened, if any.
    pub path: Option<String>,
}

impl Fail for CnsError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }
    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}
impl Display for CnsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}
impl From<ErrorKind> for CnsError {
    fn from(kind: ErrorKind) -> CnsError {
        CnsError { inner: Context::new(kind), stage: None, overlay: None, path: None }
    }
}
impl From<Context<ErrorKind>> for CnsError {
    fn from(inner: Context<ErrorKind>) -> CnsError {
        CnsError { inner, stage: None, overlay: None, path: None }
    }
}

pub type Result<T> = std::result::Result<T, CnsError>;

impl CnsError {
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        ErrorKind::InvalidRequest(msg.into()).into()
    }
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        ErrorKind::NotFound(msg.into()).into()
    }
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        ErrorKind::Timeout(msg.into()).into()
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        ErrorKind::Internal(msg.into()).into()
    }

    pub fn kind(&self) -> &ErrorKind {
        self.inner.get_context()
    }

    pub fn with_stage<S: Into<String>>(mut self, stage: S) -> Self {
        self.stage = Some(stage.into());
        self
    }
    pub fn with_overlay<S: Into<String>>(mut self, overlay: S) -> Self {
        self.overlay = Some(overlay.into());
        self
    }
    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl From<std::io::Error> for CnsError {
    fn from(e: std::io::Error) -> Self {
        CnsError::internal(format!("io error: {}", e))
    }
}
impl From<serde_yaml::Error> for CnsError {
    fn from(e: serde_yaml::Error) -> Self {
        CnsError::invalid_request(format!("yaml parse error: {}", e))
    }
}
impl From<serde_json::Error> for CnsError {
    fn from(e: serde_json::Error) -> Self {
        CnsError::invalid_request(format!("json parse error: {}", e))
    }
}
impl From<walkdir::Error> for CnsError {
    fn from(e: walkdir::Error) -> Self {
        CnsError::internal(format!("walk error: {}", e))
    }
}
