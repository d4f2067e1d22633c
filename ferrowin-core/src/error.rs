//! Common error types.

use std::error::Error;
use std::fmt::{self, Display};

/// A general error that may occur while creating or driving a window.
#[derive(Debug)]
pub enum RequestError {
    /// The creation options were malformed.
    Config(ConfigError),
    /// The operation is not supported by the backend.
    NotSupported(NotSupportedError),
    /// The OS cannot perform the operation.
    Os(OsError),
    /// The platform context has shut down.
    Terminated,
    /// The request was made from the platform thread and would wait on itself.
    Reentrant,
}

impl Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Config(err) => err.fmt(f),
            RequestError::NotSupported(err) => err.fmt(f),
            RequestError::Os(err) => err.fmt(f),
            RequestError::Terminated => f.write_str("the platform context has shut down"),
            RequestError::Reentrant => {
                f.write_str("the request was made from the platform thread it waits on")
            },
        }
    }
}

impl Error for RequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RequestError::Config(err) => Some(err),
            RequestError::NotSupported(err) => Some(err),
            RequestError::Os(err) => Some(err),
            RequestError::Terminated | RequestError::Reentrant => None,
        }
    }
}

impl From<ConfigError> for RequestError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<NotSupportedError> for RequestError {
    fn from(value: NotSupportedError) -> Self {
        Self::NotSupported(value)
    }
}

impl From<OsError> for RequestError {
    fn from(value: OsError) -> Self {
        Self::Os(value)
    }
}

/// Malformed window creation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The constructor was not given an options object.
    MissingOptions,
    /// The style contains bits that are not a known [`WindowStyle`].
    ///
    /// [`WindowStyle`]: crate::window::WindowStyle
    UnknownStyle(u32),
    /// The caption contains an interior NUL byte.
    InvalidCaption,
    /// An icon or splash path was given but empty.
    EmptyPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingOptions => {
                f.write_str("window constructor requires configuration object")
            },
            ConfigError::UnknownStyle(bits) => write!(f, "unknown window style bits: {bits:#x}"),
            ConfigError::InvalidCaption => f.write_str("window caption contains a NUL byte"),
            ConfigError::EmptyPath => f.write_str("icon or splash path is empty"),
        }
    }
}

impl Error for ConfigError {}

/// The error type for when the requested operation is not supported by the backend.
#[derive(Clone, Debug)]
pub struct NotSupportedError {
    reason: &'static str,
}

impl NotSupportedError {
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

impl Display for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation is not supported: {}", self.reason)
    }
}

impl Error for NotSupportedError {}

/// The error type for when the OS cannot perform the requested operation.
#[derive(Debug)]
pub struct OsError {
    line: u32,
    file: &'static str,
    error: Box<dyn Error + Send + Sync + 'static>,
}

impl OsError {
    pub fn new(
        line: u32,
        file: &'static str,
        error: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        Self { line, file, error: error.into() }
    }
}

impl Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("os error at {}:{}: {}", self.file, self.line, self.error))
    }
}

impl Error for OsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Build an [`OsError`] tagged with the current source location.
#[macro_export]
macro_rules! os_error {
    ($error:expr) => {{
        $crate::error::OsError::new(line!(), file!(), $error)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    // Eat attributes for testing
    #[test]
    fn ensure_fmt_does_not_panic() {
        let _ = format!(
            "{:?}, {}",
            NotSupportedError::new("splash"),
            NotSupportedError::new("splash").clone()
        );
        let _ = format!("{:?}, {}", RequestError::Terminated, RequestError::Reentrant);
    }

    #[test]
    fn os_error_carries_location() {
        let err = os_error!("XOpenDisplay failed");
        let text = err.to_string();
        assert!(text.starts_with("os error at "));
        assert!(text.contains("error.rs"));
        assert!(text.ends_with("XOpenDisplay failed"));
    }

    #[test]
    fn missing_options_message() {
        let err = RequestError::from(ConfigError::MissingOptions);
        assert_eq!(err.to_string(), "window constructor requires configuration object");
        assert!(err.source().is_some());
    }
}
