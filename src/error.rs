use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchSweepError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Target load error: {0}")]
    LoadError(String),

    #[error("Remote operation error: {0}")]
    RemoteError(String),

    #[error("Report write error: {0}")]
    ReportError(String),

    #[error("Log write error: {0}")]
    LogError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`PatchSweepError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl PatchSweepError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a target load error.
    load => LoadError,
    /// Create a remote operation error.
    remote => RemoteError,
    /// Create a report write error.
    report => ReportError,
    /// Create a log write error.
    log => LogError,
}

impl From<serde_yml::Error> for PatchSweepError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for PatchSweepError {
    fn from(e: serde_json::Error) -> Self {
        Self::RemoteError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PatchSweepError>;
