use thiserror::Error;

/// Coarse failure classes shared by every crate in the workspace.
///
/// Crate-level error enums map onto one of these through `kind()` so callers
/// can decide whether to render a failure as text or abort the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input or missing credential/configuration.
    InvalidArgument,
    /// A third-party HTTP dependency failed or returned garbage.
    ExternalService,
    /// File missing, unsupported extension or unreadable contents.
    ResourceAccess,
    /// Anything else (I/O on our own files, serialization).
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::ExternalService => "external_service",
            ErrorKind::ResourceAccess => "resource_access",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("{0}")]
    Other(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Io(_) => ErrorKind::ResourceAccess,
            CoreError::InvalidConfig { .. } => ErrorKind::InvalidArgument,
            CoreError::Other(_) => ErrorKind::Internal,
        }
    }
}
