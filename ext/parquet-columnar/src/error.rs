use thiserror::Error;

/// Core error type for Parquet operations
#[derive(Error, Debug)]
pub enum ParquetError {
    /// IO errors from the underlying reader or writer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the structured record codec used for headers and footers
    #[error("Thrift error: {0}")]
    Thrift(#[from] thrift::Error),

    /// Malformed on-disk data: bad headers, sizes, page types or encodings
    #[error("Format error: {0}")]
    Format(String),

    /// Schema-related errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// A value does not fit the column it is written to
    #[error("Data mismatch: {0}")]
    DataMismatch(String),

    /// Decoded or buffered bytes exceeded the configured ceiling
    #[error("Memory ceiling exceeded: requested {requested} bytes with {used} in use, ceiling is {ceiling}")]
    ResourceExhausted {
        requested: usize,
        used: usize,
        ceiling: usize,
    },

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unsupported operation errors
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal errors that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Parquet operations
pub type Result<T> = std::result::Result<T, ParquetError>;

impl ParquetError {
    /// Create a new format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        ParquetError::Format(msg.into())
    }

    /// Create a new schema error
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        ParquetError::Schema(msg.into())
    }

    /// Create a new data mismatch error
    pub fn data_mismatch<S: Into<String>>(msg: S) -> Self {
        ParquetError::DataMismatch(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ParquetError::InvalidArgument(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        ParquetError::Unsupported(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        ParquetError::Internal(msg.into())
    }

    /// Whether this error came from malformed on-disk data.
    pub fn is_format_error(&self) -> bool {
        matches!(self, ParquetError::Format(_) | ParquetError::Thrift(_))
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ParquetError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| wrap(ctx.into(), e.into()))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| wrap(f().into(), e.into()))
    }
}

/// Prefixes the message while keeping the error category, so callers can
/// still tell a format error from an I/O error after context was added.
fn wrap(ctx: String, err: ParquetError) -> ParquetError {
    match err {
        ParquetError::Io(e) => {
            ParquetError::Io(std::io::Error::new(e.kind(), format!("{}: {}", ctx, e)))
        }
        ParquetError::Thrift(e) => ParquetError::Format(format!("{}: {}", ctx, e)),
        ParquetError::Format(msg) => ParquetError::Format(format!("{}: {}", ctx, msg)),
        ParquetError::Schema(msg) => ParquetError::Schema(format!("{}: {}", ctx, msg)),
        ParquetError::DataMismatch(msg) => ParquetError::DataMismatch(format!("{}: {}", ctx, msg)),
        ParquetError::InvalidArgument(msg) => {
            ParquetError::InvalidArgument(format!("{}: {}", ctx, msg))
        }
        ParquetError::Unsupported(msg) => ParquetError::Unsupported(format!("{}: {}", ctx, msg)),
        exhausted @ ParquetError::ResourceExhausted { .. } => exhausted,
        other => ParquetError::Internal(format!("{}: {}", ctx, other)),
    }
}
