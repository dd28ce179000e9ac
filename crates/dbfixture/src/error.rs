//! Error types for fixture operations.

use std::fmt::{self, Display};

use thiserror::Error;

/// Coarse classification of a [`FixtureError`].
///
/// Driver-specific variants all collapse into [`ErrorKind::DbFailure`] so callers
/// can pick an exit code or retry policy without matching every driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid CLI input, configuration or driver name.
    BadArgs,
    /// A column was referenced but is absent from the row or schema.
    BadKeyAccess,
    /// A JSON or column value could not be coerced to the requested type.
    BadConversion,
    /// A column type outside the canonical set.
    Unsupported,
    /// Any error reported by a database driver or transport.
    DbFailure,
    /// Stream read/write failure, including malformed JSON input.
    IoFailure,
}

/// Main error type for fixture operations.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Invalid arguments or configuration.
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Column referenced but not present.
    #[error("Key '{key}' not found in {container}")]
    BadKeyAccess { key: String, container: String },

    /// Value coercion failed.
    #[error("Cannot convert {from} to {to}: {message}")]
    BadConversion {
        from: String,
        to: String,
        message: String,
    },

    /// Column type has no canonical mapping for the requested operation.
    #[error("Unsupported column type '{data_type}'")]
    Unsupported { data_type: String },

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// PostgreSQL (and Spanner PostgreSQL interface) driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Connection setup error that has no driver error type (TLS, URL parsing).
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO error (stdin/stdout, files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or encode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Another error annotated with key/value pairs (table, column, statement).
    #[error("{inner} ({})", format_pairs(.pairs))]
    Context {
        inner: Box<FixtureError>,
        pairs: Vec<(String, String)>,
    },
}

fn format_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

impl FixtureError {
    /// Create a BadConversion error.
    pub fn conversion(
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        FixtureError::BadConversion {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Create a BadKeyAccess error.
    pub fn bad_key(key: impl Into<String>, container: impl Into<String>) -> Self {
        FixtureError::BadKeyAccess {
            key: key.into(),
            container: container.into(),
        }
    }

    /// Create an Unsupported error.
    pub fn unsupported(data_type: impl Into<String>) -> Self {
        FixtureError::Unsupported {
            data_type: data_type.into(),
        }
    }

    /// Attach a key/value pair. Repeated calls accumulate on one context layer.
    pub fn with_context(self, key: impl Into<String>, value: impl Display) -> Self {
        match self {
            FixtureError::Context { inner, mut pairs } => {
                pairs.push((key.into(), value.to_string()));
                FixtureError::Context { inner, pairs }
            }
            other => FixtureError::Context {
                inner: Box::new(other),
                pairs: vec![(key.into(), value.to_string())],
            },
        }
    }

    /// The innermost error, skipping context layers.
    pub fn root(&self) -> &FixtureError {
        match self {
            FixtureError::Context { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// All context pairs, innermost first.
    pub fn context_pairs(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        let mut current = self;
        while let FixtureError::Context { inner, pairs } = current {
            out.extend(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            current = inner;
        }
        out
    }

    /// Classify the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            FixtureError::BadArgs(_) | FixtureError::Yaml(_) => ErrorKind::BadArgs,
            FixtureError::BadKeyAccess { .. } => ErrorKind::BadKeyAccess,
            FixtureError::BadConversion { .. } => ErrorKind::BadConversion,
            FixtureError::Unsupported { .. } => ErrorKind::Unsupported,
            FixtureError::Mysql(_)
            | FixtureError::Postgres(_)
            | FixtureError::Sqlite(_)
            | FixtureError::Connection(_) => ErrorKind::DbFailure,
            FixtureError::Io(_) | FixtureError::Json(_) => ErrorKind::IoFailure,
            FixtureError::Context { .. } => unreachable!("root() never returns a context layer"),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::BadArgs => 2,
            ErrorKind::BadKeyAccess | ErrorKind::BadConversion | ErrorKind::Unsupported => 3,
            ErrorKind::DbFailure => 4,
            ErrorKind::IoFailure => 5,
        }
    }

    /// Format error with the innermost cause, its chain, and every context pair.
    pub fn format_detailed(&self) -> String {
        let root = self.root();
        let mut output = format!("Error: {}\n", root);

        for (key, value) in self.context_pairs() {
            output.push_str(&format!("  {}: {}\n", key, value));
        }

        let mut source = std::error::Error::source(root);
        if source.is_some() {
            output.push_str("\nCaused by:\n");
        }
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("  {}: {}\n", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Attach context to fallible results.
pub trait ResultExt<T> {
    /// Annotate the error (if any) with a key/value pair.
    fn context(self, key: &str, value: impl Display) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FixtureError>,
{
    fn context(self, key: &str, value: impl Display) -> Result<T> {
        self.map_err(|e| e.into().with_context(key, value))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::BadArgs => "bad arguments",
            ErrorKind::BadKeyAccess => "bad key access",
            ErrorKind::BadConversion => "bad conversion",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::DbFailure => "database failure",
            ErrorKind::IoFailure => "io failure",
        };
        f.write_str(name)
    }
}

/// Result type alias for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;
