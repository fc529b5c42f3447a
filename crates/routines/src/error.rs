use camino::Utf8PathBuf;
use thiserror::Error;

use crate::ObjectKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("define {kind} body in {path} before migrating")]
    EmptyDefinition { kind: ObjectKind, path: Utf8PathBuf },

    #[error("no {kind} definition at {path}")]
    DefinitionNotFound { kind: ObjectKind, path: Utf8PathBuf },

    #[error("no {kind} definitions found for {name}")]
    NoDefinitions { kind: ObjectKind, name: String },

    #[error("{path} already exists")]
    DefinitionExists { path: Utf8PathBuf },

    #[error("{0}")]
    ArgumentConflict(&'static str),

    #[error("{operation}: version is required")]
    MissingVersion { operation: &'static str },

    #[error("{operation} is reversible only if given a revert_to_version")]
    IrreversibleOperation { operation: &'static str },

    #[error("{source} (rolling back also failed: {rollback})")]
    RollbackFailed {
        source: Box<Error>,
        rollback: Box<Error>,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown object kind `{0}`, expected `function` or `aggregate`")]
    InvalidKind(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
