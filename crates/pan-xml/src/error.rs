use std::path::PathBuf;

/// Errors raised while reading, querying or writing a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration is not well-formed XML: {0}")]
    Parse(#[from] xmltree::ParseError),

    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration: {0}")]
    Write(#[from] xmltree::Error),

    #[error("rulebase not found in configuration: {xpath}")]
    ScopeNotFound { xpath: String },

    #[error("document was not loaded from a file")]
    NoSource,

    #[error("refusing to overwrite the source configuration {path}")]
    WouldOverwrite { path: PathBuf },
}

/// Errors raised while interpreting a management API response body.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("response is not well-formed XML: {0}")]
    Parse(#[from] xmltree::ParseError),

    #[error("unexpected response root <{0}>")]
    UnexpectedRoot(String),

    #[error("response has no {0} element")]
    Missing(&'static str),
}
