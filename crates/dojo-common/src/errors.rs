use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("state file error: {0}")]
    StateError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DojoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("invalid route: {0}")]
    Route(String),

    #[error("{0}")]
    Other(String),
}
