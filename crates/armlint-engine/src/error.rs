use armlint_core::CoreError;
use armlint_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid selector '{selector}' at offset {offset}: {message}")]
    SelectorSyntax {
        selector: String,
        offset: usize,
        message: String,
    },

    #[error("Invalid rule {rule}: {message}")]
    InvalidRule { rule: String, message: String },

    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Document not loaded: {0}")]
    DocumentNotLoaded(String),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Returned by a rule body that could not evaluate its input.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Unexpected shape at {path}: {message}")]
    UnexpectedShape { path: String, message: String },

    #[error("Invalid rule options: {0}")]
    Options(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML/JSON config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
