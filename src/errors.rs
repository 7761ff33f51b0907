use miette::Diagnostic;
use thiserror::Error;

use crate::gates::errors::GateError;

#[derive(Debug, Error, Diagnostic)]
pub enum GatehouseError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(gatehouse::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(gatehouse::config))]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Gate(#[from] GateError),

    #[error("{0}")]
    #[diagnostic(code(gatehouse::other))]
    Other(String),
}
