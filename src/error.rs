use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogicadError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Malformed table output: {0}")]
    Table(String),
    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, LogicadError>;

// Helper conversions
impl From<std::io::Error> for LogicadError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
