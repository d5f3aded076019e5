pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Query tool failed: {message}")]
    QueryTool { message: String },

    #[error("Query tool returned a non-numeric line: {line}")]
    QueryParse { line: String },

    #[error("Query tool returned no data lines")]
    EmptyResponse,

    #[error("Unknown material property: {name}")]
    UnknownProperty { name: String },

    #[error("Grid shape mismatch: got {actual} values, expected {expected} ({num_x} x {num_y})")]
    ShapeMismatch {
        actual: usize,
        expected: usize,
        num_x: usize,
        num_y: usize,
    },

    #[error("Unsupported array file: {message}")]
    BadArrayFile { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn query_tool(message: impl Into<String>) -> Self {
        Error::QueryTool {
            message: message.into(),
        }
    }
}
