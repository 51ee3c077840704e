use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No variable matching '{pattern}' in dataset. vars={available:?}")]
    VariableNotFound {
        pattern: String,
        available: Vec<String>,
    },

    #[error("Couldn't find {axis} names in coords/vars: {searched:?}")]
    CoordinateNotFound { axis: String, searched: Vec<String> },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Output file {path} cannot be appended to: {source}")]
    OutputUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessingError {
    /// Process exit code for a failure that ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessingError::Config(_)
            | ProcessingError::Settings(_)
            | ProcessingError::Validation(_) => 2,
            ProcessingError::OutputUnavailable { .. } => 3,
            _ => 1,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProcessingError::HttpStatus { status, .. } => Some(*status),
            ProcessingError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
