use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("{0}")]
    Other(String),
}

impl HarvestError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        HarvestError::Browser(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
