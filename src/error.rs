use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch of {url} failed after {attempts} attempts")]
    FetchExhausted { url: String, attempts: u32 },

    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error for {collection}/{key}: {message}")]
    Store {
        collection: String,
        key: String,
        message: String,
    },

    #[error("Unknown job: {0}")]
    UnknownJob(String),
}

impl ScraperError {
    pub fn store(collection: &str, key: &str, message: impl Into<String>) -> Self {
        ScraperError::Store {
            collection: collection.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
