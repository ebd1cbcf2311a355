/// Top-level error type. All public fallible API functions return one of these.
#[derive(Debug, thiserror::Error)]
pub enum BookshelfError {
    #[error("Catalog lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider {provider} returned HTTP {status}")]
    Status { provider: String, status: u16 },

    #[error("Provider {provider} returned malformed response: {message}")]
    Malformed { provider: String, message: String },
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::Network(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Invalid broker URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Broker unreachable: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe to {channel} failed: {message}")]
    Subscribe { channel: String, message: String },

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store backend failure: {0}")]
    Backend(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not build HTTP client: {0}")]
    HttpClient(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
