use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Service endpoint unreachable: {0}")]
    EndpointUnreachable(String),

    #[error("Service endpoint is not set; resolve an address first")]
    EndpointUnset,

    #[error("Invalid service address: {0}")]
    InvalidAddress(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not authenticated; please log in first")]
    NotAuthenticated,

    #[error("Cannot change role to Validator while mining is in progress")]
    RoleConflict,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Only miners can process transactions; current role is {0}")]
    RoleNotMiner(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("A transaction is already in flight for this workflow")]
    Busy,

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ClientError {
    /// True for failures raised before any request left the process.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidAddress(_)
                | ClientError::MissingInput(_)
                | ClientError::RoleConflict
                | ClientError::Busy
                | ClientError::EndpointUnset
                | ClientError::NotAuthenticated
        )
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<sled::Error> for ClientError {
    fn from(err: sled::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<base64::DecodeError> for ClientError {
    fn from(err: base64::DecodeError) -> Self {
        ClientError::Serialization(format!("invalid base64: {err}"))
    }
}

// reqwest folds timeouts, refused connections and body read failures into one
// type; all of them are transport failures from the caller's point of view.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}
