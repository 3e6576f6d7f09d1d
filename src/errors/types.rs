use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to enumerate {resource}: {message}")]
    Enumeration { resource: String, message: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed network prefix '{network}' on {id}: {reason}")]
    MalformedPrefix {
        id: String,
        network: String,
        reason: String,
    },

    #[error("{resource} is located in another region ({})", region.as_deref().unwrap_or("unknown"))]
    WrongRegion {
        resource: String,
        region: Option<String>,
    },

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Wrap a provider failure raised while paging through `resource`.
    pub fn enumeration(resource: impl Into<String>, source: impl std::fmt::Display) -> Self {
        AuditError::Enumeration {
            resource: resource.into(),
            message: source.to_string(),
        }
    }
}
