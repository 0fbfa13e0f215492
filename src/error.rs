use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("corrupted config file {}: {message}", file.display())]
    CorruptedConfig { file: PathBuf, message: String },

    #[error("config file {} is not up to date (version {found}, expected {expected}); run the config migration first", file.display())]
    ConfigNotUpToDate {
        file: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("unsupported config version {found} in {} (this tool supports version {expected})", file.display())]
    UnsupportedConfigVersion {
        file: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("you must log in to run this command")]
    NotLoggedIn,

    #[error("context \"{0}\" does not exist")]
    ContextNotFound(String),

    #[error("context \"{0}\" already exists")]
    ContextAlreadyExists(String),

    #[error("context name must not be empty")]
    EmptyContextName,

    #[error("environment \"{0}\" not found; list available environments with `environment list`")]
    EnvironmentNotFound(String),

    #[error("credential \"{0}\" not found")]
    CredentialNotFound(String),

    #[error("platform \"{0}\" not found")]
    PlatformNotFound(String),

    #[error("kafka cluster \"{0}\" not found; list available clusters with `kafka cluster list`")]
    KafkaClusterNotFound(String),

    #[error("no active kafka cluster; set one with `kafka cluster use` or pass the cluster flag")]
    NoActiveKafkaCluster,

    #[error("invalid api-key {key} for cluster {cluster}")]
    InvalidApiKey { key: String, cluster: String },

    #[error("no secret for api-key {key} of cluster {cluster} is stored locally; run `api-key store {key} --resource {cluster}`")]
    UnconfiguredApiSecret { key: String, cluster: String },

    #[error("unable to obtain information for {0}: no remote client available")]
    NoClient(String),

    #[error("the environment flag cannot be used with an API key login")]
    EnvironmentFlagWithApiKey,

    #[error("unknown credential type for context \"{0}\"")]
    InvalidCredentialKind(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    pub fn corrupted(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::CorruptedConfig {
            file: file.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
