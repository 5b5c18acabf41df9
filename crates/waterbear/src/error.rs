use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaterbearError {
    /// The key is absent, no mapping operation carries its name, and the
    /// proxy has no default policy.
    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Serialization unsupported: {0}")]
    SerializationUnsupported(String),

    #[error("Unknown field `{field}` for schema {schema}")]
    UnknownSchemaField { field: String, schema: &'static str },

    #[error("Reserved name `{0}` cannot be used here")]
    ReservedName(String),

    #[error("Unknown policy name: {0}")]
    UnknownPolicy(String),

    #[error("Policy `{name}` expects {expected}")]
    InvalidPolicy { name: String, expected: &'static str },

    #[error("Unknown default factory: {0}")]
    UnknownFactory(String),

    #[error("Malformed proxy state: {0}")]
    MalformedState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WaterbearError {
    /// True for the error raised when an optional field is simply absent.
    pub fn is_missing_key(&self) -> bool {
        matches!(self, WaterbearError::MissingKey(_))
    }
}

pub type Result<T> = std::result::Result<T, WaterbearError>;
