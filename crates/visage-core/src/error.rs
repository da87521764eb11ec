use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid encoding vector: {0}")]
    InvalidVector(String),

    #[error("identity name must not be empty")]
    EmptyName,

    #[error("an identity named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("{given} encodings given, at most {max} are allowed per identity")]
    CapacityExceeded { given: usize, max: usize },

    #[error("identity '{name}' already holds the maximum of {max} encodings")]
    CapacityReached { name: String, max: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` for failures the caller can correct (bad input or
    /// a policy violation), as opposed to persistence or I/O failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidVector(_)
                | Self::EmptyName
                | Self::DuplicateName { .. }
                | Self::CapacityExceeded { .. }
                | Self::CapacityReached { .. }
        )
    }

    /// Returns `true` when the error indicates the entity was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
