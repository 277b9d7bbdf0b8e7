use apprank_utils::error::{ErrorCategory, UserFriendlyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} '{name}' not found")]
    NameNotFound { entity: &'static str, name: String },

    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Cannot delete {entity} {id}: referenced by {count} {dependents}")]
    Protected {
        entity: &'static str,
        id: i64,
        count: usize,
        dependents: String,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn protected(
        entity: &'static str,
        id: i64,
        count: usize,
        dependent: &str,
    ) -> Self {
        let dependents = if count == 1 {
            dependent.to_string()
        } else {
            format!("{dependent}s")
        };
        Self::Protected {
            entity,
            id,
            count,
            dependents,
        }
    }

    /// Caused by the request rather than by the store itself.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NameNotFound { .. }
                | Self::Conflict { .. }
                | Self::Protected { .. }
        )
    }
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Protected { .. } => Some(
                "Related rows are protected; remove the dependents first.".to_string(),
            ),
            Self::Sqlite(_) | Self::Io(_) => {
                Some("The database could not complete the operation.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { entity, .. } => vec![format!(
                "List existing records to find a valid {} id",
                entity.to_lowercase()
            )],
            Self::NameNotFound { entity, .. } => vec![format!(
                "Run 'apprank {} list' to see existing names",
                entity.to_lowercase()
            )],
            Self::Conflict { field, .. } => vec![format!("Choose a different {field}")],
            Self::Protected { dependents, .. } => {
                vec![format!("Delete the referencing {dependents} and try again")]
            }
            Self::Sqlite(_) | Self::Io(_) => vec![
                "Check that the database path is writable".to_string(),
                "Run 'apprank init' to create the database".to_string(),
            ],
            Self::Serialization(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

/// Map a UNIQUE violation onto `Conflict`; pass anything else through.
pub(crate) fn map_unique(
    err: rusqlite::Error,
    entity: &'static str,
    field: &'static str,
    value: impl Into<String>,
) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict {
            entity,
            field,
            value: value.into(),
        }
    } else {
        StoreError::Sqlite(err)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
