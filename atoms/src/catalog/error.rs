use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Whether the caller sent something wrong, as opposed to the store failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CatalogError::NotFound(_) | CatalogError::Validation(_))
    }
}
