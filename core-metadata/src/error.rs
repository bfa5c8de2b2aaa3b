use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors surfaced by metadata providers and the caches in front of them.
///
/// `Clone` so that a single failed load can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Load cancelled: {0}")]
    Cancelled(String),

    #[error("Loader panicked: {0}")]
    LoaderPanicked(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl MetadataError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MetadataError::Provider(_) | MetadataError::Cancelled(_) | MetadataError::LoaderPanicked(_)
        )
    }
}

impl From<BridgeError> for MetadataError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotFound(msg) => MetadataError::NotFound(msg),
            BridgeError::NotAvailable(msg) => MetadataError::Unsupported(msg),
            BridgeError::OperationFailed(msg) => MetadataError::Provider(msg),
            BridgeError::Io(err) => MetadataError::Provider(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
