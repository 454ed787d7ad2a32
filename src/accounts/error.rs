//! Hard failures of the account service

use crate::identity::IdentityError;
use crate::store::StoreError;

/// Errors the service does not turn into an outcome value
///
/// Business conditions (limit reached, not found, bad input on add) are
/// reported through [`AddOutcome`](super::AddOutcome) and
/// [`DeleteOutcome`](super::DeleteOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller has no valid session
    #[error("Not authenticated")]
    Unauthenticated,

    /// The identity provider could not be asked
    #[error("Identity provider unavailable: {0}")]
    IdentityUnavailable(String),

    /// Malformed request parameter outside the add workflow
    #[error("{0}")]
    Validation(String),

    /// The store failed on a read or delete
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated => ServiceError::Unauthenticated,
            IdentityError::Unavailable(reason) => ServiceError::IdentityUnavailable(reason),
        }
    }
}
