use data_model_xsf::option_store::StoreError;

use crate::nonce::NonceError;

/// Error type for exclusion storage, admin submissions and content listing.
#[derive(Debug)]
pub enum Error {
    /// Reading or writing the option backend failed.
    StoreError(StoreError),

    /// A form nonce could not be produced or checked.
    NonceError(NonceError),

    /// The external content source could not list items.
    ContentError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::StoreError(err) => write!(f, "Option store error: {}", err),
            Error::NonceError(err) => write!(f, "Nonce error: {}", err),
            Error::ContentError(msg) => write!(f, "Content lookup failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StoreError(err) => Some(err),
            Error::NonceError(err) => Some(err),
            Error::ContentError(_) => None,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::StoreError(err)
    }
}

impl From<NonceError> for Error {
    fn from(err: NonceError) -> Self {
        Error::NonceError(err)
    }
}
