// Authors: Robert Lopez

use std::{fmt::Debug, time::Duration};
use thiserror::Error;

/// Error enum to wrap various errors that can occur inside the crate.
///
/// `Configuration`, `Provision` and `Listing` are always fatal to a run.
/// `Transfer` belongs to a single object, and whether it ends the run is
/// decided by the `FailurePolicy`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not provision bucket {bucket_name}: {message}")]
    Provision {
        bucket_name: String,
        message: String,
    },
    #[error("listing bucket {bucket_name} failed: {message}")]
    Listing {
        bucket_name: String,
        message: String,
    },
    #[error("transfer of {object_name} failed: {message}")]
    Transfer {
        object_name: String,
        message: String,
    },
    #[error("{operation} timed out after {limit:?}")]
    Timeout { operation: String, limit: Duration },
    #[error(transparent)]
    StdIo(#[from] std::io::Error),
    #[error("sdk error: {0}")]
    SdkError(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn internal(message: &str) -> Self {
        Self::Internal(message.to_string())
    }

    pub fn sdk<E>(err: E) -> Self
    where
        E: Debug,
    {
        Self::SdkError(format!("{:?}", err))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn provision(bucket_name: &str, err: Error) -> Self {
        Self::Provision {
            bucket_name: bucket_name.to_string(),
            message: err.to_string(),
        }
    }

    pub fn listing(bucket_name: &str, err: Error) -> Self {
        Self::Listing {
            bucket_name: bucket_name.to_string(),
            message: err.to_string(),
        }
    }

    pub fn transfer(object_name: &str, err: Error) -> Self {
        Self::Transfer {
            object_name: object_name.to_string(),
            message: err.to_string(),
        }
    }

    /// True for the errors that end a run regardless of policy
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transfer { .. })
    }
}
