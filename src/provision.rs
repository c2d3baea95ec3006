// Authors: Robert Lopez

use crate::{error::Error, migrator::with_timeout, storage::ObjectDestination};
use std::time::Duration;

/// Idempotently makes sure `bucket_name` exists on `destination`.
///
/// `create` is only called when `exists` answers `false`. Each call is
/// bounded by `request_timeout`, and any failure is an `Error::Provision`.
///
/// Returns `true` if the bucket was created.
///
/// ---
/// Example Usage:
/// ```
///
/// let destination: S3Store = ...;
///
/// let created: bool = ensure_bucket_exists(
///     &destination,
///     "sharks",
///     Duration::from_secs(10),
/// ).await?;
/// ```
pub async fn ensure_bucket_exists<D>(
    destination: &D,
    bucket_name: &str,
    request_timeout: Duration,
) -> Result<bool, Error>
where
    D: ObjectDestination,
{
    let provision = async {
        if with_timeout(
            "bucket existence check",
            request_timeout,
            destination.exists(bucket_name),
        )
        .await?
        {
            return Ok(false);
        }

        with_timeout(
            "bucket creation",
            request_timeout,
            destination.create(bucket_name),
        )
        .await?;

        tracing::info!(bucket = bucket_name, "Created bucket");

        Ok::<bool, Error>(true)
    };

    provision
        .await
        .map_err(|err| Error::provision(bucket_name, err))
}
