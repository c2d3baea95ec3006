// Authors: Robert Lopez

use crate::error::Error;
use aws_sdk_s3::{operation::head_bucket::HeadBucketError, Client};

/// Returns true if a bucket by `bucket_name` exists
///
/// A `404` maps to `false`, anything else the server answers with
/// (including `403`) is an error.
///
/// ---
/// Example Usage:
/// ```
///
/// let client: Client = ...;
///
/// if bucket_exists(&client, "sharks").await? {
///     ...
/// }
/// ```
pub async fn bucket_exists(client: &Client, bucket_name: &str) -> Result<bool, Error> {
    match client.head_bucket().bucket(bucket_name).send().await {
        Ok(_) => Ok(true),
        Err(err) => {
            if err
                .as_service_error()
                .is_some_and(HeadBucketError::is_not_found)
            {
                return Ok(false);
            }

            Err(Error::sdk(err))
        }
    }
}

/// Creates a new bucket named `bucket_name`
///
/// Does not check for existence first, see `ensure_bucket_exists`
pub async fn create_bucket(client: &Client, bucket_name: &str) -> Result<(), Error> {
    client
        .create_bucket()
        .bucket(bucket_name)
        .send()
        .await
        .map_err(Error::sdk)?;

    Ok(())
}

/// Deletes a bucket by `bucket_name`, used by the live tests to clean up
///
/// Returns `false` if the bucket did not exist
#[cfg(test)]
pub async fn delete_bucket(client: &Client, bucket_name: &str) -> Result<bool, Error> {
    if !bucket_exists(client, bucket_name).await? {
        return Ok(false);
    }

    let mut objects_iter =
        super::pagination_iter::ObjectPaginationIter::new(client, bucket_name, 1_000);

    while let Some(objects) = objects_iter.next_page().await? {
        for object in objects {
            if let Some(key) = object.key() {
                client
                    .delete_object()
                    .bucket(bucket_name)
                    .key(key)
                    .send()
                    .await
                    .map_err(Error::sdk)?;
            }
        }
    }

    client
        .delete_bucket()
        .bucket(bucket_name)
        .send()
        .await
        .map_err(Error::sdk)?;

    Ok(true)
}
