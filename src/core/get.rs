// Authors: Robert Lopez

use crate::error::Error;
use aws_sdk_s3::{primitives::ByteStream, Client};

/// Returns the body stream for an object by `bucket_name` and `object_name`
///
/// The request is sent here, the body is read by the caller.
///
/// ---
/// Example Usage:
/// ```
///
/// let client: Client = ...;
///
/// let stream: impl AsyncBufRead = get_object(
///     &client,
///     "sharks",
///     "shark.jpg",
/// ).await?.into_async_read();
/// ```
pub async fn get_object(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
) -> Result<ByteStream, Error> {
    Ok(client
        .get_object()
        .bucket(bucket_name)
        .key(object_name)
        .send()
        .await
        .map_err(Error::sdk)?
        .body)
}
