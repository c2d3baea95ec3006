// Authors: Robert Lopez

use super::util::*;
use crate::{error::Error, ETag};
use aws_sdk_s3::Client;
use std::{future::Future, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::Instant,
};

pub const DEFAULT_BUFFER_SIZE: usize = 100_000;
pub const MIN_BUFFER_SIZE: usize = 4_096;
pub const DEFAULT_DATA_PART_SIZE: usize = 5_242_880;

/// Options for `upload_object` to control the
/// `buffer_size` and the `data_part_size`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub buffer_size: Option<usize>,
    pub data_part_size: Option<usize>,
}

impl UploadOptions {
    /// Default `100_000`, overwritten to `4_096` if lower
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
            .unwrap_or(DEFAULT_BUFFER_SIZE)
            .max(MIN_BUFFER_SIZE)
    }

    /// Default `5_242_880`, overwritten to `5_242_880` if lower
    pub fn data_part_size(&self) -> usize {
        self.data_part_size
            .unwrap_or(DEFAULT_DATA_PART_SIZE)
            .max(DEFAULT_DATA_PART_SIZE)
    }
}

/// Upload a object named `object_name` to the bucket named `bucket_name` via
/// a stream `S`
///
/// Streams under `data_part_size` bytes go out in a single `PutObject`.
/// Once `data_part_size` bytes have been read the upload converts to a
/// multipart upload, sending parts one after another.
///
/// The whole upload must finish within `limit`. A multipart upload that
/// fails or runs out of time is aborted before the error is returned.
///
/// Assumes `bucket_name` exists. Returns the total amount of bytes uploaded.
///
/// ---
/// Example Usage:
/// ```
///
/// let client: Client = ...;
/// let shark_image: tokio::fs::File = ...;
///
/// let bytes_uploaded: usize = upload_object(
///     &client,
///     "sharks",
///     "shark.jpg",
///     shark_image,
///     "image/jpeg",
///     &UploadOptions::default(),
///     Duration::from_secs(60),
///   )
///   .await?;
/// ```
pub async fn upload_object<S>(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
    mut stream: S,
    content_type: &str,
    options: &UploadOptions,
    limit: Duration,
) -> Result<usize, Error>
where
    S: AsyncRead + Unpin,
{
    let deadline = Instant::now() + limit;
    let buffer_size = options.buffer_size();
    let data_part_size = options.data_part_size();

    let mut buffer = vec![0; buffer_size];
    let mut data_part_buffer = vec![];

    let total_bytes = before_deadline(
        deadline,
        limit,
        fill_part(&mut stream, &mut buffer, &mut data_part_buffer, data_part_size),
    )
    .await?;

    if data_part_buffer.len() < data_part_size {
        before_deadline(
            deadline,
            limit,
            upload(
                client,
                bucket_name,
                object_name,
                content_type,
                data_part_buffer,
            ),
        )
        .await?;

        return Ok(total_bytes);
    }

    let upload_id = before_deadline(
        deadline,
        limit,
        start_multipart_upload(client, bucket_name, object_name, content_type),
    )
    .await?;
    let upload_id = upload_id.as_str();

    let parts = async {
        let (total_bytes, e_tags) = upload_parts(
            client,
            bucket_name,
            object_name,
            upload_id,
            &mut stream,
            PartState {
                data_part_buffer,
                total_bytes,
                buffer,
                data_part_size,
            },
        )
        .await?;

        complete_multipart_upload(client, e_tags, bucket_name, object_name, upload_id).await?;

        Ok::<usize, Error>(total_bytes)
    };

    abort_on_failure(deadline, limit, parts, move || async move {
        if let Err(err) = abort_multipart_upload(client, bucket_name, object_name, upload_id).await
        {
            tracing::warn!(
                object = object_name,
                upload_id = upload_id,
                error = %err,
                "Failed to abort multipart upload"
            );
        }
    })
    .await
}

struct PartState {
    data_part_buffer: Vec<u8>,
    total_bytes: usize,
    buffer: Vec<u8>,
    data_part_size: usize,
}

/// Reads from `stream` until `data_part_buffer` holds `data_part_size`
/// bytes or the stream ends. Returns the bytes read.
async fn fill_part<S>(
    stream: &mut S,
    buffer: &mut [u8],
    data_part_buffer: &mut Vec<u8>,
    data_part_size: usize,
) -> Result<usize, Error>
where
    S: AsyncRead + Unpin,
{
    let mut bytes_total = 0;

    while data_part_buffer.len() < data_part_size {
        let bytes_read = stream.read(buffer).await?;

        if bytes_read == 0 {
            break;
        }

        bytes_total += bytes_read;
        data_part_buffer.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(bytes_total)
}

async fn upload_parts<S>(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
    upload_id: &str,
    stream: &mut S,
    PartState {
        mut data_part_buffer,
        mut total_bytes,
        mut buffer,
        data_part_size,
    }: PartState,
) -> Result<(usize, Vec<ETag>), Error>
where
    S: AsyncRead + Unpin,
{
    let mut e_tags = vec![];

    loop {
        total_bytes +=
            fill_part(stream, &mut buffer, &mut data_part_buffer, data_part_size).await?;

        if data_part_buffer.is_empty() {
            break;
        }

        let part_number = e_tags.len() + 1;
        let bytes = std::mem::take(&mut data_part_buffer);

        let e_tag = upload_part(
            client,
            bucket_name,
            object_name,
            upload_id,
            part_number,
            bytes,
        )
        .await?;

        e_tags.push(ETag { e_tag, part_number });
    }

    Ok((total_bytes, e_tags))
}

/// Runs `body` until `deadline`, awaiting `abort` if it fails or runs out of time
async fn abort_on_failure<T, B, A, F>(
    deadline: Instant,
    limit: Duration,
    body: B,
    abort: A,
) -> Result<T, Error>
where
    B: Future<Output = Result<T, Error>>,
    A: FnOnce() -> F,
    F: Future<Output = ()>,
{
    let result = before_deadline(deadline, limit, body).await;

    if result.is_err() {
        abort().await;
    }

    result
}

async fn before_deadline<T, F>(deadline: Instant, limit: Duration, future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout_at(deadline, future)
        .await
        .map_err(|_| Error::Timeout {
            operation: "write".to_string(),
            limit,
        })?
}
