// Authors: Robert Lopez

//! Single S3 calls the streaming upload is built from

use crate::{error::Error, ETag};
use aws_sdk_s3::{
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};

/// Uploads `bytes` as `object_name` in one `PutObject`
pub(crate) async fn upload(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<(), Error> {
    let content_length = bytes.len() as i64;

    client
        .put_object()
        .bucket(bucket_name)
        .key(object_name)
        .content_type(content_type)
        .content_length(content_length)
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(Error::sdk)?;

    Ok(())
}

/// Starts a multipart upload, returning its upload id
pub(crate) async fn start_multipart_upload(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
    content_type: &str,
) -> Result<String, Error> {
    client
        .create_multipart_upload()
        .bucket(bucket_name)
        .key(object_name)
        .content_type(content_type)
        .send()
        .await
        .map_err(Error::sdk)?
        .upload_id
        .ok_or(Error::internal(
            "upload_id was None for a valid multipart call",
        ))
}

/// Discards a multipart upload and every part sent for it
pub(crate) async fn abort_multipart_upload(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
    upload_id: &str,
) -> Result<(), Error> {
    client
        .abort_multipart_upload()
        .bucket(bucket_name)
        .key(object_name)
        .upload_id(upload_id)
        .send()
        .await
        .map_err(Error::sdk)?;

    Ok(())
}

/// Sends part `part_number` (starting at `1`) of a multipart upload,
/// returning the part's e-tag
pub(crate) async fn upload_part(
    client: &Client,
    bucket_name: &str,
    object_name: &str,
    upload_id: &str,
    part_number: usize,
    bytes: Vec<u8>,
) -> Result<String, Error> {
    client
        .upload_part()
        .bucket(bucket_name)
        .key(object_name)
        .upload_id(upload_id)
        .part_number(part_number as i32)
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(Error::sdk)?
        .e_tag
        .ok_or(Error::internal("e_tag was None on upload_part"))
}

/// Assembles the object from the parts in `e_tags`
pub(crate) async fn complete_multipart_upload(
    client: &Client,
    e_tags: Vec<ETag>,
    bucket_name: &str,
    object_name: &str,
    upload_id: &str,
) -> Result<(), Error> {
    let completed_parts = e_tags
        .into_iter()
        .map(|ETag { e_tag, part_number }| {
            CompletedPart::builder()
                .e_tag(e_tag)
                .part_number(part_number as i32)
                .build()
        })
        .collect::<Vec<CompletedPart>>();

    let completed_multipart_upload = CompletedMultipartUpload::builder()
        .set_parts(Some(completed_parts))
        .build();

    client
        .complete_multipart_upload()
        .bucket(bucket_name)
        .key(object_name)
        .multipart_upload(completed_multipart_upload)
        .upload_id(upload_id)
        .send()
        .await
        .map_err(Error::sdk)?;

    Ok(())
}
