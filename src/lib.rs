// Authors: Robert Lopez

pub mod config;
pub mod core;
pub mod error;
pub mod migrator;
pub mod provision;
pub mod storage;


use crate::{
    config::EndpointConfig,
    core::{
        bucket::{bucket_exists, create_bucket},
        get::get_object,
        pagination_iter::ObjectPaginationIter,
        upload::upload_object::{upload_object, UploadOptions},
    },
    error::Error,
    storage::{ObjectDestination, ObjectSource, WriteReceipt},
};
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Builder, Credentials, Region},
    Client,
};
use secrecy::ExposeSecret;
use std::{pin::Pin, sync::Arc, time::Duration};
use tokio::io::AsyncRead;

pub use crate::migrator::{FailurePolicy, MigrationReport, MigrationSettings, Migrator};

/// A completed part of a multipart upload
pub struct ETag {
    pub e_tag: String,
    pub part_number: usize,
}

/// Object store client utilizing the S3 API
///
/// Serves as both ends of a migration: `ObjectSource` for listing and
/// reading, `ObjectDestination` for bucket provisioning and writing.
///
/// ---
/// Example Usage:
/// ```
///
/// let destination_config: EndpointConfig = ...;
///
/// let store = S3Store::connect(&destination_config).await;
///
/// store.create_bucket("shark_images").await?;
///
/// let shark_image: tokio::fs::File = ...;
///
/// store.upload_object(
///       "shark_images",
///       "shark.jpg",
///       shark_image,
///       "image/jpeg",
///       Duration::from_secs(60),
///   )
///   .await?;
/// ```
pub struct S3Store {
    pub client: Arc<Client>,
    upload_options: UploadOptions,
    page_size: i32,
}

impl S3Store {
    /// Wraps an already configured `Client`
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
            upload_options: UploadOptions::default(),
            page_size: config::DEFAULT_PAGE_SIZE,
        }
    }

    /// Constructs a client for `endpoint`
    ///
    /// Uses the static credentials of `endpoint` when present, otherwise
    /// loads credentials from environment
    pub async fn connect(endpoint: &EndpointConfig) -> Self {
        let region = Region::new(endpoint.region.clone());

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region.clone())
            .endpoint_url(&endpoint.url);

        if let Some(credentials) = &endpoint.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &credentials.access_key_id,
                credentials.secret_access_key.expose_secret(),
                None,
                None,
                "migratr",
            ));
        }

        let base_config = loader.load().await;

        let config = Builder::from(&base_config)
            .force_path_style(endpoint.force_path_style)
            .region(region)
            .build();

        Self::new(Client::from_conf(config))
    }

    pub fn with_upload_options(mut self, upload_options: UploadOptions) -> Self {
        self.upload_options = upload_options;
        self
    }

    /// Objects requested per listing page, at least `1`
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Returns true if a bucket by `bucket_name` exists
    pub async fn bucket_exists(&self, bucket_name: &str) -> Result<bool, Error> {
        bucket_exists(&self.client, bucket_name).await
    }

    /// Creates a new bucket named `bucket_name`
    pub async fn create_bucket(&self, bucket_name: &str) -> Result<(), Error> {
        create_bucket(&self.client, bucket_name).await
    }

    /// Returns a stream for an object by `bucket_name` and `object_name`
    pub async fn get_object(
        &self,
        bucket_name: &str,
        object_name: &str,
    ) -> Result<Pin<Box<dyn AsyncRead + Send>>, Error> {
        let body = get_object(&self.client, bucket_name, object_name).await?;
        let stream: Pin<Box<dyn AsyncRead + Send>> = Box::pin(body.into_async_read());

        Ok(stream)
    }

    /// Upload a object named `object_name` to the bucket named `bucket_name`
    ///
    /// Will automatically convert to a multipart upload if over the
    /// configured part size. A multipart upload still running after `limit`
    /// is aborted.
    ///
    /// Returns the total amount of bytes uploaded
    pub async fn upload_object<S>(
        &self,
        bucket_name: &str,
        object_name: &str,
        stream: S,
        content_type: &str,
        limit: Duration,
    ) -> Result<usize, Error>
    where
        S: AsyncRead + Unpin,
    {
        upload_object(
            &self.client,
            bucket_name,
            object_name,
            stream,
            content_type,
            &self.upload_options,
            limit,
        )
        .await
    }

    /// Async iterator over the objects of `bucket_name`
    pub fn pagination_object_iter(
        &self,
        bucket_name: &str,
        page_size: i32,
    ) -> ObjectPaginationIter {
        ObjectPaginationIter::new(&self.client, bucket_name, page_size)
    }
}

impl ObjectSource for S3Store {
    type Listing = ObjectPaginationIter;
    type Reader = Pin<Box<dyn AsyncRead + Send>>;

    fn list(&self, bucket_name: &str) -> Self::Listing {
        self.pagination_object_iter(bucket_name, self.page_size)
    }

    async fn open_read(
        &self,
        bucket_name: &str,
        object_name: &str,
    ) -> Result<Self::Reader, Error> {
        self.get_object(bucket_name, object_name).await
    }
}

impl ObjectDestination for S3Store {
    async fn exists(&self, bucket_name: &str) -> Result<bool, Error> {
        self.bucket_exists(bucket_name).await
    }

    async fn create(&self, bucket_name: &str) -> Result<(), Error> {
        self.create_bucket(bucket_name).await
    }

    async fn write<R>(
        &self,
        bucket_name: &str,
        object_name: &str,
        reader: R,
        declared_length: u64,
        content_type: &str,
        limit: Duration,
    ) -> Result<WriteReceipt, Error>
    where
        R: AsyncRead + Unpin,
    {
        let bytes_written = self
            .upload_object(bucket_name, object_name, reader, content_type, limit)
            .await? as u64;

        if bytes_written != declared_length {
            tracing::warn!(
                object = object_name,
                declared = declared_length,
                written = bytes_written,
                "Object size changed while migrating"
            );
        }

        Ok(WriteReceipt { bytes_written })
    }
}
