// Authors: Robert Lopez

//! Capabilities the `Migrator` is composed from.
//!
//! A source lists a bucket lazily and opens read streams per object, a
//! destination checks/creates buckets and writes streams. `S3Store`
//! implements both sides, tests swap in an in-memory store.

use crate::error::Error;
use std::{future::Future, time::Duration};
use tokio::io::AsyncRead;

/// Content type every object is written with
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A named, sized object as yielded by a source listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub name: String,
    pub size: u64,
}

impl ObjectDescriptor {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Confirmation returned by `ObjectDestination::write`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReceipt {
    pub bytes_written: u64,
}

/// Lazy, finite, non-restartable sequence of `ObjectDescriptor`s.
///
/// `Ok(None)` means the listing is exhausted, `Err` is a transport
/// failure while advancing it.
pub trait ObjectListing {
    fn next(&mut self) -> impl Future<Output = Result<Option<ObjectDescriptor>, Error>>;
}

/// Read side of a migration
pub trait ObjectSource {
    type Listing: ObjectListing;
    type Reader: AsyncRead + Unpin;

    /// Start listing `bucket_name`. No request is made until the
    /// listing is first advanced.
    fn list(&self, bucket_name: &str) -> Self::Listing;

    /// Open a read stream for `object_name` in `bucket_name`
    fn open_read(
        &self,
        bucket_name: &str,
        object_name: &str,
    ) -> impl Future<Output = Result<Self::Reader, Error>>;
}

/// Write side of a migration
pub trait ObjectDestination {
    fn exists(&self, bucket_name: &str) -> impl Future<Output = Result<bool, Error>>;

    fn create(&self, bucket_name: &str) -> impl Future<Output = Result<(), Error>>;

    /// Write the whole of `reader` to `object_name`, consuming the reader.
    ///
    /// `declared_length` is the size reported by the source listing. The
    /// write gives up with `Error::Timeout` once `limit` has passed, after
    /// discarding anything it left half written.
    fn write<R>(
        &self,
        bucket_name: &str,
        object_name: &str,
        reader: R,
        declared_length: u64,
        content_type: &str,
        limit: Duration,
    ) -> impl Future<Output = Result<WriteReceipt, Error>>
    where
        R: AsyncRead + Unpin;
}

impl<T> ObjectSource for &T
where
    T: ObjectSource,
{
    type Listing = T::Listing;
    type Reader = T::Reader;

    fn list(&self, bucket_name: &str) -> Self::Listing {
        (**self).list(bucket_name)
    }

    fn open_read(
        &self,
        bucket_name: &str,
        object_name: &str,
    ) -> impl Future<Output = Result<Self::Reader, Error>> {
        (**self).open_read(bucket_name, object_name)
    }
}

impl<T> ObjectDestination for &T
where
    T: ObjectDestination,
{
    fn exists(&self, bucket_name: &str) -> impl Future<Output = Result<bool, Error>> {
        (**self).exists(bucket_name)
    }

    fn create(&self, bucket_name: &str) -> impl Future<Output = Result<(), Error>> {
        (**self).create(bucket_name)
    }

    fn write<R>(
        &self,
        bucket_name: &str,
        object_name: &str,
        reader: R,
        declared_length: u64,
        content_type: &str,
        limit: Duration,
    ) -> impl Future<Output = Result<WriteReceipt, Error>>
    where
        R: AsyncRead + Unpin,
    {
        (**self).write(
            bucket_name,
            object_name,
            reader,
            declared_length,
            content_type,
            limit,
        )
    }
}
