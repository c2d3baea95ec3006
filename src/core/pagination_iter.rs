// Authors: Robert Lopez

use crate::{
    error::Error,
    storage::{ObjectDescriptor, ObjectListing},
};
use aws_sdk_s3::{
    error::SdkError,
    operation::list_objects_v2::{ListObjectsV2Error, ListObjectsV2Output},
    types::Object,
    Client,
};
use aws_smithy_async::future::pagination_stream::PaginationStream;
use std::collections::VecDeque;

/// Async iterator to paginate through `Objects` in a `Bucket`
///
/// Can be driven a page at a time with `next_page`, or an object at a
/// time through `ObjectListing::next`, which only holds one page in memory.
///
/// ---
/// Example Usage:
/// ```
///
/// let client: Client = ...;
///
/// // `12` means we want 12 objects per page
/// let mut objects_iter = ObjectPaginationIter::new(&client, "bucket_name", 12);
///
/// while let Some(descriptor) = objects_iter.next().await? {
///     ...
/// }
/// ```
pub struct ObjectPaginationIter {
    pub page_stream: PaginationStream<Result<ListObjectsV2Output, SdkError<ListObjectsV2Error>>>,
    pending: VecDeque<Object>,
}

impl ObjectPaginationIter {
    /// Construct a `ObjectPaginationIter`
    pub fn new(client: &Client, bucket_name: &str, page_size: i32) -> Self {
        let page_stream = client
            .list_objects_v2()
            .bucket(bucket_name)
            .into_paginator()
            .page_size(page_size)
            .send();

        Self {
            page_stream,
            pending: VecDeque::new(),
        }
    }

    /// Yield the next page of objects in the iteration.
    ///
    /// Returns `None` if there are no more.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Object>>, Error> {
        if let Some(page) = self.page_stream.try_next().await.map_err(Error::sdk)? {
            let objects = page.contents().to_owned();

            return Ok(Some(objects));
        }

        Ok(None)
    }
}

impl ObjectListing for ObjectPaginationIter {
    async fn next(&mut self) -> Result<Option<ObjectDescriptor>, Error> {
        // Pages can come back empty while a continuation token is still set
        while self.pending.is_empty() {
            match self.next_page().await? {
                Some(objects) => self.pending.extend(objects),
                None => return Ok(None),
            }
        }

        match self.pending.pop_front() {
            Some(object) => descriptor_from_object(object).map(Some),
            None => Ok(None),
        }
    }
}

fn descriptor_from_object(object: Object) -> Result<ObjectDescriptor, Error> {
    let size = object.size().unwrap_or_default().max(0) as u64;
    let name = object
        .key
        .ok_or(Error::internal("listed object had no key"))?;

    Ok(ObjectDescriptor { name, size })
}
