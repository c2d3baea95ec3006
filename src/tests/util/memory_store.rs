// Authors: Robert Lopez

use crate::{
    error::Error,
    storage::{ObjectDescriptor, ObjectDestination, ObjectListing, ObjectSource, WriteReceipt},
};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashSet, VecDeque},
    io::Cursor,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Every capability call a `MemoryStore` saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    Create(String),
    List(String),
    OpenRead(String),
    Write {
        bucket_name: String,
        object_name: String,
        declared_length: u64,
        content_type: String,
    },
    CloseRead(String),
}

/// Call log shared between a source and a destination store
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn writes(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write {
                    object_name,
                    declared_length,
                    ..
                } => Some((object_name, declared_length)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|call| predicate(call)).count()
    }
}

/// In-memory stand-in for both ends of a migration
#[derive(Debug, Default)]
pub struct MemoryStore {
    log: CallLog,
    objects: Vec<(String, Vec<u8>)>,
    bucket_exists: Cell<bool>,
    fail_exists: bool,
    stall_exists: bool,
    fail_create: bool,
    listing_error_after: Option<usize>,
    listing_stall_after: Option<usize>,
    fail_open: HashSet<String>,
    stall_open: HashSet<String>,
    fail_write: HashSet<String>,
    stall_write: HashSet<String>,
    written: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    /// Adds an object of `size` bytes to the listing
    pub fn with_object(mut self, name: &str, size: usize) -> Self {
        let bytes = (0..size).map(|index| (index % 251) as u8).collect();
        self.objects.push((name.to_string(), bytes));
        self
    }

    pub fn with_bucket(self) -> Self {
        self.bucket_exists.set(true);
        self
    }

    pub fn failing_exists(mut self) -> Self {
        self.fail_exists = true;
        self
    }

    pub fn stalling_exists(mut self) -> Self {
        self.stall_exists = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// The listing errors instead of yielding its `count + 1`th object
    pub fn failing_listing_after(mut self, count: usize) -> Self {
        self.listing_error_after = Some(count);
        self
    }

    /// The listing never yields its `count + 1`th object
    pub fn stalling_listing_after(mut self, count: usize) -> Self {
        self.listing_stall_after = Some(count);
        self
    }

    pub fn failing_open(mut self, name: &str) -> Self {
        self.fail_open.insert(name.to_string());
        self
    }

    /// Opening `name` never completes
    pub fn stalling_open(mut self, name: &str) -> Self {
        self.stall_open.insert(name.to_string());
        self
    }

    pub fn failing_write(mut self, name: &str) -> Self {
        self.fail_write.insert(name.to_string());
        self
    }

    /// Writes of `name` never complete
    pub fn stalling_write(mut self, name: &str) -> Self {
        self.stall_write.insert(name.to_string());
        self
    }

    pub fn object_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .iter()
            .find(|(object_name, _)| object_name == name)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn written(&self, name: &str) -> Option<Vec<u8>> {
        self.written.borrow().get(name).cloned()
    }

    pub fn written_count(&self) -> usize {
        self.written.borrow().len()
    }
}

pub struct MemoryListing {
    pending: VecDeque<ObjectDescriptor>,
    yielded: usize,
    error_after: Option<usize>,
    stall_after: Option<usize>,
}

impl ObjectListing for MemoryListing {
    async fn next(&mut self) -> Result<Option<ObjectDescriptor>, Error> {
        if self.error_after == Some(self.yielded) {
            return Err(Error::SdkError("connection reset by peer".to_string()));
        }

        if self.stall_after == Some(self.yielded) {
            std::future::pending::<()>().await;
        }

        let next = self.pending.pop_front();

        if next.is_some() {
            self.yielded += 1;
        }

        Ok(next)
    }
}

/// Read stream that records when it is dropped
pub struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    name: String,
    log: CallLog,
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.log.push(Call::CloseRead(self.name.clone()));
    }
}

impl ObjectSource for MemoryStore {
    type Listing = MemoryListing;
    type Reader = TrackedReader;

    fn list(&self, bucket_name: &str) -> Self::Listing {
        self.log.push(Call::List(bucket_name.to_string()));

        MemoryListing {
            pending: self
                .objects
                .iter()
                .map(|(name, bytes)| ObjectDescriptor::new(name.as_str(), bytes.len() as u64))
                .collect(),
            yielded: 0,
            error_after: self.listing_error_after,
            stall_after: self.listing_stall_after,
        }
    }

    async fn open_read(
        &self,
        _bucket_name: &str,
        object_name: &str,
    ) -> Result<Self::Reader, Error> {
        self.log.push(Call::OpenRead(object_name.to_string()));

        if self.fail_open.contains(object_name) {
            return Err(Error::SdkError(format!("NoSuchKey: {}", object_name)));
        }

        if self.stall_open.contains(object_name) {
            std::future::pending::<()>().await;
        }

        let bytes = self
            .object_bytes(object_name)
            .ok_or(Error::internal("unknown object"))?;

        Ok(TrackedReader {
            inner: Cursor::new(bytes),
            name: object_name.to_string(),
            log: self.log.clone(),
        })
    }
}

impl ObjectDestination for MemoryStore {
    async fn exists(&self, bucket_name: &str) -> Result<bool, Error> {
        self.log.push(Call::Exists(bucket_name.to_string()));

        if self.fail_exists {
            return Err(Error::SdkError("AccessDenied".to_string()));
        }

        if self.stall_exists {
            std::future::pending::<()>().await;
        }

        Ok(self.bucket_exists.get())
    }

    async fn create(&self, bucket_name: &str) -> Result<(), Error> {
        self.log.push(Call::Create(bucket_name.to_string()));

        if self.fail_create {
            return Err(Error::SdkError("BucketAlreadyOwnedByYou".to_string()));
        }

        self.bucket_exists.set(true);

        Ok(())
    }

    async fn write<R>(
        &self,
        bucket_name: &str,
        object_name: &str,
        mut reader: R,
        declared_length: u64,
        content_type: &str,
        _limit: Duration,
    ) -> Result<WriteReceipt, Error>
    where
        R: AsyncRead + Unpin,
    {
        self.log.push(Call::Write {
            bucket_name: bucket_name.to_string(),
            object_name: object_name.to_string(),
            declared_length,
            content_type: content_type.to_string(),
        });

        if self.fail_write.contains(object_name) {
            return Err(Error::SdkError("broken pipe".to_string()));
        }

        // Ignores `limit`, leaving the caller's bound to end the stall
        if self.stall_write.contains(object_name) {
            std::future::pending::<()>().await;
        }

        let mut bytes = vec![];
        reader.read_to_end(&mut bytes).await?;

        let bytes_written = bytes.len() as u64;
        self.written
            .borrow_mut()
            .insert(object_name.to_string(), bytes);

        Ok(WriteReceipt { bytes_written })
    }
}
