// Authors: Robert Lopez

use crate::{
    error::Error,
    provision::ensure_bucket_exists,
    storage::{
        ObjectDescriptor, ObjectDestination, ObjectListing, ObjectSource, DEFAULT_CONTENT_TYPE,
    },
};
use std::{fmt, future::Future, str::FromStr, time::Duration};

/// What a failed object does to the rest of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure, keep going, report it at the end
    #[default]
    Continue,
    /// Stop the run at the first failed object
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!("expected `continue` or `abort`, got `{}`", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub failure_policy: FailurePolicy,
    /// Bound on listing, opening and bucket provisioning calls
    pub request_timeout: Duration,
    /// Bound on writing a single object, handed to the destination
    pub transfer_timeout: Duration,
    pub content_type: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            request_timeout: Duration::from_secs(10),
            transfer_timeout: Duration::from_secs(3_600),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

/// Outcome of one object's transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub name: String,
    pub bytes_written: u64,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl TransferResult {
    pub fn success(name: String, bytes_written: u64) -> Self {
        Self {
            name,
            bytes_written,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(name: String, err: &Error) -> Self {
        Self {
            name,
            bytes_written: 0,
            succeeded: false,
            error: Some(err.to_string()),
        }
    }
}

/// Per-object results of a finished run, in listing order
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub transferred: Vec<TransferResult>,
    pub failed: Vec<TransferResult>,
}

impl MigrationReport {
    /// True when no object failed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn bytes_written(&self) -> u64 {
        self.transferred
            .iter()
            .map(|result| result.bytes_written)
            .sum()
    }
}

/// Copies every object of a source bucket into a destination bucket,
/// one object at a time in listing order.
///
/// ---
/// Example Usage:
/// ```
///
/// let source: S3Store = ...;
/// let destination: S3Store = ...;
///
/// let migrator = Migrator::new(source, destination, MigrationSettings::default());
///
/// migrator.ensure_destination("sharks-backup").await?;
///
/// let report = migrator.migrate("sharks", "sharks-backup").await?;
/// ```
pub struct Migrator<S, D> {
    source: S,
    destination: D,
    settings: MigrationSettings,
}

impl<S, D> Migrator<S, D>
where
    S: ObjectSource,
    D: ObjectDestination,
{
    pub fn new(source: S, destination: D, settings: MigrationSettings) -> Self {
        Self {
            source,
            destination,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Creates `bucket_name` on the destination unless it already exists.
    ///
    /// Returns `true` if the bucket was created.
    pub async fn ensure_destination(&self, bucket_name: &str) -> Result<bool, Error> {
        ensure_bucket_exists(&self.destination, bucket_name, self.settings.request_timeout).await
    }

    /// Attempts every object listed in `source_bucket` exactly once.
    ///
    /// A listing failure aborts the run with `Error::Listing`. A failed
    /// object either aborts the run with `Error::Transfer` or is collected
    /// into the report, depending on the `FailurePolicy`.
    ///
    /// `destination_bucket` must already exist, see `ensure_destination`.
    #[tracing::instrument(skip(self), fields(policy = %self.settings.failure_policy))]
    pub async fn migrate(
        &self,
        source_bucket: &str,
        destination_bucket: &str,
    ) -> Result<MigrationReport, Error> {
        let mut listing = self.source.list(source_bucket);
        let mut report = MigrationReport::default();

        loop {
            let next = with_timeout(
                "listing advance",
                self.settings.request_timeout,
                listing.next(),
            )
            .await
            .map_err(|err| Error::listing(source_bucket, err))?;

            let Some(descriptor) = next else {
                break;
            };

            match self
                .transfer(source_bucket, destination_bucket, &descriptor)
                .await
            {
                Ok(bytes_written) => {
                    tracing::info!(
                        object = descriptor.name.as_str(),
                        bytes = bytes_written,
                        "Successfully uploaded"
                    );

                    report
                        .transferred
                        .push(TransferResult::success(descriptor.name, bytes_written));
                }
                Err(err) => {
                    let err = Error::transfer(&descriptor.name, err);

                    if self.settings.failure_policy == FailurePolicy::Abort {
                        return Err(err);
                    }

                    tracing::warn!(
                        object = descriptor.name.as_str(),
                        error = %err,
                        "Upload failed"
                    );

                    report
                        .failed
                        .push(TransferResult::failure(descriptor.name, &err));
                }
            }
        }

        tracing::info!(
            transferred = report.transferred.len(),
            failed = report.failed.len(),
            bytes = report.bytes_written(),
            "Migration finished"
        );

        Ok(report)
    }

    /// Opens, writes, and drops the read stream for one object
    async fn transfer(
        &self,
        source_bucket: &str,
        destination_bucket: &str,
        descriptor: &ObjectDescriptor,
    ) -> Result<u64, Error> {
        let reader = with_timeout(
            "open read",
            self.settings.request_timeout,
            self.source.open_read(source_bucket, &descriptor.name),
        )
        .await?;

        // The destination enforces `transfer_timeout` itself so it can clean up
        // a partial write. The outer bound also covers that cleanup.
        let transfer_timeout = self.settings.transfer_timeout;

        // `write` owns the reader, so it is closed on every exit path
        let receipt = with_timeout(
            "write",
            transfer_timeout + self.settings.request_timeout,
            self.destination.write(
                destination_bucket,
                &descriptor.name,
                reader,
                descriptor.size,
                &self.settings.content_type,
                transfer_timeout,
            ),
        )
        .await?;

        Ok(receipt.bytes_written)
    }
}

/// Bounds `future` by `limit`, mapping an elapsed deadline to `Error::Timeout`
pub(crate) async fn with_timeout<T, F>(
    operation: &str,
    limit: Duration,
    future: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| Error::Timeout {
            operation: operation.to_string(),
            limit,
        })?
}
