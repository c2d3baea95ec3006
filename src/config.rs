// Authors: Robert Lopez

//! Run configuration, read once at startup and handed to constructors.

use crate::{
    core::upload::upload_object::UploadOptions,
    error::Error,
    migrator::{FailurePolicy, MigrationSettings},
    storage::DEFAULT_CONTENT_TYPE,
};
use secrecy::SecretString;
use std::{str::FromStr, time::Duration};

pub const DEFAULT_SOURCE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_SOURCE_REGION: &str = "auto";
pub const DEFAULT_DESTINATION_REGION: &str = "us-east-1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 3_600;
pub const DEFAULT_PAGE_SIZE: i32 = 1_000;

/// Static access key pair for an S3 compatible endpoint
#[derive(Debug)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

/// Where and how to reach one side of the migration
#[derive(Debug)]
pub struct EndpointConfig {
    pub url: String,
    pub region: String,
    /// `None` falls back to the default AWS credential chain
    pub credentials: Option<StaticCredentials>,
    pub force_path_style: bool,
}

#[derive(Debug)]
pub struct MigrationConfig {
    pub source_bucket: String,
    pub destination_bucket: String,
    pub source: EndpointConfig,
    pub destination: EndpointConfig,
    pub settings: MigrationSettings,
    pub page_size: i32,
    pub upload_options: UploadOptions,
}

impl MigrationConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of a variable or `None` when it is unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let secure = env.parsed_bool("S3_SECURE", true)?;

        let destination = EndpointConfig {
            url: normalize_endpoint(&env.required("S3_ENDPOINT")?, secure),
            region: env.or("S3_REGION", DEFAULT_DESTINATION_REGION),
            credentials: Some(StaticCredentials {
                access_key_id: env.required("S3_ACCESS_KEY_ID")?,
                secret_access_key: SecretString::from(env.required("S3_SECRET_ACCESS_KEY")?),
            }),
            force_path_style: true,
        };

        let source_credentials = match (
            env.optional("GCLOUD_ACCESS_KEY_ID"),
            env.optional("GCLOUD_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key: SecretString::from(secret_access_key),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::configuration(
                    "GCLOUD_ACCESS_KEY_ID and GCLOUD_SECRET_ACCESS_KEY must be set together",
                ))
            }
        };

        let source = EndpointConfig {
            url: normalize_endpoint(&env.or("GCLOUD_ENDPOINT", DEFAULT_SOURCE_ENDPOINT), true),
            region: env.or("GCLOUD_REGION", DEFAULT_SOURCE_REGION),
            credentials: source_credentials,
            force_path_style: false,
        };

        let settings = MigrationSettings {
            failure_policy: env.parsed("MIGRATION_FAILURE_POLICY", FailurePolicy::default())?,
            request_timeout: Duration::from_secs(
                env.parsed("MIGRATION_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            ),
            transfer_timeout: Duration::from_secs(
                env.parsed("MIGRATION_TRANSFER_TIMEOUT_SECS", DEFAULT_TRANSFER_TIMEOUT_SECS)?,
            ),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        };

        let page_size = env.parsed("MIGRATION_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        if page_size < 1 {
            return Err(Error::configuration("MIGRATION_PAGE_SIZE must be at least 1"));
        }

        let upload_options = UploadOptions {
            buffer_size: env.parsed_optional("MIGRATION_BUFFER_SIZE")?,
            data_part_size: env.parsed_optional("MIGRATION_PART_SIZE")?,
        };

        Ok(Self {
            source_bucket: env.required("GCLOUD_BUCKET_NAME")?,
            destination_bucket: env.required("S3_BUCKET_NAME")?,
            source,
            destination,
            settings,
            page_size,
            upload_options,
        })
    }
}

/// Prefixes a bare `host:port` endpoint with a scheme
pub fn normalize_endpoint(endpoint: &str, secure: bool) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');

    if endpoint.contains("://") {
        return endpoint.to_string();
    }

    if secure {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Empty values count as unset
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, Error> {
        self.optional(key)
            .ok_or_else(|| Error::configuration(format!("{} is not set", key)))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_optional<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|value| {
                value.parse::<T>().map_err(|err| {
                    Error::configuration(format!(
                        "{} has an invalid value {:?}: {}",
                        key, value, err
                    ))
                })
            })
            .transpose()
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parsed_optional(key)?.unwrap_or(default))
    }

    fn parsed_bool(&self, key: &str, default: bool) -> Result<bool, Error> {
        match self.optional(key).map(|value| value.to_ascii_lowercase()) {
            None => Ok(default),
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(Error::configuration(format!(
                    "{} has an invalid value {:?}",
                    key, value
                ))),
            },
        }
    }
}
