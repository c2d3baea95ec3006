// Authors: Robert Lopez

use migratr::{config::MigrationConfig, error::Error, MigrationReport, Migrator, S3Store};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Loaded before the subscriber so `RUST_LOG` can come from `.env`
    let dotenv_result = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(err) = dotenv_result {
        tracing::warn!(
            error = %err,
            "Error loading .env file, using environment variables instead"
        );
    }

    match run().await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            for failure in &report.failed {
                tracing::error!(
                    object = failure.name.as_str(),
                    error = failure.error.as_deref().unwrap_or_default(),
                    "Object was not migrated"
                );
            }

            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "Migration aborted");

            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<MigrationReport, Error> {
    let config = MigrationConfig::from_env()?;

    let source = S3Store::connect(&config.source)
        .await
        .with_page_size(config.page_size);

    let destination = S3Store::connect(&config.destination)
        .await
        .with_upload_options(config.upload_options);

    let migrator = Migrator::new(source, destination, config.settings);

    migrator.ensure_destination(&config.destination_bucket).await?;

    migrator
        .migrate(&config.source_bucket, &config.destination_bucket)
        .await
}
