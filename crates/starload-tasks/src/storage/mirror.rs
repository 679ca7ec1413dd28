//! Bucket-to-bucket mirroring of staging source data.
//!
//! Seeds the staging bucket by copying every object under the configured
//! prefixes from a source bucket, key-preserving, with bounded concurrent
//! copies. Runs as a standalone utility, not as a node of the load graph.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Mirror configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Bucket to copy from.
    pub source_bucket: String,

    /// Bucket to copy into.
    pub destination_bucket: String,

    /// Key prefixes mirrored recursively.
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Individual keys copied in addition to the prefixes.
    #[serde(default)]
    pub extra_keys: Vec<String>,

    /// Bucket region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Number of objects copied concurrently.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    8
}

/// Outcome of a mirror run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorReport {
    /// Total objects copied across all prefixes and extra keys.
    pub objects_copied: usize,
}

/// Mirror the configured prefixes between the two S3 buckets.
pub async fn mirror_bucket(config: &MirrorConfig) -> Result<MirrorReport, TaskError> {
    if config.source_bucket.is_empty() || config.destination_bucket.is_empty() {
        return Err(TaskError::Configuration(
            "Mirror requires a source and a destination bucket".to_string(),
        ));
    }

    let source = build_store(&config.source_bucket, config.region.as_deref())?;
    let destination = build_store(&config.destination_bucket, config.region.as_deref())?;

    mirror_between(source.as_ref(), destination.as_ref(), config).await
}

/// Mirror between two already-constructed stores.
pub async fn mirror_between(
    source: &dyn ObjectStore,
    destination: &dyn ObjectStore,
    config: &MirrorConfig,
) -> Result<MirrorReport, TaskError> {
    let mut objects_copied = 0;

    for prefix in &config.prefixes {
        objects_copied += mirror_prefix(source, destination, prefix, config.max_concurrent).await?;
    }

    for key in &config.extra_keys {
        copy_object(source, destination, &Path::from(key.as_str())).await?;
        objects_copied += 1;
    }

    tracing::info!(objects_copied, "Mirror complete");

    Ok(MirrorReport { objects_copied })
}

/// Copy every object under a prefix, preserving keys.
async fn mirror_prefix(
    source: &dyn ObjectStore,
    destination: &dyn ObjectStore,
    prefix: &str,
    max_concurrent: usize,
) -> Result<usize, TaskError> {
    let prefix_path = Path::from(prefix);
    let locations: Vec<Path> = source
        .list(Some(&prefix_path))
        .map_ok(|meta| meta.location)
        .try_collect()
        .await?;

    tracing::info!(prefix, objects = locations.len(), "Mirroring prefix");

    stream::iter(locations.iter())
        .map(|location| copy_object(source, destination, location))
        .buffer_unordered(max_concurrent)
        .try_collect::<Vec<_>>()
        .await?;

    Ok(locations.len())
}

/// Copy a single object under the same key.
async fn copy_object(
    source: &dyn ObjectStore,
    destination: &dyn ObjectStore,
    location: &Path,
) -> Result<(), TaskError> {
    let bytes = source.get(location).await?.bytes().await?;
    destination.put(location, bytes.into()).await?;
    tracing::debug!(key = %location, "Copied object");
    Ok(())
}

/// Build an S3 store for the given bucket. Credentials come from the
/// environment, the same way the warehouse COPY credentials are injected.
fn build_store(bucket: &str, region: Option<&str>) -> Result<Arc<dyn ObjectStore>, TaskError> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
    if let Some(region) = region {
        builder = builder.with_region(region);
    }
    let store = builder.build().map_err(TaskError::from)?;
    Ok(Arc::new(store))
}
