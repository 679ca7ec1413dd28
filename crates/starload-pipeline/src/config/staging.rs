//! Staging source configuration.

use serde::Deserialize;
use starload_tasks::storage::MirrorConfig;
use starload_tasks::tasks::DataFormat;
use starload_tasks::StagingCredentials;

/// Staging source configuration loaded from environment variables.
///
/// Environment variables are prefixed with `STARLOAD_STAGING_`:
/// - `STARLOAD_STAGING_BUCKET`: bucket holding the raw source data
/// - `STARLOAD_STAGING_EVENTS_PREFIX`: event records prefix (default: "log-data")
/// - `STARLOAD_STAGING_SONGS_PREFIX`: song records prefix (default: "song-data")
/// - `STARLOAD_STAGING_EVENTS_JSONPATHS`: JSONPaths file key for the events
///   COPY; automatic field mapping when unset
/// - `STARLOAD_STAGING_REGION`: bucket region
/// - `STARLOAD_STAGING_ACCESS_KEY_ID` / `STARLOAD_STAGING_SECRET_ACCESS_KEY`:
///   credentials the warehouse uses to read the bucket
/// - `STARLOAD_STAGING_APPEND_ONLY_DIMENSIONS`: comma-separated dimension
///   tables loaded without the pre-load delete
/// - `STARLOAD_STAGING_MIRROR_SOURCE_BUCKET`: source bucket for `mirror`
#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    /// Bucket holding the raw event and song data.
    #[serde(default)]
    pub bucket: String,

    /// Key prefix of the event records.
    #[serde(default = "default_events_prefix")]
    pub events_prefix: String,

    /// Key prefix of the song records.
    #[serde(default = "default_songs_prefix")]
    pub songs_prefix: String,

    /// JSONPaths file key for the events COPY.
    #[serde(default)]
    pub events_jsonpaths: Option<String>,

    /// Bucket region.
    #[serde(default)]
    pub region: Option<String>,

    /// Access key the warehouse presents when reading the bucket.
    #[serde(default)]
    pub access_key_id: String,

    /// Secret key the warehouse presents when reading the bucket.
    #[serde(default)]
    pub secret_access_key: String,

    /// Dimension tables loaded append-only instead of replace.
    #[serde(default)]
    pub append_only_dimensions: Vec<String>,

    /// Source bucket mirrored into `bucket` by the mirror utility.
    #[serde(default)]
    pub mirror_source_bucket: String,
}

fn default_events_prefix() -> String {
    "log-data".to_string()
}

fn default_songs_prefix() -> String {
    "song-data".to_string()
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            events_prefix: default_events_prefix(),
            songs_prefix: default_songs_prefix(),
            events_jsonpaths: None,
            region: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            append_only_dimensions: Vec::new(),
            mirror_source_bucket: String::new(),
        }
    }
}

impl StagingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("STARLOAD_STAGING_").from_env::<StagingConfig>()
    }

    /// Record format of the event records.
    pub fn events_format(&self) -> DataFormat {
        match &self.events_jsonpaths {
            Some(key) => DataFormat::JsonPaths {
                jsonpaths: format!("s3://{}/{}", self.bucket, key),
            },
            None => DataFormat::JsonAuto,
        }
    }

    /// Credentials handed to the warehouse COPY statements.
    pub fn credentials(&self) -> StagingCredentials {
        StagingCredentials {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }

    /// Whether a dimension table is configured append-only.
    pub fn is_append_only(&self, table: &str) -> bool {
        self.append_only_dimensions.iter().any(|t| t == table)
    }

    /// Mirror configuration seeding `bucket` from the source bucket.
    pub fn mirror_config(&self) -> MirrorConfig {
        let mut extra_keys = Vec::new();
        if let Some(key) = &self.events_jsonpaths {
            extra_keys.push(key.clone());
        }

        MirrorConfig {
            source_bucket: self.mirror_source_bucket.clone(),
            destination_bucket: self.bucket.clone(),
            prefixes: vec![self.events_prefix.clone(), self.songs_prefix.clone()],
            extra_keys,
            region: self.region.clone(),
            max_concurrent: 8,
        }
    }
}
