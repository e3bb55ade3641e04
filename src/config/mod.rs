// Configuration module
//
// Configuration is read once at startup and passed by reference into the
// pipeline. Nothing below the entry point looks at the environment.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_DESTINATION_BUCKET, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SOURCE_PIXELS, DEFAULT_REGION,
    DEFAULT_SOURCE_BUCKET,
};

pub const ENV_SOURCE_BUCKET: &str = "SOURCE_BUCKET";
pub const ENV_DESTINATION_BUCKET: &str = "DEST_BUCKET";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_ENDPOINT_URL: &str = "S3_ENDPOINT_URL";
pub const ENV_FORCE_PATH_STYLE: &str = "S3_FORCE_PATH_STYLE";
pub const ENV_JPEG_QUALITY: &str = "WATERMARK_JPEG_QUALITY";
pub const ENV_MAX_SOURCE_PIXELS: &str = "WATERMARK_MAX_SOURCE_PIXELS";
pub const ENV_BATCH_FAILURE_MODE: &str = "BATCH_FAILURE_MODE";

/// How a failing queue message affects the rest of its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BatchFailureMode {
    /// First failure aborts the invocation; the framework redelivers the whole batch
    #[default]
    FailFast,
    /// Failures are reported per message as a partial batch response
    Isolate,
}

impl FromStr for BatchFailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(BatchFailureMode::FailFast),
            "isolate" | "partial" => Ok(BatchFailureMode::Isolate),
            other => Err(format!(
                "Invalid batch failure mode '{}': expected 'fail-fast' or 'isolate'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bucket whose notifications we act on
    pub source_bucket: String,

    /// Bucket that receives watermarked objects
    pub destination_bucket: String,

    /// AWS region for the S3 client
    pub region: String,

    /// Custom S3 endpoint (LocalStack, MinIO)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing (required by most S3-compatible stores)
    #[serde(default)]
    pub force_path_style: bool,

    /// JPEG quality for re-encoded output (1-100)
    pub jpeg_quality: u8,

    /// Images with more pixels than this are published unwatermarked
    pub max_source_pixels: u64,

    /// Batch failure policy
    #[serde(default)]
    pub batch_failure_mode: BatchFailureMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_bucket: DEFAULT_SOURCE_BUCKET.to_string(),
            destination_bucket: DEFAULT_DESTINATION_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            force_path_style: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
            batch_failure_mode: BatchFailureMode::FailFast,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable lookup.
    ///
    /// Empty values count as unset, so `SOURCE_BUCKET=""` yields the default bucket.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Config::default();

        let config = Config {
            source_bucket: var(ENV_SOURCE_BUCKET).unwrap_or(defaults.source_bucket),
            destination_bucket: var(ENV_DESTINATION_BUCKET).unwrap_or(defaults.destination_bucket),
            region: var(ENV_REGION)
                .or_else(|| var(ENV_DEFAULT_REGION))
                .unwrap_or(defaults.region),
            endpoint_url: var(ENV_ENDPOINT_URL),
            force_path_style: parse_bool(ENV_FORCE_PATH_STYLE, var(ENV_FORCE_PATH_STYLE))?
                .unwrap_or(defaults.force_path_style),
            jpeg_quality: parse_value(ENV_JPEG_QUALITY, var(ENV_JPEG_QUALITY))?
                .unwrap_or(defaults.jpeg_quality),
            max_source_pixels: parse_value(ENV_MAX_SOURCE_PIXELS, var(ENV_MAX_SOURCE_PIXELS))?
                .unwrap_or(defaults.max_source_pixels),
            batch_failure_mode: var(ENV_BATCH_FAILURE_MODE)
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or(defaults.batch_failure_mode),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.source_bucket.is_empty() {
            return Err("Source bucket name cannot be empty".to_string());
        }
        if self.destination_bucket.is_empty() {
            return Err("Destination bucket name cannot be empty".to_string());
        }
        if self.region.is_empty() {
            return Err("Region cannot be empty".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        if self.max_source_pixels == 0 {
            return Err("Maximum source pixels must be greater than 0".to_string());
        }
        if let Some(endpoint) = &self.endpoint_url {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "S3 endpoint must start with http:// or https://, got '{}'",
                    endpoint
                ));
            }
        }
        Ok(())
    }

    /// Whether originals and results share one bucket (needs the loop guard).
    pub fn shares_bucket(&self) -> bool {
        self.source_bucket == self.destination_bucket
    }
}

fn parse_value<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, String> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| format!("Invalid value '{}' for {}", raw, name))
        })
        .transpose()
}

fn parse_bool(name: &str, value: Option<String>) -> Result<Option<bool>, String> {
    value
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid boolean '{}' for {}", raw, name)),
        })
        .transpose()
}
