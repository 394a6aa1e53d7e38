//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override individual keys; tables merge rather than replace, so a file that
/// sets `retry.provider.max_attempts` keeps the default delays.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("storage.data_dir", ".lexicast/db")?
        .set_default("retry.provider.max_attempts", 5)?
        .set_default("retry.upload.max_attempts", 3)?
        .set_default("retry.upload.attempt_timeout_ms", 60_000)?
        .set_default("tts.batch_size", 4)?
        .set_default("tts.partial_failure_tolerant", true)?
        .set_default("thumbnail.partial_failure_tolerant", false)
}
