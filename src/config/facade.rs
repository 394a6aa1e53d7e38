//! Layered configuration loading.

use std::path::{Path, PathBuf};

use config::{ConfigError, File};

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::LexicastConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: defaults, global file, `config/config.toml`,
    /// `config/{LEXICAST_ENV}.toml`, `LEXICAST__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<LexicastConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Load a single file over the defaults, ignoring the other layers.
    pub fn load_from_file(path: &Path) -> Result<LexicastConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
