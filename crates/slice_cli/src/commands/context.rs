//! Configuration loading shared by all commands.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use slice_core::prelude::*;

use crate::CONFIG_FILENAME;
use crate::ui::print_warning;

/// Loaded configuration and where it came from.
#[derive(Debug)]
pub struct SliceContext {
    /// Parsed configuration.
    pub config: Config,
    /// Path the configuration was read from.
    pub config_path: PathBuf,
}

impl SliceContext {
    /// Loads `path`, or `git-slice.toml` in the current directory, and
    /// reports lenient filter problems as warnings.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.unwrap_or(Path::new(CONFIG_FILENAME)).to_path_buf();
        let config = Config::load(&config_path).context("loading config")?;

        for warning in config.filters.warnings() {
            print_warning(&warning);
        }

        Ok(Self { config, config_path })
    }
}
