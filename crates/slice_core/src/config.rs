//! Run configuration loaded from `git-slice.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisMapping, AncestorOrder};
use crate::filter::FilterSpec;
use crate::revision::{RevisionArgs, RevisionQuery};

const DEFAULT_TEMP_DIR: &str = "/tmp/git-slice";
const DEFAULT_OUTPUT_DIR: &str = "results";
const DEFAULT_OUTPUT_FORMAT: &str = "%COMMIT_ID%";
const DEFAULT_REPO_DIR_NAME: &str = "repo";
const DEFAULT_MOUNT_DIR_NAME: &str = "mount";
const DEFAULT_CONTAINER_RUNTIME: &str = "singularity";

/// Where the repository to analyse comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RepositoryType {
    /// A directory on this machine, copied into the working directory.
    Local,
    /// A URL, cloned into the working directory.
    Remote,
}

impl RepositoryType {
    /// Returns the canonical spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl std::str::FromStr for RepositoryType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "l" => Ok(Self::Local),
            "remote" | "r" => Ok(Self::Remote),
            _ => Err(ConfigError::InvalidRepositoryType { value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for RepositoryType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositoryType> for String {
    fn from(value: RepositoryType) -> Self {
        value.as_str().to_string()
    }
}

/// Run configuration loaded from `git-slice.toml`.
///
/// Only `starting_point` and the `[analysis]` table with its `Default`
/// entry are required. Everything else has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Parent of the per-run working directory.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Copy commit content into a scratch directory inside the container
    /// before running the analysis command.
    #[serde(default)]
    pub rsync_to_temp: bool,

    /// Directory that receives one output file per analysed commit.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Output file name template; `%COMMIT_ID%` and `%COMMIT_TIME%` are substituted.
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Whether `repository_source` is a local path or a remote URL.
    #[serde(default)]
    pub repository_type: Option<RepositoryType>,

    /// Path or URL of the repository to analyse.
    #[serde(default)]
    pub repository_source: Option<String>,

    /// Name of the repository directory inside the working directory.
    #[serde(default = "default_repo_dir_name")]
    pub repo_dir_name: String,

    /// Name of the commit content directory inside the working directory.
    #[serde(default = "default_mount_dir_name")]
    pub mount_dir_name: String,

    /// Revision traversal starts from (branch, tag or commit).
    pub starting_point: String,

    /// Optional revision that bounds the traversal.
    #[serde(default)]
    pub stopping_point: Option<String>,

    /// Extra `git rev-list` arguments, passed through as given.
    #[serde(default)]
    pub rev_list_args: Option<RevisionArgs>,

    /// Commit filters.
    #[serde(default)]
    pub filters: FilterSpec,

    /// Per-commit analysis images and commands.
    pub analysis: AnalysisMapping,

    /// Ancestor search order used when a commit has no analysis entry.
    #[serde(default)]
    pub ancestor_order: AncestorOrder,

    /// Container runtime binary used to execute analyses.
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,

    /// Worker pool size. Defaults to the number of CPUs.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMP_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

fn default_repo_dir_name() -> String {
    DEFAULT_REPO_DIR_NAME.to_string()
}

fn default_mount_dir_name() -> String {
    DEFAULT_MOUNT_DIR_NAME.to_string()
}

fn default_container_runtime() -> String {
    DEFAULT_CONTAINER_RUNTIME.to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Builds the revision query for the configured starting and stopping points.
    #[must_use]
    pub fn revision_query(&self) -> RevisionQuery {
        RevisionQuery::build(
            &self.starting_point,
            self.stopping_point.as_deref(),
            self.rev_list_args.clone(),
        )
    }

    /// Returns the repository type and source, both of which are required to
    /// prepare a working copy.
    pub fn repository(&self) -> Result<(RepositoryType, &str), ConfigError> {
        let kind = self.repository_type.ok_or(ConfigError::Missing {
            key: "repository_type",
        })?;
        let source = self.repository_source.as_deref().ok_or(ConfigError::Missing {
            key: "repository_source",
        })?;
        Ok((kind, source))
    }
}

/// Errors that make a configuration unusable. All of them abort a run
/// before anything is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// Path to the config file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file contained invalid TOML or unexpected values.
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// Path to the config file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// The `[analysis]` table has no `Default` entry.
    #[error("analysis table has no 'Default' entry; every commit without its own entry needs one")]
    MissingDefaultAnalysis,

    /// `repository_type` is not one of the accepted spellings.
    #[error("invalid repository type '{value}' (expected 'local' or 'remote')")]
    InvalidRepositoryType {
        /// The value found in the configuration.
        value: String,
    },

    /// A key required for this operation is absent.
    #[error("missing required config key '{key}'")]
    Missing {
        /// The absent key.
        key: &'static str,
    },
}

impl ConfigError {
    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::MissingDefaultAnalysis | Self::InvalidRepositoryType { .. } | Self::Missing { .. } => None,
        }
    }
}
