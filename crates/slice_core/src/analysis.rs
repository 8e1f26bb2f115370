//! Per-commit analysis images and commands.
//!
//! The `[analysis]` table maps commit ids to the container image and command
//! used to analyse them. A commit without its own entry inherits the entry
//! of its nearest configured ancestor, falling back to `Default`.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::commit::{Commit, History, RepositoryError};
use crate::config::ConfigError;

/// Key of the mandatory fallback entry.
pub const DEFAULT_KEY: &str = "Default";

/// The image and command used to analyse a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSpec {
    /// Container image reference, e.g. `docker://python:3.11`.
    pub image: String,
    /// Shell command run inside the container.
    pub command: String,
}

/// Commit id to [`AnalysisSpec`] lookup with a guaranteed `Default` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, AnalysisSpec>", into = "BTreeMap<String, AnalysisSpec>")]
pub struct AnalysisMapping {
    default: AnalysisSpec,
    entries: BTreeMap<String, AnalysisSpec>,
}

impl AnalysisMapping {
    /// Builds a mapping, failing if no `Default` entry is present.
    pub fn new(mut entries: BTreeMap<String, AnalysisSpec>) -> Result<Self, ConfigError> {
        let default = entries.remove(DEFAULT_KEY).ok_or(ConfigError::MissingDefaultAnalysis)?;
        Ok(Self { default, entries })
    }

    /// Returns the `Default` entry.
    #[must_use]
    pub const fn default_spec(&self) -> &AnalysisSpec {
        &self.default
    }

    /// Returns the entry registered for exactly `id`, ignoring `Default`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AnalysisSpec> {
        self.entries.get(id)
    }

    /// Returns `true` when `Default` is the only entry, so no ancestor walk
    /// can find anything else.
    #[must_use]
    pub fn has_only_default(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves the spec for `commit_id` given its ancestors in search order.
    ///
    /// The commit's own entry wins, then the first ancestor with an entry,
    /// then `Default`. The ancestor iterator is consumed only as far as the
    /// first hit and its first error is returned as-is.
    pub fn resolve<I, E>(&self, commit_id: &str, ancestors: I) -> Result<&AnalysisSpec, E>
    where
        I: IntoIterator<Item = Result<String, E>>,
    {
        if let Some(spec) = self.get(commit_id) {
            return Ok(spec);
        }

        if !self.has_only_default() {
            for ancestor in ancestors {
                if let Some(spec) = self.get(&ancestor?) {
                    return Ok(spec);
                }
            }
        }

        Ok(&self.default)
    }

    /// Resolves the spec for `commit` by walking its ancestry in `order`.
    pub fn resolve_commit<H: History + ?Sized>(
        &self,
        commit: &Commit,
        history: &H,
        order: AncestorOrder,
    ) -> Result<&AnalysisSpec, RepositoryError> {
        self.resolve(&commit.id, Ancestors::new(history, &commit.parents, order))
    }
}

impl TryFrom<BTreeMap<String, AnalysisSpec>> for AnalysisMapping {
    type Error = ConfigError;

    fn try_from(entries: BTreeMap<String, AnalysisSpec>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<AnalysisMapping> for BTreeMap<String, AnalysisSpec> {
    fn from(mapping: AnalysisMapping) -> Self {
        let mut entries = mapping.entries;
        entries.insert(DEFAULT_KEY.to_string(), mapping.default);
        entries
    }
}

/// Order in which a commit's ancestors are searched for an analysis entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AncestorOrder {
    /// Generation by generation; within a generation first parents come
    /// before second parents.
    #[default]
    BreadthFirst,
    /// Depth-first along first parents, back-tracking to later parents of
    /// the most recent merge once a line is exhausted.
    FirstParent,
}

/// Iterator over the ancestors of a commit, each visited once.
#[derive(Debug)]
pub struct Ancestors<'h, H: ?Sized> {
    history: &'h H,
    order: AncestorOrder,
    pending: VecDeque<String>,
    seen: HashSet<String>,
}

impl<'h, H: History + ?Sized> Ancestors<'h, H> {
    /// Starts a walk from the given direct parents.
    pub fn new(history: &'h H, parents: &[String], order: AncestorOrder) -> Self {
        let mut walk = Self {
            history,
            order,
            pending: VecDeque::new(),
            seen: HashSet::new(),
        };
        walk.enqueue(parents.to_vec());
        walk
    }

    fn enqueue(&mut self, parents: Vec<String>) {
        match self.order {
            AncestorOrder::BreadthFirst => self.pending.extend(parents),
            AncestorOrder::FirstParent => {
                for parent in parents.into_iter().rev() {
                    self.pending.push_front(parent);
                }
            }
        }
    }
}

impl<H: History + ?Sized> Iterator for Ancestors<'_, H> {
    type Item = Result<String, RepositoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.pending.pop_front()?;
            if !self.seen.insert(id.clone()) {
                continue;
            }

            match self.history.parents(&id) {
                Ok(parents) => self.enqueue(parents),
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }

            return Some(Ok(id));
        }
    }
}
