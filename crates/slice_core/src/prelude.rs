//! Convenience re-exports of the most commonly used types.

pub use crate::analysis::{AnalysisMapping, AnalysisSpec, AncestorOrder};
pub use crate::commit::{Commit, CommitStream, History, RepositoryError};
pub use crate::config::{Config, ConfigError, RepositoryType};
pub use crate::diffstat::DiffStat;
pub use crate::dispatch::{DispatchOptions, Dispatcher, ExecutionPlan, Executor, TaskOutcome};
pub use crate::error::{ExecutionError, SliceError};
pub use crate::filter::FilterSpec;
pub use crate::revision::RevisionQuery;
pub use crate::selection::{Selection, SelectionStats, Selector};
pub use crate::task::AnalysisTask;
