//! CLI command handlers.

mod context;
/// Full runs: workspace preparation, selection and dispatch.
pub mod run;
/// Selection-only previews against an existing repository.
pub mod select;

/// Convenience alias for command return types.
pub type Result<T = ()> = anyhow::Result<T>;
