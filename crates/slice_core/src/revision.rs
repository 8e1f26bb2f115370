//! Revision range queries handed to the repository for traversal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Argument key added when traversal is bounded by a stopping point.
pub const ANCESTRY_PATH: &str = "ancestry-path";

/// A single `git rev-list` argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RevArg {
    /// A switch such as `no-merges = true`.
    Flag(bool),
    /// A numeric value such as `max-count = 1000`.
    Integer(i64),
    /// A textual value such as `before = "2020-01-01"`.
    Text(String),
    /// A repeated option such as `author = ["alice*", "bob*"]`.
    List(Vec<String>),
}

/// Ordered `git rev-list` arguments, passed through without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionArgs(BTreeMap<String, RevArg>);

impl RevisionArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: RevArg) {
        self.0.insert(key.into(), value);
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RevArg> {
        self.0.get(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the arguments as command-line options in key order.
    ///
    /// `true` becomes `--key`, `false` is dropped, scalars become
    /// `--key=value` and lists repeat `--key=value` per element.
    #[must_use]
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(self.0.len());

        for (key, value) in &self.0 {
            match value {
                RevArg::Flag(true) => flags.push(format!("--{key}")),
                RevArg::Flag(false) => {}
                RevArg::Integer(n) => flags.push(format!("--{key}={n}")),
                RevArg::Text(text) => flags.push(format!("--{key}={text}")),
                RevArg::List(items) => flags.extend(items.iter().map(|item| format!("--{key}={item}"))),
            }
        }

        flags
    }
}

impl FromIterator<(String, RevArg)> for RevisionArgs {
    fn from_iter<T: IntoIterator<Item = (String, RevArg)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A target revision plus the arguments used to walk it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionQuery {
    /// Either a single revision or a `start..stop` range.
    pub target: String,
    /// Arguments for the walk.
    pub args: RevisionArgs,
}

impl RevisionQuery {
    /// Builds the query for a starting point and optional stopping point.
    ///
    /// With a stopping point the target becomes `start..stop` and the walk is
    /// restricted to the ancestry path between them. Without one the
    /// arguments are used exactly as given. Missing arguments become an empty
    /// set and a blank stopping point counts as absent.
    #[must_use]
    pub fn build(starting_point: &str, stopping_point: Option<&str>, args: Option<RevisionArgs>) -> Self {
        let mut args = args.unwrap_or_default();

        let target = match stopping_point.filter(|stop| !stop.trim().is_empty()) {
            Some(stop) => {
                args.insert(ANCESTRY_PATH, RevArg::Flag(true));
                format!("{starting_point}..{stop}")
            }
            None => starting_point.to_string(),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(revision = %target, ?args, "built revision query");

        Self { target, args }
    }

    /// Returns the full `git rev-list` argument vector, options first and
    /// the target revision last.
    #[must_use]
    pub fn to_rev_list_args(&self) -> Vec<String> {
        let mut argv = self.args.to_flags();
        argv.push(self.target.clone());
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOP: &str = "9a46c3c6a3f1d8f0b5e9e9c2b4c6f0a1d2e3f4a5";

    fn base_args() -> RevisionArgs {
        let mut args = RevisionArgs::new();
        args.insert("max-count", RevArg::Integer(1000));
        args.insert("author", RevArg::List(vec!["alice*".into(), "bob*".into()]));
        args.insert("before", RevArg::Text("2020-01-01".into()));
        args.insert("no-merges", RevArg::Flag(true));
        args
    }

    #[test]
    fn stopping_point_builds_range_with_ancestry_path() {
        let query = RevisionQuery::build("main", Some(STOP), Some(base_args()));

        assert_eq!(query.target, format!("main..{STOP}"));
        assert_eq!(query.args.get(ANCESTRY_PATH), Some(&RevArg::Flag(true)));
        assert_eq!(query.args.len(), base_args().len() + 1);
        for (key, value) in &base_args().0 {
            assert_eq!(query.args.get(key), Some(value));
        }
    }

    #[test]
    fn starting_point_alone_leaves_args_untouched() {
        let query = RevisionQuery::build("main", None, Some(base_args()));

        assert_eq!(query.target, "main");
        assert!(!query.args.contains_key(ANCESTRY_PATH));
        assert_eq!(query.args, base_args());
    }

    #[test]
    fn blank_stopping_point_counts_as_absent() {
        let query = RevisionQuery::build("main", Some(""), None);
        assert_eq!(query.target, "main");
        assert!(query.args.is_empty());
    }

    #[test]
    fn missing_args_default_to_empty_set() {
        let query = RevisionQuery::build("HEAD", None, None);
        assert_eq!(query.args, RevisionArgs::new());
    }

    #[test]
    fn flags_render_in_key_order() {
        assert_eq!(
            base_args().to_flags(),
            vec![
                "--author=alice*",
                "--author=bob*",
                "--before=2020-01-01",
                "--max-count=1000",
                "--no-merges",
            ]
        );
    }

    #[test]
    fn false_flags_are_omitted() {
        let mut args = RevisionArgs::new();
        args.insert("no-merges", RevArg::Flag(false));
        assert!(args.to_flags().is_empty());
    }

    #[test]
    fn rev_list_args_end_with_target() {
        let query = RevisionQuery::build("v1.0", Some("v2.0"), None);
        assert_eq!(query.to_rev_list_args(), vec!["--ancestry-path", "v1.0..v2.0"]);
    }

    #[test]
    fn args_deserialise_from_toml_table() {
        let args: RevisionArgs = toml::from_str(
            r#"
            max-count = 1000
            author = ["alice*"]
            before = "2020-01-01"
            no-merges = true
        "#,
        )
        .unwrap();

        assert_eq!(args.get("max-count"), Some(&RevArg::Integer(1000)));
        assert_eq!(args.get("author"), Some(&RevArg::List(vec!["alice*".into()])));
        assert_eq!(args.get("no-merges"), Some(&RevArg::Flag(true)));
    }
}
