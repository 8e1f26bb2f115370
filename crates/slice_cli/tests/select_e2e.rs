//! End-to-end tests for the `git-slice select` command.

#![expect(clippy::expect_used, reason = "tests use expect for clearer failure messages")]

use std::fs;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn git_slice() -> Command {
    Command::new(env!("CARGO_BIN_EXE_git-slice"))
}

fn git(dir: &TempDir, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir.path())
        .output()
        .expect("git failed to start");
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8(output.stdout).expect("git output is utf-8").trim().to_string()
}

fn init_git_repo(dir: &TempDir) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
}

/// Commits `content` to `file`, dated `day` days into 2020 so commit times
/// are predictable.
fn commit(dir: &TempDir, file: &str, content: &str, day: u32) -> String {
    let path = dir.path().join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&path, content).expect("write failed");
    git(dir, &["add", file]);

    let date = format!("2020-01-{day:02}T10:00:00+01:00");
    let status = StdCommand::new("git")
        .args(["commit", "--quiet", "-m", &format!("change {file}")])
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .current_dir(dir.path())
        .status()
        .expect("git commit failed to start");
    assert!(status.success(), "git commit failed");

    git(dir, &["rev-parse", "HEAD"])
}

/// Builds a repo with five commits, one per day, alternating Python and
/// Markdown files. Returns commit ids oldest first.
fn five_commit_repo(dir: &TempDir) -> Vec<String> {
    init_git_repo(dir);
    (1..=5)
        .map(|day| {
            let file = if day % 2 == 1 { format!("src/m{day}.py") } else { format!("doc{day}.md") };
            commit(dir, &file, &format!("line {day}\n"), day)
        })
        .collect()
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("git-slice.toml");
    fs::write(
        &path,
        format!(
            r#"
starting_point = "HEAD"
{body}

[analysis.Default]
image = "docker://alpine"
command = "ls"
"#
        ),
    )
    .expect("write config");
    path
}

fn select_json(dir: &TempDir) -> Vec<Value> {
    let output = git_slice()
        .args(["select", "--format", "json"])
        .current_dir(dir.path())
        .output()
        .expect("git-slice failed to start");
    assert!(output.status.success(), "select failed: {}", String::from_utf8_lossy(&output.stderr));

    let value: Value = serde_json::from_slice(&output.stdout).expect("select output is JSON");
    value.as_array().expect("select output is an array").clone()
}

fn ids(tasks: &[Value]) -> Vec<&str> {
    tasks
        .iter()
        .map(|t| t["commit_id"].as_str().expect("commit_id is a string"))
        .collect()
}

#[test]
fn select_without_filters_lists_every_commit_newest_first() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(&dir, "");

    let tasks = select_json(&dir);

    let expected: Vec<&str> = commits.iter().rev().map(String::as_str).collect();
    assert_eq!(ids(&tasks), expected);
    assert_eq!(tasks[0]["image"], "docker://alpine");
    assert_eq!(tasks[0]["command"], "ls");
    assert_eq!(tasks[4]["commit_time"], "2020-01-01T10:00:00+01:00");
}

#[test]
fn select_applies_limit() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(&dir, "[filters]\nlimit = 2");

    let tasks = select_json(&dir);

    assert_eq!(ids(&tasks), vec![commits[4].as_str(), commits[3].as_str()]);
}

#[test]
fn select_skips_between_accepted_commits() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(&dir, "[filters]\nskip = 1");

    let tasks = select_json(&dir);

    assert_eq!(ids(&tasks), vec![commits[3].as_str(), commits[1].as_str()]);
}

#[test]
fn select_filters_by_file_type() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(&dir, "[filters.changes]\nfile_types = [\".py\"]");

    let tasks = select_json(&dir);

    assert_eq!(
        ids(&tasks),
        vec![commits[4].as_str(), commits[2].as_str(), commits[0].as_str()]
    );
}

#[test]
fn select_filters_by_change_counts() {
    let dir = TempDir::new().expect("tempdir");
    init_git_repo(&dir);
    let small = commit(&dir, "a.txt", "one\n", 1);
    let large = commit(&dir, "b.txt", "one\ntwo\nthree\nfour\n", 2);
    commit(&dir, "a.txt", "changed\n", 3);
    write_config(&dir, "[filters.changes]\nadditions = \">3\"");

    let tasks = select_json(&dir);

    assert_eq!(ids(&tasks), vec![large.as_str()]);
    assert!(!ids(&tasks).contains(&small.as_str()));
}

#[test]
fn select_enforces_minimum_delta() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(&dir, "[filters]\nmin_delta = \"1d12h\"");

    let tasks = select_json(&dir);

    assert_eq!(
        ids(&tasks),
        vec![commits[4].as_str(), commits[2].as_str(), commits[0].as_str()]
    );
}

#[test]
fn select_walks_from_starting_point_to_stopping_point() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    fs::write(
        dir.path().join("git-slice.toml"),
        format!(
            r#"
starting_point = "{}"
stopping_point = "{}"

[analysis.Default]
image = "img"
command = "ls"
"#,
            commits[1], commits[3]
        ),
    )
    .expect("write config");

    let tasks = select_json(&dir);

    assert_eq!(ids(&tasks), vec![commits[3].as_str(), commits[2].as_str()]);
}

#[test]
fn select_inherits_analysis_from_nearest_ancestor() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(
        &dir,
        &format!("[analysis.{}]\nimage = \"docker://python\"\ncommand = \"pytest\"", commits[2]),
    );

    let tasks = select_json(&dir);

    let images: Vec<&str> = tasks.iter().map(|t| t["image"].as_str().expect("image")).collect();
    assert_eq!(
        images,
        vec!["docker://python", "docker://python", "docker://python", "docker://alpine", "docker://alpine"]
    );
}

#[test]
fn select_text_output_summarises_selection() {
    let dir = TempDir::new().expect("tempdir");
    let commits = five_commit_repo(&dir);
    write_config(&dir, "[filters]\nlimit = 1");

    git_slice()
        .args(["select"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(&commits[4]))
        .stdout(predicate::str::contains("1 of 1 commit selected"))
        .stdout(predicate::str::contains("limit reached"));
}

#[test]
fn select_writes_output_file() {
    let dir = TempDir::new().expect("tempdir");
    five_commit_repo(&dir);
    write_config(&dir, "");
    let out = dir.path().join("selected.json");

    git_slice()
        .args(["select", "--format", "json", "--output"])
        .arg(&out)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let value: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read output")).expect("JSON");
    assert_eq!(value.as_array().map(Vec::len), Some(5));
}

#[test]
fn select_warns_about_unparseable_range() {
    let dir = TempDir::new().expect("tempdir");
    five_commit_repo(&dir);
    write_config(&dir, "[filters.changes]\nfiles = \"lots\"");

    git_slice()
        .args(["select", "--format", "json"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("changes.files"));
}

#[test]
fn select_reports_unknown_starting_point() {
    let dir = TempDir::new().expect("tempdir");
    five_commit_repo(&dir);
    let config = dir.path().join("other.toml");
    fs::write(
        &config,
        r#"
starting_point = "no-such-branch"

[analysis.Default]
image = "img"
command = "ls"
"#,
    )
    .expect("write config");

    git_slice()
        .args(["select", "--config"])
        .arg(&config)
        .current_dir(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no-such-branch"));
}

/// Commit ids of a history with one merge:
///
/// ```text
/// base --- main ------ merge
///      \             /
///       `- feature -'
/// ```
struct MergeRepo {
    base: String,
    main: String,
    feature: String,
    merge: String,
}

/// `base.txt` and `main.md` get one line each, `feature.py` three, so the
/// merge adds three lines relative to its first parent and one relative to
/// its second.
fn merge_repo(dir: &TempDir) -> MergeRepo {
    init_git_repo(dir);
    let base = commit(dir, "base.txt", "base\n", 1);
    let trunk = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"]);

    git(dir, &["checkout", "--quiet", "-b", "feature"]);
    let feature = commit(dir, "feature.py", "a = 1\nb = 2\nc = 3\n", 2);

    git(dir, &["checkout", "--quiet", &trunk]);
    let main = commit(dir, "main.md", "notes\n", 3);

    let date = "2020-01-04T10:00:00+01:00";
    let status = StdCommand::new("git")
        .args(["merge", "--quiet", "--no-ff", "-m", "merge feature", "feature"])
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .current_dir(dir.path())
        .status()
        .expect("git merge failed to start");
    assert!(status.success(), "git merge failed");
    let merge = git(dir, &["rev-parse", "HEAD"]);

    MergeRepo {
        base,
        main,
        feature,
        merge,
    }
}

#[test]
fn merge_is_diffed_against_its_first_parent() {
    let dir = TempDir::new().expect("tempdir");
    let repo = merge_repo(&dir);
    write_config(&dir, "[filters.changes]\nfiles = \"1-1\"\nadditions = \"2-3\"");

    let tasks = select_json(&dir);

    assert_eq!(ids(&tasks), vec![repo.merge.as_str(), repo.feature.as_str()]);
}

#[test]
fn merge_file_types_come_from_its_first_parent_diff() {
    let dir = TempDir::new().expect("tempdir");
    let repo = merge_repo(&dir);

    write_config(&dir, "[filters.changes]\nfile_types = [\".md\"]");
    assert_eq!(ids(&select_json(&dir)), vec![repo.main.as_str()]);

    write_config(&dir, "[filters.changes]\nfile_types = [\".py\"]");
    assert_eq!(ids(&select_json(&dir)), vec![repo.merge.as_str(), repo.feature.as_str()]);
}

fn merge_image(dir: &TempDir, repo: &MergeRepo, order: &str) -> String {
    write_config(
        dir,
        &format!(
            "ancestor_order = \"{order}\"\n\
             [filters]\nlimit = 1\n\
             [analysis.{}]\nimage = \"feature-img\"\ncommand = \"ls\"\n\
             [analysis.{}]\nimage = \"base-img\"\ncommand = \"ls\"",
            repo.feature, repo.base
        ),
    );

    let tasks = select_json(dir);
    assert_eq!(ids(&tasks), vec![repo.merge.as_str()]);
    tasks[0]["image"].as_str().expect("image").to_string()
}

#[test]
fn ancestor_order_decides_which_parent_line_wins() {
    let dir = TempDir::new().expect("tempdir");
    let repo = merge_repo(&dir);

    assert_eq!(merge_image(&dir, &repo, "breadth-first"), "feature-img");
    assert_eq!(merge_image(&dir, &repo, "first-parent"), "base-img");
}
