//! Typed descriptions of git operations.
//!
//! Every operation the engine can run is a variant here; argument vectors are
//! built by exhaustive matching, so there is no way to submit a command the
//! engine does not know about.

/// Field separator used in `--format` strings: ASCII unit separator, which
/// cannot appear in ref names and is stripped from commit messages by git.
pub const FIELD_SEP: char = '\u{1f}';

/// Record separator between log entries: ASCII record separator.
pub const RECORD_SEP: char = '\u{1e}';

/// Log format handed to `git log`. One record per commit, fields split on
/// [`FIELD_SEP`], records split on [`RECORD_SEP`]. The full `%B` body comes
/// last so embedded newlines never break field alignment.
pub const LOG_FORMAT: &str =
    "%H%x1f%P%x1f%T%x1f%an%x1f%ae%x1f%at%x1f%cn%x1f%ce%x1f%ct%x1f%B%x1e";

/// Ref listing format for `git for-each-ref`: full name, target object,
/// peeled target (annotated tags), and the HEAD marker.
pub const REF_FORMAT: &str =
    "%(refname)\u{1f}%(objectname)\u{1f}%(*objectname)\u{1f}%(HEAD)";

/// A requested git operation with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandIntent {
    // Read-only queries.
    Log { limit: Option<usize> },
    ListRefs,
    Status,
    Diff { path: Option<String>, staged: bool },
    AheadBehind { branch: String, upstream: String },
    ResolveHead,

    // Working-tree and index mutations.
    Stage { path: String },
    Unstage { path: String },
    RevertPath { path: String },
    Commit { message: String, amend: bool },
    StashSave { message: Option<String> },
    StashPop,

    // Ref mutations.
    Checkout { target: String },
    CreateBranch { name: String, start_point: Option<String> },
    DeleteBranch { name: String, force: bool },
    RenameBranch { from: String, to: String },
    CreateTag { name: String, target: Option<String> },
    DeleteTag { name: String },
    Merge { branch: String },

    // Remote operations.
    Fetch { remote: String, prune: bool },
    Pull { remote: String, branch: Option<String> },
    Push { remote: String, branch: String, set_upstream: bool },
}

impl CommandIntent {
    /// Whether this intent can change repository state. Mutations are never
    /// coalesced and always run in submission order.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            CommandIntent::Log { .. }
                | CommandIntent::ListRefs
                | CommandIntent::Status
                | CommandIntent::Diff { .. }
                | CommandIntent::AheadBehind { .. }
                | CommandIntent::ResolveHead
        )
    }

    /// Short operation name for error reports and logs.
    pub fn operation_name(&self) -> &'static str {
        match self {
            CommandIntent::Log { .. } => "log",
            CommandIntent::ListRefs => "list-refs",
            CommandIntent::Status => "status",
            CommandIntent::Diff { .. } => "diff",
            CommandIntent::AheadBehind { .. } => "ahead-behind",
            CommandIntent::ResolveHead => "resolve-head",
            CommandIntent::Stage { .. } => "stage",
            CommandIntent::Unstage { .. } => "unstage",
            CommandIntent::RevertPath { .. } => "revert",
            CommandIntent::Commit { .. } => "commit",
            CommandIntent::StashSave { .. } => "stash",
            CommandIntent::StashPop => "stash-pop",
            CommandIntent::Checkout { .. } => "checkout",
            CommandIntent::CreateBranch { .. } => "create-branch",
            CommandIntent::DeleteBranch { .. } => "delete-branch",
            CommandIntent::RenameBranch { .. } => "rename-branch",
            CommandIntent::CreateTag { .. } => "create-tag",
            CommandIntent::DeleteTag { .. } => "delete-tag",
            CommandIntent::Merge { .. } => "merge",
            CommandIntent::Fetch { .. } => "fetch",
            CommandIntent::Pull { .. } => "pull",
            CommandIntent::Push { .. } => "push",
        }
    }

    /// Non-zero exit codes that mean "nothing to do" rather than failure.
    pub fn benign_exit_codes(&self) -> &'static [i32] {
        match self {
            // `git commit` exits 1 when there is nothing to commit.
            CommandIntent::Commit { .. } => &[1],
            // `rev-parse --verify --quiet` exits 1 when HEAD is unborn.
            CommandIntent::ResolveHead => &[1],
            _ => &[],
        }
    }

    /// Build the full git argument vector for this intent.
    pub fn args(&self) -> Vec<String> {
        fn v(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|s| s.to_string()).collect()
        }

        match self {
            CommandIntent::Log { limit } => {
                let mut args = v(&[
                    "log",
                    "--branches",
                    "--tags",
                    "--remotes",
                    &format!("--format={LOG_FORMAT}"),
                ]);
                if let Some(n) = limit {
                    args.push("-n".into());
                    args.push(n.to_string());
                }
                args
            }
            CommandIntent::ListRefs => v(&[
                "for-each-ref",
                &format!("--format={REF_FORMAT}"),
                "refs/heads",
                "refs/tags",
                "refs/remotes",
            ]),
            CommandIntent::Status => v(&["status", "--porcelain"]),
            CommandIntent::Diff { path, staged } => {
                let mut args = v(&["diff"]);
                if *staged {
                    args.push("--cached".into());
                }
                if let Some(p) = path {
                    args.push("--".into());
                    args.push(p.clone());
                }
                args
            }
            CommandIntent::AheadBehind { branch, upstream } => v(&[
                "rev-list",
                "--left-right",
                "--count",
                &format!("{branch}...{upstream}"),
            ]),
            CommandIntent::ResolveHead => v(&["rev-parse", "--verify", "--quiet", "HEAD"]),
            CommandIntent::Stage { path } => v(&["add", "--", path]),
            CommandIntent::Unstage { path } => v(&["reset", "HEAD", "--", path]),
            CommandIntent::RevertPath { path } => v(&["checkout", "HEAD", "--", path]),
            CommandIntent::Commit { message, amend } => {
                let mut args = v(&["commit", "-m", message]);
                if *amend {
                    args.push("--amend".into());
                }
                args
            }
            CommandIntent::StashSave { message } => {
                let mut args = v(&["stash", "push"]);
                if let Some(m) = message {
                    args.push("-m".into());
                    args.push(m.clone());
                }
                args
            }
            CommandIntent::StashPop => v(&["stash", "pop"]),
            CommandIntent::Checkout { target } => v(&["checkout", target]),
            CommandIntent::CreateBranch { name, start_point } => {
                let mut args = v(&["branch", name]);
                if let Some(start) = start_point {
                    args.push(start.clone());
                }
                args
            }
            CommandIntent::DeleteBranch { name, force } => {
                v(&["branch", if *force { "-D" } else { "-d" }, name])
            }
            CommandIntent::RenameBranch { from, to } => v(&["branch", "-m", from, to]),
            CommandIntent::CreateTag { name, target } => {
                let mut args = v(&["tag", name]);
                if let Some(t) = target {
                    args.push(t.clone());
                }
                args
            }
            CommandIntent::DeleteTag { name } => v(&["tag", "-d", name]),
            CommandIntent::Merge { branch } => v(&["merge", branch]),
            CommandIntent::Fetch { remote, prune } => {
                let mut args = v(&["fetch", remote]);
                if *prune {
                    args.push("--prune".into());
                }
                args
            }
            CommandIntent::Pull { remote, branch } => {
                let mut args = v(&["pull", remote]);
                if let Some(b) = branch {
                    args.push(b.clone());
                }
                args
            }
            CommandIntent::Push {
                remote,
                branch,
                set_upstream,
            } => {
                let mut args = v(&["push"]);
                if *set_upstream {
                    args.push("--set-upstream".into());
                }
                args.push(remote.clone());
                args.push(branch.clone());
                args
            }
        }
    }
}
