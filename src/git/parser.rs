//! Stateless parsers for git's textual output.
//!
//! Each function maps one output shape to domain records. A malformed record
//! is skipped with a warning rather than failing the whole parse; the only
//! hard failures are load-bearing headers (hunk headers, the ahead/behind
//! count line), where continuing would misattribute everything after them.

use crate::error::{ParseError, ParseResult};
use crate::git::command::{FIELD_SEP, RECORD_SEP};
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

/// Author or committer identity with timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

/// One commit as reported by `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub parents: Vec<String>,
    pub tree: String,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl CommitRecord {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Classification of a ref by its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
    RemoteTracking,
}

/// One ref as reported by `git for-each-ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRecord {
    /// Short name (prefix stripped).
    pub name: String,
    pub kind: RefKind,
    /// Commit id the ref resolves to; annotated tags are peeled.
    pub target: String,
    /// True for the branch HEAD points at.
    pub is_head: bool,
}

/// Working-tree status codes from porcelain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Conflicted,
    Untracked,
}

/// One path's state within either the staged or unstaged section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    /// Original path for renames and copies.
    pub old_path: Option<String>,
    pub code: StatusCode,
}

/// Parsed `git status --porcelain`, split into index and worktree sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecords {
    pub staged: Vec<StatusEntry>,
    pub unstaged: Vec<StatusEntry>,
}

impl StatusRecords {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

/// Origin of one diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOrigin {
    Context,
    Added,
    Removed,
}

/// One diff line, content kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub origin: DiffOrigin,
    pub content: String,
}

/// One hunk: the `@@` header ranges plus its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// The raw header line, verbatim.
    pub header: String,
    pub lines: Vec<DiffLine>,
}

/// All hunks for one file pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<DiffHunk>,
}

/// Parse `git log` output produced with [`LOG_FORMAT`].
///
/// Tolerates commits with zero, one, or many parents. A record with the
/// wrong field count or an unparseable timestamp is skipped with a warning.
///
/// [`LOG_FORMAT`]: crate::git::command::LOG_FORMAT
pub fn parse_log(output: &str) -> ParseResult<Vec<CommitRecord>> {
    let mut commits = Vec::new();

    for record in output.split(RECORD_SEP) {
        let record = record.trim_start_matches('\n');
        if record.is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split(FIELD_SEP).collect();
        if fields.len() != 10 {
            warn!(
                fields = fields.len(),
                "skipping malformed log record (expected 10 fields)"
            );
            continue;
        }

        let author_when = parse_epoch(fields[5]);
        let committer_when = parse_epoch(fields[8]);
        let (author_when, committer_when) = match (author_when, committer_when) {
            (Some(a), Some(c)) => (a, c),
            _ => {
                warn!(id = fields[0], "skipping log record with bad timestamp");
                continue;
            }
        };

        commits.push(CommitRecord {
            id: fields[0].to_string(),
            parents: fields[1].split_whitespace().map(String::from).collect(),
            tree: fields[2].to_string(),
            author: Signature {
                name: fields[3].to_string(),
                email: fields[4].to_string(),
                when: author_when,
            },
            committer: Signature {
                name: fields[6].to_string(),
                email: fields[7].to_string(),
                when: committer_when,
            },
            message: fields[9].trim_end_matches('\n').to_string(),
        });
    }

    Ok(commits)
}

fn parse_epoch(field: &str) -> Option<DateTime<Utc>> {
    let secs = field.trim().parse::<i64>().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Parse `git for-each-ref` output produced with [`REF_FORMAT`].
///
/// Refs are classified by name prefix; anything outside the three known
/// namespaces is skipped.
///
/// [`REF_FORMAT`]: crate::git::command::REF_FORMAT
pub fn parse_refs(output: &str) -> ParseResult<Vec<RefRecord>> {
    let mut refs = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_SEP).collect();
        if fields.len() != 4 {
            warn!("skipping malformed ref line");
            continue;
        }

        let full_name = fields[0];
        let (kind, name) = if let Some(rest) = full_name.strip_prefix("refs/heads/") {
            (RefKind::Branch, rest)
        } else if let Some(rest) = full_name.strip_prefix("refs/tags/") {
            (RefKind::Tag, rest)
        } else if let Some(rest) = full_name.strip_prefix("refs/remotes/") {
            (RefKind::RemoteTracking, rest)
        } else {
            continue;
        };

        // Annotated tags report the tag object in %(objectname); the peeled
        // field holds the commit it points at.
        let target = if fields[2].is_empty() {
            fields[1]
        } else {
            fields[2]
        };
        if target.is_empty() {
            warn!(name, "skipping ref with no target");
            continue;
        }

        refs.push(RefRecord {
            name: name.to_string(),
            kind,
            target: target.to_string(),
            is_head: kind == RefKind::Branch && fields[3] == "*",
        });
    }

    Ok(refs)
}

/// Parse `git status --porcelain` (v1).
///
/// The first column is the index (staged) state, the second the worktree
/// (unstaged) state. Rename entries carry both paths. Conflict codes produce
/// a single `Conflicted` entry in the unstaged section.
pub fn parse_status(output: &str) -> ParseResult<StatusRecords> {
    let mut records = StatusRecords::default();

    for line in output.lines() {
        if line.len() < 4 {
            if !line.is_empty() {
                warn!("skipping malformed status line");
            }
            continue;
        }

        let mut chars = line.chars();
        let x = chars.next().unwrap_or(' ');
        let y = chars.next().unwrap_or(' ');
        let rest = &line[3..];

        let (path, old_path) = match rest.split_once(" -> ") {
            Some((old, new)) => (new.to_string(), Some(old.to_string())),
            None => (rest.to_string(), None),
        };

        if x == '?' && y == '?' {
            records.unstaged.push(StatusEntry {
                path,
                old_path: None,
                code: StatusCode::Untracked,
            });
            continue;
        }

        if is_conflict(x, y) {
            records.unstaged.push(StatusEntry {
                path,
                old_path: None,
                code: StatusCode::Conflicted,
            });
            continue;
        }

        if let Some(code) = code_for(x) {
            records.staged.push(StatusEntry {
                path: path.clone(),
                old_path: old_path.clone(),
                code,
            });
        }
        if let Some(code) = code_for(y) {
            records.unstaged.push(StatusEntry {
                path,
                old_path,
                code,
            });
        }
    }

    Ok(records)
}

fn is_conflict(x: char, y: char) -> bool {
    matches!(
        (x, y),
        ('D', 'D') | ('A', 'A') | ('U', _) | (_, 'U')
    )
}

fn code_for(c: char) -> Option<StatusCode> {
    match c {
        'A' => Some(StatusCode::Added),
        'M' | 'T' => Some(StatusCode::Modified),
        'D' => Some(StatusCode::Deleted),
        'R' => Some(StatusCode::Renamed),
        'C' => Some(StatusCode::Copied),
        _ => None,
    }
}

/// Parse unified diff output into per-file hunks.
///
/// Hunk lines are preserved verbatim. A malformed `@@` header rejects the
/// whole parse: everything after it would be attributed to the wrong ranges.
pub fn parse_diff(output: &str) -> ParseResult<Vec<FileDiff>> {
    let mut files: Vec<FileDiff> = Vec::new();

    for line in output.lines() {
        if line.starts_with("diff --git ") {
            files.push(FileDiff {
                old_path: String::new(),
                new_path: String::new(),
                hunks: Vec::new(),
            });
        } else if let Some(old) = line.strip_prefix("--- ") {
            if let Some(file) = files.last_mut() {
                file.old_path = strip_diff_prefix(old).to_string();
            }
        } else if let Some(new) = line.strip_prefix("+++ ") {
            if let Some(file) = files.last_mut() {
                file.new_path = strip_diff_prefix(new).to_string();
            }
        } else if line.starts_with("@@") {
            let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(line)?;
            if let Some(file) = files.last_mut() {
                file.hunks.push(DiffHunk {
                    old_start,
                    old_lines,
                    new_start,
                    new_lines,
                    header: line.to_string(),
                    lines: Vec::new(),
                });
            }
        } else if let Some(hunk) = files.last_mut().and_then(|f| f.hunks.last_mut()) {
            let origin = match line.chars().next() {
                Some('+') => DiffOrigin::Added,
                Some('-') => DiffOrigin::Removed,
                Some(' ') | Some('\\') => DiffOrigin::Context,
                _ => continue,
            };
            hunk.lines.push(DiffLine {
                origin,
                content: line.get(1..).unwrap_or_default().to_string(),
            });
        }
    }

    Ok(files)
}

fn strip_diff_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// `@@ -old_start[,old_lines] +new_start[,new_lines] @@ ...`
fn parse_hunk_header(line: &str) -> ParseResult<(u32, u32, u32, u32)> {
    let malformed = || ParseError::Malformed(format!("bad hunk header: {line}"));

    let body = line
        .strip_prefix("@@ ")
        .and_then(|s| s.split(" @@").next())
        .ok_or_else(malformed)?;

    let mut parts = body.split(' ');
    let old = parts.next().ok_or_else(malformed)?;
    let new = parts.next().ok_or_else(malformed)?;

    let (old_start, old_lines) = parse_range(old, '-').ok_or_else(malformed)?;
    let (new_start, new_lines) = parse_range(new, '+').ok_or_else(malformed)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(text: &str, sign: char) -> Option<(u32, u32)> {
    let text = text.strip_prefix(sign)?;
    match text.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((text.parse().ok()?, 1)),
    }
}

/// Parse `git rev-list --left-right --count A...B` output.
///
/// The count line is the whole payload; if it is malformed the output is
/// rejected rather than guessed at.
pub fn parse_ahead_behind(output: &str) -> ParseResult<(usize, usize)> {
    let parts: Vec<&str> = output.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(ParseError::Malformed(format!(
            "expected two counts, got: {}",
            output.trim()
        )));
    }

    let ahead = parts[0]
        .parse::<usize>()
        .map_err(|_| ParseError::Malformed(format!("bad ahead count: {}", parts[0])))?;
    let behind = parts[1]
        .parse::<usize>()
        .map_err(|_| ParseError::Malformed(format!("bad behind count: {}", parts[1])))?;

    Ok((ahead, behind))
}
