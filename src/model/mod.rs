//! The authoritative in-memory picture of the repository.
//!
//! State is published as immutable, versioned snapshots. An update builds a
//! whole new snapshot and swaps it in under one lock; readers hold `Arc`s and
//! can never observe a half-applied update. Nothing is patched in place, so
//! the cache cannot drift from what git last reported.

pub mod notifier;

pub use notifier::{ChangeEvent, ChangeNotifier, ChangeScope};

use crate::git::parser::{RefKind, RefRecord, StatusEntry, StatusRecords};
use crate::graph::CommitGraph;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// A named pointer to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub kind: RefKind,
    pub target: String,
    /// For branches: whether HEAD points here.
    pub is_current: bool,
}

impl From<RefRecord> for Reference {
    fn from(record: RefRecord) -> Self {
        Reference {
            name: record.name,
            kind: record.kind,
            target: record.target,
            is_current: record.is_head,
        }
    }
}

/// Full working-tree state, rebuilt on every status refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub staged: Vec<StatusEntry>,
    pub unstaged: Vec<StatusEntry>,
    pub in_merge: bool,
    pub in_rebase: bool,
}

impl WorkingTreeStatus {
    pub fn from_records(records: StatusRecords, in_merge: bool, in_rebase: bool) -> Self {
        WorkingTreeStatus {
            staged: records.staged,
            unstaged: records.unstaged,
            in_merge,
            in_rebase,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

/// Immutable bundle of everything observable about the repository at one
/// instant. Never mutated after publication.
#[derive(Debug)]
pub struct RepositorySnapshot {
    version: u64,
    head: Option<Reference>,
    refs: Vec<Reference>,
    graph: Arc<CommitGraph>,
    status: WorkingTreeStatus,
    refs_by_commit: HashMap<String, Vec<String>>,
}

impl RepositorySnapshot {
    fn new(
        version: u64,
        head: Option<Reference>,
        refs: Vec<Reference>,
        graph: Arc<CommitGraph>,
        status: WorkingTreeStatus,
    ) -> Self {
        let mut refs_by_commit: HashMap<String, Vec<String>> = HashMap::new();
        for r in &refs {
            refs_by_commit
                .entry(r.target.clone())
                .or_default()
                .push(r.name.clone());
        }
        RepositorySnapshot {
            version,
            head,
            refs,
            graph,
            status,
            refs_by_commit,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn head(&self) -> Option<&Reference> {
        self.head.as_ref()
    }

    pub fn refs(&self) -> &[Reference] {
        &self.refs
    }

    pub fn branches(&self) -> impl Iterator<Item = &Reference> {
        self.refs.iter().filter(|r| r.kind == RefKind::Branch)
    }

    pub fn tags(&self) -> impl Iterator<Item = &Reference> {
        self.refs.iter().filter(|r| r.kind == RefKind::Tag)
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn status(&self) -> &WorkingTreeStatus {
        &self.status
    }

    /// Names of all refs pointing at the given commit (history cell labels).
    pub fn refs_at(&self, commit_id: &str) -> &[String] {
        self.refs_by_commit
            .get(commit_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_detached(&self) -> bool {
        self.head.is_none()
    }
}

struct Versions {
    current: Arc<RepositorySnapshot>,
    previous: Option<Arc<RepositorySnapshot>>,
}

/// Single-writer, multi-reader snapshot store.
///
/// Only the refresh apply path writes; everyone else reads `Arc` snapshots.
/// The prior snapshot is retained so updates can be diffed for change scope.
pub struct RepositoryModel {
    versions: RwLock<Versions>,
    notifier: ChangeNotifier,
}

impl RepositoryModel {
    pub fn new() -> Self {
        let empty = Arc::new(RepositorySnapshot::new(
            0,
            None,
            Vec::new(),
            Arc::new(CommitGraph::default()),
            WorkingTreeStatus::default(),
        ));
        RepositoryModel {
            versions: RwLock::new(Versions {
                current: empty,
                previous: None,
            }),
            notifier: ChangeNotifier::default(),
        }
    }

    /// Current snapshot. Cheap; callers keep the `Arc` as long as they like.
    pub fn snapshot(&self) -> Arc<RepositorySnapshot> {
        self.versions.read().expect("model lock poisoned").current.clone()
    }

    /// The snapshot one version back, if any.
    pub fn previous_snapshot(&self) -> Option<Arc<RepositorySnapshot>> {
        self.versions.read().expect("model lock poisoned").previous.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// Replace the ref set. No-op (no event, no version bump) when the new
    /// set equals the current one.
    pub fn apply_refs(&self, refs: Vec<Reference>) -> u64 {
        let head = refs.iter().find(|r| r.is_current).cloned();
        self.replace(ChangeScope::Refs, |current| {
            if current.refs == refs && current.head.as_ref() == head.as_ref() {
                return None;
            }
            Some(RepositorySnapshot::new(
                current.version + 1,
                head.clone(),
                refs.clone(),
                current.graph.clone(),
                current.status.clone(),
            ))
        })
    }

    /// Replace the commit graph.
    pub fn apply_history(&self, graph: CommitGraph) -> u64 {
        let graph = Arc::new(graph);
        self.replace(ChangeScope::History, |current| {
            if *current.graph == *graph {
                return None;
            }
            Some(RepositorySnapshot::new(
                current.version + 1,
                current.head.clone(),
                current.refs.clone(),
                graph.clone(),
                current.status.clone(),
            ))
        })
    }

    /// Replace the working-tree status.
    pub fn apply_status(&self, status: WorkingTreeStatus) -> u64 {
        self.replace(ChangeScope::WorkingTree, |current| {
            if current.status == status {
                return None;
            }
            Some(RepositorySnapshot::new(
                current.version + 1,
                current.head.clone(),
                current.refs.clone(),
                current.graph.clone(),
                status.clone(),
            ))
        })
    }

    /// Atomic replace-and-publish. The builder returns `None` to signal
    /// "nothing actually changed"; otherwise the new snapshot becomes
    /// current, the old one is retained as previous, and one scoped event
    /// goes out. Returns the version current after the call.
    fn replace<F>(&self, scope: ChangeScope, build: F) -> u64
    where
        F: Fn(&RepositorySnapshot) -> Option<RepositorySnapshot>,
    {
        let mut versions = self.versions.write().expect("model lock poisoned");
        match build(&versions.current) {
            Some(next) => {
                let next = Arc::new(next);
                let version = next.version;
                versions.previous = Some(std::mem::replace(&mut versions.current, next));
                drop(versions);
                self.notifier.notify(ChangeEvent { version, scope });
                version
            }
            None => versions.current.version,
        }
    }
}

impl Default for RepositoryModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::parser::{CommitRecord, Signature, StatusCode};
    use crate::graph::GraphBuilder;
    use chrono::{TimeZone, Utc};

    fn branch(name: &str, target: &str, current: bool) -> Reference {
        Reference {
            name: name.into(),
            kind: RefKind::Branch,
            target: target.into(),
            is_current: current,
        }
    }

    fn small_graph() -> CommitGraph {
        let sig = Signature {
            name: "Test".into(),
            email: "t@example.com".into(),
            when: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let records = vec![CommitRecord {
            id: "abc".into(),
            parents: vec![],
            tree: "t".into(),
            author: sig.clone(),
            committer: sig,
            message: "m".into(),
        }];
        GraphBuilder::build(records).unwrap()
    }

    #[test]
    fn test_versions_are_monotonic() {
        let model = RepositoryModel::new();
        assert_eq!(model.snapshot().version(), 0);

        let v1 = model.apply_refs(vec![branch("main", "abc", true)]);
        let v2 = model.apply_history(small_graph());
        let v3 = model.apply_status(WorkingTreeStatus {
            staged: vec![StatusEntry {
                path: "f".into(),
                old_path: None,
                code: StatusCode::Modified,
            }],
            ..Default::default()
        });

        assert_eq!((v1, v2, v3), (1, 2, 3));
        assert_eq!(model.snapshot().version(), 3);
    }

    #[test]
    fn test_unchanged_slice_publishes_nothing() {
        let model = RepositoryModel::new();
        let mut rx = model.subscribe();

        let refs = vec![branch("main", "abc", true)];
        model.apply_refs(refs.clone());
        let v = model.apply_refs(refs);

        assert_eq!(v, 1);
        assert_eq!(rx.try_recv().unwrap().version, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_events_carry_scope() {
        let model = RepositoryModel::new();
        let mut rx = model.subscribe();

        model.apply_refs(vec![branch("main", "abc", true)]);
        model.apply_history(small_graph());

        assert_eq!(rx.try_recv().unwrap().scope, ChangeScope::Refs);
        assert_eq!(rx.try_recv().unwrap().scope, ChangeScope::History);
    }

    #[test]
    fn test_head_follows_current_branch() {
        let model = RepositoryModel::new();
        model.apply_refs(vec![
            branch("main", "abc", false),
            branch("topic", "def", true),
        ]);

        let snapshot = model.snapshot();
        assert_eq!(snapshot.head().unwrap().name, "topic");
        assert!(!snapshot.is_detached());
    }

    #[test]
    fn test_refs_at_indexes_by_commit() {
        let model = RepositoryModel::new();
        model.apply_refs(vec![
            branch("main", "abc", true),
            Reference {
                name: "v1.0".into(),
                kind: RefKind::Tag,
                target: "abc".into(),
                is_current: false,
            },
            branch("other", "def", false),
        ]);

        let snapshot = model.snapshot();
        let mut at = snapshot.refs_at("abc").to_vec();
        at.sort();
        assert_eq!(at, vec!["main", "v1.0"]);
        assert!(snapshot.refs_at("zzz").is_empty());
    }

    #[test]
    fn test_previous_snapshot_retained() {
        let model = RepositoryModel::new();
        assert!(model.previous_snapshot().is_none());

        model.apply_refs(vec![branch("main", "abc", true)]);
        model.apply_refs(vec![branch("main", "def", true)]);

        let prev = model.previous_snapshot().unwrap();
        let cur = model.snapshot();
        assert_eq!(prev.version(), 1);
        assert_eq!(cur.version(), 2);
        assert_eq!(prev.refs()[0].target, "abc");
        assert_eq!(cur.refs()[0].target, "def");
    }

    #[test]
    fn test_readers_never_see_mixed_slices() {
        // A reader's Arc stays internally consistent across later updates.
        let model = RepositoryModel::new();
        model.apply_refs(vec![branch("main", "abc", true)]);

        let held = model.snapshot();
        model.apply_history(small_graph());
        model.apply_status(WorkingTreeStatus::default());

        assert_eq!(held.version(), 1);
        assert!(held.graph().is_empty());
        assert_eq!(model.snapshot().version(), 2);
    }
}
