//! Ties the engine together: discovery, command submission, and the refresh
//! cycles that keep the model in step with the repository on disk.

use crate::config::Settings;
use crate::error::{EngineError, EngineResult, ExecutionError};
use crate::git::command::CommandIntent;
use crate::git::executor::{CommandExecutor, CommandResult};
use crate::git::parser::{self, FileDiff};
use crate::graph::GraphBuilder;
use crate::model::{
    ChangeEvent, Reference, RepositoryModel, RepositorySnapshot, WorkingTreeStatus,
};
use crate::queue::{OperationQueue, Priority, Ticket};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// A git repository under engine management.
///
/// UI collaborators read [`snapshot`] and listen on [`subscribe`]; they
/// never touch git directly.
///
/// [`snapshot`]: Repository::snapshot
/// [`subscribe`]: Repository::subscribe
pub struct Repository {
    path: PathBuf,
    queue: OperationQueue,
    model: Arc<RepositoryModel>,
    settings: Settings,
}

impl Repository {
    /// Detect a repository from the current working directory.
    pub fn discover() -> EngineResult<Self> {
        Self::discover_from(env::current_dir()?)
    }

    /// Walk up from `start_path` until a `.git` directory appears.
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> EngineResult<Self> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(".git").exists() {
                return Ok(Self::open(current, Settings::default()));
            }
            if !current.pop() {
                return Err(EngineError::NotARepository);
            }
        }
    }

    /// Open a known repository directory with the given settings.
    pub fn open<P: AsRef<Path>>(path: P, settings: Settings) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut executor =
            CommandExecutor::new(&path).with_default_timeout(settings.command_timeout());
        if let Some(binary) = &settings.git.binary {
            executor = executor.with_binary(binary);
        }

        Repository {
            path,
            queue: OperationQueue::new(executor),
            model: Arc::new(RepositoryModel::new()),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current published snapshot.
    pub fn snapshot(&self) -> Arc<RepositorySnapshot> {
        self.model.snapshot()
    }

    /// Subscribe to scoped change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.model.subscribe()
    }

    /// Run a user-initiated command.
    ///
    /// Mutations are followed by a full refresh so the published snapshot
    /// reflects the new repository state. A failed mutation surfaces git's
    /// stderr verbatim, tagged with the operation name.
    pub async fn submit(&self, intent: CommandIntent) -> EngineResult<CommandResult> {
        let mutating = intent.is_mutating();
        let outcome = self.queue.execute(intent, Priority::Interactive).await;

        // Refresh even when the command failed: a conflicted merge exits
        // non-zero but still changes the working tree.
        if mutating {
            self.refresh_logged().await;
        }
        Ok(outcome?)
    }

    /// Enqueue a background read without waiting. The ticket is cancellable
    /// through [`cancel`] until the command starts.
    ///
    /// [`cancel`]: Repository::cancel
    pub fn submit_background(&self, intent: CommandIntent) -> Ticket {
        self.queue.submit(intent, Priority::Background)
    }

    pub fn cancel(&self, ticket_id: crate::queue::RequestId) {
        self.queue.cancel(ticket_id);
    }

    /// Refresh every slice of the model.
    pub async fn refresh(&self) -> EngineResult<()> {
        self.refresh_refs().await?;
        self.refresh_history().await?;
        self.refresh_status().await?;
        Ok(())
    }

    /// Refresh and log failures instead of surfacing them; the model keeps
    /// the last good snapshot. This is the background-refresh policy.
    pub async fn refresh_logged(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "background refresh failed; keeping previous snapshot");
        }
    }

    /// Rebuild the ref set (branches, tags, remote-tracking).
    pub async fn refresh_refs(&self) -> EngineResult<()> {
        let result = self
            .queue
            .execute(CommandIntent::ListRefs, Priority::Background)
            .await?;
        let records = parser::parse_refs(&result.stdout_text())?;
        let refs: Vec<Reference> = records.into_iter().map(Reference::from).collect();
        self.model.apply_refs(refs);
        Ok(())
    }

    /// Rebuild the commit graph from all refs.
    ///
    /// A failed log walk or a graph inconsistency aborts only this refresh;
    /// the previous valid snapshot stays published (stale beats corrupt).
    /// The one non-zero exit that is not a failure is an unborn HEAD, which
    /// yields an empty history.
    pub async fn refresh_history(&self) -> EngineResult<()> {
        let intent = CommandIntent::Log {
            limit: self.settings.history_limit(),
        };
        let records = match self.queue.execute(intent, Priority::Background).await {
            Ok(result) => parser::parse_log(&result.stdout_text())?,
            Err(err @ ExecutionError::NonZeroExit { .. }) => {
                let head = self
                    .queue
                    .execute(CommandIntent::ResolveHead, Priority::Background)
                    .await?;
                if head.stdout.is_empty() {
                    Vec::new()
                } else {
                    return Err(err.into());
                }
            }
            Err(e) => return Err(e.into()),
        };
        let graph = GraphBuilder::build(records)?;
        self.model.apply_history(graph);
        Ok(())
    }

    /// Rebuild the working-tree status, including merge/rebase flags.
    pub async fn refresh_status(&self) -> EngineResult<()> {
        let result = self
            .queue
            .execute(CommandIntent::Status, Priority::Background)
            .await?;
        let records = parser::parse_status(&result.stdout_text())?;

        let git_dir = self.path.join(".git");
        let in_merge = git_dir.join("MERGE_HEAD").exists();
        let in_rebase =
            git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists();

        self.model
            .apply_status(WorkingTreeStatus::from_records(records, in_merge, in_rebase));
        Ok(())
    }

    /// Diff one path (or the whole tree) against HEAD or the index.
    pub async fn diff(&self, path: Option<String>, staged: bool) -> EngineResult<Vec<FileDiff>> {
        let result = self
            .queue
            .execute(CommandIntent::Diff { path, staged }, Priority::Interactive)
            .await?;
        Ok(parser::parse_diff(&result.stdout_text())?)
    }

    /// Ahead/behind counts for a branch against its upstream.
    pub async fn ahead_behind(
        &self,
        branch: &str,
        upstream: &str,
    ) -> EngineResult<(usize, usize)> {
        let result = self
            .queue
            .execute(
                CommandIntent::AheadBehind {
                    branch: branch.to_string(),
                    upstream: upstream.to_string(),
                },
                Priority::Background,
            )
            .await?;
        Ok(parser::parse_ahead_behind(&result.stdout_text())?)
    }

    /// Periodic background refresh driven by the settings interval.
    ///
    /// The loop holds only a weak reference; it ends when the repository is
    /// dropped or auto refresh is disabled.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.settings.refresh.auto_refresh {
            return None;
        }
        let interval = self.settings.refresh_interval();
        let weak = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(repo) => repo.refresh_logged().await,
                    None => break,
                }
            }
        }))
    }
}
