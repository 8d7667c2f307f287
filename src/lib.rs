pub mod config;
pub mod error;
pub mod git;
pub mod graph;
pub mod model;
pub mod queue;
pub mod repository;

// Re-export the surface UI collaborators work against.
pub use error::{EngineError, EngineResult, ExecutionError, ParseError};
pub use git::{CommandIntent, CommandResult, GitVersion};
pub use graph::{CommitGraph, CommitGraphNode, GraphBuilder};
pub use model::{ChangeEvent, ChangeScope, Reference, RepositorySnapshot, WorkingTreeStatus};
pub use queue::{OperationQueue, Priority, RequestId, Ticket};
pub use repository::Repository;
