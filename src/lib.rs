pub mod audit;
pub mod config;
pub mod error;
pub mod git;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use error::{GitError, Result};
pub use git::{
    Branch, Commit, Conflict, ConflictResolution, DiffEngine, FileDiff, HistoryService,
    MergeEngine, Repository, Tag, Workspace,
};
