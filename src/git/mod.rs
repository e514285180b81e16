pub mod diff;
pub mod executor;
pub mod history;
pub mod merge;
pub mod parser;
pub mod repository;
pub mod workspace;

// Re-export commonly used types
pub use diff::{DiffEngine, EMPTY_TREE_HASH};
pub use executor::{CommandOutput, GitExecutor};
pub use history::HistoryService;
pub use merge::{Conflict, ConflictResolution, MergeEngine};
pub use parser::{
    Branch, BranchLine, BlockDiff, Commit, FileDiff, Tag, TreeEntry, TreeEntryKind,
    parse_branch_lines, parse_file_diff, parse_log, parse_path_lines, parse_tree_entries,
};
pub use repository::Repository;
pub use workspace::Workspace;
