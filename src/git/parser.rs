use crate::error::{GitError, GitResult};
use serde::Serialize;

/// Separator placed between the fields of one log record.
///
/// Two UNIT SEPARATOR codepoints; git emits it via `%x1f%x1f`. Commit
/// metadata never contains it, which is what makes the six-field split exact.
pub const LOG_FIELD_SEPARATOR: &str = "\u{1f}\u{1f}";

/// Separator placed between successive log records (`%x1e%x1e`)
pub const LOG_RECORD_SEPARATOR: &str = "\u{1e}\u{1e}";

/// Pretty-format string handed to `git log`:
/// hash, committer name, committer email, commit time, subject, body.
pub const LOG_FORMAT: &str = "%H%x1f%x1f%cn%x1f%x1f%ce%x1f%x1f%ct%x1f%x1f%s%x1f%x1f%b%x1e%x1e";

const LOG_FIELD_COUNT: usize = 6;

/// Marker git prints for files missing a trailing newline
const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// One commit parsed from a log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub committer_name: String,
    pub committer_email: String,
    /// Commit time in milliseconds since the Unix epoch
    pub commit_time_millis: i64,
    pub subject: String,
    pub body: String,
}

/// One line of `git branch --list` output, before its head commit is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchLine {
    pub name: String,
    pub is_current: bool,
}

/// A branch with its resolved head commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    pub head: Commit,
    pub is_current: bool,
}

/// A tag with the commit it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub commit: Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    /// Submodule reference
    Commit,
}

/// One entry of `git ls-tree` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub mode: String,
    pub kind: TreeEntryKind,
    pub hash: String,
    pub path: String,
}

/// One hunk of a unified diff, paired with its `@@ ... @@` range line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDiff {
    pub header: String,
    pub body: String,
}

/// Per-file diff. Binary files carry no hunks; `blocks` is empty for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub path: String,
    pub is_new_file: bool,
    pub is_deleted: bool,
    pub is_binary: bool,
    pub blocks: Vec<BlockDiff>,
}

/// Parse `git log --format=LOG_FORMAT` output into commits.
///
/// Splits on the record separator, discards empty trailing records, and
/// requires every record to split into exactly six fields. Anything else is
/// corrupt or unexpected git output and fails hard.
pub fn parse_log(output: &str) -> GitResult<Vec<Commit>> {
    let mut commits = Vec::new();

    for record in output.split(LOG_RECORD_SEPARATOR) {
        if record.trim().is_empty() {
            continue;
        }
        commits.push(parse_log_record(record)?);
    }

    Ok(commits)
}

fn parse_log_record(record: &str) -> GitResult<Commit> {
    let fields: Vec<&str> = record.split(LOG_FIELD_SEPARATOR).collect();

    if fields.len() != LOG_FIELD_COUNT {
        return Err(GitError::ParseError(format!(
            "log record split into {} fields, expected {}",
            fields.len(),
            LOG_FIELD_COUNT
        )));
    }

    // The previous record's trailing newline precedes the hash
    let hash = fields[0].trim().to_string();

    let seconds: i64 = fields[3].trim().parse().map_err(|_| {
        GitError::ParseError(format!("invalid commit time '{}'", fields[3].trim()))
    })?;

    Ok(Commit {
        hash,
        committer_name: fields[1].to_string(),
        committer_email: fields[2].to_string(),
        commit_time_millis: seconds * 1000,
        subject: fields[4].to_string(),
        body: fields[5].to_string(),
    })
}

/// Parse `git branch --list` output.
///
/// The current branch carries a leading `*` marker; every other line is
/// indented two spaces. Parenthesized status lines such as
/// `* (HEAD detached at abc1234)` name no branch and are skipped.
pub fn parse_branch_lines(output: &str) -> GitResult<Vec<BranchLine>> {
    let mut branches = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let is_current = line.starts_with('*');
        let name = line.trim_start_matches('*').trim();
        if name.is_empty() || name.starts_with('(') {
            continue;
        }

        branches.push(BranchLine {
            name: name.to_string(),
            is_current,
        });
    }

    Ok(branches)
}

/// Parse `git ls-tree` output: `<mode> <type> <hash>\t<path>` per line
pub fn parse_tree_entries(output: &str) -> GitResult<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (meta, path) = line.split_once('\t').ok_or_else(|| {
            GitError::ParseError(format!("ls-tree line without tab separator: '{line}'"))
        })?;

        let parts: Vec<&str> = meta.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(GitError::ParseError(format!(
                "ls-tree line split into {} meta fields, expected 3: '{line}'",
                parts.len()
            )));
        }

        let kind = match parts[1] {
            "blob" => TreeEntryKind::Blob,
            "tree" => TreeEntryKind::Tree,
            "commit" => TreeEntryKind::Commit,
            other => {
                return Err(GitError::ParseError(format!(
                    "unknown ls-tree object type '{other}'"
                )));
            }
        };

        entries.push(TreeEntry {
            mode: parts[0].to_string(),
            kind,
            hash: parts[2].to_string(),
            path: path.to_string(),
        });
    }

    Ok(entries)
}

/// Parse the raw diff stream for a single file into a [`FileDiff`].
///
/// The segment before the first hunk header is the meta block; its structural
/// lines decide the new/deleted/binary flags. Every segment between one hunk
/// header and the next becomes one [`BlockDiff`]. Binary diffs carry only the
/// meta block and therefore produce zero hunks.
pub fn parse_file_diff(path: &str, raw: &str) -> GitResult<FileDiff> {
    let lines: Vec<&str> = raw
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with(NO_NEWLINE_MARKER))
        .collect();

    let mut meta_lines: Vec<&str> = Vec::new();
    let mut blocks: Vec<BlockDiff> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in lines {
        if is_hunk_header(line) {
            if let Some((header, body)) = current.take() {
                blocks.push(BlockDiff {
                    header,
                    body: body.join("\n"),
                });
            }
            current = Some((line.to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        } else {
            meta_lines.push(line);
        }
    }

    if let Some((header, body)) = current.take() {
        blocks.push(BlockDiff {
            header,
            body: body.join("\n"),
        });
    }

    let mut is_new_file = false;
    let mut is_deleted = false;
    let mut is_binary = false;

    // Flags come from the structural meta lines only; the `diff --git` and
    // `---`/`+++` lines carry file paths, which may themselves contain words
    // like "binary" or "deleted".
    for line in &meta_lines {
        let line = line.to_lowercase();
        if line.starts_with("new file mode") {
            is_new_file = true;
        } else if line.starts_with("deleted file mode") {
            is_deleted = true;
        } else if line.starts_with("binary files ") || line.starts_with("git binary patch") {
            is_binary = true;
        }
    }

    Ok(FileDiff {
        path: path.to_string(),
        is_new_file,
        is_deleted,
        is_binary,
        blocks,
    })
}

/// Recognize a unified-diff hunk header such as `@@ -1,5 +1,6 @@ fn main()`
fn is_hunk_header(line: &str) -> bool {
    line.starts_with("@@ ") && line[3..].contains("@@")
}

/// Parse newline-separated path output (`diff --name-only` and friends)
pub fn parse_path_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect()
}
