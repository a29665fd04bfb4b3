mod demo;
mod git;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use focusdeck_core::render::UpdateTask;

pub use demo::DemoBackend;
pub use git::GitBackend;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    /// Short branch name; `None` for a detached HEAD.
    pub branch: Option<String>,
    pub head: String,
    pub is_main: bool,
    pub is_current: bool,
    pub is_path_missing: bool,
}

impl Worktree {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn id(&self) -> String {
        self.path.display().to_string()
    }

    pub fn branch_label(&self) -> String {
        match &self.branch {
            Some(branch) => branch.clone(),
            None => format!("(detached {})", short_sha(&self.head)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StashEntry {
    pub index: usize,
    pub message: String,
}

impl StashEntry {
    pub fn ref_name(&self) -> String {
        format!("stash@{{{}}}", self.index)
    }
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },
}

impl From<GitError> for focusdeck_core::Error {
    fn from(e: GitError) -> Self {
        focusdeck_core::Error::user(e.to_string())
    }
}

/// Source of repository data and the mutations panels perform on it.
pub trait RepoBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn worktrees(&self) -> Result<Vec<Worktree>, GitError>;
    fn add_worktree(&self, path: &str) -> Result<(), GitError>;
    fn remove_worktree(&self, worktree: &Worktree, force: bool) -> Result<(), GitError>;
    fn switch_worktree(&self, worktree: &Worktree) -> Result<(), GitError>;

    fn stash_entries(&self) -> Result<Vec<StashEntry>, GitError>;
    fn stash_apply(&self, entry: &StashEntry) -> Result<(), GitError>;
    fn stash_pop(&self, entry: &StashEntry) -> Result<(), GitError>;
    fn stash_drop(&self, entry: &StashEntry) -> Result<(), GitError>;

    /// Task that renders the patch of a stash entry into the main view.
    fn stash_diff_task(&self, entry: &StashEntry) -> UpdateTask;

    fn open_dir(&self, template: &str, dir: &Path) -> Result<(), GitError>;
}

/// Cached repository state. Panel providers read the cache so they stay
/// cheap; `reload` is the only place the backend is queried.
pub struct Repo {
    backend: Arc<dyn RepoBackend>,
    worktrees: RwLock<Vec<Worktree>>,
    stash: RwLock<Vec<StashEntry>>,
}

impl Repo {
    pub fn new(backend: Arc<dyn RepoBackend>) -> Self {
        Self {
            backend,
            worktrees: RwLock::new(Vec::new()),
            stash: RwLock::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn RepoBackend> {
        &self.backend
    }

    pub fn reload(&self) -> Result<(), GitError> {
        let worktrees = self.backend.worktrees()?;
        let stash = self.backend.stash_entries()?;
        debug!(
            backend = self.backend.name(),
            worktrees = worktrees.len(),
            stash = stash.len(),
            "repository reloaded"
        );
        *self.worktrees.write() = worktrees;
        *self.stash.write() = stash;
        Ok(())
    }

    pub fn worktrees(&self) -> Vec<Worktree> {
        self.worktrees.read().clone()
    }

    pub fn stash(&self) -> Vec<StashEntry> {
        self.stash.read().clone()
    }
}

/// Splits `template` on whitespace and substitutes `{{dir}}` in each word, so
/// paths containing spaces stay a single argument.
pub fn expand_open_command(template: &str, dir: &Path) -> Option<(String, Vec<String>)> {
    let dir = dir.display().to_string();
    let mut words = template
        .split_whitespace()
        .map(|w| w.replace("{{dir}}", &dir));
    let program = words.next()?;
    Some((program, words.collect()))
}

fn spawn_detached(template: &str, dir: &Path) -> Result<(), GitError> {
    let (program, args) = expand_open_command(template, dir).ok_or_else(|| GitError::Open {
        path: dir.display().to_string(),
        reason: "empty open command".into(),
    })?;
    info!(%program, ?args, "opening directory");
    std::process::Command::new(&program)
        .args(&args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| GitError::Open {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })
}

fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_open_command_keeps_spaces_in_path() {
        let (program, args) =
            expand_open_command("code --new-window {{dir}}", Path::new("/tmp/my repo")).unwrap();
        assert_eq!(program, "code");
        assert_eq!(args, vec!["--new-window", "/tmp/my repo"]);
        assert!(expand_open_command("   ", Path::new("/tmp")).is_none());
    }

    #[test]
    fn test_worktree_labels() {
        let wt = Worktree {
            path: PathBuf::from("/src/app-feature"),
            branch: None,
            head: "0123456789abcdef".into(),
            is_main: false,
            is_current: false,
            is_path_missing: false,
        };
        assert_eq!(wt.name(), "app-feature");
        assert_eq!(wt.branch_label(), "(detached 01234567)");
        assert_eq!(StashEntry { index: 3, message: String::new() }.ref_name(), "stash@{3}");
    }

    #[test]
    fn test_repo_reload_caches_backend_data() {
        let repo = Repo::new(Arc::new(DemoBackend::new()));
        assert!(repo.worktrees().is_empty());
        repo.reload().unwrap();
        assert!(repo.worktrees().iter().any(|w| w.is_main));
        assert!(!repo.stash().is_empty());
    }
}
