use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::Mutex;
use tracing::{debug, info};

use focusdeck_core::render::UpdateTask;

use super::{GitError, RepoBackend, StashEntry, Worktree, spawn_detached};

/// Runs the `git` executable inside the current worktree.
pub struct GitBackend {
    repo_dir: Mutex<PathBuf>,
}

impl GitBackend {
    /// Resolves the top-level directory of the repository containing `start`.
    pub fn discover(start: &Path) -> Result<Self, GitError> {
        let top = run_git(start, &["rev-parse", "--show-toplevel"])?;
        let repo_dir = PathBuf::from(top.trim());
        info!(repo = %repo_dir.display(), "using git repository");
        Ok(Self {
            repo_dir: Mutex::new(repo_dir),
        })
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.repo_dir.lock().clone()
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        run_git(&self.repo_dir(), args)
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    debug!(?args, dir = %dir.display(), "git");
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if !output.status.success() {
        return Err(GitError::Command {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl RepoBackend for GitBackend {
    fn name(&self) -> &'static str {
        "git"
    }

    fn worktrees(&self) -> Result<Vec<Worktree>, GitError> {
        let output = self.git(&["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_porcelain(&output, &self.repo_dir()))
    }

    fn add_worktree(&self, path: &str) -> Result<(), GitError> {
        self.git(&["worktree", "add", path]).map(|_| ())
    }

    fn remove_worktree(&self, worktree: &Worktree, force: bool) -> Result<(), GitError> {
        let path = worktree.path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path);
        self.git(&args).map(|_| ())
    }

    fn switch_worktree(&self, worktree: &Worktree) -> Result<(), GitError> {
        info!(to = %worktree.path.display(), "switching worktree");
        *self.repo_dir.lock() = worktree.path.clone();
        Ok(())
    }

    fn stash_entries(&self) -> Result<Vec<StashEntry>, GitError> {
        let output = self.git(&["stash", "list"])?;
        Ok(parse_stash_list(&output))
    }

    fn stash_apply(&self, entry: &StashEntry) -> Result<(), GitError> {
        self.git(&["stash", "apply", &entry.ref_name()]).map(|_| ())
    }

    fn stash_pop(&self, entry: &StashEntry) -> Result<(), GitError> {
        self.git(&["stash", "pop", &entry.ref_name()]).map(|_| ())
    }

    fn stash_drop(&self, entry: &StashEntry) -> Result<(), GitError> {
        self.git(&["stash", "drop", &entry.ref_name()]).map(|_| ())
    }

    fn stash_diff_task(&self, entry: &StashEntry) -> UpdateTask {
        UpdateTask::command("git", ["stash", "show", "-p", "--stat", &entry.ref_name()])
            .in_dir(self.repo_dir())
    }

    fn open_dir(&self, template: &str, dir: &Path) -> Result<(), GitError> {
        spawn_detached(template, dir)
    }
}

/// Parses `git worktree list --porcelain`. The first record is the main
/// worktree.
pub fn parse_worktree_porcelain(output: &str, current_dir: &Path) -> Vec<Worktree> {
    let current = canonical(current_dir);
    let mut worktrees = Vec::new();

    for record in output.split("\n\n") {
        let mut path = None;
        let mut head = String::new();
        let mut branch = None;
        for line in record.lines() {
            if let Some(p) = line.strip_prefix("worktree ") {
                path = Some(PathBuf::from(p));
            } else if let Some(h) = line.strip_prefix("HEAD ") {
                head = h.to_string();
            } else if let Some(b) = line.strip_prefix("branch ") {
                branch = Some(b.strip_prefix("refs/heads/").unwrap_or(b).to_string());
            }
        }
        let Some(path) = path else {
            continue;
        };
        worktrees.push(Worktree {
            is_main: worktrees.is_empty(),
            is_current: canonical(&path) == current,
            is_path_missing: !path.exists(),
            path,
            branch,
            head,
        });
    }
    worktrees
}

/// Parses `git stash list` lines of the form `stash@{n}: message`.
pub fn parse_stash_list(output: &str) -> Vec<StashEntry> {
    output
        .lines()
        .filter_map(|line| {
            let (name, message) = line.split_once(": ").unwrap_or((line, ""));
            let index = name.strip_prefix("stash@{")?.strip_suffix('}')?.parse().ok()?;
            Some(StashEntry {
                index,
                message: message.to_string(),
            })
        })
        .collect()
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_worktree_porcelain() {
        let output = "worktree /nonexistent/repo\nHEAD 1111111111\nbranch refs/heads/main\n\n\
                      worktree /nonexistent/repo-hotfix\nHEAD 2222222222\ndetached\n\n";
        let worktrees = parse_worktree_porcelain(output, Path::new("/nonexistent/repo-hotfix"));
        assert_eq!(worktrees.len(), 2);

        assert!(worktrees[0].is_main);
        assert!(!worktrees[0].is_current);
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
        assert!(worktrees[0].is_path_missing);

        assert!(!worktrees[1].is_main);
        assert!(worktrees[1].is_current);
        assert_eq!(worktrees[1].branch, None);
        assert_eq!(worktrees[1].head, "2222222222");
    }

    #[test]
    fn test_parse_stash_list() {
        let output = "stash@{0}: WIP on main: 1234 fix: parser\nstash@{1}: On dev: experiment\ngarbage\n";
        let entries = parse_stash_list(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].message, "WIP on main: 1234 fix: parser");
        assert_eq!(entries[1].ref_name(), "stash@{1}");
    }
}
