use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::info;

use focusdeck_core::render::UpdateTask;

use super::{GitError, RepoBackend, StashEntry, Worktree};

/// In-memory repository used by `--demo` and by tests.
pub struct DemoBackend {
    state: Mutex<DemoState>,
}

struct DemoState {
    worktrees: Vec<Worktree>,
    stash: Vec<String>,
}

impl DemoBackend {
    pub fn new() -> Self {
        let worktree = |name: &str, branch: Option<&str>, head: &str| Worktree {
            path: PathBuf::from("/demo").join(name),
            branch: branch.map(str::to_string),
            head: head.to_string(),
            is_main: false,
            is_current: false,
            is_path_missing: false,
        };

        let mut worktrees = vec![
            worktree("focusdeck", Some("main"), "9f2c41d7a0b3"),
            worktree("focusdeck-hotfix", Some("hotfix/render-race"), "41aa09c2e811"),
            worktree("focusdeck-bisect", None, "c0ffee12ab34"),
        ];
        worktrees[0].is_main = true;
        worktrees[0].is_current = true;
        worktrees[2].is_path_missing = true;

        Self {
            state: Mutex::new(DemoState {
                worktrees,
                stash: vec![
                    "WIP on main: 9f2c41d tighten cursor clamping".into(),
                    "On hotfix/render-race: debug logging".into(),
                    "On main: half-finished popup styling".into(),
                ],
            }),
        }
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoState {
    fn stash_index(&self, entry: &StashEntry) -> Result<usize, GitError> {
        if entry.index < self.stash.len() {
            Ok(entry.index)
        } else {
            Err(GitError::Command {
                args: format!("stash {}", entry.ref_name()),
                stderr: format!("{} is not a valid reference", entry.ref_name()),
            })
        }
    }
}

impl RepoBackend for DemoBackend {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn worktrees(&self) -> Result<Vec<Worktree>, GitError> {
        Ok(self.state.lock().worktrees.clone())
    }

    fn add_worktree(&self, path: &str) -> Result<(), GitError> {
        let mut state = self.state.lock();
        let path = PathBuf::from("/demo").join(path);
        if state.worktrees.iter().any(|w| w.path == path) {
            return Err(GitError::Command {
                args: format!("worktree add {}", path.display()),
                stderr: format!("'{}' already exists", path.display()),
            });
        }
        let branch = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        state.worktrees.push(Worktree {
            path,
            branch,
            head: "9f2c41d7a0b3".into(),
            is_main: false,
            is_current: false,
            is_path_missing: false,
        });
        Ok(())
    }

    fn remove_worktree(&self, worktree: &Worktree, _force: bool) -> Result<(), GitError> {
        self.state.lock().worktrees.retain(|w| w.path != worktree.path);
        Ok(())
    }

    fn switch_worktree(&self, worktree: &Worktree) -> Result<(), GitError> {
        for w in self.state.lock().worktrees.iter_mut() {
            w.is_current = w.path == worktree.path;
        }
        Ok(())
    }

    fn stash_entries(&self) -> Result<Vec<StashEntry>, GitError> {
        Ok(self
            .state
            .lock()
            .stash
            .iter()
            .enumerate()
            .map(|(index, message)| StashEntry {
                index,
                message: message.clone(),
            })
            .collect())
    }

    fn stash_apply(&self, entry: &StashEntry) -> Result<(), GitError> {
        self.state.lock().stash_index(entry).map(|_| ())
    }

    fn stash_pop(&self, entry: &StashEntry) -> Result<(), GitError> {
        let mut state = self.state.lock();
        let index = state.stash_index(entry)?;
        state.stash.remove(index);
        Ok(())
    }

    fn stash_drop(&self, entry: &StashEntry) -> Result<(), GitError> {
        self.stash_pop(entry)
    }

    fn stash_diff_task(&self, entry: &StashEntry) -> UpdateTask {
        let patch = format!(
            "{}\n\n src/lib.rs | 2 +-\n 1 file changed, 1 insertion(+), 1 deletion(-)\n\n\
             --- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-// {}\n+// {}\n",
            entry.message,
            entry.ref_name(),
            entry.message
        );
        UpdateTask::render_string(patch)
    }

    fn open_dir(&self, template: &str, dir: &Path) -> Result<(), GitError> {
        info!(template, dir = %dir.display(), "demo backend: open directory skipped");
        Ok(())
    }
}
