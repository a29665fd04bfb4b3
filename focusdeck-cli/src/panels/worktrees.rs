use std::sync::Arc;

use focusdeck_core::context::{BaseContext, ContextCallbacks, ContextKey, ContextKind};
use focusdeck_core::keybinding::{Binding, Controller, Handler, KeybindingsOpts, requires_selection};
use focusdeck_core::list_context::ListContext;
use focusdeck_core::list_model::ListViewModel;
use focusdeck_core::render::{RenderRequest, UpdateTask};
use focusdeck_core::{Error, Result};

use super::popup::non_empty;
use super::{AppRequest, MAIN_KEY, PanelCommon};
use crate::backend::Worktree;

pub const WORKTREES_KEY: &str = "worktrees";

pub struct WorktreesPanel {
    pub model: Arc<ListViewModel<Worktree>>,
    pub context: Arc<ListContext<Worktree>>,
}

pub fn build(common: &PanelCommon) -> WorktreesPanel {
    let repo = common.repo.clone();
    let model = Arc::new(ListViewModel::new(move || repo.worktrees()));

    let rows = model.clone();
    let selected = model.clone();
    let scheduler = common.scheduler.clone();
    let context = ListContext::new(
        BaseContext::new(WORKTREES_KEY, ContextKind::Side),
        model.clone(),
        move |start, len| {
            rows.items()
                .iter()
                .skip(start)
                .take(len)
                .map(display_row)
                .collect()
        },
        Worktree::id,
        ContextCallbacks::new().on_render_to_main(move || {
            let body = render_summary(selected.selected_item().as_ref());
            scheduler.enqueue(
                RenderRequest::new(MAIN_KEY, UpdateTask::render_string(body)).with_title("Worktree"),
            );
            Ok(())
        }),
    );

    WorktreesPanel {
        model,
        context: Arc::new(context),
    }
}

fn display_row(worktree: &Worktree) -> Vec<String> {
    let marker = if worktree.is_current { "*" } else { " " };
    let mut name = worktree.name();
    if worktree.is_main {
        name.push_str(" (main)");
    }
    if worktree.is_path_missing {
        name.push_str(" (missing)");
    }
    vec![marker.to_string(), name, worktree.branch_label()]
}

/// Main-view text for the selected worktree.
pub fn render_summary(worktree: Option<&Worktree>) -> String {
    let Some(worktree) = worktree else {
        return "No worktrees for this repository".to_string();
    };
    let mut name = worktree.name();
    if worktree.is_main {
        name.push_str(" (main worktree)");
    }
    let mut path = worktree.path.display().to_string();
    if worktree.is_path_missing {
        path.push_str(" (missing)");
    }
    align_columns(&[
        ["Name:".to_string(), name],
        ["Branch:".to_string(), worktree.branch_label()],
        ["Path:".to_string(), path],
    ])
}

/// Pads the first column to a common width plus two spaces.
fn align_columns(rows: &[[String; 2]]) -> String {
    let width = rows.iter().map(|[label, _]| label.chars().count()).max().unwrap_or(0) + 2;
    rows.iter()
        .map(|[label, value]| format!("{label:<width$}{value}\n"))
        .collect()
}

pub struct WorktreesController {
    common: PanelCommon,
    model: Arc<ListViewModel<Worktree>>,
}

impl WorktreesController {
    pub fn new(common: PanelCommon, model: Arc<ListViewModel<Worktree>>) -> Self {
        Self { common, model }
    }

    fn add(&self) -> impl Fn() -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move || {
            let c = common.clone();
            common.popups.prompt("New worktree path", move |input| {
                let path = non_empty(&input, "Path")?;
                c.repo.backend().add_worktree(&path)?;
                c.reporter.info(&format!("Created worktree {path}"));
                c.requests.send(AppRequest::Refresh);
                Ok(())
            });
            Ok(())
        }
    }

    fn enter(&self) -> impl Fn(Worktree) -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move |worktree: Worktree| {
            if !worktree.is_current {
                common.repo.backend().switch_worktree(&worktree)?;
                common
                    .reporter
                    .info(&format!("Switched to worktree {}", worktree.name()));
                common.requests.send(AppRequest::Refresh);
            }
            // already focused when invoked from the panel, so this is a no-op
            // transition unless a popup sits on top
            common.requester.push(WORKTREES_KEY);
            Ok(())
        }
    }

    fn open(&self) -> impl Fn(Worktree) -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move |worktree: Worktree| {
            common
                .repo
                .backend()
                .open_dir(&common.config.os.open_dir, &worktree.path)?;
            Ok(())
        }
    }

    fn remove(&self) -> impl Fn(Worktree) -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move |worktree: Worktree| {
            if worktree.is_main {
                return Err(Error::user("Cannot remove the main worktree"));
            }
            if worktree.is_current {
                return Err(Error::user("Cannot remove the current worktree"));
            }
            let c = common.clone();
            let body = format!("Are you sure you want to remove worktree '{}'?", worktree.name());
            common.popups.confirm("Remove worktree", body, move || {
                c.repo.backend().remove_worktree(&worktree, false)?;
                c.reporter.info(&format!("Removed worktree {}", worktree.name()));
                c.requests.send(AppRequest::Refresh);
                Ok(())
            });
            Ok(())
        }
    }
}

impl Controller for WorktreesController {
    fn context_key(&self) -> ContextKey {
        WORKTREES_KEY.into()
    }

    fn keybindings(&self, opts: &KeybindingsOpts) -> Vec<Binding> {
        let keys = &opts.config.universal;
        vec![
            Binding::new(opts.get_key(&keys.new), "Create worktree", self.add()),
            Binding::from_handler(
                opts.get_key(&keys.select),
                "Switch to worktree",
                requires_selection(&self.model, self.enter()),
            ),
            Binding::from_handler(
                opts.get_key(&keys.confirm),
                "Switch to worktree",
                requires_selection(&self.model, self.enter()),
            ),
            Binding::from_handler(
                opts.get_key(&keys.open_file),
                "Open directory",
                requires_selection(&self.model, self.open()),
            ),
            Binding::from_handler(
                opts.get_key(&keys.remove),
                "Remove worktree",
                requires_selection(&self.model, self.remove()),
            ),
        ]
    }

    fn on_click(&self) -> Option<Handler> {
        Some(requires_selection(&self.model, self.enter()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use focusdeck_core::config::FocusdeckConfig;
    use focusdeck_core::keybinding::DispatchOutcome;
    use focusdeck_core::keys::Key;
    use tokio::runtime::Handle;

    use super::*;
    use crate::app::App;
    use crate::backend::DemoBackend;

    fn worktree(path: &str, branch: Option<&str>) -> Worktree {
        Worktree {
            path: PathBuf::from(path),
            branch: branch.map(str::to_string),
            head: "abcdef0123".into(),
            is_main: false,
            is_current: false,
            is_path_missing: false,
        }
    }

    #[test]
    fn test_summary_for_empty_repository() {
        assert_eq!(render_summary(None), "No worktrees for this repository");
    }

    #[test]
    fn test_summary_is_tab_aligned() {
        let mut wt = worktree("/src/focusdeck", Some("main"));
        wt.is_main = true;
        let summary = render_summary(Some(&wt));
        assert_eq!(
            summary,
            "Name:    focusdeck (main worktree)\nBranch:  main\nPath:    /src/focusdeck\n"
        );
    }

    #[test]
    fn test_summary_marks_missing_path() {
        let mut wt = worktree("/gone/old", None);
        wt.is_path_missing = true;
        let summary = render_summary(Some(&wt));
        assert!(summary.contains("Path:    /gone/old (missing)"));
        assert!(summary.contains("(detached abcdef01)"));
    }

    #[test]
    fn test_display_row_markers() {
        let mut wt = worktree("/src/focusdeck", Some("main"));
        wt.is_current = true;
        wt.is_main = true;
        assert_eq!(display_row(&wt), vec!["*", "focusdeck (main)", "main"]);
    }

    fn demo_app() -> App {
        App::new(
            FocusdeckConfig::default(),
            Arc::new(DemoBackend::new()),
            Handle::current(),
        )
        .unwrap()
    }

    fn press(app: &mut App, spec: &str) -> DispatchOutcome {
        app.handle_key(Key::parse(spec).unwrap())
    }

    /// Names of the rows marked as the current worktree.
    fn current(app: &App) -> Vec<String> {
        let ctx = app.manager().get(&WORKTREES_KEY.into()).unwrap();
        let list = ctx.as_list().unwrap();
        list.display_strings(0, list.len())
            .into_iter()
            .filter(|row| row[0] == "*")
            .map(|row| row[1].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_space_switches_to_selected_worktree() {
        let mut app = demo_app();
        press(&mut app, "j");
        assert_eq!(press(&mut app, "<space>"), DispatchOutcome::Handled);
        assert_eq!(current(&app), vec!["focusdeck-hotfix"]);
        assert_eq!(
            app.status().last().unwrap().text(),
            "Switched to worktree focusdeck-hotfix"
        );
        assert_eq!(app.describe(), "active=worktrees selected=/demo/focusdeck-hotfix");
    }

    #[tokio::test]
    async fn test_enter_on_current_worktree_is_noop() {
        let mut app = demo_app();
        assert_eq!(press(&mut app, "<enter>"), DispatchOutcome::Handled);
        assert_eq!(current(&app), vec!["focusdeck (main)"]);
        assert!(app.status().last().is_none());
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
        assert!(app.manager().history().is_empty());
    }

    #[tokio::test]
    async fn test_remove_refuses_current_worktree() {
        let mut app = demo_app();
        press(&mut app, "j");
        press(&mut app, "<enter>");
        assert_eq!(current(&app), vec!["focusdeck-hotfix"]);

        assert_eq!(press(&mut app, "d"), DispatchOutcome::Failed);
        assert_eq!(
            app.status().last().unwrap().text(),
            "Cannot remove the current worktree"
        );
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
        let ctx = app.manager().get(&WORKTREES_KEY.into()).unwrap();
        assert_eq!(ctx.as_list().unwrap().len(), 3);
    }
}
