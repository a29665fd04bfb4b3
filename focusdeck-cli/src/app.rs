//! Application root: owns the focus manager and wires panels, router and
//! render scheduler together.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info};

use focusdeck_core::config::FocusdeckConfig;
use focusdeck_core::context::{Context, ContextKey, ContextKind, FocusOpts};
use focusdeck_core::focus::ContextManager;
use focusdeck_core::keybinding::{Binding, DispatchOutcome, KeybindingsOpts, ListController, Router};
use focusdeck_core::keys::Key;
use focusdeck_core::render::{MainViews, RenderReceiver, RenderScheduler, RenderedContent};
use focusdeck_core::report::{Reporter, StatusLine};
use focusdeck_core::Result;

use crate::backend::{Repo, RepoBackend};
use crate::panels::popup::Popups;
use crate::panels::stash::{self, STASH_KEY, StashController};
use crate::panels::worktrees::{self, WORKTREES_KEY, WorktreesController};
use crate::panels::{AppRequest, AppRequests, MAIN_KEY, PanelCommon, main_context};

pub struct App {
    manager: ContextManager,
    router: Router,
    status: Arc<StatusLine>,
    scheduler: RenderScheduler,
    renders: RenderReceiver,
    views: MainViews,
    repo: Arc<Repo>,
    popups: Popups,
    requests: AppRequests,
    side: Vec<ContextKey>,
    quit: bool,
}

impl App {
    pub fn new(config: FocusdeckConfig, backend: Arc<dyn RepoBackend>, runtime: Handle) -> Result<Self> {
        let config = Arc::new(config);
        let repo = Arc::new(Repo::new(backend));
        repo.reload()?;

        let (scheduler, renders) = RenderScheduler::new(runtime);
        let status = Arc::new(StatusLine::new());
        let reporter: Arc<dyn Reporter> = status.clone();
        let mut manager = ContextManager::new(config.focus);
        let mut router = Router::new(reporter.clone());
        let requests = AppRequests::default();
        let popups = Popups::new(manager.requester(), reporter.clone());

        let common = PanelCommon {
            config: config.clone(),
            repo: repo.clone(),
            requester: manager.requester(),
            scheduler: scheduler.clone(),
            reporter,
            requests: requests.clone(),
            popups: popups.clone(),
        };

        let worktrees = worktrees::build(&common);
        let stash = stash::build(&common);
        let side: Vec<Arc<dyn Context>> = vec![worktrees.context.clone(), stash.context.clone()];

        manager.register(Arc::new(main_context()))?;
        for ctx in side.iter().cloned().chain(popups.contexts()) {
            manager.register(ctx)?;
        }

        let opts = KeybindingsOpts::new(&config.keybinding);
        for ctx in &side {
            router.add_controller(&ListController::new(ctx.clone(), manager.requester()), &opts);
        }
        router.add_controller(&WorktreesController::new(common.clone(), worktrees.model.clone()), &opts);
        router.add_controller(&StashController::new(common.clone(), stash.model.clone()), &opts);
        popups.register_bindings(&mut router, &opts);
        router.bind_global(global_bindings(&opts, &requests));

        manager.push(&WORKTREES_KEY.into())?;
        info!(backend = repo.backend().name(), "application ready");

        Ok(Self {
            manager,
            router,
            status,
            scheduler,
            renders,
            views: MainViews::new(),
            repo,
            popups,
            requests,
            side: side.iter().map(|ctx| ctx.key().clone()).collect(),
            quit: false,
        })
    }

    pub fn handle_key(&mut self, key: Key) -> DispatchOutcome {
        let outcome = self.router.dispatch(key, &mut self.manager);
        self.process_requests();
        outcome
    }

    fn process_requests(&mut self) {
        for request in self.requests.take() {
            debug!(?request, "app request");
            match request {
                AppRequest::Quit => self.quit = true,
                AppRequest::Refresh => self.refresh(),
                AppRequest::CycleSide(step) => self.cycle_side(step),
            }
        }
    }

    /// Focuses `key` with the cursor on `line`, as a mouse click does.
    /// Clicking the row that is already selected in the active context runs
    /// the context's click action. Clicks are ignored while a popup is open.
    pub fn click(&mut self, key: &ContextKey, line: usize) {
        let Some(active) = self.manager.current() else {
            self.focus_clicked(key, line);
            return;
        };
        if active.kind() == ContextKind::Popup {
            debug!(popup = %active.key(), "click ignored under popup");
            return;
        }
        if active.key() != key {
            self.focus_clicked(key, line);
            return;
        }

        let Some(list) = active.as_list() else {
            return;
        };
        if list.selected_index() == Some(line) {
            self.router.click(key, &mut self.manager);
            self.process_requests();
            return;
        }
        list.move_to(line);
        if let Err(e) = self.manager.rerender() {
            self.status.error(&e.to_string());
        }
    }

    fn focus_clicked(&mut self, key: &ContextKey, line: usize) {
        let opts = FocusOpts { clicked_line: Some(line) };
        if let Err(e) = self.manager.push_with_opts(key, opts) {
            self.status.error(&e.to_string());
        }
    }

    /// Reloads repository data keeping every list's selection on the same
    /// item, then re-renders the main view.
    pub fn refresh(&mut self) {
        let repo = self.repo.clone();
        let result = self
            .manager
            .preserve_selection(|| repo.reload())
            .map_err(focusdeck_core::Error::from)
            .and_then(|_| self.manager.rerender());
        if let Err(e) = result {
            self.status.error(&e.to_string());
        }
    }

    fn cycle_side(&mut self, step: isize) {
        let Some(pos) = self
            .manager
            .current_key()
            .and_then(|current| self.side.iter().position(|k| k == current))
        else {
            return;
        };
        let next = (pos as isize + step).rem_euclid(self.side.len() as isize) as usize;
        let key = self.side[next].clone();
        if let Err(e) = self.manager.replace(&key) {
            self.status.error(&e.to_string());
        }
    }

    /// Publishes finished renders that are still current.
    pub fn drain_renders(&mut self) -> usize {
        self.scheduler.drain_into(&mut self.renders, &mut self.views)
    }

    /// Waits until no render completes for `quiet`.
    pub async fn settle(&mut self, quiet: Duration) {
        while let Ok(Some(completion)) = tokio::time::timeout(quiet, self.renders.recv()).await {
            if let Some(completion) = self.scheduler.accept(completion) {
                self.views.publish(completion);
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn manager(&self) -> &ContextManager {
        &self.manager
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn popups(&self) -> &Popups {
        &self.popups
    }

    pub fn side_keys(&self) -> &[ContextKey] {
        &self.side
    }

    pub fn main_view(&self) -> Option<&RenderedContent> {
        self.views.get(&MAIN_KEY.into())
    }

    /// One-line description of the focus state, used by headless runs.
    pub fn describe(&self) -> String {
        let Some(ctx) = self.manager.current() else {
            return "no active context".to_string();
        };
        match ctx.as_list() {
            Some(list) => format!("active={} selected={}", ctx.key(), list.selected_item_id()),
            None => format!("active={}", ctx.key()),
        }
    }
}

fn global_bindings(opts: &KeybindingsOpts, requests: &AppRequests) -> Vec<Binding> {
    let keys = &opts.config.universal;
    vec![
        Binding::new(opts.get_key(&keys.quit), "Quit", sender(requests, AppRequest::Quit)),
        Binding::new(opts.get_key(&keys.prev_block), "Previous panel", sender(requests, AppRequest::CycleSide(-1))),
        Binding::new(opts.get_key(&keys.next_block), "Next panel", sender(requests, AppRequest::CycleSide(1))),
        Binding::new(opts.get_key(&keys.refresh), "Refresh", sender(requests, AppRequest::Refresh)),
    ]
}

fn sender(requests: &AppRequests, request: AppRequest) -> impl Fn() -> Result<()> + Send + Sync + 'static {
    let requests = requests.clone();
    move || {
        requests.send(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DemoBackend;
    use crate::panels::popup::CONFIRMATION_KEY;

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

    #[tokio::test]
    async fn test_starts_on_worktrees_with_summary() {
        let mut app = demo_app();
        app.settle(Duration::from_millis(100)).await;
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
        let view = app.main_view().unwrap();
        assert_eq!(view.title.as_deref(), Some("Worktree"));
        assert!(view.body.contains("focusdeck (main worktree)"));
    }

    #[tokio::test]
    async fn test_remove_guards_main_worktree() {
        let mut app = demo_app();
        assert_eq!(press(&mut app, "d"), DispatchOutcome::Failed);
        assert_eq!(app.status().last().unwrap().text(), "Cannot remove the main worktree");
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
    }

    #[tokio::test]
    async fn test_remove_with_confirmation_refreshes_list() {
        let mut app = demo_app();
        press(&mut app, "j");
        press(&mut app, "d");
        assert_eq!(app.manager().current_key(), Some(&CONFIRMATION_KEY.into()));
        press(&mut app, "<enter>");

        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
        assert_eq!(app.repo.worktrees().len(), 2);
        assert!(app.repo.worktrees().iter().all(|w| w.name() != "focusdeck-hotfix"));
        assert_eq!(app.status().error_count(), 0);
    }

    #[tokio::test]
    async fn test_cycle_side_panels_replaces_focus() {
        let mut app = demo_app();
        press(&mut app, "<right>");
        assert_eq!(app.manager().current_key(), Some(&STASH_KEY.into()));
        press(&mut app, "<right>");
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
        press(&mut app, "<left>");
        assert_eq!(app.manager().current_key(), Some(&STASH_KEY.into()));
        assert!(app.manager().history().is_empty());

        app.settle(Duration::from_millis(100)).await;
        assert_eq!(app.main_view().unwrap().title.as_deref(), Some("Stash stash@{0}"));
    }

    #[tokio::test]
    async fn test_pop_stash_then_refresh_keeps_selection() {
        let mut app = demo_app();
        press(&mut app, "<right>");
        press(&mut app, "j");
        press(&mut app, "g");
        assert_eq!(app.repo.stash().len(), 2);
        assert_eq!(app.describe(), "active=stash selected=stash@{1}");
        assert_eq!(app.status().last().unwrap().text(), "Popped stash@{1}");
    }

    #[tokio::test]
    async fn test_new_worktree_through_prompt() {
        let mut app = demo_app();
        press(&mut app, "n");
        for c in "spike".chars() {
            app.handle_key(Key::Char(c));
        }
        press(&mut app, "<enter>");
        assert!(app.repo.worktrees().iter().any(|w| w.name() == "spike"));
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
    }

    #[tokio::test]
    async fn test_click_moves_cursor() {
        let mut app = demo_app();
        app.click(&STASH_KEY.into(), 2);
        assert_eq!(app.describe(), "active=stash selected=stash@{2}");
        app.click(&STASH_KEY.into(), 0);
        assert_eq!(app.describe(), "active=stash selected=stash@{0}");
    }

    #[tokio::test]
    async fn test_click_is_ignored_under_confirmation() {
        let mut app = demo_app();
        press(&mut app, "j");
        press(&mut app, "d");
        assert_eq!(app.manager().current_key(), Some(&CONFIRMATION_KEY.into()));

        app.click(&STASH_KEY.into(), 1);
        assert_eq!(app.manager().current_key(), Some(&CONFIRMATION_KEY.into()));
        assert_eq!(app.manager().history(), [ContextKey::from(WORKTREES_KEY)].as_slice());
        assert!(app.popups().view(&CONFIRMATION_KEY.into()).is_some());

        press(&mut app, "<esc>");
        assert_eq!(app.manager().current_key(), Some(&WORKTREES_KEY.into()));
        assert_eq!(app.repo.worktrees().len(), 3);
    }

    #[tokio::test]
    async fn test_click_on_selected_worktree_switches_to_it() {
        let mut app = demo_app();
        app.click(&WORKTREES_KEY.into(), 1);
        assert_eq!(app.describe(), "active=worktrees selected=/demo/focusdeck-hotfix");
        assert!(app.status().last().is_none());

        app.click(&WORKTREES_KEY.into(), 1);
        let current: Vec<_> = app
            .repo
            .worktrees()
            .into_iter()
            .filter(|w| w.is_current)
            .map(|w| w.name())
            .collect();
        assert_eq!(current, vec!["focusdeck-hotfix"]);
        assert_eq!(
            app.status().last().unwrap().text(),
            "Switched to worktree focusdeck-hotfix"
        );
        assert_eq!(app.describe(), "active=worktrees selected=/demo/focusdeck-hotfix");
    }

    #[tokio::test]
    async fn test_click_on_selected_stash_row_has_no_action() {
        let mut app = demo_app();
        press(&mut app, "<right>");
        app.click(&STASH_KEY.into(), 0);
        assert_eq!(app.repo.stash().len(), 3);
        assert!(app.status().last().is_none());
    }

    #[tokio::test]
    async fn test_quit_request() {
        let mut app = demo_app();
        assert!(!app.should_quit());
        press(&mut app, "q");
        assert!(app.should_quit());
    }
}
