//! Domain panels plugged into the generic context machinery.

pub mod popup;
pub mod stash;
pub mod worktrees;

use std::sync::Arc;

use parking_lot::Mutex;

use focusdeck_core::config::FocusdeckConfig;
use focusdeck_core::context::{BaseContext, ContextCallbacks, ContextKind, SimpleContext};
use focusdeck_core::focus::FocusRequester;
use focusdeck_core::render::RenderScheduler;
use focusdeck_core::report::Reporter;

use crate::backend::Repo;
use popup::Popups;

pub const MAIN_KEY: &str = "main";

/// Work a handler wants done by the application after dispatch, because it
/// needs the focus manager or the event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppRequest {
    Quit,
    /// Reload repository data keeping list selections pinned.
    Refresh,
    /// Move to the next (`1`) or previous (`-1`) side panel.
    CycleSide(isize),
}

#[derive(Clone, Debug, Default)]
pub struct AppRequests {
    queue: Arc<Mutex<Vec<AppRequest>>>,
}

impl AppRequests {
    pub fn send(&self, request: AppRequest) {
        self.queue.lock().push(request);
    }

    pub fn take(&self) -> Vec<AppRequest> {
        std::mem::take(&mut *self.queue.lock())
    }
}

/// Handles shared by every panel's callbacks and handlers.
#[derive(Clone)]
pub struct PanelCommon {
    pub config: Arc<FocusdeckConfig>,
    pub repo: Arc<Repo>,
    pub requester: FocusRequester,
    pub scheduler: RenderScheduler,
    pub reporter: Arc<dyn Reporter>,
    pub requests: AppRequests,
    pub popups: Popups,
}

/// Display target for every side panel's `OnRenderToMain`. Never focused.
pub fn main_context() -> SimpleContext {
    SimpleContext::new(
        BaseContext::new(MAIN_KEY, ContextKind::Main).with_focusable(false),
        ContextCallbacks::new(),
    )
}
