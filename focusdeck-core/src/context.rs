//! Contexts: the addressable units of focus.
//!
//! A context is a passive identity record plus three optional lifecycle
//! hooks. Specialised panels (see [`crate::list_context`]) compose a
//! [`SimpleContext`] rather than extending it.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::list_context::ListContextTrait;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextKey(String);

impl ContextKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Left-hand list panels (worktrees, stash, ...)
    Side,
    /// The main content area rendered by `OnRenderToMain`
    Main,
    /// Short-lived contexts that are discarded once they lose focus
    Temporary,
    /// Confirmation, prompt and menu popups
    Popup,
    /// Always-present contexts such as the status bar
    Persistent,
}

impl ContextKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContextKind::Side => "side",
            ContextKind::Main => "main",
            ContextKind::Temporary => "temporary",
            ContextKind::Popup => "popup",
            ContextKind::Persistent => "persistent",
        }
    }
}

/// Options passed to `OnFocus`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FocusOpts {
    /// Line clicked in the context's view, if focus came from a mouse click.
    pub clicked_line: Option<usize>,
}

pub type FocusHook = Arc<dyn Fn(&FocusOpts) -> Result<()> + Send + Sync>;
pub type Hook = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Lifecycle hooks; any hook left unset is a no-op.
#[derive(Clone, Default)]
pub struct ContextCallbacks {
    pub on_focus: Option<FocusHook>,
    pub on_focus_lost: Option<Hook>,
    pub on_render_to_main: Option<Hook>,
}

impl ContextCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_focus(mut self, f: impl Fn(&FocusOpts) -> Result<()> + Send + Sync + 'static) -> Self {
        self.on_focus = Some(Arc::new(f));
        self
    }

    pub fn on_focus_lost(mut self, f: impl Fn() -> Result<()> + Send + Sync + 'static) -> Self {
        self.on_focus_lost = Some(Arc::new(f));
        self
    }

    pub fn on_render_to_main(mut self, f: impl Fn() -> Result<()> + Send + Sync + 'static) -> Self {
        self.on_render_to_main = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ContextCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCallbacks")
            .field("on_focus", &self.on_focus.is_some())
            .field("on_focus_lost", &self.on_focus_lost.is_some())
            .field("on_render_to_main", &self.on_render_to_main.is_some())
            .finish()
    }
}

/// Identity of a context. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseContext {
    key: ContextKey,
    view_name: String,
    window_name: String,
    kind: ContextKind,
    focusable: bool,
}

impl BaseContext {
    /// View and window names default to the key.
    pub fn new(key: impl Into<ContextKey>, kind: ContextKind) -> Self {
        let key = key.into();
        Self {
            view_name: key.to_string(),
            window_name: key.to_string(),
            key,
            kind,
            focusable: true,
        }
    }

    pub fn with_view_name(mut self, view_name: impl Into<String>) -> Self {
        self.view_name = view_name.into();
        self
    }

    pub fn with_window_name(mut self, window_name: impl Into<String>) -> Self {
        self.window_name = window_name.into();
        self
    }

    pub fn with_focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    pub fn view_name(&self) -> &str {
        &self.view_name
    }

    pub fn window_name(&self) -> &str {
        &self.window_name
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }
}

pub trait Context: Send + Sync {
    fn base(&self) -> &BaseContext;

    fn key(&self) -> &ContextKey {
        self.base().key()
    }

    fn kind(&self) -> ContextKind {
        self.base().kind()
    }

    fn is_focusable(&self) -> bool {
        self.base().is_focusable()
    }

    fn handle_focus(&self, opts: &FocusOpts) -> Result<()>;
    fn handle_focus_lost(&self) -> Result<()>;
    fn handle_render_to_main(&self) -> Result<()>;
    fn has_render_to_main(&self) -> bool;

    /// List-backed contexts expose their cursor and row rendering here.
    fn as_list(&self) -> Option<&dyn ListContextTrait> {
        None
    }
}

/// A context made of an identity and a callback set.
#[derive(Clone, Debug)]
pub struct SimpleContext {
    base: BaseContext,
    callbacks: ContextCallbacks,
}

impl SimpleContext {
    pub fn new(base: BaseContext, callbacks: ContextCallbacks) -> Self {
        Self { base, callbacks }
    }
}

impl Context for SimpleContext {
    fn base(&self) -> &BaseContext {
        &self.base
    }

    fn handle_focus(&self, opts: &FocusOpts) -> Result<()> {
        match &self.callbacks.on_focus {
            Some(f) => f(opts),
            None => Ok(()),
        }
    }

    fn handle_focus_lost(&self) -> Result<()> {
        match &self.callbacks.on_focus_lost {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    fn handle_render_to_main(&self) -> Result<()> {
        match &self.callbacks.on_render_to_main {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    fn has_render_to_main(&self) -> bool {
        self.callbacks.on_render_to_main.is_some()
    }
}
