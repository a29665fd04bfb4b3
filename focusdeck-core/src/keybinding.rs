//! Keybinding router.
//!
//! Each controller contributes `(key, handler, description)` bindings for one
//! context. A key press is resolved against the active context's bindings,
//! then its fallback (text input), then the global bindings. Handler errors
//! go to the [`Reporter`]; the router never retries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::KeybindingConfig;
use crate::context::{Context, ContextKey};
use crate::error::Result;
use crate::focus::{ContextManager, FocusRequester};
use crate::keys::Key;
use crate::list_context::ListContextTrait;
use crate::list_model::ListViewModel;
use crate::report::Reporter;

pub type Handler = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Handles keys no binding claimed. Returns whether the key was consumed.
pub type Fallback = Arc<dyn Fn(Key) -> Result<bool> + Send + Sync>;

#[derive(Clone)]
pub struct Binding {
    /// `None` when the configured spec did not resolve; never matches.
    pub key: Option<Key>,
    pub handler: Handler,
    pub description: String,
}

impl Binding {
    pub fn new(
        key: Option<Key>,
        description: impl Into<String>,
        handler: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            handler: Arc::new(handler),
            description: description.into(),
        }
    }

    pub fn from_handler(key: Option<Key>, description: impl Into<String>, handler: Handler) -> Self {
        Self {
            key,
            handler,
            description: description.into(),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish()
    }
}

/// Resolves configured key specs for controllers.
#[derive(Clone, Copy, Debug)]
pub struct KeybindingsOpts<'a> {
    pub config: &'a KeybindingConfig,
}

impl<'a> KeybindingsOpts<'a> {
    pub fn new(config: &'a KeybindingConfig) -> Self {
        Self { config }
    }

    pub fn get_key(&self, spec: &str) -> Option<Key> {
        let key = Key::parse(spec);
        if key.is_none() {
            warn!(spec, "unresolvable key spec");
        }
        key
    }
}

pub trait Controller {
    fn context_key(&self) -> ContextKey;
    fn keybindings(&self, opts: &KeybindingsOpts) -> Vec<Binding>;

    /// Runs when the already-selected row of the context is clicked.
    fn on_click(&self) -> Option<Handler> {
        None
    }
}

/// Wraps a handler that needs the current selection. With nothing selected
/// the handler is skipped and the call succeeds.
pub fn requires_selection<T, F>(model: &Arc<ListViewModel<T>>, handler: F) -> Handler
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    let model = model.clone();
    Arc::new(move || match model.selected_item() {
        Some(item) => handler(item),
        None => Ok(()),
    })
}

/// Cursor navigation shared by every list context. Each move re-renders the
/// main view for the new selection.
pub struct ListController {
    context: Arc<dyn Context>,
    requester: FocusRequester,
}

impl ListController {
    pub fn new(context: Arc<dyn Context>, requester: FocusRequester) -> Self {
        Self { context, requester }
    }

    fn nav(&self, key: Option<Key>, description: &str, step: fn(&dyn ListContextTrait)) -> Binding {
        let context = self.context.clone();
        let requester = self.requester.clone();
        Binding::new(key, description, move || {
            if let Some(list) = context.as_list() {
                step(list);
                list.focus_line();
                requester.rerender();
            }
            Ok(())
        })
    }
}

impl Controller for ListController {
    fn context_key(&self) -> ContextKey {
        self.context.key().clone()
    }

    fn keybindings(&self, opts: &KeybindingsOpts) -> Vec<Binding> {
        let keys = &opts.config.universal;
        vec![
            self.nav(opts.get_key(&keys.prev_item), "Previous item", |l| l.move_up()),
            self.nav(opts.get_key(&keys.next_item), "Next item", |l| l.move_down()),
            self.nav(opts.get_key(&keys.prev_item_alt), "Previous item", |l| l.move_up()),
            self.nav(opts.get_key(&keys.next_item_alt), "Next item", |l| l.move_down()),
            self.nav(opts.get_key(&keys.goto_top), "Scroll to top", |l| l.move_to_top()),
            self.nav(opts.get_key(&keys.goto_bottom), "Scroll to bottom", |l| l.move_to_bottom()),
            self.nav(Some(Key::PageUp), "Previous page", |l| {
                l.move_by(-(page(l) as isize))
            }),
            self.nav(Some(Key::PageDown), "Next page", |l| l.move_by(page(l) as isize)),
        ]
    }
}

fn page(list: &dyn ListContextTrait) -> usize {
    list.viewport().height.max(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// No binding or fallback claimed the key.
    Unbound,
    /// A handler or transition failed and was reported.
    Failed,
}

pub struct Router {
    contexts: BTreeMap<ContextKey, Vec<Binding>>,
    global: Vec<Binding>,
    fallbacks: BTreeMap<ContextKey, Fallback>,
    clicks: BTreeMap<ContextKey, Handler>,
    reporter: Arc<dyn Reporter>,
}

impl Router {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            contexts: BTreeMap::new(),
            global: Vec::new(),
            fallbacks: BTreeMap::new(),
            clicks: BTreeMap::new(),
            reporter,
        }
    }

    pub fn add_controller(&mut self, controller: &dyn Controller, opts: &KeybindingsOpts) {
        let bindings = controller.keybindings(opts);
        let context = controller.context_key();
        if let Some(handler) = controller.on_click() {
            self.clicks.insert(context.clone(), handler);
        }
        self.bind(context, bindings);
    }

    /// Earlier bindings win when two claim the same key.
    pub fn bind(&mut self, context: ContextKey, bindings: Vec<Binding>) {
        debug!(context = %context, count = bindings.len(), "bindings registered");
        self.contexts.entry(context).or_default().extend(bindings);
    }

    pub fn bind_global(&mut self, bindings: Vec<Binding>) {
        self.global.extend(bindings);
    }

    pub fn set_fallback(&mut self, context: ContextKey, fallback: impl Fn(Key) -> Result<bool> + Send + Sync + 'static) {
        self.fallbacks.insert(context, Arc::new(fallback));
    }

    /// Bindings visible in `context`, context bindings first.
    pub fn bindings_for(&self, context: &ContextKey) -> Vec<&Binding> {
        self.contexts
            .get(context)
            .into_iter()
            .flatten()
            .chain(self.global.iter())
            .filter(|b| b.key.is_some())
            .collect()
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Runs the handler bound to `key` in the active context, then applies
    /// the transitions it queued.
    pub fn dispatch(&self, key: Key, manager: &mut ContextManager) -> DispatchOutcome {
        let active = manager.current_key().cloned();
        let context_binding = active
            .as_ref()
            .and_then(|ctx| self.contexts.get(ctx))
            .and_then(|bindings| find(bindings, key));

        let result = if let Some(binding) = context_binding {
            debug!(%key, context = ?active, action = %binding.description, "dispatch");
            (binding.handler)().map(|_| true)
        } else if let Some(fallback) = active.as_ref().and_then(|ctx| self.fallbacks.get(ctx)) {
            match fallback(key) {
                Ok(false) => self.run_global(key),
                other => other,
            }
        } else {
            self.run_global(key)
        };

        self.finish(key.to_string(), active.as_ref(), result, manager)
    }

    /// Runs the click handler of `context`, which must be the active one.
    pub fn click(&self, context: &ContextKey, manager: &mut ContextManager) -> DispatchOutcome {
        if manager.current_key() != Some(context) {
            return DispatchOutcome::Unbound;
        }
        let result = match self.clicks.get(context) {
            Some(handler) => {
                debug!(context = %context, "dispatch click");
                handler().map(|_| true)
            }
            None => Ok(false),
        };
        self.finish("click".to_string(), Some(context), result, manager)
    }

    fn finish(
        &self,
        input: String,
        active: Option<&ContextKey>,
        result: Result<bool>,
        manager: &mut ContextManager,
    ) -> DispatchOutcome {
        match result {
            Ok(true) => {}
            Ok(false) => {
                debug!(input = %input, context = ?active, "unbound input");
                return DispatchOutcome::Unbound;
            }
            Err(e) => {
                manager.discard_pending();
                self.reporter.error(&e.to_string());
                return DispatchOutcome::Failed;
            }
        }

        if let Err(e) = manager.flush() {
            self.reporter.error(&e.to_string());
            return DispatchOutcome::Failed;
        }
        DispatchOutcome::Handled
    }

    fn run_global(&self, key: Key) -> Result<bool> {
        match find(&self.global, key) {
            Some(binding) => {
                debug!(%key, action = %binding.description, "dispatch global");
                (binding.handler)().map(|_| true)
            }
            None => Ok(false),
        }
    }
}

fn find(bindings: &[Binding], key: Key) -> Option<&Binding> {
    bindings.iter().find(|b| b.key == Some(key))
}
