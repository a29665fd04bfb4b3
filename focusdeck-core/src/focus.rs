//! Focus stack / context manager.
//!
//! The manager is the single source of truth for which context owns input.
//! It is owned by the application root and mutated only on the UI thread.
//! Handlers cannot hold `&mut ContextManager` while they run, so they queue
//! transitions through a [`FocusRequester`] and the caller flushes them.
//!
//! Transition ordering for `push(B)` while `A` is active:
//!
//! 1. `A.OnFocusLost`
//! 2. `B.OnFocus`
//! 3. `B.OnRenderToMain` (only if B declares one)
//!
//! A failing hook aborts the rest of the chain and the active record and
//! return stack are left exactly as they were before the transition. A
//! cursor moved by `FocusOpts::clicked_line` is restored as well.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::FocusConfig;
use crate::context::{Context, ContextKey, FocusOpts};
use crate::error::{FocusError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Inactive,
    Active,
}

/// A transition queued by a handler or hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Push(ContextKey),
    Replace(ContextKey),
    Pop,
    /// Re-run the active context's `OnRenderToMain`
    Rerender,
}

/// Cloneable handle used by handlers to request focus transitions.
#[derive(Clone, Debug, Default)]
pub struct FocusRequester {
    queue: Arc<Mutex<VecDeque<Transition>>>,
}

impl FocusRequester {
    pub fn push(&self, key: impl Into<ContextKey>) {
        self.request(Transition::Push(key.into()));
    }

    pub fn replace(&self, key: impl Into<ContextKey>) {
        self.request(Transition::Replace(key.into()));
    }

    pub fn pop(&self) {
        self.request(Transition::Pop);
    }

    pub fn rerender(&self) {
        self.request(Transition::Rerender);
    }

    pub fn request(&self, transition: Transition) {
        self.queue.lock().push_back(transition);
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn next(&self) -> Option<Transition> {
        self.queue.lock().pop_front()
    }

    fn clear(&self) {
        self.queue.lock().clear();
    }
}

pub struct ContextManager {
    contexts: BTreeMap<ContextKey, Arc<dyn Context>>,
    active: Option<ContextKey>,
    /// Return stack, oldest first.
    history: Vec<ContextKey>,
    max_history: usize,
    requester: FocusRequester,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(FocusConfig::default())
    }
}

impl ContextManager {
    pub fn new(config: FocusConfig) -> Self {
        Self {
            contexts: BTreeMap::new(),
            active: None,
            history: Vec::new(),
            max_history: config.max_history,
            requester: FocusRequester::default(),
        }
    }

    pub fn register(&mut self, context: Arc<dyn Context>) -> std::result::Result<(), FocusError> {
        let key = context.key().clone();
        if self.contexts.contains_key(&key) {
            return Err(FocusError::DuplicateContext(key));
        }
        debug!(context = %key, kind = context.kind().label(), "registered context");
        self.contexts.insert(key, context);
        Ok(())
    }

    pub fn get(&self, key: &ContextKey) -> Option<Arc<dyn Context>> {
        self.contexts.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ContextKey> {
        self.contexts.keys()
    }

    pub fn current(&self) -> Option<Arc<dyn Context>> {
        self.active.as_ref().and_then(|key| self.get(key))
    }

    pub fn current_key(&self) -> Option<&ContextKey> {
        self.active.as_ref()
    }

    pub fn state(&self, key: &ContextKey) -> ContextState {
        if self.active.as_ref() == Some(key) {
            ContextState::Active
        } else {
            ContextState::Inactive
        }
    }

    /// Previously focused contexts, oldest first.
    pub fn history(&self) -> &[ContextKey] {
        &self.history
    }

    pub fn requester(&self) -> FocusRequester {
        self.requester.clone()
    }

    pub fn push(&mut self, key: &ContextKey) -> Result<()> {
        self.push_with_opts(key, FocusOpts::default())
    }

    pub fn push_with_opts(&mut self, key: &ContextKey, opts: FocusOpts) -> Result<()> {
        let incoming = self.lookup(key)?;
        self.activate(incoming, opts, true)
    }

    /// Like `push`, but the outgoing context is not kept on the return stack.
    pub fn replace(&mut self, key: &ContextKey) -> Result<()> {
        let incoming = self.lookup(key)?;
        self.activate(incoming, FocusOpts::default(), false)
    }

    /// Returns to the most recent entry of the return stack. A no-op when the
    /// stack is empty.
    pub fn pop(&mut self) -> Result<()> {
        // entries equal to the active context cannot be returned to
        let mut depth = self.history.len();
        while depth > 0 && self.history.get(depth - 1) == self.active.as_ref() {
            depth -= 1;
        }
        let Some(target_key) = depth.checked_sub(1).map(|i| self.history[i].clone()) else {
            debug!("pop with empty return stack");
            self.history.clear();
            return Ok(());
        };
        let target = self.lookup(&target_key)?;
        if !target.is_focusable() {
            return Err(FocusError::NotFocusable(target_key).into());
        }

        if let Some(outgoing) = self.current() {
            outgoing.handle_focus_lost()?;
        }
        run_focus_hooks(target.as_ref(), &FocusOpts::default())?;

        debug!(from = ?self.active, to = %target_key, "focus pop");
        self.history.truncate(depth - 1);
        self.active = Some(target_key);
        Ok(())
    }

    /// Drops queued transitions without applying them.
    pub fn discard_pending(&self) {
        self.requester.clear();
    }

    /// Re-runs `OnRenderToMain` of the active context.
    pub fn rerender(&self) -> Result<()> {
        match self.current() {
            Some(ctx) if ctx.has_render_to_main() => ctx.handle_render_to_main(),
            _ => Ok(()),
        }
    }

    /// Applies queued transitions in order. Stops at the first failure and
    /// drops whatever was queued after it.
    pub fn flush(&mut self) -> Result<()> {
        while let Some(transition) = self.requester.next() {
            let outcome = match &transition {
                Transition::Push(key) => self.push(key),
                Transition::Replace(key) => self.replace(key),
                Transition::Pop => self.pop(),
                Transition::Rerender => self.rerender(),
            };
            if let Err(e) = outcome {
                warn!(?transition, error = %e, "focus transition failed");
                self.requester.clear();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Runs `refresh` while keeping every list context's selection pinned to
    /// the same item identity.
    pub fn preserve_selection<R>(&self, refresh: impl FnOnce() -> R) -> R {
        let snapshot: Vec<(Arc<dyn Context>, String)> = self
            .contexts
            .values()
            .filter_map(|ctx| {
                let id = ctx.as_list()?.selected_item_id();
                Some((ctx.clone(), id))
            })
            .collect();

        let result = refresh();

        for (ctx, id) in snapshot {
            if let Some(list) = ctx.as_list() {
                list.restore_selection(&id);
            }
        }
        result
    }

    fn lookup(&self, key: &ContextKey) -> std::result::Result<Arc<dyn Context>, FocusError> {
        self.get(key)
            .ok_or_else(|| FocusError::UnknownContext(key.clone()))
    }

    fn activate(&mut self, incoming: Arc<dyn Context>, opts: FocusOpts, retain: bool) -> Result<()> {
        let key = incoming.key().clone();
        if !incoming.is_focusable() {
            return Err(FocusError::NotFocusable(key).into());
        }
        if self.active.as_ref() == Some(&key) {
            return Ok(());
        }

        let outgoing = self.current();
        if let Some(outgoing) = &outgoing {
            outgoing.handle_focus_lost()?;
        }
        run_focus_hooks(incoming.as_ref(), &opts)?;

        debug!(from = ?self.active, to = %key, retain, "focus transition");
        if retain {
            if let Some(outgoing) = outgoing {
                self.remember(outgoing.key().clone());
            }
        }
        self.active = Some(key);
        Ok(())
    }

    fn remember(&mut self, key: ContextKey) {
        self.history.push(key);
        if self.max_history > 0 && self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }
}

/// Runs `OnFocus` then `OnRenderToMain`. A list context's cursor, which
/// `OnFocus` may move to a clicked line, is put back if either hook fails.
fn run_focus_hooks(ctx: &dyn Context, opts: &FocusOpts) -> Result<()> {
    let saved = ctx.as_list().and_then(|list| list.selected_index());
    let outcome = ctx.handle_focus(opts).and_then(|_| {
        if ctx.has_render_to_main() {
            ctx.handle_render_to_main()
        } else {
            Ok(())
        }
    });
    if outcome.is_err() {
        if let (Some(list), Some(index)) = (ctx.as_list(), saved) {
            list.move_to(index);
        }
    }
    outcome
}
