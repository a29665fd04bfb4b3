//! Confirmation and prompt popups.
//!
//! Both are modal: while one is focused every key is consumed, so global
//! bindings such as quit or panel cycling cannot fire underneath it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use focusdeck_core::context::{BaseContext, Context, ContextCallbacks, ContextKey, ContextKind, SimpleContext};
use focusdeck_core::focus::FocusRequester;
use focusdeck_core::keybinding::{Binding, KeybindingsOpts, Router};
use focusdeck_core::keys::Key;
use focusdeck_core::report::Reporter;
use focusdeck_core::{Error, Result};

pub const CONFIRMATION_KEY: &str = "confirmation";
pub const PROMPT_KEY: &str = "prompt";

type ConfirmFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;
type SubmitFn = Arc<dyn Fn(String) -> Result<()> + Send + Sync>;

struct Confirmation {
    title: String,
    body: String,
    on_confirm: ConfirmFn,
}

struct Prompt {
    title: String,
    input: String,
    on_submit: SubmitFn,
}

/// What the front-end draws for an open popup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupView {
    pub title: String,
    pub body: String,
    pub is_prompt: bool,
}

#[derive(Clone)]
pub struct Popups {
    confirmation: Arc<Mutex<Option<Confirmation>>>,
    prompt: Arc<Mutex<Option<Prompt>>>,
    requester: FocusRequester,
    reporter: Arc<dyn Reporter>,
}

impl Popups {
    pub fn new(requester: FocusRequester, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            confirmation: Arc::new(Mutex::new(None)),
            prompt: Arc::new(Mutex::new(None)),
            requester,
            reporter,
        }
    }

    /// Opens a yes/no popup; `on_confirm` runs if the user accepts.
    pub fn confirm(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        on_confirm: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) {
        *self.confirmation.lock() = Some(Confirmation {
            title: title.into(),
            body: body.into(),
            on_confirm: Arc::new(on_confirm),
        });
        self.requester.push(CONFIRMATION_KEY);
    }

    /// Opens a single-line text prompt.
    pub fn prompt(
        &self,
        title: impl Into<String>,
        on_submit: impl Fn(String) -> Result<()> + Send + Sync + 'static,
    ) {
        *self.prompt.lock() = Some(Prompt {
            title: title.into(),
            input: String::new(),
            on_submit: Arc::new(on_submit),
        });
        self.requester.push(PROMPT_KEY);
    }

    pub fn view(&self, key: &ContextKey) -> Option<PopupView> {
        match key.as_str() {
            CONFIRMATION_KEY => self.confirmation.lock().as_ref().map(|c| PopupView {
                title: c.title.clone(),
                body: c.body.clone(),
                is_prompt: false,
            }),
            PROMPT_KEY => self.prompt.lock().as_ref().map(|p| PopupView {
                title: p.title.clone(),
                body: p.input.clone(),
                is_prompt: true,
            }),
            _ => None,
        }
    }

    pub fn contexts(&self) -> Vec<Arc<dyn Context>> {
        [CONFIRMATION_KEY, PROMPT_KEY]
            .into_iter()
            .map(|key| {
                Arc::new(SimpleContext::new(
                    BaseContext::new(key, ContextKind::Popup),
                    ContextCallbacks::new(),
                )) as Arc<dyn Context>
            })
            .collect()
    }

    pub fn register_bindings(&self, router: &mut Router, opts: &KeybindingsOpts) {
        let keys = &opts.config.universal;
        let confirm = opts.get_key(&keys.confirm);
        let cancel = opts.get_key(&keys.return_);

        let this = self.clone();
        let accept = Binding::new(confirm, "Confirm", move || {
            let action = this.confirmation.lock().take().map(|c| c.on_confirm);
            this.requester.pop();
            this.finish(action.map(|f| f()))
        });
        let this = self.clone();
        let dismiss = Binding::new(cancel, "Cancel", move || {
            this.confirmation.lock().take();
            this.requester.pop();
            Ok(())
        });
        router.bind(CONFIRMATION_KEY.into(), vec![accept, dismiss]);
        router.set_fallback(CONFIRMATION_KEY.into(), |_| Ok(true));

        let this = self.clone();
        let submit = Binding::new(confirm, "Submit", move || {
            let pending = this
                .prompt
                .lock()
                .take()
                .map(|p| (p.on_submit, p.input));
            this.requester.pop();
            this.finish(pending.map(|(f, input)| f(input)))
        });
        let this = self.clone();
        let dismiss = Binding::new(cancel, "Cancel", move || {
            this.prompt.lock().take();
            this.requester.pop();
            Ok(())
        });
        router.bind(PROMPT_KEY.into(), vec![submit, dismiss]);

        let prompt = self.prompt.clone();
        router.set_fallback(PROMPT_KEY.into(), move |key| {
            if let Some(p) = prompt.lock().as_mut() {
                match key {
                    Key::Char(c) => p.input.push(c),
                    Key::Space => p.input.push(' '),
                    Key::Backspace => {
                        p.input.pop();
                    }
                    _ => {}
                }
            }
            Ok(true)
        });
    }

    /// The popup is already closing when its action runs, so a failure is
    /// reported here instead of cancelling the close.
    fn finish(&self, outcome: Option<Result<()>>) -> Result<()> {
        if let Some(Err(e)) = outcome {
            debug!(error = %e, "popup action failed");
            self.reporter.error(&e.to_string());
        }
        Ok(())
    }
}

/// Rejects blank prompt input.
pub fn non_empty(input: &str, what: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::user(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
