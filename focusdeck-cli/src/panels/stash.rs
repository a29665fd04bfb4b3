use std::sync::Arc;

use focusdeck_core::context::{BaseContext, ContextCallbacks, ContextKey, ContextKind};
use focusdeck_core::keybinding::{Binding, Controller, KeybindingsOpts, requires_selection};
use focusdeck_core::list_context::ListContext;
use focusdeck_core::list_model::ListViewModel;
use focusdeck_core::render::{RenderRequest, UpdateTask};
use focusdeck_core::Result;

use super::{AppRequest, MAIN_KEY, PanelCommon};
use crate::backend::StashEntry;

pub const STASH_KEY: &str = "stash";

pub struct StashPanel {
    pub model: Arc<ListViewModel<StashEntry>>,
    pub context: Arc<ListContext<StashEntry>>,
}

pub fn build(common: &PanelCommon) -> StashPanel {
    let repo = common.repo.clone();
    let model = Arc::new(ListViewModel::new(move || repo.stash()));

    let rows = model.clone();
    let selected = model.clone();
    let scheduler = common.scheduler.clone();
    let backend = common.repo.backend().clone();
    let context = ListContext::new(
        BaseContext::new(STASH_KEY, ContextKind::Side),
        model.clone(),
        move |start, len| {
            rows.items()
                .iter()
                .skip(start)
                .take(len)
                .map(|entry| vec![entry.ref_name(), entry.message.clone()])
                .collect()
        },
        StashEntry::ref_name,
        ContextCallbacks::new().on_render_to_main(move || {
            let request = match selected.selected_item() {
                Some(entry) => RenderRequest::new(MAIN_KEY, backend.stash_diff_task(&entry))
                    .with_title(format!("Stash {}", entry.ref_name())),
                None => RenderRequest::new(MAIN_KEY, UpdateTask::render_string("No stash entries"))
                    .with_title("Stash"),
            };
            scheduler.enqueue(request);
            Ok(())
        }),
    );

    StashPanel {
        model,
        context: Arc::new(context),
    }
}

pub struct StashController {
    common: PanelCommon,
    model: Arc<ListViewModel<StashEntry>>,
}

impl StashController {
    pub fn new(common: PanelCommon, model: Arc<ListViewModel<StashEntry>>) -> Self {
        Self { common, model }
    }

    fn apply(&self) -> impl Fn(StashEntry) -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move |entry: StashEntry| {
            common.repo.backend().stash_apply(&entry)?;
            common.reporter.info(&format!("Applied {}", entry.ref_name()));
            common.requests.send(AppRequest::Refresh);
            Ok(())
        }
    }

    fn pop(&self) -> impl Fn(StashEntry) -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move |entry: StashEntry| {
            common.repo.backend().stash_pop(&entry)?;
            common.reporter.info(&format!("Popped {}", entry.ref_name()));
            common.requests.send(AppRequest::Refresh);
            Ok(())
        }
    }

    fn drop_entry(&self) -> impl Fn(StashEntry) -> Result<()> + Send + Sync + 'static {
        let common = self.common.clone();
        move |entry: StashEntry| {
            let c = common.clone();
            let body = format!("Are you sure you want to drop {}?", entry.ref_name());
            common.popups.confirm("Drop stash", body, move || {
                c.repo.backend().stash_drop(&entry)?;
                c.reporter.info(&format!("Dropped {}", entry.ref_name()));
                c.requests.send(AppRequest::Refresh);
                Ok(())
            });
            Ok(())
        }
    }
}

impl Controller for StashController {
    fn context_key(&self) -> ContextKey {
        STASH_KEY.into()
    }

    fn keybindings(&self, opts: &KeybindingsOpts) -> Vec<Binding> {
        let keys = &opts.config;
        vec![
            Binding::from_handler(
                opts.get_key(&keys.universal.select),
                "Apply stash",
                requires_selection(&self.model, self.apply()),
            ),
            Binding::from_handler(
                opts.get_key(&keys.stash.pop_stash),
                "Pop stash",
                requires_selection(&self.model, self.pop()),
            ),
            Binding::from_handler(
                opts.get_key(&keys.universal.remove),
                "Drop stash",
                requires_selection(&self.model, self.drop_entry()),
            ),
        ]
    }
}
