//! List contexts: a [`SimpleContext`] composed with a [`ListViewModel`] and a
//! row renderer.
//!
//! Rows are only ever produced for the visible window (`origin .. origin +
//! height`), never for the whole collection, so panels backed by thousands of
//! items stay responsive.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::{BaseContext, Context, ContextCallbacks, FocusOpts, SimpleContext};
use crate::error::Result;
use crate::list_model::{ListView, ListViewModel};

/// `(start_index, length) -> rows of columns`
pub type DisplayStringsFn = Arc<dyn Fn(usize, usize) -> Vec<Vec<String>> + Send + Sync>;
pub type ItemIdFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Scroll window of a list view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub origin: usize,
    pub height: usize,
}

impl Viewport {
    /// Adjusts the origin so that `selected` is inside the window.
    fn follow(&mut self, selected: Option<usize>, len: usize) {
        let Some(selected) = selected else {
            self.origin = 0;
            return;
        };
        if selected < self.origin {
            self.origin = selected;
        } else if self.height > 0 && selected >= self.origin + self.height {
            self.origin = selected + 1 - self.height;
        }
        if self.origin + self.height > len {
            self.origin = len.saturating_sub(self.height);
        }
    }

    fn visible_len(&self, len: usize) -> usize {
        self.height.min(len.saturating_sub(self.origin))
    }
}

/// Type-erased view of a list context, used by the focus manager and the
/// terminal front-end.
pub trait ListContextTrait: ListView {
    /// Stable identity of the selection, or an empty string.
    fn selected_item_id(&self) -> String;

    /// Moves the cursor to the item with the given id. Returns whether it was
    /// found.
    fn restore_selection(&self, id: &str) -> bool;

    fn display_strings(&self, start: usize, length: usize) -> Vec<Vec<String>>;
    fn viewport(&self) -> Viewport;
    fn set_view_height(&self, height: usize);

    /// Scrolls the viewport to keep the selection visible.
    fn focus_line(&self);

    /// Rows for the visible window only.
    fn render_rows(&self) -> Vec<Vec<String>> {
        self.focus_line();
        let viewport = self.viewport();
        let visible = viewport.visible_len(self.len());
        if visible == 0 {
            return Vec::new();
        }
        self.display_strings(viewport.origin, visible)
    }
}

pub struct ListContext<T> {
    context: SimpleContext,
    model: Arc<ListViewModel<T>>,
    viewport: Mutex<Viewport>,
    display_strings: DisplayStringsFn,
    item_id: ItemIdFn<T>,
}

impl<T: Clone + Send + Sync + 'static> ListContext<T> {
    /// Never fails: every input is a closure over already-validated state.
    ///
    /// The model is passed in shared so that the callbacks can capture it
    /// before the context exists.
    pub fn new(
        base: BaseContext,
        model: Arc<ListViewModel<T>>,
        display_strings: impl Fn(usize, usize) -> Vec<Vec<String>> + Send + Sync + 'static,
        item_id: impl Fn(&T) -> String + Send + Sync + 'static,
        callbacks: ContextCallbacks,
    ) -> Self {
        Self {
            context: SimpleContext::new(base, callbacks),
            model,
            viewport: Mutex::new(Viewport::default()),
            display_strings: Arc::new(display_strings),
            item_id: Arc::new(item_id),
        }
    }

    pub fn model(&self) -> &Arc<ListViewModel<T>> {
        &self.model
    }

    pub fn selected_item(&self) -> Option<T> {
        self.model.selected_item()
    }
}

impl<T: Clone + Send + Sync + 'static> ListView for ListContext<T> {
    fn len(&self) -> usize {
        self.model.len()
    }

    fn selected_index(&self) -> Option<usize> {
        self.model.selected_index()
    }

    fn move_up(&self) {
        self.model.move_up();
    }

    fn move_down(&self) {
        self.model.move_down();
    }

    fn move_by(&self, delta: isize) {
        self.model.move_by(delta);
    }

    fn move_to(&self, index: usize) {
        self.model.move_to(index);
    }

    fn move_to_top(&self) {
        self.model.move_to_top();
    }

    fn move_to_bottom(&self) {
        self.model.move_to_bottom();
    }
}

impl<T: Clone + Send + Sync + 'static> ListContextTrait for ListContext<T> {
    fn selected_item_id(&self) -> String {
        self.model
            .selected_item()
            .map(|item| (self.item_id)(&item))
            .unwrap_or_default()
    }

    fn restore_selection(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        self.model.select_where(|item| (self.item_id)(item) == id)
    }

    fn display_strings(&self, start: usize, length: usize) -> Vec<Vec<String>> {
        (self.display_strings)(start, length)
    }

    fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }

    fn set_view_height(&self, height: usize) {
        self.viewport.lock().height = height;
    }

    fn focus_line(&self) {
        let len = self.model.len();
        let selected = self.model.selected_index();
        self.viewport.lock().follow(selected, len);
    }
}

impl<T: Clone + Send + Sync + 'static> Context for ListContext<T> {
    fn base(&self) -> &BaseContext {
        self.context.base()
    }

    /// Moves the cursor to a clicked line before `OnFocus` runs, so the hook
    /// sees the clicked item. The focus manager restores the cursor if the
    /// transition is aborted.
    fn handle_focus(&self, opts: &FocusOpts) -> Result<()> {
        if let Some(line) = opts.clicked_line {
            self.model.move_to(line);
        }
        self.focus_line();
        self.context.handle_focus(opts)
    }

    fn handle_focus_lost(&self) -> Result<()> {
        self.context.handle_focus_lost()
    }

    fn handle_render_to_main(&self) -> Result<()> {
        self.context.handle_render_to_main()
    }

    fn has_render_to_main(&self) -> bool {
        self.context.has_render_to_main()
    }

    fn as_list(&self) -> Option<&dyn ListContextTrait> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::context::ContextKind;

    fn letters(items: Vec<String>) -> (Arc<Mutex<Vec<String>>>, ListContext<String>) {
        let data = Arc::new(Mutex::new(items));
        let source = data.clone();
        let model = Arc::new(ListViewModel::new(move || source.lock().clone()));
        let rows = data.clone();
        let ctx = ListContext::new(
            BaseContext::new("letters", ContextKind::Side),
            model,
            move |start, len| {
                rows.lock()[start..start + len]
                    .iter()
                    .map(|s| vec![s.clone()])
                    .collect()
            },
            |s: &String| format!("id-{s}"),
            ContextCallbacks::new(),
        );
        (data, ctx)
    }

    #[test]
    fn test_selected_item_id_empty_when_nothing_selected() {
        let (_, ctx) = letters(Vec::new());
        assert_eq!(ctx.selected_item_id(), "");
        assert!(ctx.render_rows().is_empty());
    }

    #[test]
    fn test_scenario_move_down_clamps() {
        let (_, ctx) = letters(vec!["a".into(), "b".into(), "c".into()]);
        ctx.move_to(1);
        assert_eq!(ctx.selected_item().as_deref(), Some("b"));
        ctx.move_down();
        assert_eq!(ctx.selected_item_id(), "id-c");
        ctx.move_down();
        assert_eq!(ctx.selected_index(), Some(2));
    }

    #[test]
    fn test_restore_selection_by_id() {
        let (data, ctx) = letters(vec!["a".into(), "b".into(), "c".into()]);
        ctx.move_to(2);
        let id = ctx.selected_item_id();
        data.lock().insert(0, "z".into());
        assert_eq!(ctx.selected_item_id(), "id-b");
        assert!(ctx.restore_selection(&id));
        assert_eq!(ctx.selected_index(), Some(3));
        assert!(!ctx.restore_selection(""));
    }

    #[test]
    fn test_only_visible_window_is_rendered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let items: Vec<usize> = (0..10_000).collect();
        let model = Arc::new(ListViewModel::new(move || items.clone()));
        let (c, s) = (calls.clone(), seen.clone());
        let ctx = ListContext::new(
            BaseContext::new("commits", ContextKind::Side),
            model,
            move |start, len| {
                c.fetch_add(1, Ordering::SeqCst);
                s.lock().push((start, len));
                (start..start + len).map(|i| vec![i.to_string()]).collect()
            },
            |i: &usize| i.to_string(),
            ContextCallbacks::new(),
        );

        ctx.set_view_height(20);
        ctx.move_to(500);
        let rows = ctx.render_rows();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows.last().map(|r| r[0].as_str()), Some("500"));
        assert_eq!(*seen.lock(), vec![(481, 20)]);

        ctx.move_to_bottom();
        let rows = ctx.render_rows();
        assert_eq!(rows.first().map(|r| r[0].as_str()), Some("9980"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_focus_with_clicked_line_moves_cursor() {
        let (_, ctx) = letters(vec!["a".into(), "b".into(), "c".into()]);
        ctx.handle_focus(&FocusOpts { clicked_line: Some(2) }).unwrap();
        assert_eq!(ctx.selected_index(), Some(2));
        assert!(ctx.as_list().is_some());
    }
}
