use std::sync::Arc;

use parking_lot::Mutex;

use crate::cursor::ListCursor;

/// Pull-style data source. Called on every access, so it must be cheap and
/// free of side effects.
pub type ItemProvider<T> = Arc<dyn Fn() -> Vec<T> + Send + Sync>;

/// The capability set every list-backed panel exposes, independent of its
/// item type.
pub trait ListView: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn selected_index(&self) -> Option<usize>;
    fn move_up(&self);
    fn move_down(&self);
    fn move_by(&self, delta: isize);
    fn move_to(&self, index: usize);
    fn move_to_top(&self);
    fn move_to_bottom(&self);
}

/// Binds an item provider to a selection cursor.
pub struct ListViewModel<T> {
    provider: ItemProvider<T>,
    cursor: Mutex<ListCursor>,
}

impl<T: Clone> ListViewModel<T> {
    pub fn new(provider: impl Fn() -> Vec<T> + Send + Sync + 'static) -> Self {
        Self::from_provider(Arc::new(provider))
    }

    pub fn from_provider(provider: ItemProvider<T>) -> Self {
        Self {
            provider,
            cursor: Mutex::new(ListCursor::new()),
        }
    }

    pub fn items(&self) -> Vec<T> {
        (self.provider)()
    }

    pub fn item_at(&self, index: usize) -> Option<T> {
        self.items().get(index).cloned()
    }

    /// Never fails: an empty or shrunken collection simply yields `None`.
    pub fn selected_item(&self) -> Option<T> {
        let items = self.items();
        let index = self.cursor.lock().current(items.len())?;
        items.get(index).cloned()
    }

    /// Moves the cursor to the first item matching `pred`.
    pub fn select_where(&self, pred: impl Fn(&T) -> bool) -> bool {
        let items = self.items();
        match items.iter().position(pred) {
            Some(index) => {
                self.cursor.lock().move_to(index, items.len());
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Send + Sync> ListView for ListViewModel<T> {
    fn len(&self) -> usize {
        self.items().len()
    }

    fn selected_index(&self) -> Option<usize> {
        let len = self.len();
        self.cursor.lock().current(len)
    }

    fn move_up(&self) {
        let len = self.len();
        self.cursor.lock().move_up(len);
    }

    fn move_down(&self) {
        let len = self.len();
        self.cursor.lock().move_down(len);
    }

    fn move_by(&self, delta: isize) {
        let len = self.len();
        self.cursor.lock().move_by(delta, len);
    }

    fn move_to(&self, index: usize) {
        let len = self.len();
        self.cursor.lock().move_to(index, len);
    }

    fn move_to_top(&self) {
        let len = self.len();
        self.cursor.lock().move_to_top(len);
    }

    fn move_to_bottom(&self) {
        let len = self.len();
        self.cursor.lock().move_to_bottom(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(items: &[&str]) -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(items.iter().map(|s| s.to_string()).collect()))
    }

    fn model_over(data: &Arc<Mutex<Vec<String>>>) -> ListViewModel<String> {
        let data = data.clone();
        ListViewModel::new(move || data.lock().clone())
    }

    #[test]
    fn test_selected_item_on_empty_is_none() {
        let data = shared(&[]);
        let model = model_over(&data);
        assert_eq!(model.selected_item(), None);
        assert_eq!(model.selected_index(), None);
        model.move_down();
        assert_eq!(model.selected_item(), None);
    }

    #[test]
    fn test_tracks_provider_without_notifications() {
        let data = shared(&["a", "b", "c"]);
        let model = model_over(&data);
        model.move_to(2);
        assert_eq!(model.selected_item().as_deref(), Some("c"));

        data.lock().truncate(1);
        assert_eq!(model.selected_item().as_deref(), Some("a"));

        data.lock().clear();
        assert_eq!(model.selected_item(), None);
    }

    #[test]
    fn test_move_down_clamps_at_last_item() {
        let data = shared(&["a", "b", "c"]);
        let model = model_over(&data);
        model.move_to(1);
        assert_eq!(model.selected_item().as_deref(), Some("b"));
        model.move_down();
        assert_eq!(model.selected_index(), Some(2));
        assert_eq!(model.selected_item().as_deref(), Some("c"));
        model.move_down();
        assert_eq!(model.selected_index(), Some(2));
    }

    #[test]
    fn test_select_where() {
        let data = shared(&["a", "b", "c"]);
        let model = model_over(&data);
        assert!(model.select_where(|s| s == "c"));
        assert_eq!(model.selected_index(), Some(2));
        assert!(!model.select_where(|s| s == "z"));
        assert_eq!(model.selected_index(), Some(2));
        assert_eq!(model.item_at(0).as_deref(), Some("a"));
        assert_eq!(model.item_at(3), None);
    }
}
