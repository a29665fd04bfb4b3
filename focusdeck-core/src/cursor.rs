//! Selection cursor for list-backed panels.
//!
//! The cursor never owns the collection it points into. Every operation takes
//! the current length, so a collection that shrank between two user actions is
//! re-clamped on the next access instead of yielding a stale index.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListCursor {
    selected: Option<usize>,
}

impl ListCursor {
    pub fn new() -> Self {
        Self { selected: None }
    }

    /// Current index clamped to `[0, len - 1]`, or `None` for an empty list.
    pub fn current(&mut self, len: usize) -> Option<usize> {
        self.selected = clamp(self.selected, len);
        self.selected
    }

    pub fn move_up(&mut self, len: usize) {
        self.move_by(-1, len);
    }

    pub fn move_down(&mut self, len: usize) {
        self.move_by(1, len);
    }

    /// Moves by `delta` rows, stopping at the first and last item.
    pub fn move_by(&mut self, delta: isize, len: usize) {
        let Some(current) = self.current(len) else {
            return;
        };
        let target = current.saturating_add_signed(delta);
        self.selected = clamp(Some(target), len);
    }

    /// Out-of-range requests clamp silently.
    pub fn move_to(&mut self, index: usize, len: usize) {
        self.selected = clamp(Some(index), len);
    }

    pub fn move_to_top(&mut self, len: usize) {
        self.move_to(0, len);
    }

    pub fn move_to_bottom(&mut self, len: usize) {
        self.move_to(len.saturating_sub(1), len);
    }
}

fn clamp(index: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(index.unwrap_or(0).min(len - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_has_no_selection() {
        let mut cursor = ListCursor::new();
        assert_eq!(cursor.current(0), None);
        cursor.move_down(0);
        cursor.move_up(0);
        cursor.move_to(5, 0);
        assert_eq!(cursor.current(0), None);
    }

    #[test]
    fn test_clamps_at_both_ends() {
        let mut cursor = ListCursor::new();
        cursor.move_to(1, 3);
        cursor.move_down(3);
        assert_eq!(cursor.current(3), Some(2));
        cursor.move_down(3);
        assert_eq!(cursor.current(3), Some(2));

        cursor.move_to_top(3);
        cursor.move_up(3);
        assert_eq!(cursor.current(3), Some(0));
    }

    #[test]
    fn test_shrinking_collection_reclamps_lazily() {
        let mut cursor = ListCursor::new();
        cursor.move_to(9, 10);
        assert_eq!(cursor.current(10), Some(9));
        assert_eq!(cursor.current(4), Some(3));
        assert_eq!(cursor.current(0), None);
        // growing again starts from the top
        assert_eq!(cursor.current(2), Some(0));
    }

    #[test]
    fn test_out_of_range_move_to_clamps() {
        let mut cursor = ListCursor::new();
        cursor.move_to(100, 5);
        assert_eq!(cursor.current(5), Some(4));
        cursor.move_by(-100, 5);
        assert_eq!(cursor.current(5), Some(0));
        cursor.move_to_bottom(5);
        assert_eq!(cursor.current(5), Some(4));
    }

    #[test]
    fn test_random_walk_stays_in_bounds() {
        // deterministic LCG so the walk is reproducible
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for len in 0..12 {
            let mut cursor = ListCursor::new();
            let mut live_len = len;
            for _ in 0..200 {
                match next() % 5 {
                    0 => cursor.move_up(live_len),
                    1 => cursor.move_down(live_len),
                    2 => cursor.move_to(next() % 20, live_len),
                    3 => live_len = next() % (len + 1),
                    _ => cursor.move_by((next() % 7) as isize - 3, live_len),
                }
                match cursor.current(live_len) {
                    None => assert_eq!(live_len, 0),
                    Some(i) => assert!(i < live_len),
                }
            }
        }
    }
}
