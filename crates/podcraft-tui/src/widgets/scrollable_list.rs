//! Generic scrollable + filterable list.

pub struct ScrollableList<T> {
    pub items: Vec<T>,
    filtered: Vec<usize>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub filter: String,
    matches: Box<dyn Fn(&T, &str) -> bool + Send + Sync>,
}

impl<T> ScrollableList<T> {
    pub fn new(matches: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            items: Vec::new(),
            filtered: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            matches: Box::new(matches),
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.rebuild();
    }

    pub fn set_filter(&mut self, query: &str) {
        let prev = self.filtered.get(self.selected).copied();
        self.filter = query.to_string();
        self.rebuild();
        // keep the same item selected when it survives the filter
        self.selected = prev
            .and_then(|p| self.filtered.iter().position(|&i| i == p))
            .unwrap_or(0);
        self.scroll_offset = 0;
    }

    fn rebuild(&mut self) {
        self.filtered = if self.filter.is_empty() {
            (0..self.items.len()).collect()
        } else {
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| (self.matches)(item, &self.filter))
                .map(|(i, _)| i)
                .collect()
        };
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.filtered.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.filtered.len().saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(*self.filtered.get(self.selected)?)
    }

    /// Items visible in `height` rows.  Call `ensure_visible` first.
    pub fn visible_items(&self, height: usize) -> Vec<&T> {
        if height == 0 || self.filtered.is_empty() {
            return Vec::new();
        }
        let end = (self.scroll_offset + height).min(self.filtered.len());
        self.filtered[self.scroll_offset..end]
            .iter()
            .map(|&i| &self.items[i])
            .collect()
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// Select the item at `row` of the rendered area.  True if it exists.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.filtered.len() {
            self.selected = target;
            true
        } else {
            false
        }
    }

    pub fn selected_in_view(&self) -> usize {
        self.selected.saturating_sub(self.scroll_offset)
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Whitespace-separated words must all appear, case-insensitively.
pub fn search_matches(query: &str, text: &str) -> bool {
    let text = text.to_lowercase();
    query
        .split_whitespace()
        .all(|word| text.contains(&word.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> ScrollableList<String> {
        let mut l = ScrollableList::new(|s: &String, q: &str| search_matches(q, s));
        l.set_items(items.iter().map(|s| s.to_string()).collect());
        l
    }

    #[test]
    fn test_filter_keeps_selection() {
        let mut l = list(&["Morning Show", "Tech Talk", "Evening Tech"]);
        l.select_down(2);
        l.set_filter("tech");
        assert_eq!(l.len(), 2);
        assert_eq!(l.selected_item().map(String::as_str), Some("Evening Tech"));
        l.set_filter("");
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn test_selection_clamped_when_items_shrink() {
        let mut l = list(&["a", "b", "c"]);
        l.select_last();
        l.set_items(vec!["a".to_string()]);
        assert_eq!(l.selected, 0);
        assert_eq!(l.selected_item().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_scrolls_to_keep_selection_visible() {
        let mut l = list(&["a", "b", "c", "d", "e"]);
        l.select_down(4);
        l.ensure_visible(2);
        assert_eq!(l.scroll_offset, 3);
        assert_eq!(l.visible_items(2), vec!["d", "e"]);
        assert_eq!(l.selected_in_view(), 1);
    }

    #[test]
    fn test_search_matches_all_words() {
        assert!(search_matches("tech eve", "Evening Tech"));
        assert!(!search_matches("tech morning", "Evening Tech"));
        assert!(search_matches("", "anything"));
    }
}
