//! WorkspaceManager: Podcasts/Studio/Voices tab switching and focus cycling.

use crate::action::{ComponentId, Workspace};

/// Cycles keyboard focus between the panes of one workspace.
pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + self.items.len() - 1) % self.items.len();
        self.current()
    }

    /// Focus `id` if it is in the ring.  True on success.
    pub fn set(&mut self, id: ComponentId) -> bool {
        match self.items.iter().position(|&x| x == id) {
            Some(i) => {
                self.current = i;
                true
            }
            None => false,
        }
    }

    /// Replace the ring contents, keeping focus on the same pane if present.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        let old = self.current();
        self.items = items;
        self.current = old
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }
}

pub struct WorkspaceManager {
    pub workspace: Workspace,
    pub show_log_panel: bool,
    pub show_help: bool,
    pub focus: FocusRing,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        let mut wm = Self {
            workspace: Workspace::Podcasts,
            show_log_panel: false,
            show_help: false,
            focus: FocusRing::new(Vec::new()),
        };
        wm.rebuild_focus_ring();
        wm
    }

    fn rebuild_focus_ring(&mut self) {
        let mut items = match self.workspace {
            Workspace::Podcasts => vec![ComponentId::PodcastList],
            Workspace::Studio => vec![ComponentId::ScriptPane, ComponentId::AudioPlayer],
            Workspace::Voices => vec![ComponentId::VoiceList],
        };
        if self.show_log_panel {
            items.push(ComponentId::LogPanel);
        }
        self.focus.set_items(items);
    }

    pub fn switch(&mut self, workspace: Workspace) {
        if self.workspace != workspace {
            self.workspace = workspace;
            self.focus.set_items(Vec::new());
            self.rebuild_focus_ring();
        }
    }

    pub fn toggle_logs(&mut self) {
        self.show_log_panel = !self.show_log_panel;
        self.rebuild_focus_ring();
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.focus.current()
    }

    pub fn focus_set(&mut self, id: ComponentId) -> bool {
        self.focus.set(id)
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.focused() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_wraps_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::ScriptPane, ComponentId::AudioPlayer]);
        assert_eq!(ring.next(), Some(ComponentId::AudioPlayer));
        assert_eq!(ring.next(), Some(ComponentId::ScriptPane));
        assert_eq!(ring.prev(), Some(ComponentId::AudioPlayer));
    }

    #[test]
    fn test_empty_ring() {
        let mut ring = FocusRing::new(Vec::new());
        assert_eq!(ring.next(), None);
        assert_eq!(ring.current(), None);
    }

    #[test]
    fn test_switch_focuses_first_pane() {
        let mut wm = WorkspaceManager::new();
        assert_eq!(wm.focused(), Some(ComponentId::PodcastList));
        wm.switch(Workspace::Studio);
        assert_eq!(wm.focused(), Some(ComponentId::ScriptPane));
        wm.focus.next();
        assert!(wm.is_focused(ComponentId::AudioPlayer));
    }

    #[test]
    fn test_log_panel_joins_ring_and_keeps_focus() {
        let mut wm = WorkspaceManager::new();
        wm.switch(Workspace::Studio);
        wm.focus.next();
        wm.toggle_logs();
        assert!(wm.is_focused(ComponentId::AudioPlayer));
        assert_eq!(wm.focus.next(), Some(ComponentId::LogPanel));
        wm.toggle_logs();
        assert_eq!(wm.focused(), Some(ComponentId::ScriptPane));
    }

    #[test]
    fn test_focus_set_ignores_foreign_panes() {
        let mut wm = WorkspaceManager::new();
        wm.switch(Workspace::Studio);
        assert!(wm.focus_set(ComponentId::AudioPlayer));
        assert!(!wm.focus_set(ComponentId::VoiceList));
        assert!(wm.is_focused(ComponentId::AudioPlayer));
    }
}
