//! PodcastList component: the Podcasts workspace.

use ratatui::crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use podcraft_client::protocol::Podcast;

use crate::{
    action::{Action, ComponentId, PromptKind},
    app_state::AppState,
    component::Component,
    theme::{C_MUTED, C_PLAYING, C_PRIMARY, C_PROMPT_BG, C_PROMPT_FG, C_SECONDARY, C_SELECTION_BG},
    widgets::{
        pane_chrome::pane_chrome,
        scrollable_list::{search_matches, ScrollableList},
    },
};

pub struct PodcastList {
    pub list: ScrollableList<Podcast>,
    filter: Input,
    filtering: bool,
}

impl PodcastList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|p: &Podcast, q: &str| {
                search_matches(q, &format!("{} {}", p.title, p.description.as_deref().unwrap_or("")))
            }),
            filter: Input::default(),
            filtering: false,
        }
    }

    pub fn sync(&mut self, podcasts: &[Podcast]) {
        self.list.set_items(podcasts.to_vec());
    }

    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Up => self.list.select_up(1),
            KeyCode::Down => self.list.select_down(1),
            KeyCode::Enter => {
                self.filtering = false;
                return vec![Action::CloseFilter];
            }
            KeyCode::Esc => {
                if self.filter.value().is_empty() {
                    self.filtering = false;
                    return vec![Action::CloseFilter];
                }
                self.filter = Input::default();
                self.list.set_filter("");
            }
            _ => {
                self.filter.handle_event(&Event::Key(key));
                self.list.set_filter(self.filter.value());
            }
        }
        vec![]
    }
}

impl Component for PodcastList {
    fn id(&self) -> ComponentId {
        ComponentId::PodcastList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if self.filtering {
            return self.handle_filter_key(key);
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => {
                if let Some(p) = self.list.selected_item() {
                    return vec![Action::OpenPodcast(p.clone())];
                }
            }
            KeyCode::Char('n') => return vec![Action::OpenPrompt(PromptKind::PodcastTitle)],
            KeyCode::Char('d') => {
                if let Some(p) = self.list.selected_item() {
                    return vec![Action::OpenPrompt(PromptKind::ConfirmDeletePodcast(
                        p.id.clone(),
                    ))];
                }
            }
            KeyCode::Char('r') => return vec![Action::RefreshPodcasts],
            KeyCode::Char('/') => {
                self.filtering = true;
                return vec![Action::OpenFilter];
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let row = event.row.saturating_sub(area.y + 1) as usize;
                self.list.handle_click(row);
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::CloseFilter = action {
            self.filtering = false;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("podcasts", Some('1'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let empty_msg = if !state.podcasts_loaded {
            Some("  loading podcasts…")
        } else if state.podcasts.is_empty() {
            Some("  no podcasts yet, press n to create one")
        } else if self.list.is_empty() {
            Some("  no podcasts match filter")
        } else {
            None
        };

        let list_h = if self.filtering {
            inner.height.saturating_sub(1)
        } else {
            inner.height
        } as usize;

        if let Some(msg) = empty_msg {
            frame.render_widget(
                Paragraph::new(Span::styled(msg, Style::default().fg(C_MUTED))),
                inner,
            );
        } else {
            self.list.ensure_visible(list_h);
            let sel = self.list.selected_in_view();
            let current = state.current_podcast_id();
            let items: Vec<ListItem> = self
                .list
                .visible_items(list_h)
                .into_iter()
                .enumerate()
                .map(|(row, p)| {
                    let is_open = current == Some(p.id.as_str());
                    let is_selected = row == sel;
                    let marker = if is_open {
                        Span::styled("▶ ", Style::default().fg(C_PLAYING))
                    } else {
                        Span::raw("  ")
                    };
                    let title_style = if is_selected {
                        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(C_SECONDARY)
                    };
                    let mut spans = vec![marker, Span::styled(p.title.clone(), title_style)];
                    if let Some(desc) = p.description.as_deref().filter(|d| !d.is_empty()) {
                        spans.push(Span::styled(format!("  {}", desc), Style::default().fg(C_MUTED)));
                    }
                    let bg = if is_selected {
                        Style::default().bg(C_SELECTION_BG)
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::from(spans)).style(bg)
                })
                .collect();
            frame.render_widget(List::new(items), inner);
        }

        if self.filtering && inner.height > 0 {
            let bar = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("/ {}", self.filter.value()),
                    Style::default().fg(C_PROMPT_FG),
                ))
                .style(Style::default().bg(C_PROMPT_BG)),
                bar,
            );
            let x = bar.x + 2 + self.filter.visual_cursor() as u16;
            frame.set_cursor_position((x.min(bar.x + bar.width.saturating_sub(1)), bar.y));
        }
    }
}
