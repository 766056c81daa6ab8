//! Header tabs with the status-stream bulb, and the keybindings footer.

use podcraft_client::SubscriptionState;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::Workspace;
use crate::theme::{C_ACCENT, C_BUSY, C_MUTED, C_PLAYING, C_PROMPT_FG, C_SECONDARY, C_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    Prompt,
}

fn connection_span(state: Option<SubscriptionState>) -> Span<'static> {
    let (glyph, color): (&str, Color) = match state {
        Some(SubscriptionState::Open) => ("●", C_PLAYING),
        Some(SubscriptionState::Connecting) => ("◌", C_BUSY),
        Some(SubscriptionState::Closed) | None => ("○", C_ACCENT),
    };
    Span::styled(glyph, Style::default().fg(color))
}

/// Draw the one-row header: workspace tabs on the left, backend URL and
/// status-stream bulb on the right.
pub fn draw_tabs(
    frame: &mut Frame,
    area: Rect,
    active: Workspace,
    backend_url: &str,
    connection: Option<SubscriptionState>,
) {
    let mut spans = Vec::new();
    for (i, ws) in [Workspace::Podcasts, Workspace::Studio, Workspace::Voices]
        .into_iter()
        .enumerate()
    {
        let style = if ws == active {
            Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_MUTED)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, ws.label()), style));
        spans.push(Span::styled("│", Style::default().fg(C_SEPARATOR)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let right = Line::from(vec![
        Span::styled(backend_url.to_string(), Style::default().fg(C_SECONDARY)),
        Span::raw(" "),
        connection_span(connection),
        Span::raw(" "),
    ])
    .right_aligned();
    frame.render_widget(Paragraph::new(right), area);
}

fn keys_for(mode: InputMode, workspace: Workspace) -> &'static str {
    match mode {
        InputMode::Prompt => " type  Enter submit  Esc cancel",
        InputMode::Filter => " type to filter  ↑↓ move  Enter keep  Esc clear+close",
        InputMode::Normal => match workspace {
            Workspace::Podcasts => {
                " ↑↓/jk select  Enter open  n new  d delete  r refresh  / filter  1-3 tabs  L logs  ? help  q quit"
            }
            Workspace::Studio => {
                " g script  s save  p generate  Space pause  ←→ seek  Tab panes  1-3 tabs  L logs  ? help  q quit"
            }
            Workspace::Voices => {
                " ↑↓/jk select  Enter preview  a assign  R record  d delete  r refresh  1-3 tabs  L logs  ? help  q quit"
            }
        },
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, workspace: Workspace) {
    let (label, color) = match mode {
        InputMode::Prompt => ("INPUT", C_PROMPT_FG),
        InputMode::Filter => ("FILTER", C_PROMPT_FG),
        InputMode::Normal => (workspace.label(), C_PLAYING),
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys_for(mode, workspace), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_keys_override_workspace() {
        for ws in [Workspace::Podcasts, Workspace::Studio, Workspace::Voices] {
            assert_eq!(keys_for(InputMode::Prompt, ws), keys_for(InputMode::Prompt, Workspace::Studio));
        }
        assert!(keys_for(InputMode::Normal, Workspace::Voices).contains("R record"));
    }
}
