pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use focusdeck_core::context::{ContextKey, ContextKind};
use focusdeck_core::list_context::ListContextTrait;

use crate::app::App;
pub use theme::styles;

/// A side panel's row area from the last frame.
#[derive(Debug)]
struct PanelHitbox {
    key: ContextKey,
    area: Rect,
    /// Item index of the first visible row
    origin: usize,
    /// Rows actually drawn; clicks below them hit nothing.
    rows: usize,
}

/// Row areas of the side panels from the last frame, for mouse clicks.
#[derive(Debug, Default)]
pub struct Hitboxes {
    panels: Vec<PanelHitbox>,
}

impl Hitboxes {
    /// Maps a terminal cell to `(panel, item index)`.
    pub fn resolve(&self, column: u16, row: u16) -> Option<(ContextKey, usize)> {
        self.panels.iter().find_map(|hitbox| {
            let area = hitbox.area;
            let inside = column >= area.x
                && column < area.x + area.width
                && row >= area.y
                && row < area.y + area.height;
            if !inside {
                return None;
            }
            let offset = (row - area.y) as usize;
            (offset < hitbox.rows).then(|| (hitbox.key.clone(), hitbox.origin + offset))
        })
    }
}

pub fn draw(f: &mut Frame, app: &App, hitboxes: &mut Hitboxes) {
    hitboxes.panels.clear();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    let side = app.side_keys();
    let side_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(side.iter().map(|_| Constraint::Ratio(1, side.len().max(1) as u32)))
        .split(columns[0]);
    for (key, area) in side.iter().zip(side_areas.iter()) {
        draw_side_panel(f, app, key, *area, hitboxes);
    }

    draw_main(f, app, columns[1]);
    draw_footer(f, app, rows[1]);

    if let Some(active) = app.manager().current() {
        if active.kind() == ContextKind::Popup {
            draw_popup(f, app, active.key());
        }
    }
}

fn draw_side_panel(f: &mut Frame, app: &App, key: &ContextKey, area: Rect, hitboxes: &mut Hitboxes) {
    let focused = app.manager().current_key() == Some(key);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border(focused))
        .title(Span::styled(format!(" {key} "), styles::title(focused)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(ctx) = app.manager().get(key) else {
        return;
    };
    let Some(list) = ctx.as_list() else {
        return;
    };
    list.set_view_height(inner.height as usize);
    let rows = list.render_rows();
    let hitbox = PanelHitbox {
        key: key.clone(),
        area: inner,
        origin: list.viewport().origin,
        rows: rows.len(),
    };
    f.render_widget(Paragraph::new(list_lines(list, rows, focused)), inner);
    hitboxes.panels.push(hitbox);
}

fn list_lines(list: &dyn ListContextTrait, rows: Vec<Vec<String>>, focused: bool) -> Vec<Line<'static>> {
    if rows.is_empty() {
        return vec![Line::styled("  (empty)", styles::text_muted())];
    }
    let origin = list.viewport().origin;
    let selected = list.selected_index();
    rows.into_iter()
        .enumerate()
        .map(|(i, cols)| {
            let text = cols.join(" ");
            if Some(origin + i) == selected {
                Line::styled(text, styles::selection(focused))
            } else {
                Line::styled(text, styles::text())
            }
        })
        .collect()
}

fn draw_main(f: &mut Frame, app: &App, area: Rect) {
    let view = app.main_view();
    let title = view
        .and_then(|v| v.title.clone())
        .unwrap_or_else(|| "Main".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border(false))
        .title(Span::styled(format!(" {title} "), styles::title(false)));

    let lines: Vec<Line> = match view {
        Some(v) if v.is_error => v
            .body
            .lines()
            .map(|l| Line::styled(l.to_string(), styles::error()))
            .collect(),
        Some(v) => v
            .body
            .lines()
            .map(|l| Line::styled(l.to_string(), styles::diff_line(l)))
            .collect(),
        None => vec![Line::styled("Loading...", styles::text_muted())],
    };
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    if let Some(message) = app.status().last() {
        let style = if message.is_error() {
            styles::error()
        } else {
            styles::success()
        };
        f.render_widget(Paragraph::new(Line::styled(message.text().to_string(), style)), area);
        return;
    }

    let Some(active) = app.manager().current_key() else {
        return;
    };
    let mut spans = Vec::new();
    for binding in app.router().bindings_for(active) {
        let Some(key) = binding.key else {
            continue;
        };
        if !spans.is_empty() {
            spans.push(Span::styled(" | ", styles::text_muted()));
        }
        spans.push(Span::styled(format!("{}: ", binding.description), styles::text()));
        spans.push(Span::styled(key.to_string(), styles::key_hint()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_popup(f: &mut Frame, app: &App, key: &ContextKey) {
    let Some(view) = app.popups().view(key) else {
        return;
    };
    let area = centered_rect(60, 5, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border(true))
        .title(Span::styled(format!(" {} ", view.title), styles::title(true)));
    let body = if view.is_prompt {
        Line::from(vec![
            Span::styled(view.body, styles::text()),
            Span::styled("_", styles::warn()),
        ])
    } else {
        Line::styled(view.body, styles::text())
    };
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }).block(block), area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = (u32::from(r.width) * u32::from(percent_x) / 100) as u16;
    Rect {
        x: r.x + (r.width.saturating_sub(width)) / 2,
        y: r.y + (r.height.saturating_sub(height)) / 2,
        width,
        height: height.min(r.height),
    }
}
