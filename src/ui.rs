//! Terminal UI rendering with ratatui

use crate::game::{GameState, View};
use crate::settings::Settings;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

const EMPTY: &str = "  ";

/// Render one frame of the game
pub fn render_game(frame: &mut Frame, view: &View, settings: &Settings) {
    let area = frame.area();

    let (board_width, board_height) = board_size(view);
    let status_width = u16::try_from(view.status.chars().count()).unwrap_or(u16::MAX);
    let game_area = center_rect(
        area,
        board_width.max(status_width),
        board_height.saturating_add(1),
    );

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(board_height)])
        .split(game_area);

    render_stats(frame, layout[0], view);
    let board_area = center_rect(layout[1], board_width, board_height);
    render_board(frame, board_area, view, settings.visual.block_chars());

    match view.state {
        GameState::Paused => {
            let key = first_key(&settings.keys.pause, "p");
            render_overlay(frame, area, "PAUSE", &format!("Press \"{}\" to continue", key));
        }
        GameState::GameOver => {
            let key = first_key(&settings.keys.quit, "q");
            render_overlay(frame, area, "Game Over", &format!("Press \"{}\" to exit", key));
        }
        GameState::Playing | GameState::Quit => {}
    }
}

/// Size of the bordered well in terminal cells. Each cell is two
/// characters wide.
fn board_size(view: &View) -> (u16, u16) {
    let columns = u16::try_from(view.columns.max(0)).unwrap_or(u16::MAX);
    let rows = u16::try_from(view.rows.max(0)).unwrap_or(u16::MAX);
    (
        columns.saturating_mul(2).saturating_add(2),
        rows.saturating_add(2),
    )
}

fn first_key<'a>(keys: &'a [String], fallback: &'a str) -> &'a str {
    keys.first().map(String::as_str).unwrap_or(fallback)
}

/// Center a rect within another rect
fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Color of every cell in the well, active piece drawn over the stack
fn paint(view: &View) -> Vec<Vec<Option<Color>>> {
    let columns = view.columns.max(0) as usize;
    let rows = view.rows.max(0) as usize;
    let mut grid = vec![vec![None; columns]; rows];

    let active = view.active.iter().map(|&cell| (cell, view.active_color));
    for (cell, color) in view.settled.iter().copied().chain(active) {
        if cell.x < 0 || cell.y < 0 {
            continue;
        }
        if let Some(slot) = grid
            .get_mut(cell.y as usize)
            .and_then(|row| row.get_mut(cell.x as usize))
        {
            *slot = Some(color);
        }
    }
    grid
}

fn render_board(frame: &mut Frame, area: Rect, view: &View, block_char: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = paint(view)
        .into_iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .into_iter()
                .map(|cell| match cell {
                    Some(color) => Span::styled(block_char.to_string(), Style::default().fg(color)),
                    None => Span::raw(EMPTY),
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render the status line above the board
fn render_stats(frame: &mut Frame, area: Rect, view: &View) {
    let line = Line::styled(view.status.clone(), Style::default().fg(Color::Yellow).bold());
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

/// Render an overlay (for pause/game over)
fn render_overlay(frame: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let popup_width = 28u16;
    let popup_height = 5u16;
    let popup_area = center_rect(area, popup_width, popup_height);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = vec![
        Line::styled(title, Style::default().fg(Color::Yellow).bold()),
        Line::raw(""),
        Line::styled(subtitle, Style::default().fg(Color::Gray)),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}
