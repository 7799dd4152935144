//! Layout and drawing: menu, board, launcher, sidebar, pause, quit menu, game over.

use crate::app::{GameOverChoice, MenuState, MenuTab, QuitOption, Screen};
use crate::game::GameState;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 22;
/// Duration of the pop flash (TachyonFX fade at popped cells).
const POP_FLASH_MS: u32 = 350;

const BUBBLE_GLYPH: &str = "●";
const EMPTY_GLYPH: &str = "·";
const LAUNCHER_GLYPH: &str = "▲";

/// Board block size in terminal cells: two chars per column plus border,
/// grid rows plus a launcher zone plus border.
fn board_block_size(state: &GameState) -> (u16, u16) {
    let w = state.grid.columns() as u16 * 2 + 2;
    let h = state.grid.rows() as u16 + 4;
    (w, h)
}

/// Board outer (bordered) and inner rects, centered with the sidebar.
fn board_rects(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (bw, bh) = board_block_size(state);
    let total_w = bw + 1 + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    let outer = Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let inner = Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    };
    (outer, inner)
}

/// Map a scene position to a terminal cell inside the board. Bubble centres
/// land on every other column; offset rows shift right by one char.
fn scene_to_cell(inner: Rect, state: &GameState, x: f32, y: f32) -> Option<(u16, u16)> {
    let ts = state.grid.tile_size();
    let rh = state.grid.row_height();
    let cx = (x / (ts / 2.0) - 1.0).round() as i32;
    let cy = ((y - ts / 2.0) / rh).round() as i32;
    if cx < 0 || cx >= i32::from(inner.width) || cy < 0 || cy >= i32::from(inner.height) {
        return None;
    }
    Some((inner.x + cx as u16, inner.y + cy as u16))
}

fn put(frame: &mut Frame, x: u16, y: u16, glyph: &str, style: Style) {
    if let Some(cell) = frame.buffer_mut().cell_mut(Position::new(x, y)) {
        cell.set_symbol(glyph);
        cell.set_style(style);
    }
}

/// Draw current screen (menu, game, game over), with optional pause overlay.
/// `pop_cells` holds scene positions of bubbles popped this frame; a fresh
/// TachyonFX flash is started over them and processed via `pop_effect`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    area: Rect,
    pop_cells: &[(f32, f32)],
    pop_effect: &mut Option<Effect>,
    pop_effect_process_time: &mut Option<Instant>,
    menu_state: &MenuState,
    now: Instant,
    no_guide: bool,
    quit_selected: Option<QuitOption>,
    game_over_choice: Option<GameOverChoice>,
    best_score: u32,
    new_high_score: bool,
) {
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::Playing => {
            draw_game(frame, state, theme, area, no_guide, best_score);
            apply_pop_effect(frame, state, area, pop_cells, pop_effect, pop_effect_process_time, now);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, area, no_guide, best_score);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, area, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, area, true, best_score);
            draw_game_over(
                frame,
                state,
                theme,
                area,
                game_over_choice.unwrap_or(GameOverChoice::Restart),
                new_high_score,
            );
        }
    }
}

fn bubble_style(theme: &Theme, color: crate::grid::BubbleColor) -> Style {
    Style::default().fg(theme.bubble_color(color.index())).bg(theme.bg)
}

fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    no_guide: bool,
    best_score: u32,
) {
    let (outer, inner) = board_rects(area, state);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg));
    frame.render_widget(block, outer);

    // Resident bubbles plus faint markers for empty slots.
    for row in 0..state.grid.rows() {
        for col in 0..state.grid.usable_columns(row) {
            let (x, y) = state.grid.to_scene(col, row);
            let Some((cx, cy)) = scene_to_cell(inner, state, x, y) else {
                continue;
            };
            match state.grid.get(col, row) {
                Some(id) => {
                    let tile = state.grid.tile(id);
                    put(frame, cx, cy, BUBBLE_GLYPH, bubble_style(theme, tile.color));
                }
                None => put(
                    frame,
                    cx,
                    cy,
                    EMPTY_GLYPH,
                    Style::default().fg(theme.div_line).bg(theme.bg),
                ),
            }
        }
    }

    // Aim guide, skipping chars a bubble already occupies.
    if !no_guide {
        for &(x, y) in &state.trace_guide() {
            if let Some((cx, cy)) = scene_to_cell(inner, state, x, y) {
                let occupied = frame
                    .buffer_mut()
                    .cell(Position::new(cx, cy))
                    .is_some_and(|c| c.symbol() == BUBBLE_GLYPH);
                if !occupied {
                    put(
                        frame,
                        cx,
                        cy,
                        EMPTY_GLYPH,
                        Style::default().fg(theme.inactive_fg).bg(theme.bg),
                    );
                }
            }
        }
    }

    // The cascade tile waiting out its pop delay is off the grid but still
    // visible (and falling, in a floating cascade).
    if let Some((x, y, color)) = state.scheduled_visual() {
        if let Some((cx, cy)) = scene_to_cell(inner, state, x, y) {
            put(frame, cx, cy, BUBBLE_GLYPH, bubble_style(theme, color));
        }
    }

    if let Some(flight) = state.flight {
        if let Some((cx, cy)) = scene_to_cell(inner, state, flight.x, flight.y) {
            put(frame, cx, cy, BUBBLE_GLYPH, bubble_style(theme, flight.color));
        }
    }

    // Launcher with the loaded colour.
    let (lx, ly) = state.launcher_pos();
    if let Some((cx, cy)) = scene_to_cell(inner, state, lx, ly) {
        let style = match state.loaded {
            Some(color) => bubble_style(theme, color),
            None => Style::default().fg(theme.inactive_fg).bg(theme.bg),
        };
        put(frame, cx, cy, LAUNCHER_GLYPH, style);
    }

    // "+N" popups drift up from where a match landed.
    for popup in &state.popups {
        let rise = (popup.age_ms / 300) as f32 * state.grid.row_height();
        if let Some((cx, cy)) = scene_to_cell(inner, state, popup.x, popup.y - rise) {
            let text = format!("+{}", popup.amount);
            for (i, ch) in text.chars().enumerate() {
                put(
                    frame,
                    cx + i as u16,
                    cy,
                    &ch.to_string(),
                    Style::default().fg(theme.title).bg(theme.bg).bold(),
                );
            }
        }
    }

    draw_sidebar(frame, state, theme, outer, area, best_score);
}

fn draw_sidebar(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    board_outer: Rect,
    area: Rect,
    best: u32,
) {
    let x = board_outer.x + board_outer.width + 1;
    if x + SIDEBAR_WIDTH > area.x + area.width {
        return;
    }
    let sidebar = Rect {
        x,
        y: board_outer.y,
        width: SIDEBAR_WIDTH,
        height: board_outer.height.min(area.height),
    };

    let next_color = theme.bubble_color(state.next.index());
    let fg = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);
    let lines = vec![
        Line::from(Span::styled(" bubbletui ", Style::default().fg(theme.title).bold())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Score ", fg),
            Span::styled(format!("{}", state.score), Style::default().fg(theme.title)),
        ]),
        Line::from(vec![Span::styled("Best  ", fg), Span::styled(format!("{best}"), fg)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Next  ", fg),
            Span::styled(BUBBLE_GLYPH, Style::default().fg(next_color)),
        ]),
        Line::from(vec![
            Span::styled("Rows  ", fg),
            Span::styled(format!("{}", state.injections), fg),
        ]),
        Line::from(vec![
            Span::styled("Pops  ", fg),
            Span::styled(format!("{}", state.popped), fg),
        ]),
        Line::from(""),
        Line::from(Span::styled("Ceiling pressure", dim)),
    ];
    let header_height = lines.len() as u16;
    frame.render_widget(Paragraph::new(lines), sidebar);

    // Pressure gauge: fills toward the next ceiling row.
    if sidebar.height > header_height + 1 {
        let gauge_rect = Rect {
            x: sidebar.x,
            y: sidebar.y + header_height,
            width: sidebar.width.saturating_sub(2),
            height: 1,
        };
        let ratio =
            f64::from(state.pressure()) / f64::from(state.pressure_limit().max(1));
        let gauge_color = if ratio > 0.75 {
            theme.bubble_color(2)
        } else {
            theme.bubble_color(0)
        };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(gauge_color).bg(theme.bg))
            .ratio(ratio.min(1.0))
            .label(format!("{}/{}", state.pressure(), state.pressure_limit()));
        frame.render_widget(gauge, gauge_rect);
    }

    let hints = vec![
        Line::from(""),
        Line::from(Span::styled("←/→ aim   ↑ shoot", dim)),
        Line::from(Span::styled("tab swap  p pause", dim)),
        Line::from(Span::styled("q quit", dim)),
    ];
    let hints_rect = Rect {
        x: sidebar.x,
        y: sidebar.y + header_height + 1,
        width: sidebar.width,
        height: sidebar.height.saturating_sub(header_height + 1),
    };
    if hints_rect.height > 0 {
        frame.render_widget(Paragraph::new(hints), hints_rect);
    }
}

/// Start/process the pop flash (TachyonFX: popped cells fade in from the
/// bubble's last colour toward the emptied board).
fn apply_pop_effect(
    frame: &mut Frame,
    state: &GameState,
    area: Rect,
    pop_cells: &[(f32, f32)],
    pop_effect: &mut Option<Effect>,
    pop_effect_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let (_, inner) = board_rects(area, state);
    let delta = pop_effect_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *pop_effect_process_time = Some(now);

    if !pop_cells.is_empty() {
        let mut flash_set: HashSet<(u16, u16)> = HashSet::new();
        for &(x, y) in pop_cells {
            if let Some((cx, cy)) = scene_to_cell(inner, state, x, y) {
                flash_set.insert((cx, cy));
                flash_set.insert((cx.saturating_sub(1), cy));
                flash_set.insert((cx + 1, cy));
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            flash_set.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (POP_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(inner);
        *pop_effect = Some(effect);
    }

    if let Some(effect) = pop_effect {
        frame.render_effect(effect, inner, tfx_delta);
    }
}

/// Centered popup rect of the given size.
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup = popup_rect(area, 46, 16);

    let highlight = Style::default().fg(Color::Black).bg(theme.bubble_color(1)).bold();
    let selected = Style::default().fg(theme.bubble_color(1)).bold();
    let normal = Style::default().fg(theme.main_fg);

    let diff_span = |label: &str, d: crate::Difficulty| {
        let style = if menu_state.current_tab == MenuTab::Difficulty
            && menu_state.selected_difficulty == d
        {
            highlight
        } else if menu_state.selected_difficulty == d {
            selected
        } else {
            normal
        };
        Span::styled(format!(" {label} "), style)
    };

    let start_btn = if menu_state.current_tab == MenuTab::Start {
        Span::styled(" [ START ] ", highlight)
    } else {
        Span::styled(" [ START ] ", normal)
    };

    let title = Line::from(vec![
        Span::styled(BUBBLE_GLYPH, Style::default().fg(theme.bubble_color(2))),
        Span::styled(" bubble ", Style::default().fg(theme.main_fg).bold()),
        Span::styled("tui ", Style::default().fg(theme.title).bold()),
        Span::styled(BUBBLE_GLYPH, Style::default().fg(theme.bubble_color(3))),
    ]);

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            "pop 3+ of a colour · don't reach the floor",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(" ─ DIFFICULTY ─ ", Style::default().fg(theme.div_line))),
        Line::from(vec![
            diff_span("EASY", crate::Difficulty::Easy),
            Span::from("  "),
            diff_span("MEDIUM", crate::Difficulty::Medium),
            Span::from("  "),
            diff_span("HARD", crate::Difficulty::Hard),
        ]),
        Line::from(""),
        Line::from(start_btn),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.bubble_color(3))),
            Span::from("SECTION   "),
            Span::styled(" ↔ ", Style::default().fg(theme.bubble_color(3))),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.bubble_color(3))),
            Span::from("GO"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(theme.bubble_color(2)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Startup animation: slide in from below, ease-out cubic.
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let t = (elapsed as f32 / 400.0).min(1.0);
    let eased = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - eased) * 8.0) as u16;
    frame.render_widget(p, anim_popup.intersection(area));
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 26, 5);
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(" PAUSED ", Style::default().fg(theme.title).bold())),
        Line::from(Span::styled("p resume · q quit", Style::default().fg(theme.inactive_fg))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    frame.render_widget(p, popup);
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, area: Rect, selected: QuitOption) {
    let popup = popup_rect(area, 26, 7);
    let entry = |label: &str, opt: QuitOption| {
        let style = if selected == opt {
            Style::default().fg(Color::Black).bg(theme.bubble_color(1)).bold()
        } else {
            Style::default().fg(theme.main_fg)
        };
        Line::from(Span::styled(format!("  {label}  "), style))
    };
    let p = Paragraph::new(vec![
        Line::from(""),
        entry("Resume", QuitOption::Resume),
        entry("Main menu", QuitOption::MainMenu),
        entry("Exit", QuitOption::Exit),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    frame.render_widget(p, popup);
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    choice: GameOverChoice,
    new_high_score: bool,
) {
    let popup = popup_rect(area, 34, 11);
    let entry = |label: &str, c: GameOverChoice| {
        let style = if choice == c {
            Style::default().fg(Color::Black).bg(theme.bubble_color(1)).bold()
        } else {
            Style::default().fg(theme.main_fg)
        };
        Line::from(Span::styled(format!("  {label}  "), style))
    };
    let score_line = if new_high_score {
        Line::from(vec![
            Span::styled(format!("score {}", state.score), Style::default().fg(theme.title).bold()),
            Span::styled("  new best!", Style::default().fg(theme.bubble_color(0)).bold()),
        ])
    } else {
        Line::from(Span::styled(
            format!("score {}", state.score),
            Style::default().fg(theme.main_fg),
        ))
    };
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(" GAME OVER ", Style::default().fg(theme.bubble_color(2)).bold())),
        Line::from(""),
        score_line,
        Line::from(""),
        entry("Restart", GameOverChoice::Restart),
        entry("Main menu", GameOverChoice::MainMenu),
        entry("Exit", GameOverChoice::Exit),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    frame.render_widget(p, popup);
}
