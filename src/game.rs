//! Game state: landing resolution, paced removal, pressure, launcher, flight.

use crate::grid::{BubbleColor, Grid, TileId};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Minimum connected same-colour cluster that pops.
pub const MATCH_MIN: usize = 3;
/// Rows pre-filled when a game starts.
const INITIAL_FILL_ROWS: usize = 5;
/// Shot speed, tile widths per second.
const SHOT_SPEED_TILES: f32 = 12.0;
/// Downward speed of a dislodged bubble, tile widths per second.
const FALL_SPEED_TILES: f32 = 10.0;
/// A flying bubble sticks when it gets this close to a resident one,
/// in tile widths. Below 1.0 so shots can slip between near-touching rows.
const COLLIDE_RANGE: f32 = 0.85;
/// Aim nudge per key press, radians.
const AIM_STEP: f32 = 0.055;
/// Aim clamp either side of straight up, radians.
const AIM_LIMIT: f32 = 1.25;
/// Pressure ticks up once per this interval while playing.
const PRESSURE_TICK: Duration = Duration::from_secs(1);

/// Outbound signals for the shell, drained once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BubbleEvent {
    /// A shot stuck to the grid (feedback cue).
    Snapped { col: usize, row: usize },
    /// A tile's delayed pop fired; it has left the grid for good.
    Popped { x: f32, y: f32, color: BubbleColor },
    /// A dislodged tile started falling. Fires before its delayed pop.
    Fell { x: f32, y: f32, color: BubbleColor },
    /// A landing matched a cluster of `count` tiles.
    MatchResolved { count: usize },
    /// A landing matched nothing.
    NoMatch,
    GameOver,
}

/// The loaded bubble mid-flight, between shoot and landing.
#[derive(Debug, Clone, Copy)]
pub struct Flight {
    pub color: BubbleColor,
    pub x: f32,
    pub y: f32,
    vx: f32,
    vy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalPhase {
    Matched,
    Floating,
}

/// One cascade in progress: tiles still queued, plus the tile whose cell is
/// already cleared and whose pop fires at `fire_at`.
#[derive(Debug)]
struct Removal {
    phase: RemovalPhase,
    pending: VecDeque<TileId>,
    scheduled: TileId,
    fire_at: Instant,
}

/// Small LCG, enough for bubble colours.
#[derive(Debug, Clone)]
struct ColorRng {
    state: u32,
}

impl ColorRng {
    fn new(seed: u32) -> Self {
        Self { state: seed | 1 }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state >> 16
    }

    fn color(&mut self) -> BubbleColor {
        BubbleColor::ALL[(self.next() as usize) % BubbleColor::ALL.len()]
    }
}

/// Transient "+N" marker shown where a match popped.
#[derive(Debug, Clone)]
pub struct ScorePopup {
    pub x: f32,
    pub y: f32,
    pub amount: u32,
    pub age_ms: u32,
}

/// Game state: grid, launcher, flight, cascade, pressure, score.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    /// Colour sitting in the launcher; None between landing and reload.
    pub loaded: Option<BubbleColor>,
    /// On-deck colour.
    pub next: BubbleColor,
    pub flight: Option<Flight>,
    /// Aim angle, radians from straight up; positive leans right.
    pub aim: f32,
    removal: Option<Removal>,
    pop_delay: Duration,
    pub score: u32,
    pub popped: u32,
    /// Ceiling rows injected so far.
    pub injections: u32,
    pub game_over: bool,
    pressure: u32,
    pressure_limit: u32,
    last_pressure_tick: Instant,
    rng: ColorRng,
    events: Vec<BubbleEvent>,
    pub popups: Vec<ScorePopup>,
}

fn pressure_limit_for(difficulty: crate::Difficulty) -> u32 {
    match difficulty {
        crate::Difficulty::Easy => 20,
        crate::Difficulty::Medium => 14,
        crate::Difficulty::Hard => 9,
    }
}

impl GameState {
    pub fn new(columns: u16, rows: u16, config: &crate::GameConfig) -> Self {
        let mut grid = Grid::new(columns as usize, rows as usize, 16.0);
        let mut rng = ColorRng::new(config.seed);

        // Starting field: a band of random bubbles hanging from the ceiling.
        let fill = INITIAL_FILL_ROWS.min(grid.rows().saturating_sub(2));
        for row in 0..fill {
            for col in 0..grid.usable_columns(row) {
                let (x, y) = grid.to_scene(col, row);
                let id = grid.spawn(rng.color(), x, y);
                grid.set(col, row, Some(id));
            }
        }

        let loaded = rng.color();
        let next = rng.color();
        Self {
            grid,
            loaded: Some(loaded),
            next,
            flight: None,
            aim: 0.0,
            removal: None,
            pop_delay: Duration::from_millis(config.pop_delay_ms),
            score: 0,
            popped: 0,
            injections: 0,
            game_over: false,
            pressure: 0,
            pressure_limit: pressure_limit_for(config.difficulty),
            last_pressure_tick: Instant::now(),
            rng,
            events: Vec::new(),
            popups: Vec::new(),
        }
    }

    /// Launcher muzzle in scene coordinates, below the grid.
    pub fn launcher_pos(&self) -> (f32, f32) {
        let x = self.grid.columns() as f32 * self.grid.tile_size() / 2.0;
        let y = self.grid.rows() as f32 * self.grid.row_height() + self.grid.tile_size();
        (x, y)
    }

    pub fn drain_events(&mut self) -> Vec<BubbleEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn pressure(&self) -> u32 {
        self.pressure
    }

    #[inline]
    pub fn pressure_limit(&self) -> u32 {
        self.pressure_limit
    }

    #[inline]
    pub fn removal_active(&self) -> bool {
        self.removal.is_some()
    }

    /// The cascade tile whose cell is already cleared but whose pop has not
    /// fired yet; still drawn for the remainder of the delay window.
    pub fn scheduled_visual(&self) -> Option<(f32, f32, BubbleColor)> {
        self.removal.as_ref().map(|rem| {
            let tile = self.grid.tile(rem.scheduled);
            (tile.x, tile.y, tile.color)
        })
    }

    pub fn aim_left(&mut self) {
        if !self.game_over {
            self.aim = (self.aim - AIM_STEP).max(-AIM_LIMIT);
        }
    }

    pub fn aim_right(&mut self) {
        if !self.game_over {
            self.aim = (self.aim + AIM_STEP).min(AIM_LIMIT);
        }
    }

    /// Exchange launcher and on-deck colours.
    pub fn swap(&mut self) {
        if self.game_over {
            return;
        }
        if let Some(loaded) = self.loaded {
            self.loaded = Some(self.next);
            self.next = loaded;
        }
    }

    /// Fire the loaded bubble along the current aim. One shot in the air at a
    /// time, and never while a cascade is draining the grid.
    pub fn shoot(&mut self) {
        if self.game_over || self.flight.is_some() || self.removal.is_some() {
            return;
        }
        let Some(color) = self.loaded.take() else { return };
        let (x, y) = self.launcher_pos();
        let speed = SHOT_SPEED_TILES * self.grid.tile_size();
        self.flight = Some(Flight {
            color,
            x,
            y,
            vx: self.aim.sin() * speed,
            vy: -self.aim.cos() * speed,
        });
    }

    /// Advance one frame: flight, cascade deadlines, pressure clock, reload.
    pub fn tick(&mut self, now: Instant, dt: f32) {
        if self.game_over {
            return;
        }
        self.tick_flight(now, dt);
        self.tick_removal(now, dt);
        self.tick_pressure(now);
        if self.loaded.is_none() && self.flight.is_none() {
            self.loaded = Some(self.next);
            self.next = self.rng.color();
        }
    }

    /// Push all internal deadlines forward after a pause, so suspended time
    /// doesn't land as a burst of catch-up ticks on resume.
    pub fn shift_clock(&mut self, by: Duration) {
        self.last_pressure_tick += by;
        if let Some(rem) = &mut self.removal {
            rem.fire_at += by;
        }
    }

    /// Age and cull score popups.
    pub fn tick_popups(&mut self, delta_ms: u32) {
        self.popups.retain_mut(|p| {
            p.age_ms += delta_ms;
            p.age_ms < 1200
        });
    }

    fn tick_flight(&mut self, now: Instant, dt: f32) {
        let Some(mut f) = self.flight else { return };
        let ts = self.grid.tile_size();
        let half = ts / 2.0;
        let right = self.grid.columns() as f32 * ts - half;
        let speed = (f.vx * f.vx + f.vy * f.vy).sqrt();
        // Substep so a fast shot can't tunnel through a bubble in one frame.
        let substeps = ((speed * dt / (ts * 0.25)).ceil() as usize).max(1);
        let sdt = dt / substeps as f32;
        for _ in 0..substeps {
            f.x += f.vx * sdt;
            f.y += f.vy * sdt;
            if f.x < half {
                f.x = 2.0 * half - f.x;
                f.vx = -f.vx;
            } else if f.x > right {
                f.x = 2.0 * right - f.x;
                f.vx = -f.vx;
            }
            if f.y <= half || self.scan_hit(f.x, f.y) {
                self.flight = None;
                self.land(f.color, f.x, f.y, now);
                return;
            }
        }
        self.flight = Some(f);
    }

    /// True when a position is within sticking range of a resident bubble.
    fn scan_hit(&self, x: f32, y: f32) -> bool {
        let ts = self.grid.tile_size();
        let range = ts * COLLIDE_RANGE;
        let (col, row) = self.grid.to_grid(x, y);
        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                let nc = col as i32 + dc;
                let nr = row as i32 + dr;
                if nc < 0
                    || nc as usize >= self.grid.columns()
                    || nr < 0
                    || nr as usize >= self.grid.rows()
                {
                    continue;
                }
                if let Some(id) = self.grid.get(nc as usize, nr as usize) {
                    let tile = self.grid.tile(id);
                    let (dx, dy) = (tile.x - x, tile.y - y);
                    if dx * dx + dy * dy < range * range {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Dotted aim trajectory from the launcher, with wall reflections, up to
    /// the first position the shot would stick at.
    pub fn trace_guide(&self) -> Vec<(f32, f32)> {
        if self.loaded.is_none() || self.game_over {
            return Vec::new();
        }
        let ts = self.grid.tile_size();
        let half = ts / 2.0;
        let right = self.grid.columns() as f32 * ts - half;
        let step = ts * 0.3;
        let (mut x, mut y) = self.launcher_pos();
        let mut dx = self.aim.sin() * step;
        let dy = -self.aim.cos() * step;
        let mut points = Vec::new();
        for _ in 0..160 {
            x += dx;
            y += dy;
            if x < half {
                x = 2.0 * half - x;
                dx = -dx;
            } else if x > right {
                x = 2.0 * right - x;
                dx = -dx;
            }
            if y <= half || self.scan_hit(x, y) {
                break;
            }
            points.push((x, y));
        }
        points
    }

    /// A shot touched the grid at (x, y): snap it to its cell, record it, and
    /// resolve the landing (match, quiet stick, or loss).
    pub fn land(&mut self, color: BubbleColor, x: f32, y: f32, now: Instant) {
        if self.game_over {
            return;
        }
        let (col, row) = {
            let (c, r) = self.grid.to_grid(x, y);
            (c, r.min(self.grid.rows() - 1))
        };
        let (col, row) = self.settle_cell(col, row);
        let (sx, sy) = self.grid.to_scene(col, row);
        let id = self.grid.spawn(color, sx, sy);
        self.grid.set(col, row, Some(id));
        self.events.push(BubbleEvent::Snapped { col, row });

        let cluster = self.grid.find_connected(col, row, true, true, false);
        if cluster.len() >= MATCH_MIN {
            let count = cluster.len();
            self.pressure = self.pressure.saturating_sub(count as u32);
            self.events.push(BubbleEvent::MatchResolved { count });
            self.popups.push(ScorePopup {
                x: sx,
                y: sy,
                amount: count as u32,
                age_ms: 0,
            });
            self.begin_removal(cluster, RemovalPhase::Matched, now);
        } else if row >= self.grid.rows() - 1 {
            self.end_game();
        } else {
            self.events.push(BubbleEvent::NoMatch);
            self.raise_pressure();
        }
    }

    /// The computed cell is normally empty; a shallow-angle stick can file
    /// into the cell of the bubble it touched, so fall back to the nearest
    /// empty neighbour.
    fn settle_cell(&self, col: usize, row: usize) -> (usize, usize) {
        if self.grid.get(col, row).is_none() {
            return (col, row);
        }
        for (nc, nr) in self.grid.neighbor_cells(col, row) {
            if nc < self.grid.usable_columns(nr) && self.grid.get(nc, nr).is_none() {
                return (nc, nr);
            }
        }
        debug_assert!(false, "no empty cell near ({col},{row})");
        (col, row)
    }

    /// Start a cascade: the whole cluster is retired up front, then tiles
    /// leave the grid one per pop delay. Each tile's cell is cleared when it
    /// is taken off the queue, strictly before its own pop fires.
    fn begin_removal(&mut self, cluster: Vec<TileId>, phase: RemovalPhase, now: Instant) {
        if cluster.is_empty() {
            return;
        }
        debug_assert!(self.removal.is_none(), "cascade already running");
        for &id in &cluster {
            self.grid.retire(id);
        }
        let mut pending: VecDeque<TileId> = cluster.into();
        let first = pending.pop_front().expect("cluster checked non-empty");
        self.clear_cell_of(first);
        if phase == RemovalPhase::Floating {
            self.emit_fell(first);
        }
        self.removal = Some(Removal {
            phase,
            pending,
            scheduled: first,
            fire_at: now + self.pop_delay,
        });
    }

    fn tick_removal(&mut self, now: Instant, dt: f32) {
        // The tile awaiting its pop falls visibly during a floating cascade.
        if let Some(rem) = &self.removal {
            if rem.phase == RemovalPhase::Floating {
                let id = rem.scheduled;
                self.grid.tile_mut(id).y += FALL_SPEED_TILES * self.grid.tile_size() * dt;
            }
        }

        loop {
            let Some(rem) = &self.removal else { break };
            if now < rem.fire_at {
                break;
            }
            let fired_at = rem.fire_at;
            let phase = rem.phase;
            let id = rem.scheduled;

            let (x, y, color) = {
                let tile = self.grid.tile(id);
                (tile.x, tile.y, tile.color)
            };
            self.events.push(BubbleEvent::Popped { x, y, color });
            self.score += 1;
            self.popped += 1;
            self.grid.recycle(id);

            let next = self
                .removal
                .as_mut()
                .expect("checked above")
                .pending
                .pop_front();
            match next {
                Some(next_id) => {
                    self.clear_cell_of(next_id);
                    if phase == RemovalPhase::Floating {
                        self.emit_fell(next_id);
                    }
                    let rem = self.removal.as_mut().expect("checked above");
                    rem.scheduled = next_id;
                    rem.fire_at = fired_at + self.pop_delay;
                }
                None => {
                    self.removal = None;
                    if phase == RemovalPhase::Matched {
                        // A finished match can leave unsupported bubbles;
                        // those cascade once, without re-triggering.
                        let floating = self.grid.find_floating();
                        if !floating.is_empty() {
                            self.begin_removal(floating, RemovalPhase::Floating, fired_at);
                        }
                    }
                }
            }
        }
    }

    /// Clear the grid cell a queued tile still occupies.
    fn clear_cell_of(&mut self, id: TileId) {
        let tile = self.grid.tile(id);
        let (col, row) = self.grid.to_grid(tile.x, tile.y);
        debug_assert_eq!(self.grid.get(col, row), Some(id), "cell/tile desync");
        self.grid.set(col, row, None);
    }

    fn emit_fell(&mut self, id: TileId) {
        let tile = self.grid.tile(id);
        let (x, y, color) = (tile.x, tile.y, tile.color);
        self.events.push(BubbleEvent::Fell { x, y, color });
    }

    fn tick_pressure(&mut self, now: Instant) {
        while now.duration_since(self.last_pressure_tick) >= PRESSURE_TICK {
            self.last_pressure_tick += PRESSURE_TICK;
            self.raise_pressure();
            if self.game_over {
                return;
            }
        }
    }

    /// Bump the pressure counter; past the limit, the ceiling advances.
    fn raise_pressure(&mut self) {
        self.pressure += 1;
        if self.pressure > self.pressure_limit {
            self.pressure = 0;
            self.inject_row();
        }
    }

    /// Push a fresh row in at the ceiling: everything shifts down a row, the
    /// parity flag flips, row 0 refills. A shot in the air is forfeit.
    fn inject_row(&mut self) {
        if let Some(f) = self.flight.take() {
            self.events.push(BubbleEvent::Popped {
                x: f.x,
                y: f.y,
                color: f.color,
            });
            self.score += 1;
            self.popped += 1;
        }
        if self.grid.bottom_row_occupied() {
            self.end_game();
            return;
        }
        self.grid.shift_down();
        self.injections += 1;
        for col in 0..self.grid.usable_columns(0) {
            let (x, y) = self.grid.to_scene(col, 0);
            let color = self.rng.color();
            let id = self.grid.spawn(color, x, y);
            self.grid.set(col, 0, Some(id));
        }
        if self.grid.bottom_row_occupied() {
            self.end_game();
        }
    }

    fn end_game(&mut self) {
        self.game_over = true;
        self.events.push(BubbleEvent::GameOver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Difficulty, GameConfig};

    fn config() -> GameConfig {
        GameConfig {
            difficulty: Difficulty::Easy,
            seed: 7,
            pop_delay_ms: 100,
            no_guide: false,
        }
    }

    /// Fresh state with the starting band cleared out.
    fn empty_state() -> GameState {
        let mut state = GameState::new(8, 14, &config());
        for row in 0..state.grid.rows() {
            for col in 0..state.grid.columns() {
                if let Some(id) = state.grid.get(col, row) {
                    state.grid.set(col, row, None);
                    state.grid.recycle(id);
                }
            }
        }
        state.drain_events();
        state
    }

    fn place(state: &mut GameState, col: usize, row: usize, color: BubbleColor) {
        let (x, y) = state.grid.to_scene(col, row);
        let id = state.grid.spawn(color, x, y);
        state.grid.set(col, row, Some(id));
    }

    fn land_at(state: &mut GameState, col: usize, row: usize, color: BubbleColor, now: Instant) {
        let (x, y) = state.grid.to_scene(col, row);
        state.land(color, x, y, now);
    }

    fn popped_count(events: &[BubbleEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, BubbleEvent::Popped { .. }))
            .count()
    }

    #[test]
    fn landing_a_pair_is_not_a_match() {
        let mut state = empty_state();
        let now = Instant::now();
        place(&mut state, 0, 0, BubbleColor::Red);
        land_at(&mut state, 1, 0, BubbleColor::Red, now);

        let events = state.drain_events();
        assert!(events.contains(&BubbleEvent::NoMatch));
        assert!(!state.removal_active());
        assert_eq!(state.grid.occupied_count(), 2);
    }

    #[test]
    fn landing_a_triple_starts_a_cascade() {
        let mut state = empty_state();
        let now = Instant::now();
        place(&mut state, 0, 0, BubbleColor::Red);
        place(&mut state, 1, 0, BubbleColor::Red);
        land_at(&mut state, 2, 0, BubbleColor::Red, now);

        let events = state.drain_events();
        assert!(events.contains(&BubbleEvent::MatchResolved { count: 3 }));
        assert!(state.removal_active());
    }

    #[test]
    fn removal_is_paced_one_cell_per_delay() {
        let mut state = empty_state();
        let now = Instant::now();
        place(&mut state, 0, 0, BubbleColor::Blue);
        place(&mut state, 1, 0, BubbleColor::Blue);
        land_at(&mut state, 2, 0, BubbleColor::Blue, now);
        state.drain_events();

        // Cell of the first queued tile clears immediately, before any pop.
        assert_eq!(state.grid.occupied_count(), 2);

        let mut expected_left = 2usize;
        for step in 1..=3u64 {
            state.tick(now + Duration::from_millis(100 * step), 0.0);
            let events = state.drain_events();
            assert_eq!(popped_count(&events), 1, "one pop per delay step");
            // Each pop uncovers the next queued tile's cleared cell.
            expected_left = expected_left.saturating_sub(1);
            assert_eq!(state.grid.occupied_count(), expected_left);
        }
        assert!(!state.removal_active());
        assert_eq!(state.score, 3);
    }

    #[test]
    fn match_cascades_into_floating_removal() {
        let mut state = empty_state();
        let now = Instant::now();
        // Anchor at the ceiling, a blue pair, and a red hanging off the pair.
        place(&mut state, 3, 0, BubbleColor::Green);
        place(&mut state, 2, 1, BubbleColor::Blue);
        place(&mut state, 3, 1, BubbleColor::Blue);
        place(&mut state, 3, 2, BubbleColor::Red);

        land_at(&mut state, 4, 1, BubbleColor::Blue, now);
        assert!(
            state
                .drain_events()
                .contains(&BubbleEvent::MatchResolved { count: 3 })
        );

        let mut fell = 0;
        let mut popped = 0;
        for step in 1..=5u64 {
            state.tick(now + Duration::from_millis(100 * step), 0.0);
            for event in state.drain_events() {
                match event {
                    BubbleEvent::Fell { color, .. } => {
                        assert_eq!(color, BubbleColor::Red);
                        fell += 1;
                    }
                    BubbleEvent::Popped { .. } => popped += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(fell, 1, "only the detached red falls");
        assert_eq!(popped, 4, "three matched plus one floating");
        assert!(!state.removal_active());
        // The anchored green survives.
        assert_eq!(state.grid.occupied_count(), 1);
        assert!(state.grid.get(3, 0).is_some());
    }

    #[test]
    fn quiet_landing_on_the_loss_row_ends_the_game() {
        let mut state = empty_state();
        let now = Instant::now();
        let loss_row = state.grid.rows() - 1;
        land_at(&mut state, 0, loss_row, BubbleColor::Cyan, now);

        assert!(state.game_over);
        assert!(state.drain_events().contains(&BubbleEvent::GameOver));

        // Terminal: further landings are rejected outright.
        land_at(&mut state, 1, loss_row, BubbleColor::Cyan, now);
        assert!(state.drain_events().is_empty());
        assert_eq!(state.grid.occupied_count(), 1);
    }

    #[test]
    fn quiet_landing_one_row_above_the_boundary_does_not_end_the_game() {
        let mut state = empty_state();
        let now = Instant::now();
        let row = state.grid.rows() - 2;
        land_at(&mut state, 0, row, BubbleColor::Cyan, now);

        let events = state.drain_events();
        assert!(!state.game_over);
        assert!(events.contains(&BubbleEvent::NoMatch));
    }

    #[test]
    fn no_match_landing_raises_pressure_and_match_relieves_it() {
        let mut state = empty_state();
        let now = Instant::now();
        place(&mut state, 0, 0, BubbleColor::Red);
        land_at(&mut state, 4, 0, BubbleColor::Yellow, now);
        assert_eq!(state.pressure(), 1);

        place(&mut state, 1, 0, BubbleColor::Red);
        land_at(&mut state, 2, 0, BubbleColor::Red, now);
        assert_eq!(state.pressure(), 0, "match of 3 drains below zero, floored");
    }

    #[test]
    fn pressure_past_the_limit_injects_a_ceiling_row() {
        let mut state = empty_state();
        place(&mut state, 0, 0, BubbleColor::Red);
        assert!(!state.grid.is_offset_row(0));

        for _ in 0..=state.pressure_limit() {
            state.raise_pressure();
        }

        assert_eq!(state.injections, 1);
        assert_eq!(state.pressure(), 0);
        // Parity flipped: the fresh ceiling row is the short one.
        assert!(state.grid.is_offset_row(0));
        assert_eq!(state.grid.usable_columns(0), state.grid.columns() - 1);
        // The old ceiling tile moved down with its row.
        assert!(state.grid.get(0, 1).is_some());
        let filled = (0..state.grid.columns())
            .filter(|&c| state.grid.get(c, 0).is_some())
            .count();
        assert_eq!(filled, state.grid.columns() - 1);
    }

    #[test]
    fn shifting_the_clock_defers_pending_pops() {
        let mut state = empty_state();
        let now = Instant::now();
        place(&mut state, 0, 0, BubbleColor::Red);
        place(&mut state, 1, 0, BubbleColor::Red);
        land_at(&mut state, 2, 0, BubbleColor::Red, now);
        state.drain_events();

        // A pause of half a second pushes the first pop out accordingly.
        state.shift_clock(Duration::from_millis(500));
        state.tick(now + Duration::from_millis(100), 0.0);
        assert_eq!(popped_count(&state.drain_events()), 0);
        state.tick(now + Duration::from_millis(600), 0.0);
        assert_eq!(popped_count(&state.drain_events()), 1);
    }

    #[test]
    fn swap_exchanges_loaded_and_next() {
        let mut state = empty_state();
        let loaded = state.loaded.unwrap();
        let next = state.next;
        state.swap();
        assert_eq!(state.loaded, Some(next));
        assert_eq!(state.next, loaded);
    }

    #[test]
    fn launcher_reloads_after_a_shot_resolves() {
        let mut state = empty_state();
        let now = Instant::now();
        state.shoot();
        assert!(state.loaded.is_none());
        assert!(state.flight.is_some());

        // Straight up over an empty grid: the shot reaches the ceiling within
        // a couple of simulated seconds.
        let mut t = now;
        for _ in 0..200 {
            t += Duration::from_millis(16);
            state.tick(t, 0.016);
            if state.flight.is_none() {
                break;
            }
        }
        assert!(state.flight.is_none(), "shot never landed");
        assert!(state.loaded.is_some(), "launcher reloaded");
        let events = state.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, BubbleEvent::Snapped { row: 0, .. }))
        );
    }
}
