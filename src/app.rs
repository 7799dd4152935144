//! App: terminal init, main loop, tick and key handling.

use crate::game::{BubbleEvent, GameState};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, Difficulty, GameConfig, highscores};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before aiming starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated aim nudges while holding.
const REPEAT_INTERVAL_MS: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverChoice {
    Restart,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Difficulty,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_difficulty: Difficulty,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::Difficulty,
            selected_difficulty: Difficulty::Easy,
            animation_start: Instant::now(),
        }
    }
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    last_frame: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    /// Scene positions popped this frame; feeds the TachyonFX flash.
    pop_cells: Vec<(f32, f32)>,
    pop_effect: Option<Effect>,
    pop_effect_process_time: Option<Instant>,
    /// Set while the game is not ticking (pause, menus); used to shift the
    /// game clock past the suspended stretch on resume.
    halted_since: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
    game_over_choice: GameOverChoice,
    /// (easy, medium, hard), loaded once and persisted on game over.
    high_scores: highscores::HighScores,
    new_high_score: bool,
}

impl App {
    pub fn new(mut args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        // Keep the board sane regardless of what --width/--height asked for.
        args.width = args.width.clamp(4, 16);
        args.height = args.height.clamp(6, 30);
        let state = GameState::new(args.width, args.height, &config);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            args,
            config,
            theme,
            state,
            screen,
            paused: false,
            last_frame: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            pop_cells: Vec::new(),
            pop_effect: None,
            pop_effect_process_time: None,
            halted_since: None,
            menu_state: MenuState::default(),
            quit_selected: QuitOption::Resume,
            game_over_choice: GameOverChoice::Restart,
            high_scores: highscores::load_high_scores(),
            new_high_score: false,
        })
    }

    fn best_score(&self) -> u32 {
        match self.config.difficulty {
            Difficulty::Easy => self.high_scores.0,
            Difficulty::Medium => self.high_scores.1,
            Difficulty::Hard => self.high_scores.2,
        }
    }

    fn reset_game(&mut self) {
        // Scramble the seed so a restart deals a different board.
        self.config.seed = self
            .config
            .seed
            .wrapping_mul(747_796_405)
            .wrapping_add(2_891_336_453);
        self.state = GameState::new(self.args.width, self.args.height, &self.config);
        self.screen = Screen::Playing;
        self.paused = false;
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.pop_cells.clear();
        self.pop_effect = None;
        self.pop_effect_process_time = None;
        self.halted_since = None;
        self.new_high_score = false;
        self.last_frame = Instant::now();
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::AimLeft => self.state.aim_left(),
            Action::AimRight => self.state.aim_right(),
            Action::Shoot => {
                self.state.shoot();
                self.repeat_state = None;
            }
            Action::Swap => self.state.swap(),
            Action::Pause | Action::Quit | Action::None => {}
        }
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(action, Action::AimLeft | Action::AimRight) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    /// Drain game events: pop flashes, loss handling, high-score bookkeeping.
    fn consume_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                BubbleEvent::Popped { x, y, .. } => self.pop_cells.push((x, y)),
                BubbleEvent::GameOver => {
                    let score = self.state.score;
                    let slot = match self.config.difficulty {
                        Difficulty::Easy => &mut self.high_scores.0,
                        Difficulty::Medium => &mut self.high_scores.1,
                        Difficulty::Hard => &mut self.high_scores.2,
                    };
                    if score > *slot {
                        *slot = score;
                        self.new_high_score = true;
                        let (e, m, h) = self.high_scores;
                        let _ = highscores::save_high_scores(e, m, h);
                    }
                    self.game_over_choice = GameOverChoice::Restart;
                    self.screen = Screen::GameOver;
                }
                BubbleEvent::Snapped { .. }
                | BubbleEvent::Fell { .. }
                | BubbleEvent::MatchResolved { .. }
                | BubbleEvent::NoMatch => {}
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard for Release events
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let dt = now.duration_since(self.last_frame).as_secs_f32().min(0.1);
            self.last_frame = now;

            if self.screen == Screen::Playing && !self.paused {
                if let Some(halted_at) = self.halted_since.take() {
                    self.state.shift_clock(now.duration_since(halted_at));
                }
                self.tick_repeat();
                self.state.tick(now, dt);
                self.state.tick_popups((dt * 1000.0) as u32);
                self.consume_events();
            } else if self.halted_since.is_none() {
                self.halted_since = Some(now);
            }

            let best = self.best_score();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    f.area(),
                    &self.pop_cells,
                    &mut self.pop_effect,
                    &mut self.pop_effect_process_time,
                    &self.menu_state,
                    now,
                    self.config.no_guide,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                    (self.screen == Screen::GameOver).then_some(self.game_over_choice),
                    best,
                    self.new_high_score,
                )
            })?;
            self.pop_cells.clear();
            if self.pop_effect.as_ref().is_some_and(|e| e.done()) {
                self.pop_effect = None;
                self.pop_effect_process_time = None;
            }

            let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Ignore OS repeats; track Release to stop our own repeat.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        if self.handle_key(action)? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Handle one pressed action for the current screen. Returns true to exit.
    fn handle_key(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return Ok(true),
                Action::AimLeft => {
                    if self.menu_state.current_tab == MenuTab::Difficulty {
                        self.menu_state.selected_difficulty =
                            match self.menu_state.selected_difficulty {
                                Difficulty::Easy => Difficulty::Hard,
                                Difficulty::Medium => Difficulty::Easy,
                                Difficulty::Hard => Difficulty::Medium,
                            };
                    }
                }
                Action::AimRight => {
                    if self.menu_state.current_tab == MenuTab::Difficulty {
                        self.menu_state.selected_difficulty =
                            match self.menu_state.selected_difficulty {
                                Difficulty::Easy => Difficulty::Medium,
                                Difficulty::Medium => Difficulty::Hard,
                                Difficulty::Hard => Difficulty::Easy,
                            };
                    }
                }
                Action::Swap => {
                    self.menu_state.current_tab = match self.menu_state.current_tab {
                        MenuTab::Difficulty => MenuTab::Start,
                        MenuTab::Start => MenuTab::Difficulty,
                    };
                }
                Action::Shoot => {
                    if self.menu_state.current_tab == MenuTab::Start {
                        self.config.difficulty = self.menu_state.selected_difficulty;
                        self.reset_game();
                    } else {
                        self.menu_state.current_tab = MenuTab::Start;
                    }
                }
                _ => {}
            },
            Screen::Playing => {
                if self.paused {
                    match action {
                        Action::Pause => self.paused = false,
                        Action::Quit => {
                            self.screen = Screen::QuitMenu;
                            self.quit_selected = QuitOption::Resume;
                        }
                        _ => {}
                    }
                } else {
                    match action {
                        Action::Pause => self.paused = true,
                        Action::Quit => {
                            self.screen = Screen::QuitMenu;
                            self.quit_selected = QuitOption::Resume;
                        }
                        _ => {
                            self.apply_action(action);
                            if matches!(action, Action::AimLeft | Action::AimRight) {
                                self.repeat_state = Some((action, Instant::now()));
                                self.last_repeat_fire = None;
                            }
                        }
                    }
                }
            }
            Screen::QuitMenu => match action {
                Action::Swap | Action::AimRight => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::MainMenu,
                        QuitOption::MainMenu => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::AimLeft => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::MainMenu => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::MainMenu,
                    };
                }
                Action::Shoot => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::MainMenu => self.go_to_menu(),
                    QuitOption::Exit => return Ok(true),
                },
                Action::Pause | Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return Ok(true),
                Action::Swap | Action::AimRight => {
                    self.game_over_choice = match self.game_over_choice {
                        GameOverChoice::Restart => GameOverChoice::MainMenu,
                        GameOverChoice::MainMenu => GameOverChoice::Exit,
                        GameOverChoice::Exit => GameOverChoice::Restart,
                    };
                }
                Action::AimLeft => {
                    self.game_over_choice = match self.game_over_choice {
                        GameOverChoice::Restart => GameOverChoice::Exit,
                        GameOverChoice::MainMenu => GameOverChoice::Restart,
                        GameOverChoice::Exit => GameOverChoice::MainMenu,
                    };
                }
                Action::Shoot => match self.game_over_choice {
                    GameOverChoice::Restart => self.reset_game(),
                    GameOverChoice::MainMenu => self.go_to_menu(),
                    GameOverChoice::Exit => return Ok(true),
                },
                _ => {}
            },
        }
        Ok(false)
    }

    fn go_to_menu(&mut self) {
        self.screen = Screen::Menu;
        self.menu_state.animation_start = Instant::now();
        self.menu_state.current_tab = MenuTab::Difficulty;
        self.menu_state.selected_difficulty = self.config.difficulty;
    }
}
