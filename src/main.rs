//! Bubbletui — bubble-shooter puzzle game in the terminal.

mod app;
mod game;
mod grid;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (difficulty, rng seed, pop pacing).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub seed: u32,
    pub pop_delay_ms: u64,
    pub no_guide: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let seed = args.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0x5EED)
    });
    let config = GameConfig {
        difficulty: args.difficulty,
        seed,
        pop_delay_ms: args.pop_delay_ms,
        no_guide: args.no_guide,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Bubble-shooter puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "bubbletui",
    version,
    about = "Bubble-shooter puzzle in the terminal. Pop groups of 3+ same-colour bubbles before the ceiling pushes the field into the floor.",
    long_about = "Bubbletui is a terminal bubble shooter on a hex-packed grid.\n\n\
        Aim, shoot, and stick bubbles to the field. Landing a bubble in a connected \
        same-colour group of 3 or more pops the group, and anything left hanging \
        without a path to the ceiling falls. Misses feed the pressure gauge; when it \
        fills, a new row pushes in at the ceiling. Bubbles reaching the bottom row end \
        the game.\n\n\
        CONTROLS (normal):\n  Left/Right  Aim    Up/Space/Enter  Shoot    Down/Tab  Swap\n  P           Pause  Q / Esc         Quit\n\n\
        CONTROLS (vim):\n  h/l         Aim    k               Shoot    j / f     Swap\n  p           Pause  q               Quit\n\n\
        Hold an aim key to keep turning. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Difficulty: easy, medium, or hard. Sets how fast ceiling rows push in.
    #[arg(short, long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Grid width in columns (offset rows get one less).
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub width: u16,

    /// Grid height in rows; the bottom row is the loss line.
    #[arg(long, default_value = "14", value_name = "ROWS")]
    pub height: u16,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Hide the dotted aim guide.
    #[arg(long)]
    pub no_guide: bool,

    /// Delay in ms between successive bubble pops in a cascade.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub pop_delay_ms: u64,

    /// Seed for bubble colours (random if not set). Useful for practice runs.
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}
