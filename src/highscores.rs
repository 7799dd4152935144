//! Persist high scores to disk (XDG config or ~/.config/bubbletui).

use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const FILENAME: &str = "highscores";

/// High scores per difficulty: (easy, medium, hard).
pub type HighScores = (u32, u32, u32);

/// Returns the path to the high scores file (config dir / bubbletui / highscores).
fn config_path() -> Result<PathBuf> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    Ok(base.join("bubbletui").join(FILENAME))
}

/// Load high scores from disk. Returns zeros on missing or unparsable file.
pub fn load_high_scores() -> HighScores {
    let Ok(path) = config_path() else {
        return (0, 0, 0);
    };
    let Ok(content) = fs::read_to_string(path) else {
        return (0, 0, 0);
    };
    let mut scores = [0u32; 3];
    for (slot, line) in scores.iter_mut().zip(content.lines()) {
        *slot = line.trim().parse().unwrap_or(0);
    }
    (scores[0], scores[1], scores[2])
}

/// Save high scores to disk. Creates config directory if needed.
pub fn save_high_scores(easy: u32, medium: u32, hard: u32) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    writeln!(f, "{}", easy)?;
    writeln!(f, "{}", medium)?;
    writeln!(f, "{}", hard)?;
    Ok(())
}
