//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Bubble palette and UI colours, defaulting to One Dark.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Bubble colours (index 0..=5): green, yellow, red, blue, magenta, cyan.
    pub bubble: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Grid border / dividers.
    pub div_line: Color,
    /// Text (score, sidebar).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (hints, inactive menu entries).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::one_dark()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults (hex values straight from onedark.theme).
    pub fn one_dark() -> Self {
        Self {
            bubble: [
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
                Color::Rgb(0xC6, 0x78, 0xDD), // magenta
                Color::Rgb(0x56, 0xB6, 0xC2), // cyan
            ],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"`. Falls back to
    /// One Dark when path is None or the file is missing. `palette` then
    /// selects the colour variant (normal, high-contrast, colorblind).
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::one_dark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override bubble colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.bubble = [
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                ];
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito-ish: distinguishable without red/green contrast.
                self.bubble = [
                    Color::Rgb(0x00, 0x99, 0x88), // teal
                    Color::Rgb(0xBB, 0xBB, 0x00), // yellow
                    Color::Rgb(0xCC, 0x33, 0x11), // red
                    Color::Rgb(0x00, 0x77, 0xBB), // blue
                    Color::Rgb(0xEE, 0x33, 0x77), // magenta
                    Color::Rgb(0xEE, 0x77, 0x33), // orange
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::one_dark();
        let get = |key: &str, fallback: Color| {
            map.get(key)
                .and_then(|v| parse_hex(v).ok())
                .unwrap_or(fallback)
        };
        Self {
            bubble: [
                get("mem_box", defaults.bubble[0]),
                get("cpu_mid", defaults.bubble[1]),
                get("cpu_end", defaults.bubble[2]),
                get("cpu_box", defaults.bubble[3]),
                get("net_box", defaults.bubble[4]),
                get("hi_fg", defaults.bubble[5]),
            ],
            bg: get("meter_bg", defaults.bg),
            div_line: get("div_line", defaults.div_line),
            main_fg: get("main_fg", defaults.main_fg),
            title: get("title", defaults.title),
            inactive_fg: get("inactive_fg", defaults.inactive_fg),
        }
    }

    /// Bubble colour for a palette index (0..6).
    #[inline]
    pub fn bubble_color(&self, index: u8) -> Color {
        self.bubble[(index as usize) % 6]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else { continue };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let raw = s.trim().trim_start_matches('#');
    let byte = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&raw[range], 16).map_err(|_| ThemeError::InvalidHex(raw.to_string()))
    };
    match raw.len() {
        6 => Ok(Color::Rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?)),
        3 => {
            let (r, g, b) = (byte(0..1)?, byte(1..2)?, byte(2..3)?);
            Ok(Color::Rgb(r * 17, g * 17, b * 17))
        }
        _ => Err(ThemeError::InvalidHex(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#98C3").is_err());
        assert!(parse_hex("#GGHHII").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_one_key() {
        let map = parse_theme_file(r##"theme[main_fg]="#FFFFFF""##);
        let theme = Theme::from_map(&map);
        assert!(matches!(theme.main_fg, Color::Rgb(255, 255, 255)));
        assert_eq!(theme.bg, Theme::one_dark().bg);
    }
}
