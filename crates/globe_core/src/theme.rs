//! Theme registry
//!
//! Themes are selected by name from the built-in `light`/`dark` pair plus
//! any number of custom themes. A custom theme is merged onto the full dark
//! theme, so the active theme is always complete. Custom themes can be
//! registered in code or loaded from RON files.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Serialize, Deserialize};

/// Name of the theme active at startup and used as the merge base
pub const DEFAULT_THEME: &str = "dark";

/// Linear RGBA color, each component in 0.0-1.0
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Opaque color from components
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Color from 8-bit channels
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Parse a CSS color: `#RGB`, `#RRGGBB`, `rgb(r, g, b)` or `rgba(r, g, b, a)`
    pub fn from_css(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::from_hex(hex);
        }

        let lower = text.to_ascii_lowercase();
        let (body, expects_alpha) = if let Some(body) = lower.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = lower.strip_prefix("rgb(") {
            (body, false)
        } else {
            return None;
        };
        let body = body.strip_suffix(')')?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if expects_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return None;
        }
        let channel = |s: &str| s.parse::<u8>().ok();
        let alpha = if expects_alpha { parts[3].parse::<f32>().ok()? } else { 1.0 };
        Some(Self::from_rgba8(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
        let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => Some(Self::from_rgba8(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 1.0)),
            6 => Some(Self::from_rgba8(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            _ => None,
        }
    }

    /// Color from hue/saturation/lightness, each in 0.0-1.0
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        if s <= 0.0 {
            return Self::rgb(l, l, l);
        }
        let h = h.rem_euclid(1.0);
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self::rgb(
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    }

    /// Same color with a different alpha
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise interpolation
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// As an `[r, g, b, a]` array
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// As 8-bit RGBA
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Role of a themed color
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorRole {
    Background,
    Globe,
    Marker,
    Line,
    Highlight,
    Text,
    Panel,
}

/// Theme colors as CSS strings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    pub background: String,
    #[serde(alias = "global")]
    pub globe: String,
    pub marker: String,
    pub line: String,
    pub highlight: String,
    pub text: String,
    pub panel: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            background: "#1A1A1A".to_string(),
            globe: "#2C3E50".to_string(),
            marker: "#FF5252".to_string(),
            line: "#4CAF50".to_string(),
            highlight: "#FFC107".to_string(),
            text: "#FFFFFF".to_string(),
            panel: "rgba(0, 0, 0, 0.8)".to_string(),
        }
    }
}

impl ThemeColors {
    /// (key, value) pairs in declaration order
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("background", &self.background),
            ("globe", &self.globe),
            ("marker", &self.marker),
            ("line", &self.line),
            ("highlight", &self.highlight),
            ("text", &self.text),
            ("panel", &self.panel),
        ]
    }

    fn get(&self, role: ColorRole) -> &str {
        match role {
            ColorRole::Background => &self.background,
            ColorRole::Globe => &self.globe,
            ColorRole::Marker => &self.marker,
            ColorRole::Line => &self.line,
            ColorRole::Highlight => &self.highlight,
            ColorRole::Text => &self.text,
            ColorRole::Panel => &self.panel,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeFonts {
    pub primary: String,
    pub secondary: String,
}

impl Default for ThemeFonts {
    fn default() -> Self {
        Self {
            primary: "Arial, sans-serif".to_string(),
            secondary: "Helvetica, sans-serif".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeAnimations {
    /// Globe rotation in radians per frame
    pub rotation_speed: f32,
    pub line_speed: f32,
    pub marker_pulse: bool,
    pub glow_intensity: f32,
}

impl Default for ThemeAnimations {
    fn default() -> Self {
        Self {
            rotation_speed: 0.001,
            line_speed: 1.0,
            marker_pulse: true,
            glow_intensity: 0.8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeSizes {
    pub marker_size: f32,
    pub line_width: f32,
    pub panel_width: String,
}

impl Default for ThemeSizes {
    fn default() -> Self {
        Self {
            marker_size: 0.5,
            line_width: 2.0,
            panel_width: "300px".to_string(),
        }
    }
}

/// A complete theme
///
/// Section defaults are the dark theme's values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
    pub fonts: ThemeFonts,
    pub animations: ThemeAnimations,
    pub sizes: ThemeSizes,
}

impl Theme {
    /// The built-in dark theme
    pub fn dark() -> Self {
        Self {
            name: "Dark Theme".to_string(),
            colors: ThemeColors::default(),
            fonts: ThemeFonts::default(),
            animations: ThemeAnimations::default(),
            sizes: ThemeSizes::default(),
        }
    }

    /// The built-in light theme
    pub fn light() -> Self {
        Self {
            name: "Light Theme".to_string(),
            colors: ThemeColors {
                background: "#FFFFFF".to_string(),
                globe: "#E8F4F8".to_string(),
                marker: "#FF4444".to_string(),
                line: "#2196F3".to_string(),
                highlight: "#FFA726".to_string(),
                text: "#333333".to_string(),
                panel: "rgba(255, 255, 255, 0.9)".to_string(),
            },
            animations: ThemeAnimations {
                glow_intensity: 0.5,
                ..ThemeAnimations::default()
            },
            ..Self::dark()
        }
    }

    /// Parsed color for a role
    ///
    /// Colors are checked when a theme is registered, so the black fallback
    /// is only reachable for themes built outside the registry.
    pub fn color(&self, role: ColorRole) -> Color {
        Color::from_css(self.colors.get(role)).unwrap_or(Color::BLACK)
    }

    /// Check that every color parses
    pub fn validate(&self) -> Result<(), ThemeError> {
        for (key, value) in self.colors.entries() {
            if Color::from_css(value).is_none() {
                return Err(ThemeError::InvalidColor {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A theme with any section omitted
///
/// Omitted sections, and omitted keys within a section, fall back to the
/// dark theme.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialTheme {
    pub name: Option<String>,
    pub colors: Option<ThemeColors>,
    pub fonts: Option<ThemeFonts>,
    pub animations: Option<ThemeAnimations>,
    pub sizes: Option<ThemeSizes>,
}

impl PartialTheme {
    /// Merge onto the dark theme, naming the result `name`
    pub fn into_theme(self, name: &str) -> Theme {
        let base = Theme::dark();
        Theme {
            name: name.to_string(),
            colors: self.colors.unwrap_or(base.colors),
            fonts: self.fonts.unwrap_or(base.fonts),
            animations: self.animations.unwrap_or(base.animations),
            sizes: self.sizes.unwrap_or(base.sizes),
        }
    }
}

/// Error from the theme registry
#[derive(Debug)]
pub enum ThemeError {
    /// No theme registered under this name
    Unknown(String),
    /// A color string could not be parsed
    InvalidColor { key: String, value: String },
    /// Theme file could not be read
    Io(io::Error),
    /// Theme file could not be parsed
    Parse(String),
    /// Theme file has no `name`
    MissingName,
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeError::Unknown(name) => write!(f, "Unknown theme: '{}'", name),
            ThemeError::InvalidColor { key, value } => {
                write!(f, "Invalid color for '{}': '{}'", key, value)
            }
            ThemeError::Io(err) => write!(f, "Theme IO error: {}", err),
            ThemeError::Parse(msg) => write!(f, "Theme parse error: {}", msg),
            ThemeError::MissingName => write!(f, "Theme file has no name"),
        }
    }
}

impl std::error::Error for ThemeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ThemeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ThemeError {
    fn from(err: io::Error) -> Self {
        ThemeError::Io(err)
    }
}

impl From<ron::error::SpannedError> for ThemeError {
    fn from(err: ron::error::SpannedError) -> Self {
        ThemeError::Parse(err.to_string())
    }
}

/// Named themes with one active selection
#[derive(Debug)]
pub struct ThemeRegistry {
    builtin: Vec<(String, Theme)>,
    custom: Vec<(String, Theme)>,
    current: String,
    revision: u64,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeRegistry {
    /// Registry with the built-in themes, `dark` active
    pub fn new() -> Self {
        Self {
            builtin: vec![
                ("light".to_string(), Theme::light()),
                ("dark".to_string(), Theme::dark()),
            ],
            custom: Vec::new(),
            current: DEFAULT_THEME.to_string(),
            revision: 0,
        }
    }

    /// Name of the active theme
    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// The active theme (always complete)
    pub fn current(&self) -> &Theme {
        self.get(&self.current)
            .unwrap_or_else(|| &self.builtin[1].1)
    }

    /// Look up a theme by name; custom themes shadow built-ins
    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.custom
            .iter()
            .chain(self.builtin.iter())
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Number of effective theme switches so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Built-in names followed by custom names, without duplicates
    pub fn available_themes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtin.iter().map(|(n, _)| n.clone()).collect();
        for (name, _) in &self.custom {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Register a custom theme merged onto the dark theme
    ///
    /// Re-adding an existing name replaces it. Replacing the active theme
    /// counts as a change.
    pub fn add_theme(&mut self, name: &str, theme: PartialTheme) -> Result<(), ThemeError> {
        let theme = theme.into_theme(name);
        theme.validate()?;

        match self.custom.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = theme,
            None => self.custom.push((name.to_string(), theme)),
        }
        if self.current == name {
            self.revision += 1;
        }
        log::debug!("Registered theme '{}'", name);
        Ok(())
    }

    /// Make `name` the active theme
    ///
    /// Returns `Ok(true)` if the active theme changed and `Ok(false)` if it
    /// was already active. Unknown names leave the active theme unchanged.
    pub fn switch_theme(&mut self, name: &str) -> Result<bool, ThemeError> {
        if self.get(name).is_none() {
            log::warn!("Ignoring switch to unknown theme '{}'", name);
            return Err(ThemeError::Unknown(name.to_string()));
        }
        if self.current == name {
            return Ok(false);
        }
        log::info!("Theme switched: '{}' -> '{}'", self.current, name);
        self.current = name.to_string();
        self.revision += 1;
        Ok(true)
    }

    /// Switch to the next theme in [`available_themes`](Self::available_themes) order
    pub fn cycle(&mut self) -> &str {
        let names = self.available_themes();
        let index = names.iter().position(|n| *n == self.current).unwrap_or(0);
        let next = &names[(index + 1) % names.len()];
        if self.current != *next {
            self.current = next.clone();
            self.revision += 1;
            log::info!("Theme cycled to '{}'", self.current);
        }
        &self.current
    }

    /// `--global-{key}` CSS custom properties for the active theme's colors
    pub fn css_variables(&self) -> Vec<(String, String)> {
        self.current()
            .colors
            .entries()
            .iter()
            .map(|(key, value)| (format!("--global-{}", key), value.to_string()))
            .collect()
    }

    /// Load a custom theme from a RON file
    ///
    /// The file must carry a `name`. Returns the registered name.
    pub fn load_theme_file(&mut self, path: impl AsRef<Path>) -> Result<String, ThemeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let partial: PartialTheme = ron::from_str(&content)?;
        let name = partial.name.clone().ok_or(ThemeError::MissingName)?;
        self.add_theme(&name, partial)?;
        log::info!("Loaded theme '{}' from {}", name, path.display());
        Ok(name)
    }
}
