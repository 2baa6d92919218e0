//! Options - The engine's configuration schema
//!
//! `Options::validate` checks parsed groups against the schema and
//! loads any tilesets they name, without touching live state. Only when
//! every group is valid does the session apply the resulting `Update`,
//! so a failed `set` leaves the engine exactly as it was.

use log::{debug, LevelFilter};

use crate::core::Size;
use crate::error::{EngineError, Result};
use crate::font::{parse_base_code, FontManager, PendingTileset};
use crate::input::InputFilter;
use crate::text::Encoding;

use super::parser::OptionGroup;

/// Largest composed frame, in pixels
pub const MAX_FRAME_PIXELS: i64 = 4096 * 4096;

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Stage size in cells
    pub window_size: Size,
    /// Forced cell size; `None` follows the base tileset
    pub window_cellsize: Option<Size>,
    pub window_title: String,
    pub window_resizeable: bool,
    pub input_filter: InputFilter,
    pub input_precise_mouse: bool,
    pub input_sticky_close: bool,
    /// Code drawn at the `read_str` cursor
    pub input_cursor_symbol: u32,
    pub log_level: LevelFilter,
    pub terminal_encoding: Encoding,
    pub terminal_encoding_affects_put: bool,
    pub output_postformatting: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            window_size: Size::new(80, 25),
            window_cellsize: None,
            window_title: "cellterm".to_string(),
            window_resizeable: false,
            input_filter: InputFilter::default(),
            input_precise_mouse: false,
            input_sticky_close: true,
            input_cursor_symbol: '_' as u32,
            log_level: LevelFilter::Info,
            terminal_encoding: Encoding::Utf8,
            terminal_encoding_affects_put: false,
            output_postformatting: true,
        }
    }
}

/// A validated change, ready to apply
pub struct Update {
    pub options: Options,
    pub tilesets: Vec<PendingTileset>,
    /// `log.level` was given explicitly
    pub log_level_changed: bool,
}

impl Update {
    /// Whether any tileset changes
    pub fn touches_fonts(&self) -> bool {
        !self.tilesets.is_empty()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(EngineError::config(format!("{} value '{}' is not a boolean", key, value))),
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    let level = match value.trim().to_ascii_lowercase().as_str() {
        "none" | "off" => LevelFilter::Off,
        "fatal" | "error" => LevelFilter::Error,
        "warning" | "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => return None,
    };
    Some(level)
}

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "none",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warning",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

/// A single character, or a code written `0x..`, `U+..` or in decimal
fn parse_symbol(value: &str) -> Option<u32> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c as u32),
        _ => parse_base_code(value).filter(|_| value.trim() != "font"),
    }
}

fn unknown(group: &str, attribute: &str) -> EngineError {
    EngineError::config(format!("unknown option '{}.{}'", group, attribute))
}

impl Options {
    /// Check `groups` and compute the configuration they would produce
    pub fn validate(&self, groups: &[OptionGroup], fonts: &FontManager) -> Result<Update> {
        let mut next = self.clone();
        let mut tilesets = Vec::new();
        let mut log_level_changed = false;

        for group in groups {
            debug!("Validating option group '{}' ({} attributes)", group.name, group.attributes.len());
            match group.name.as_str() {
                "window" => next.validate_window(group)?,
                "input" => next.validate_input(group)?,
                "terminal" => next.validate_terminal(group)?,
                "output" => {
                    for (key, value) in &group.attributes {
                        match key.as_str() {
                            "postformatting" => {
                                next.output_postformatting = parse_bool("output.postformatting", value)?
                            }
                            _ => return Err(unknown("output", key)),
                        }
                    }
                }
                "log" => {
                    for (key, value) in &group.attributes {
                        match key.as_str() {
                            "level" => {
                                next.log_level = parse_level(value).ok_or_else(|| {
                                    EngineError::config(format!("log.level value '{}' is invalid", value))
                                })?;
                                log_level_changed = true;
                            }
                            _ => return Err(unknown("log", key)),
                        }
                    }
                }
                name => {
                    let base = parse_base_code(name)
                        .ok_or_else(|| EngineError::config(format!("unknown option group '{}'", name)))?;
                    tilesets.push(fonts.prepare(base, &group.attributes)?);
                }
            }
        }

        let cell = next.window_cellsize.unwrap_or_else(|| {
            tilesets
                .iter()
                .rev()
                .find_map(|t| t.base_cell_size())
                .unwrap_or_else(|| fonts.base_cell_size())
        });
        let frame_w = next.window_size.width as i64 * cell.width as i64;
        let frame_h = next.window_size.height as i64 * cell.height as i64;
        if frame_w * frame_h > MAX_FRAME_PIXELS {
            return Err(EngineError::config(format!(
                "window of {} cells at {} pixels each is too large ({}x{} pixels)",
                next.window_size, cell, frame_w, frame_h
            )));
        }

        Ok(Update {
            options: next,
            tilesets,
            log_level_changed,
        })
    }

    fn validate_window(&mut self, group: &OptionGroup) -> Result<()> {
        for (key, value) in &group.attributes {
            match key.as_str() {
                "size" => {
                    let size = Size::parse(value).ok_or_else(|| {
                        EngineError::config(format!("window.size value '{}' cannot be parsed", value))
                    })?;
                    if !(1..=255).contains(&size.width) || !(1..=255).contains(&size.height) {
                        return Err(EngineError::config(format!("window.size value '{}' is out of range", value)));
                    }
                    self.window_size = size;
                }
                "cellsize" => {
                    if value.trim().eq_ignore_ascii_case("auto") {
                        self.window_cellsize = None;
                        continue;
                    }
                    let size = Size::parse(value).ok_or_else(|| {
                        EngineError::config(format!("window.cellsize value '{}' cannot be parsed", value))
                    })?;
                    if !(1..=64).contains(&size.width) || !(1..=64).contains(&size.height) {
                        return Err(EngineError::config(format!(
                            "window.cellsize value '{}' is out of range",
                            value
                        )));
                    }
                    self.window_cellsize = Some(size);
                }
                "title" => self.window_title = value.clone(),
                "resizeable" | "resizable" => self.window_resizeable = parse_bool("window.resizeable", value)?,
                _ => return Err(unknown("window", key)),
            }
        }
        Ok(())
    }

    fn validate_input(&mut self, group: &OptionGroup) -> Result<()> {
        for (key, value) in &group.attributes {
            match key.as_str() {
                "filter" => self.input_filter = InputFilter::parse(value)?,
                "precise-mouse" => self.input_precise_mouse = parse_bool("input.precise-mouse", value)?,
                "sticky-close" => self.input_sticky_close = parse_bool("input.sticky-close", value)?,
                "cursor-symbol" => {
                    self.input_cursor_symbol = parse_symbol(value).ok_or_else(|| {
                        EngineError::config(format!("input.cursor-symbol value '{}' is invalid", value))
                    })?
                }
                _ => return Err(unknown("input", key)),
            }
        }
        Ok(())
    }

    fn validate_terminal(&mut self, group: &OptionGroup) -> Result<()> {
        for (key, value) in &group.attributes {
            match key.as_str() {
                "encoding" => {
                    self.terminal_encoding = Encoding::from_name(value).ok_or_else(|| {
                        EngineError::config(format!("terminal.encoding '{}' is not supported", value))
                    })?
                }
                "encoding-affects-put" => {
                    self.terminal_encoding_affects_put = parse_bool("terminal.encoding-affects-put", value)?
                }
                _ => return Err(unknown("terminal", key)),
            }
        }
        Ok(())
    }

    /// Current value of `key` as a string, `None` when it has none
    pub fn get(&self, key: &str, fonts: &FontManager) -> Option<String> {
        let value = match key.trim() {
            "window.size" => self.window_size.to_string(),
            "window.cellsize" => self
                .window_cellsize
                .map(|s| s.to_string())
                .unwrap_or_else(|| "auto".to_string()),
            "window.title" => self.window_title.clone(),
            "window.resizeable" => self.window_resizeable.to_string(),
            "input.filter" => self.input_filter.to_string(),
            "input.precise-mouse" => self.input_precise_mouse.to_string(),
            "input.sticky-close" => self.input_sticky_close.to_string(),
            "input.cursor-symbol" => char::from_u32(self.input_cursor_symbol)?.to_string(),
            "log.level" => level_name(self.log_level).to_string(),
            "terminal.encoding" => self.terminal_encoding.name().to_string(),
            "terminal.encoding-affects-put" => self.terminal_encoding_affects_put.to_string(),
            "output.postformatting" => self.output_postformatting.to_string(),
            other => {
                let (group, attribute) = other.rsplit_once('.')?;
                return fonts.attribute(parse_base_code(group)?, attribute);
            }
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_options;
    use pretty_assertions::assert_eq;

    fn validate(options: &Options, s: &str) -> Result<Update> {
        let fonts = FontManager::new();
        options.validate(&parse_options(s)?, &fonts)
    }

    #[test]
    fn test_window_size_round_trip() {
        let fonts = FontManager::new();
        let update = validate(&Options::default(), "window.size=100x30").unwrap();
        assert_eq!(update.options.window_size, Size::new(100, 30));
        assert_eq!(update.options.get("window.size", &fonts).as_deref(), Some("100x30"));
    }

    #[test]
    fn test_window_size_rejected() {
        for bad in ["window.size=abc", "window.size=0x10", "window.size=256x10"] {
            assert!(matches!(validate(&Options::default(), bad), Err(EngineError::Config(_))), "{}", bad);
        }
    }

    #[test]
    fn test_cellsize() {
        let update = validate(&Options::default(), "window.cellsize=10x20").unwrap();
        assert_eq!(update.options.window_cellsize, Some(Size::new(10, 20)));
        let update = validate(&update.options, "window.cellsize=auto").unwrap();
        assert_eq!(update.options.window_cellsize, None);
        assert!(validate(&Options::default(), "window.cellsize=65x8").is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(validate(&Options::default(), "window.foo=1").is_err());
        assert!(validate(&Options::default(), "bogus.size=1").is_err());
        assert!(validate(&Options::default(), "input.precise-mouse=maybe").is_err());
    }

    #[test]
    fn test_input_options() {
        let fonts = FontManager::new();
        let update = validate(
            &Options::default(),
            "input: filter=[keyboard, mouse+], precise-mouse=true, sticky-close=false, cursor-symbol=0x2588",
        )
        .unwrap();
        let options = update.options;
        assert!(options.input_precise_mouse);
        assert!(!options.input_sticky_close);
        assert_eq!(options.input_cursor_symbol, 0x2588);
        assert_eq!(options.get("input.filter", &fonts).as_deref(), Some("keyboard, mouse+"));
    }

    #[test]
    fn test_terminal_and_output() {
        let update = validate(
            &Options::default(),
            "terminal.encoding=437; terminal.encoding-affects-put=true; output.postformatting=false",
        )
        .unwrap();
        assert_eq!(update.options.terminal_encoding, Encoding::Cp437);
        assert!(update.options.terminal_encoding_affects_put);
        assert!(!update.options.output_postformatting);
        assert!(validate(&Options::default(), "terminal.encoding=ebcdic").is_err());
    }

    #[test]
    fn test_log_level() {
        let update = validate(&Options::default(), "log.level=debug").unwrap();
        assert!(update.log_level_changed);
        assert_eq!(update.options.log_level, LevelFilter::Debug);
        assert!(validate(&Options::default(), "log.level=loud").is_err());
    }

    #[test]
    fn test_font_groups_prepare_tilesets() {
        let update = validate(&Options::default(), "font: dynamic, size=10x20; 0xE000: dynamic, size=8x8").unwrap();
        assert_eq!(update.tilesets.len(), 2);
        assert!(update.touches_fonts());
        assert!(matches!(
            validate(&Options::default(), "font: missing.png, size=8x8"),
            Err(EngineError::FontLoad(_))
        ));
    }

    #[test]
    fn test_get_font_attribute() {
        let fonts = FontManager::new();
        let options = Options::default();
        assert_eq!(options.get("font.name", &fonts).as_deref(), Some("default"));
        assert_eq!(options.get("window.cellsize", &fonts).as_deref(), Some("auto"));
        assert_eq!(options.get("nothing", &fonts), None);
    }

    #[test]
    fn test_frame_area_capped() {
        assert!(matches!(
            validate(&Options::default(), "window.size=255x255; window.cellsize=64x64"),
            Err(EngineError::Config(_))
        ));
        assert!(validate(&Options::default(), "window.size=255x255; window.cellsize=16x16").is_ok());
        let large = validate(&Options::default(), "window.size=255x255").unwrap();
        assert!(validate(&large.options, "font: dynamic, size=64x64").is_err());
    }
}
