//! Fonts and text measurement.
//!
//! Glyph rasterization belongs to the renderer. This module only knows the
//! glyph grid and per-character widths, which is enough to lay out text.
//!
//! Text may contain escapes: `~<` and `~>` open and close a highlighted run,
//! `~!` marks the next character as a hotkey and `~~` is a literal tilde.
//! Escapes take no horizontal space.

use std::collections::HashMap;

use super::ImageConfig;
use crate::data::{parse_int, DataProperty, DataSection};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::math::{PixelSize, Vec2i};
use crate::registry::{unknown_property, unknown_section, DataEntry, DataType};

/// A bitmap font.
#[derive(Debug, Clone, Default)]
pub struct Font {
    /// Glyph sheet; its frame size is the glyph cell.
    pub image: Option<ImageConfig>,
    /// Advance width per character. Missing characters use the cell width.
    pub char_widths: HashMap<char, i32>,
    /// Extra pixels between lines.
    pub line_spacing: i32,
}

impl Font {
    /// Glyph cell height.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.image.as_ref().map_or(0, |image| image.size.y)
    }

    /// Advance width of one character.
    #[must_use]
    pub fn char_width(&self, c: char) -> i32 {
        self.char_widths
            .get(&c)
            .copied()
            .unwrap_or_else(|| self.image.as_ref().map_or(0, |image| image.size.x))
    }

    /// Width of a single line of text, ignoring escapes.
    #[must_use]
    pub fn width(&self, text: &str) -> i32 {
        visible_chars(text).map(|c| self.char_width(c)).sum()
    }

    /// Bounding box of possibly multi-line text.
    #[must_use]
    pub fn measure(&self, text: &str) -> PixelSize {
        let mut width = 0;
        let mut lines = 0;
        for line in text.split('\n') {
            width = width.max(self.width(line));
            lines += 1;
        }
        Vec2i::new(width, lines * self.height() + (lines - 1) * self.line_spacing)
    }

    /// Character marked as hotkey with `~!`, if any.
    #[must_use]
    pub fn hotkey(text: &str) -> Option<char> {
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '~' {
                match chars.next() {
                    Some('!') => return chars.next(),
                    Some(_) | None => {}
                }
            }
        }
        None
    }

    /// Wrap text into lines no wider than `max_width`, breaking at spaces.
    ///
    /// A single word wider than the limit gets a line of its own.
    #[must_use]
    pub fn wrap(&self, text: &str, max_width: i32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split(' ') {
                let candidate = if line.is_empty() {
                    word.to_string()
                } else {
                    format!("{line} {word}")
                };
                if !line.is_empty() && self.width(&candidate) > max_width {
                    lines.push(std::mem::replace(&mut line, word.to_string()));
                } else {
                    line = candidate;
                }
            }
            lines.push(line);
        }
        lines
    }
}

/// Characters that take up space, with escapes stripped.
fn visible_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    let mut chars = text.chars();
    std::iter::from_fn(move || loop {
        let c = chars.next()?;
        if c != '~' {
            return Some(c);
        }
        match chars.next() {
            Some('~') => return Some('~'),
            Some('<' | '>' | '!') => {}
            // Unknown escape: drop the tilde, keep the character.
            Some(other) => return Some(other),
            None => return None,
        }
    })
}

impl DataEntry for Font {
    const TYPE_NAME: &'static str = "font";
    const DATABASE_FOLDER: &'static str = "fonts";

    fn new(_identifier: &str) -> Self {
        Self::default()
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        match property.key.as_str() {
            "line_spacing" => self.line_spacing = parse_int(&property.key, &property.value)?,
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn process_section(&mut self, section: &DataSection) -> Result<()> {
        match section.tag.as_str() {
            "image" => self.image = Some(ImageConfig::from_section(section)?),
            "char_widths" => {
                for property in &section.properties {
                    let mut chars = property.key.chars();
                    let (Some(c), None) = (chars.next(), chars.next()) else {
                        return Err(GameError::configuration(format!(
                            "Invalid font character: \"{}\"",
                            property.key
                        )));
                    };
                    self.char_widths
                        .insert(c, parse_int(&property.key, &property.value)?);
                }
            }
            _ => return Err(unknown_section::<Self>(section)),
        }
        Ok(())
    }

    fn check(&self, _database: &Database) -> Result<()> {
        if self.image.is_none() {
            return Err(GameError::Validation("Font has no image.".to_string()));
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.fonts
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.fonts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn font() -> Font {
        let mut font = Font::new("game");
        font.image = Some(ImageConfig {
            file: PathBuf::from("fonts/game.png"),
            size: Vec2i::new(8, 12),
        });
        font.char_widths.insert('i', 3);
        font.char_widths.insert(' ', 4);
        font.line_spacing = 2;
        font
    }

    #[test]
    fn test_width_uses_char_table_and_cell_fallback() {
        let font = font();
        assert_eq!(font.width("hi"), 8 + 3);
        assert_eq!(font.width(""), 0);
    }

    #[test]
    fn test_escapes_take_no_space() {
        let font = font();
        assert_eq!(font.width("~<hi~>"), font.width("hi"));
        assert_eq!(font.width("~!quit"), font.width("quit"));
        assert_eq!(font.width("a~~b"), 8 * 3);
    }

    #[test]
    fn test_hotkey() {
        assert_eq!(Font::hotkey("~!Attack"), Some('A'));
        assert_eq!(Font::hotkey("S~!top"), Some('t'));
        assert_eq!(Font::hotkey("~<Stop~>"), None);
    }

    #[test]
    fn test_multi_line_measure() {
        let font = font();
        let size = font.measure("hi\nhello");
        assert_eq!(size, Vec2i::new(5 * 8, 12 * 2 + 2));
        assert_eq!(font.measure("hi"), Vec2i::new(11, 12));
    }

    #[test]
    fn test_wrap_breaks_at_spaces() {
        let font = font();
        // "aa bb" is 8+8+4+8+8 = 36 pixels wide.
        assert_eq!(font.wrap("aa bb cc", 36), vec!["aa bb", "cc"]);
        assert_eq!(font.wrap("aa bb", 10), vec!["aa", "bb"]);
        assert_eq!(font.wrap("aa\nbb", 100), vec!["aa", "bb"]);
    }

    #[test]
    fn test_char_widths_section() {
        let mut font = font();
        font.process_section(&DataSection::new("char_widths").with_property("l", "2"))
            .unwrap();
        assert_eq!(font.char_width('l'), 2);
        assert!(font
            .process_section(&DataSection::new("char_widths").with_property("ll", "2"))
            .unwrap_err()
            .is_configuration());
    }
}
