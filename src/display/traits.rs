/*
 *  display/traits.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for character display abstraction
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use lcdticker_driver_hd44780::GlyphSet;

use crate::display::error::DisplayError;

/// Display capabilities and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCapabilities {
    /// Text lines on the panel
    pub lines: u8,

    /// Characters per line
    pub columns: u8,

    /// Programmable characters available (0 if none)
    pub custom_glyphs: usize,

    /// Whether the backlight can be switched
    pub supports_backlight: bool,
}

/// Minimal hardware abstraction - every character display implements this
///
/// Lines are 1-based. Implementations are not expected to lock internally;
/// callers hand a driver to exactly one owner.
pub trait CharacterDisplay: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (columns, lines)
    fn dimensions(&self) -> (u8, u8) {
        let caps = self.capabilities();
        (caps.columns, caps.lines)
    }

    /// Initialize the display hardware
    ///
    /// Also the recovery path after a failed initialization.
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Write `text` from the first column of `line`
    fn write_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError>;

    /// Like `write_line`, with `{0xHH}` tokens sent as raw character codes
    fn write_extended_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError>;

    /// Blank every line and home the cursor
    fn clear(&mut self) -> Result<(), DisplayError>;

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError>;

    fn backlight(&self) -> bool;

    /// Program custom characters (if supported)
    fn load_glyphs(&mut self, _glyphs: &GlyphSet) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }
}
