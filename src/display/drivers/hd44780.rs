/*
 *  display/drivers/hd44780.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  HD44780 character LCD behind a PCF8574 I2C backpack
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

use lcdticker_driver_hd44780::glyph::GLYPH_SLOTS;
use lcdticker_driver_hd44780::{GlyphLoader, GlyphSet, Hd44780, LineLayout, ProtocolState, Transport};
use log::info;

use crate::display::error::DisplayError;
use crate::display::traits::{CharacterDisplay, DisplayCapabilities};

/// HD44780 display driver wrapper
pub struct Hd44780Driver<T: Transport> {
    lcd: Hd44780<T>,

    /// Display capabilities
    capabilities: DisplayCapabilities,
}

impl<T: Transport> Hd44780Driver<T> {
    /// Wrap a transport; nothing is sent until `init`.
    pub fn new(transport: T, lines: u8, columns: u8, backlight: bool) -> Self {
        info!(
            "HD44780 {}x{} at {}, backlight {}",
            columns,
            lines,
            transport.address(),
            if backlight { "on" } else { "off" }
        );

        let capabilities = DisplayCapabilities {
            lines,
            columns,
            custom_glyphs: GLYPH_SLOTS,
            supports_backlight: true,
        };

        Self {
            lcd: Hd44780::new(transport, LineLayout::new(lines, columns), backlight),
            capabilities,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.lcd.state()
    }
}

impl<T: Transport + Send> CharacterDisplay for Hd44780Driver<T> {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        Ok(self.lcd.init()?)
    }

    fn write_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        Ok(self.lcd.write_line(line, text)?)
    }

    fn write_extended_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        Ok(self.lcd.write_extended_line(line, text)?)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(self.lcd.clear()?)
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        Ok(self.lcd.set_backlight(on)?)
    }

    fn backlight(&self) -> bool {
        self.lcd.backlight()
    }

    fn load_glyphs(&mut self, glyphs: &GlyphSet) -> Result<(), DisplayError> {
        Ok(GlyphLoader::load(&mut self.lcd, glyphs)?)
    }
}
