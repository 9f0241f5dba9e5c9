/*
 *  display/drivers/emulated.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Software panel for running without an LCD attached
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

use lcdticker_driver_hd44780::emulated::{EmulatedBus, EmulatedLcd, InstantDelay};
use lcdticker_driver_hd44780::{GlyphSet, I2cTransport, LineLayout};
use log::info;

use crate::display::drivers::hd44780::Hd44780Driver;
use crate::display::error::DisplayError;
use crate::display::traits::{CharacterDisplay, DisplayCapabilities};

/// The real protocol driver, run against an emulated controller.
///
/// Every visible change is logged as the panel would show it.
pub struct EmulatedDriver {
    driver: Hd44780Driver<I2cTransport<EmulatedBus, InstantDelay>>,
    panel: EmulatedLcd,
    layout: LineLayout,
}

impl EmulatedDriver {
    pub fn new(address: u8, lines: u8, columns: u8, backlight: bool) -> Result<Self, DisplayError> {
        let panel = EmulatedLcd::new(address);
        let transport = panel.transport()?;
        Ok(Self {
            driver: Hd44780Driver::new(transport, lines, columns, backlight),
            panel,
            layout: LineLayout::new(lines, columns),
        })
    }

    /// Handle on the simulated controller, for inspection.
    pub fn panel(&self) -> &EmulatedLcd {
        &self.panel
    }

    /// Current text of every line, top first.
    pub fn screen(&self) -> Vec<String> {
        (1..=self.layout.lines)
            .map(|l| self.panel.line_text(&self.layout, l))
            .collect()
    }

    fn show(&self) {
        let light = if self.panel.backlight() { '*' } else { ' ' };
        for (i, text) in self.screen().iter().enumerate() {
            info!("lcd{}{} |{}|", light, i + 1, text);
        }
    }
}

impl CharacterDisplay for EmulatedDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        self.driver.capabilities()
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.driver.init()
    }

    fn write_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        self.driver.write_line(line, text)?;
        self.show();
        Ok(())
    }

    fn write_extended_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        self.driver.write_extended_line(line, text)?;
        self.show();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.driver.clear()
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.driver.set_backlight(on)
    }

    fn backlight(&self) -> bool {
        self.driver.backlight()
    }

    fn load_glyphs(&mut self, glyphs: &GlyphSet) -> Result<(), DisplayError> {
        self.driver.load_glyphs(glyphs)
    }
}
