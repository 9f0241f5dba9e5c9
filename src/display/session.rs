/*
 *  display/session.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Session facade over a character display
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
use log::{debug, info, warn};

use crate::display::error::DisplayError;
use crate::display::factory::BoxedDisplay;
use crate::display::traits::DisplayCapabilities;
use crate::forecast::{Forecast, ForecastError};

pub const MESSAGE_RECEIVED: &str = "Message Received";
pub const FORECAST_FAILED: &str = "Forecast failed";
pub const PENDING: &str = "...";

/// Everything the rest of the program may do to the panel.
///
/// Owns the driver outright; a single task holds the session and all
/// display traffic is funnelled through it.
pub struct DisplaySession {
    display: BoxedDisplay,
    glyphs: GlyphSet,
}

impl DisplaySession {
    pub fn new(display: BoxedDisplay) -> Self {
        Self { display, glyphs: GlyphSet::default() }
    }

    /// Initialize the panel, program the glyph slots and blank it.
    pub fn start(&mut self, glyphs: &GlyphSet) -> Result<(), DisplayError> {
        self.glyphs = glyphs.clone();
        self.display.init()?;
        if self.display.capabilities().custom_glyphs == 0 {
            debug!("Display has no glyph memory");
        } else {
            match self.display.load_glyphs(glyphs) {
                Ok(()) => debug!("Glyph slots loaded"),
                Err(DisplayError::UnsupportedOperation) => debug!("Display has no glyph memory"),
                Err(e) => return Err(e),
            }
        }
        // glyph load leaves the address counter in CGRAM; clear re-homes it
        self.display.clear()?;
        let (columns, lines) = self.display.dimensions();
        info!("Display session started ({}x{})", columns, lines);
        Ok(())
    }

    /// Run `start` again with the glyphs it was last given.
    pub fn restart(&mut self) -> Result<(), DisplayError> {
        info!("Re-initializing display");
        let glyphs = self.glyphs.clone();
        self.start(&glyphs)
    }

    pub fn capabilities(&self) -> &DisplayCapabilities {
        self.display.capabilities()
    }

    pub fn write_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        self.display.write_line(line, text)
    }

    /// Line write honouring `{0xHH}` raw character escapes
    pub fn write_extended_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        self.display.write_extended_line(line, text)
    }

    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.display.clear()
    }

    /// Clear, then write `lines` top down.
    ///
    /// On a one-line panel the entries are joined with a space.
    pub fn show(&mut self, lines: &[&str]) -> Result<(), DisplayError> {
        self.display.clear()?;
        let available = self.display.capabilities().lines as usize;
        if available == 1 && lines.len() > 1 {
            return self.display.write_line(1, &lines.join(" "));
        }
        for (i, text) in lines.iter().take(available).enumerate() {
            self.display.write_line(i as u8 + 1, text)?;
        }
        Ok(())
    }

    pub fn backlight(&self) -> bool {
        self.display.backlight()
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        if !self.display.capabilities().supports_backlight {
            return Err(DisplayError::UnsupportedOperation);
        }
        self.display.set_backlight(on)
    }

    pub fn backlight_on(&mut self) -> Result<(), DisplayError> {
        self.set_backlight(true)
    }

    pub fn backlight_off(&mut self) -> Result<(), DisplayError> {
        self.set_backlight(false)
    }

    /// Flip the backlight, returning the new state.
    pub fn toggle_backlight(&mut self) -> Result<bool, DisplayError> {
        let on = !self.display.backlight();
        self.set_backlight(on)?;
        Ok(on)
    }

    /// Echo a received token before acting on it.
    pub fn acknowledge(&mut self, token: &str) -> Result<(), DisplayError> {
        self.show(&[MESSAGE_RECEIVED, token])
    }

    /// Ticker on line 1 while its score is being fetched.
    pub fn show_pending(&mut self, ticker: &str) -> Result<(), DisplayError> {
        self.show(&[ticker, PENDING])
    }

    /// Ticker on line 1, score or "Not Found!" on line 2.
    pub fn show_forecast(
        &mut self,
        ticker: &str,
        forecast: &Result<Forecast, ForecastError>,
    ) -> Result<(), DisplayError> {
        let text = match forecast {
            Ok(f) => f.to_string(),
            Err(e) => {
                warn!("Forecast for {} failed: {}", ticker, e);
                FORECAST_FAILED.to_string()
            }
        };
        self.show(&[ticker, &text])
    }

    /// Blank the panel and switch the backlight off.
    ///
    /// Both steps are attempted; the first error is returned.
    pub fn shutdown(&mut self) -> Result<(), DisplayError> {
        info!("Display session shutting down");
        let cleared = self.display.clear();
        if !self.display.capabilities().supports_backlight {
            return cleared;
        }
        let dark = self.display.set_backlight(false);
        cleared.and(dark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockDriver;

    fn bare_panel() -> MockDriver {
        MockDriver::with_capabilities(DisplayCapabilities {
            lines: 2,
            columns: 16,
            custom_glyphs: 0,
            supports_backlight: false,
        })
    }

    fn session(lines: u8, columns: u8) -> (DisplaySession, MockDriver) {
        let mock = MockDriver::new(lines, columns);
        (DisplaySession::new(Box::new(mock.clone())), mock)
    }

    #[test]
    fn test_start_inits_loads_and_clears() {
        let (mut s, mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();
        let state = mock.state();
        let state = state.lock().unwrap();
        assert_eq!(state.init_count, 1);
        assert_eq!(state.glyph_loads, 1);
        assert_eq!(state.clear_count, 1);
    }

    #[test]
    fn test_restart_reloads_last_glyphs() {
        let (mut s, mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();
        s.write_line(1, "AAPL").unwrap();
        s.restart().unwrap();
        let state = mock.state();
        let state = state.lock().unwrap();
        assert_eq!(state.init_count, 2);
        assert_eq!(state.glyph_loads, 2);
        assert!(state.lines[0].is_empty());
    }

    #[test]
    fn test_panel_without_glyphs_or_backlight() {
        let mock = bare_panel();
        let mut s = DisplaySession::new(Box::new(mock.clone()));
        s.start(&GlyphSet::default()).unwrap();
        assert_eq!(mock.state().lock().unwrap().glyph_loads, 0);

        assert!(matches!(s.backlight_off(), Err(DisplayError::UnsupportedOperation)));
        assert!(matches!(s.toggle_backlight(), Err(DisplayError::UnsupportedOperation)));
        s.write_line(1, "AAPL").unwrap();
        s.shutdown().unwrap();
        assert_eq!(mock.line(1), "");
        assert!(mock.state().lock().unwrap().backlight);
    }

    #[test]
    fn test_start_reports_init_failure() {
        let (mut s, mock) = session(2, 16);
        mock.state().lock().unwrap().simulate_init_failure = true;
        assert!(matches!(
            s.start(&GlyphSet::default()),
            Err(DisplayError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_forecast_rendering() {
        let (mut s, mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();

        s.show_forecast("AAPL", &Ok(Forecast::Score(72.0))).unwrap();
        assert_eq!(mock.line(1), "AAPL");
        assert_eq!(mock.line(2), "72");

        s.show_forecast("ZZZZ", &Ok(Forecast::NotFound)).unwrap();
        assert_eq!(mock.line(1), "ZZZZ");
        assert_eq!(mock.line(2), "Not Found!");

        s.show_forecast("AAPL", &Err(ForecastError::Unconfigured)).unwrap();
        assert_eq!(mock.line(2), FORECAST_FAILED);
    }

    #[test]
    fn test_pending_and_acknowledge() {
        let (mut s, mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();

        s.acknowledge("NVDA").unwrap();
        assert_eq!(mock.line(1), MESSAGE_RECEIVED);
        assert_eq!(mock.line(2), "NVDA");

        s.show_pending("NVDA").unwrap();
        assert_eq!(mock.line(2), PENDING);
    }

    #[test]
    fn test_show_on_one_line_panel() {
        let (mut s, mock) = session(1, 16);
        s.start(&GlyphSet::default()).unwrap();
        s.show_forecast("AAPL", &Ok(Forecast::Score(72.0))).unwrap();
        assert_eq!(mock.line(1), "AAPL 72");
    }

    #[test]
    fn test_backlight_controls() {
        let (mut s, _mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();
        assert!(s.backlight());
        assert!(!s.toggle_backlight().unwrap());
        assert!(!s.backlight());
        s.backlight_on().unwrap();
        assert!(s.backlight());
        s.backlight_off().unwrap();
        assert!(!s.backlight());
    }

    #[test]
    fn test_shutdown_clears_and_darkens() {
        let (mut s, mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();
        s.write_line(1, "AAPL").unwrap();
        s.shutdown().unwrap();
        assert_eq!(mock.line(1), "");
        assert!(!mock.state().lock().unwrap().backlight);
    }

    #[test]
    fn test_write_errors_surface() {
        let (mut s, mock) = session(2, 16);
        s.start(&GlyphSet::default()).unwrap();
        mock.state().lock().unwrap().simulate_write_failure = true;
        assert!(s.write_line(1, "AAPL").is_err());
        assert!(matches!(s.write_line(3, "x"), Err(DisplayError::InvalidLine { .. })));
    }
}
