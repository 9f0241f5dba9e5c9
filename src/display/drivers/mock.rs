/*
 *  display/drivers/mock.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display driver for testing without hardware
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
use crate::display::traits::{CharacterDisplay, DisplayCapabilities};

use std::sync::{Arc, Mutex};

/// Mock display driver for testing
///
/// Keeps a text buffer per line and records every call. The state is shared
/// so a test can keep a handle after the driver is boxed and moved away.
#[derive(Debug, Clone)]
pub struct MockDriver {
    /// Display capabilities
    capabilities: DisplayCapabilities,

    /// Shared state for testing
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Current contents of each line
    pub lines: Vec<String>,

    /// Every (line, text) written, in order
    pub writes: Vec<(u8, String)>,

    /// Number of times init() was called
    pub init_count: usize,

    /// Number of times clear() was called
    pub clear_count: usize,

    /// Number of times load_glyphs() was called
    pub glyph_loads: usize,

    pub backlight: bool,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Simulate failures (for error testing)
    pub simulate_write_failure: bool,
    pub simulate_init_failure: bool,
}

impl MockDriver {
    pub fn new(lines: u8, columns: u8) -> Self {
        Self::with_capabilities(DisplayCapabilities {
            lines,
            columns,
            custom_glyphs: 8,
            supports_backlight: true,
        })
    }

    pub fn with_capabilities(capabilities: DisplayCapabilities) -> Self {
        let state = MockDriverState {
            lines: vec![String::new(); capabilities.lines as usize],
            backlight: true,
            ..Default::default()
        };
        Self {
            capabilities,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Current text of a 1-based line
    pub fn line(&self, line: u8) -> String {
        let state = self.state.lock().unwrap();
        state.lines.get(line as usize - 1).cloned().unwrap_or_default()
    }

    fn check_line(&self, line: u8) -> Result<(), DisplayError> {
        if line == 0 || line > self.capabilities.lines {
            return Err(DisplayError::InvalidLine { line, lines: self.capabilities.lines });
        }
        Ok(())
    }

    fn write(&mut self, line: u8, text: String) -> Result<(), DisplayError> {
        self.check_line(line)?;
        let mut state = self.state.lock().unwrap();
        if !state.is_initialized {
            return Err(DisplayError::NotReady);
        }
        if state.simulate_write_failure {
            return Err(DisplayError::Other("Simulated write failure".to_string()));
        }
        let text: String = text.chars().take(self.capabilities.columns as usize).collect();
        state.lines[line as usize - 1] = text.clone();
        state.writes.push((line, text));
        Ok(())
    }
}

impl CharacterDisplay for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();

        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn write_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        self.write(line, text.to_string())
    }

    fn write_extended_line(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        // record escapes verbatim; the real encoding is tested in the driver crate
        self.write(line, text.to_string())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if !state.is_initialized {
            return Err(DisplayError::NotReady);
        }
        state.clear_count += 1;
        state.lines.iter_mut().for_each(|l| l.clear());
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.backlight = on;
        Ok(())
    }

    fn backlight(&self) -> bool {
        self.state.lock().unwrap().backlight
    }

    fn load_glyphs(&mut self, _glyphs: &GlyphSet) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.glyph_loads += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_driver_creation() {
        let driver = MockDriver::new(2, 16);
        assert_eq!(driver.capabilities().lines, 2);
        assert_eq!(driver.capabilities().columns, 16);
        assert!(driver.backlight());
    }

    #[test]
    fn test_mock_driver_init() {
        let mut driver = MockDriver::new(2, 16);

        let state = driver.state();
        assert_eq!(state.lock().unwrap().init_count, 0);
        assert!(!state.lock().unwrap().is_initialized);

        driver.init().unwrap();

        assert_eq!(state.lock().unwrap().init_count, 1);
        assert!(state.lock().unwrap().is_initialized);
    }

    #[test]
    fn test_mock_driver_lines() {
        let mut driver = MockDriver::new(2, 8);
        driver.init().unwrap();
        driver.write_line(1, "ABCDEFGHIJ").unwrap();
        assert_eq!(driver.line(1), "ABCDEFGH");
        assert!(matches!(driver.write_line(3, "x"), Err(DisplayError::InvalidLine { line: 3, lines: 2 })));

        driver.clear().unwrap();
        assert_eq!(driver.line(1), "");
        assert_eq!(driver.state().lock().unwrap().clear_count, 1);
    }

    #[test]
    fn test_mock_driver_simulated_failure() {
        let mut driver = MockDriver::new(2, 16);
        driver.state().lock().unwrap().simulate_init_failure = true;
        assert!(driver.init().is_err());
        assert!(matches!(driver.write_line(1, "x"), Err(DisplayError::NotReady)));
    }
}
