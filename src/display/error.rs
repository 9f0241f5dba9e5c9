/*
 *  display/error.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for display subsystem
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

use std::fmt;
use std::error::Error;

use lcdticker_driver_hd44780::{Hd44780Error, TransportError};

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// No device address could be settled on
    AddressResolution,

    /// Hardware initialization failed; the panel needs re-initializing
    InitializationFailed(String),

    /// I2C communication error
    I2cError(TransportError),

    /// Operation before a successful init
    NotReady,

    /// Line number outside the panel
    InvalidLine { line: u8, lines: u8 },

    /// Text written while the cursor was left in glyph memory
    CursorUndefined,

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Unsupported operation for this display
    UnsupportedOperation,

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::AddressResolution =>
                write!(f, "No I2C address could be determined for the display"),
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::I2cError(err) =>
                write!(f, "I2C communication error: {}", err),
            DisplayError::NotReady =>
                write!(f, "Display not initialized"),
            DisplayError::InvalidLine { line, lines } =>
                write!(f, "Line {} out of range (display has {})", line, lines),
            DisplayError::CursorUndefined =>
                write!(f, "Cursor position undefined after glyph load"),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this display"),
            DisplayError::Other(msg) =>
                write!(f, "{}", msg),
        }
    }
}

impl DisplayError {
    /// Whether the panel must be initialized again before further use.
    ///
    /// A bus error may have split a byte between its two nibbles.
    pub fn needs_reinit(&self) -> bool {
        matches!(self, DisplayError::I2cError(_) | DisplayError::InitializationFailed(_))
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::I2cError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for DisplayError {
    fn from(err: TransportError) -> Self {
        DisplayError::I2cError(err)
    }
}

// Conversion from driver errors
impl From<Hd44780Error> for DisplayError {
    fn from(err: Hd44780Error) -> Self {
        match err {
            Hd44780Error::AddressResolution => DisplayError::AddressResolution,
            Hd44780Error::InvalidAddress(a) =>
                DisplayError::InvalidConfiguration(format!("0x{:02X} is not a 7-bit I2C address", a)),
            Hd44780Error::Transport(e) => DisplayError::I2cError(e),
            Hd44780Error::ProtocolFault(msg) => DisplayError::InitializationFailed(msg),
            Hd44780Error::NotReady => DisplayError::NotReady,
            Hd44780Error::CursorUndefined => DisplayError::CursorUndefined,
            Hd44780Error::InvalidLine { line, lines } => DisplayError::InvalidLine { line, lines },
            Hd44780Error::InvalidColumn { column, columns } =>
                DisplayError::Other(format!("Column {} out of range (display has {})", column, columns)),
            Hd44780Error::InvalidGlyph(msg) => DisplayError::InvalidConfiguration(msg),
        }
    }
}

/// Factory error types
#[derive(Debug)]
pub enum DisplayFactoryError {
    /// Could not open the I2C bus device
    BusUnavailable(String),

    /// Display driver initialization failed
    DriverInitFailed(DisplayError),

    /// Configuration validation error
    ConfigError(String),
}

impl fmt::Display for DisplayFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayFactoryError::BusUnavailable(msg) =>
                write!(f, "I2C bus unavailable: {}", msg),
            DisplayFactoryError::DriverInitFailed(err) =>
                write!(f, "Driver initialization failed: {}", err),
            DisplayFactoryError::ConfigError(msg) =>
                write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for DisplayFactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayFactoryError::DriverInitFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DisplayError> for DisplayFactoryError {
    fn from(err: DisplayError) -> Self {
        DisplayFactoryError::DriverInitFailed(err)
    }
}

impl From<Hd44780Error> for DisplayFactoryError {
    fn from(err: Hd44780Error) -> Self {
        DisplayFactoryError::DriverInitFailed(err.into())
    }
}
