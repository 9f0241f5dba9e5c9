/*
 *  lcdticker HD44780 Driver
 *
 *  Character LCD support for HD44780 controllers behind a PCF8574 I2C
 *  backpack, driven in 4-bit mode.
 */

//! # lcdticker HD44780 Display Driver
//!
//! Layered leaf-first:
//!
//! - [`address`] picks the 7-bit device address (explicit, probed or default)
//! - [`transport`] does byte and register I/O with the expander's settle delay
//! - [`protocol`] runs the 4-bit initialization and nibble strobing
//! - [`glyph`] programs the eight CGRAM characters
//!
//! [`emulated`] provides a software panel on the same `embedded-hal` traits,
//! for running off-target and for tests.
//!
//! ## Usage
//!
//! ```no_run
//! use lcdticker_driver_hd44780::{BusAddress, BusNumber, Hd44780, LineLayout, LinuxTransport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = LinuxTransport::open(BusNumber(1), BusAddress::new(0x27)?)?;
//! let mut lcd = Hd44780::new(transport, LineLayout::new(2, 16), true);
//! lcd.init()?;
//! lcd.write_line(1, "AAPL")?;
//! lcd.write_line(2, "72")?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod command;
pub mod emulated;
pub mod error;
pub mod glyph;
pub mod protocol;
pub mod transport;

pub use address::{AddressResolver, BusAddress, BusNumber, FixedProber, I2cDetectProber, Prober};
pub use command::{Command, LineLayout, Mode};
pub use error::{Hd44780Error, Result, TransportError};
pub use glyph::{Glyph, GlyphLoader, GlyphSet};
pub use protocol::{DisplayState, Hd44780, ProtocolState};
pub use transport::{I2cTransport, LinuxTransport, Transport};
