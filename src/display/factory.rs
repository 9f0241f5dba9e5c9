/*
 *  display/factory.rs
 *
 *  lcdticker - stock forecasts on a character LCD
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the display driver described by configuration
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

use lcdticker_driver_hd44780::address::board_revision;
use lcdticker_driver_hd44780::{
    AddressResolver, BusAddress, BusNumber, I2cDetectProber, LineLayout, LinuxTransport, Prober,
};
use log::{debug, info};

use crate::config::DisplayConfig;
use crate::display::drivers::emulated::EmulatedDriver;
use crate::display::drivers::hd44780::Hd44780Driver;
use crate::display::error::DisplayFactoryError;
use crate::display::traits::CharacterDisplay;

/// Type alias for boxed display driver trait objects
pub type BoxedDisplay = Box<dyn CharacterDisplay>;

const CPUINFO: &str = "/proc/cpuinfo";

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create a display driver from configuration
    ///
    /// The returned driver is constructed but not initialized.
    ///
    /// ```ignore
    /// let config = DisplayConfig {
    ///     address: Some(0x27),
    ///     lines: Some(2),
    ///     columns: Some(16),
    ///     ..Default::default()
    /// };
    ///
    /// let mut display = DisplayDriverFactory::create_from_config(&config)?;
    /// display.init()?;
    /// ```
    pub fn create_from_config(
        config: &DisplayConfig
    ) -> Result<BoxedDisplay, DisplayFactoryError> {
        let (lines, columns, backlight) = (config.lines(), config.columns(), config.backlight());
        if !LineLayout::new(lines, columns).fits_ddram() {
            return Err(DisplayFactoryError::ConfigError(format!(
                "{}x{} panel is not addressable", columns, lines
            )));
        }

        if config.emulated() {
            let address = config.address.unwrap_or(config.default_address());
            info!("Emulation mode enabled - software panel at 0x{:02X}", address);
            return Ok(Box::new(EmulatedDriver::new(address, lines, columns, backlight)?));
        }

        let bus = Self::select_bus(config);
        let address = if config.probe() {
            let mut prober = I2cDetectProber::new(config.probe_timeout());
            Self::resolve_address(config, bus, Some(&mut prober))?
        } else {
            Self::resolve_address(config, bus, None)?
        };

        let transport = LinuxTransport::open(bus, address)
            .map_err(|e| DisplayFactoryError::BusUnavailable(e.to_string()))?;

        Ok(Box::new(Hd44780Driver::new(transport, lines, columns, backlight)))
    }

    /// Configured bus, else the one the board revision wires to the header.
    pub fn select_bus(config: &DisplayConfig) -> BusNumber {
        if let Some(bus) = config.bus {
            return BusNumber(bus);
        }
        let revision = config.revision.unwrap_or_else(|| {
            std::fs::read_to_string(CPUINFO)
                .map(|s| board_revision(&s))
                .unwrap_or(2)
        });
        let bus = BusNumber::from_revision(revision);
        debug!("Board revision {} -> {}", revision, bus);
        bus
    }

    pub fn resolve_address(
        config: &DisplayConfig,
        bus: BusNumber,
        prober: Option<&mut dyn Prober>,
    ) -> Result<BusAddress, DisplayFactoryError> {
        let mut resolver = AddressResolver::new(Some(config.default_address()));
        if let Some(prober) = prober {
            resolver = resolver.with_prober(prober);
        }
        Ok(resolver.resolve(config.address, bus)?)
    }
}
