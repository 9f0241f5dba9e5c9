/*
 *  lcdticker HD44780 Driver - Address Resolution
 *
 *  Bus selection and best-effort discovery of the backpack address
 */

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Hd44780Error, Result};

/// Where `i2cdetect` lives on Raspberry Pi OS.
pub const I2CDETECT_PATH: &str = "/usr/sbin/i2cdetect";

/// The usual PCF8574 backpack address.
pub const DEFAULT_ADDRESS: u8 = 0x27;

/// 7-bit I2C device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress(u8);

impl BusAddress {
    pub fn new(address: u16) -> Result<Self> {
        if address > 0x7F {
            return Err(Hd44780Error::InvalidAddress(address));
        }
        Ok(Self(address as u8))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Numbered I2C bus.
///
/// Revision 1 Raspberry Pi boards wire the header to bus 0; every later board
/// swapped the two buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusNumber(pub u8);

impl BusNumber {
    pub fn from_revision(revision: u32) -> Self {
        if revision == 1 { BusNumber(0) } else { BusNumber(1) }
    }

    pub fn device_path(self) -> String {
        format!("/dev/i2c-{}", self.0)
    }
}

impl fmt::Display for BusNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i2c-{}", self.0)
    }
}

/// Board revision from the `Revision` line of `/proc/cpuinfo`.
///
/// Only the old-style codes 0002 and 0003 are revision 1 boards; anything else,
/// including a missing or unreadable file, counts as revision 2.
pub fn board_revision(cpuinfo: &str) -> u32 {
    let code = cpuinfo
        .lines()
        .filter(|l| l.starts_with("Revision"))
        .filter_map(|l| l.split(':').nth(1))
        .find_map(|v| u32::from_str_radix(v.trim(), 16).ok());

    // bit 24 flags a warranty-voiding over-voltage and is not part of the code
    match code.map(|c| c & !0x0100_0000) {
        Some(0x0002) | Some(0x0003) => 1,
        _ => 2,
    }
}

/// Bus scanning capability used when no explicit address is configured.
pub trait Prober {
    /// Scan `bus` and report the first responding address, if any.
    fn probe(&mut self, bus: BusNumber) -> Option<u8>;
}

/// Prober that always reports the same answer. Useful off-target.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProber(pub Option<u8>);

impl Prober for FixedProber {
    fn probe(&mut self, _bus: BusNumber) -> Option<u8> {
        self.0
    }
}

/// Runs `i2cdetect -y <bus>` and takes the first address in its table.
#[derive(Debug, Clone)]
pub struct I2cDetectProber {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for I2cDetectProber {
    fn default() -> Self {
        Self {
            program: PathBuf::from(I2CDETECT_PATH),
            timeout: Duration::from_secs(2),
        }
    }
}

impl I2cDetectProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, ..Default::default() }
    }

    fn run(&self, bus: BusNumber) -> Option<String> {
        if !self.program.exists() {
            debug!("{} not present, skipping probe", self.program.display());
            return None;
        }

        let mut child = Command::new(&self.program)
            .arg("-y")
            .arg(bus.0.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| warn!("Failed to run {}: {}", self.program.display(), e))
            .ok()?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => break,
                Ok(Some(status)) => {
                    warn!("{} exited with {}", self.program.display(), status);
                    return None;
                }
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} timed out after {:?}", self.program.display(), self.timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    warn!("Failed waiting on {}: {}", self.program.display(), e);
                    return None;
                }
            }
        }

        let mut out = String::new();
        child.stdout.take()?.read_to_string(&mut out).ok()?;
        Some(out)
    }
}

impl Prober for I2cDetectProber {
    fn probe(&mut self, bus: BusNumber) -> Option<u8> {
        self.run(bus).and_then(|out| parse_i2cdetect(&out))
    }
}

/// First responding address in an `i2cdetect` table.
///
/// Rows look like `20: -- -- -- -- -- -- -- 27 -- ...`; `--` is silence and
/// `UU` is a device claimed by a kernel driver, neither counts.
pub fn parse_i2cdetect(output: &str) -> Option<u8> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .flat_map(|(_, cells)| cells.split_whitespace())
        .find(|cell| cell.len() == 2 && cell.chars().all(|c| c.is_ascii_hexdigit()))
        .and_then(|cell| u8::from_str_radix(cell, 16).ok())
}

/// Picks the device address once, at driver construction.
pub struct AddressResolver<'a> {
    prober: Option<&'a mut dyn Prober>,
    default: Option<u8>,
}

impl<'a> AddressResolver<'a> {
    pub fn new(default: Option<u8>) -> Self {
        Self { prober: None, default }
    }

    pub fn with_prober(mut self, prober: &'a mut dyn Prober) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Explicit address wins verbatim; else the probe; else the default.
    pub fn resolve(self, explicit: Option<u8>, bus: BusNumber) -> Result<BusAddress> {
        if let Some(address) = explicit {
            debug!("Using explicit display address 0x{:02X}", address);
            return BusAddress::new(address as u16);
        }

        if let Some(prober) = self.prober {
            match prober.probe(bus) {
                Some(found) if found <= 0x7F => {
                    info!("Probe found device at 0x{:02X} on {}", found, bus);
                    return BusAddress::new(found as u16);
                }
                Some(found) => warn!("Ignoring out-of-range address 0x{:02X} from {}", found, bus),
                None => match self.default {
                    Some(d) => warn!("Probe of {} found nothing, using default 0x{:02X}", bus, d),
                    None => warn!("Probe of {} found nothing and no default configured", bus),
                },
            }
        }

        let address = self.default.ok_or(Hd44780Error::AddressResolution)?;
        BusAddress::new(address as u16)
    }
}
