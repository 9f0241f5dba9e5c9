/*
 *  lcdticker HD44780 Driver - Transport
 *
 *  SMBus-style byte and register primitives over an embedded-hal I2C bus
 */

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use log::{debug, trace};

use crate::address::{BusAddress, BusNumber};
use crate::error::TransportError;

/// Post-write recovery time of the expander, in microseconds.
pub const SETTLE_DELAY_US: u32 = 100;

/// SMBus block transfers carry at most 32 data bytes.
pub const MAX_BLOCK_LEN: usize = 32;

/// Raw I/O against one device on one bus.
///
/// Every write returns only after the settle delay has elapsed, so callers can
/// issue writes back to back. Implementations never retry.
pub trait Transport {
    fn address(&self) -> BusAddress;

    fn write_byte(&mut self, value: u8) -> Result<(), TransportError>;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError>;

    fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), TransportError>;

    fn read_byte(&mut self) -> Result<u8, TransportError>;

    fn read_register(&mut self, register: u8) -> Result<u8, TransportError>;

    fn read_block(&mut self, register: u8) -> Result<Vec<u8>, TransportError>;

    /// Block the caller for `us` microseconds.
    fn delay_us(&mut self, us: u32);

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// Transport over any `embedded_hal::i2c::I2c` bus.
///
/// On a Pi this is `I2cTransport<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay>`.
pub struct I2cTransport<I2C, D> {
    i2c: I2C,
    delay: D,
    address: BusAddress,
}

impl<I2C, D> I2cTransport<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, address: BusAddress) -> Self {
        Self { i2c, delay, address }
    }

    /// Give the bus and delay back.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn error(&self, op: &'static str, err: I2C::Error) -> TransportError {
        TransportError::new(op, self.address.get(), format!("{:?} ({:?})", err.kind(), err))
    }

    fn write(&mut self, op: &'static str, bytes: &[u8]) -> Result<(), TransportError> {
        trace!("i2c {} 0x{:02X} <- {:02X?}", op, self.address.get(), bytes);
        let result = self.i2c.write(self.address.get(), bytes);
        // recovery time applies even when the device NAKed
        self.delay.delay_us(SETTLE_DELAY_US);
        result.map_err(|e| self.error(op, e))
    }
}

/// Transport on the host's `/dev/i2c-N` character device.
pub type LinuxTransport = I2cTransport<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay>;

impl LinuxTransport {
    /// Open the bus device node for exclusive use by this transport.
    pub fn open(bus: BusNumber, address: BusAddress) -> Result<Self, TransportError> {
        let path = bus.device_path();
        let i2c = linux_embedded_hal::I2cdev::new(&path)
            .map_err(|e| TransportError::new("open", address.get(), format!("{}: {}", path, e)))?;
        debug!("Opened {} for device {}", path, address);
        Ok(Self::new(i2c, linux_embedded_hal::Delay, address))
    }
}

impl<I2C, D> Transport for I2cTransport<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn address(&self) -> BusAddress {
        self.address
    }

    fn write_byte(&mut self, value: u8) -> Result<(), TransportError> {
        self.write("write_byte", &[value])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.write("write_register", &[register, value])
    }

    fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), TransportError> {
        if data.len() > MAX_BLOCK_LEN {
            return Err(TransportError::new(
                "write_block",
                self.address.get(),
                format!("block of {} bytes exceeds {}", data.len(), MAX_BLOCK_LEN),
            ));
        }
        let mut frame = Vec::with_capacity(data.len() + 2);
        frame.push(register);
        frame.push(data.len() as u8);
        frame.extend_from_slice(data);
        self.write("write_block", &frame)
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address.get(), &mut buf)
            .map_err(|e| self.error("read_byte", e))?;
        Ok(buf[0])
    }

    fn read_register(&mut self, register: u8) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address.get(), &[register], &mut buf)
            .map_err(|e| self.error("read_register", e))?;
        Ok(buf[0])
    }

    fn read_block(&mut self, register: u8) -> Result<Vec<u8>, TransportError> {
        // first byte on the wire is the block length
        let mut buf = [0u8; MAX_BLOCK_LEN + 1];
        self.i2c
            .write_read(self.address.get(), &[register], &mut buf)
            .map_err(|e| self.error("read_block", e))?;
        let len = (buf[0] as usize).min(MAX_BLOCK_LEN);
        Ok(buf[1..=len].to_vec())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulated::{EmulatedLcd, Event};

    fn transport(lcd: &EmulatedLcd) -> I2cTransport<crate::emulated::EmulatedBus, crate::emulated::InstantDelay> {
        I2cTransport::new(lcd.bus(), lcd.delay(), BusAddress::new(0x27).unwrap())
    }

    #[test]
    fn test_every_write_is_followed_by_settle_delay() {
        let lcd = EmulatedLcd::new(0x27);
        let mut t = transport(&lcd);

        t.write_byte(0x08).unwrap();
        t.write_register(0x10, 0x20).unwrap();
        t.write_block(0x00, &[1, 2, 3]).unwrap();

        let events = lcd.events();
        assert_eq!(events.len(), 6);
        for pair in events.chunks(2) {
            assert!(matches!(pair[0], Event::Write(_)));
            assert_eq!(pair[1], Event::Delay(SETTLE_DELAY_US * 1000));
        }
        assert_eq!(events[0], Event::Write(vec![0x08]));
        assert_eq!(events[2], Event::Write(vec![0x10, 0x20]));
        assert_eq!(events[4], Event::Write(vec![0x00, 3, 1, 2, 3]));
    }

    #[test]
    fn test_block_too_long_is_rejected() {
        let lcd = EmulatedLcd::new(0x27);
        let mut t = transport(&lcd);
        let err = t.write_block(0x00, &[0u8; 33]).unwrap_err();
        assert_eq!(err.op, "write_block");
        assert!(lcd.events().is_empty());
    }

    #[test]
    fn test_absent_device_is_a_transport_error() {
        let lcd = EmulatedLcd::new(0x3F);
        let mut t = transport(&lcd);
        let err = t.write_byte(0x00).unwrap_err();
        assert_eq!(err.address, 0x27);
        assert_eq!(err.op, "write_byte");
    }

    #[test]
    fn test_read_byte_returns_port_latch() {
        let lcd = EmulatedLcd::new(0x27);
        let mut t = transport(&lcd);
        t.write_byte(0x5A).unwrap();
        assert_eq!(t.read_byte().unwrap(), 0x5A);
        // the register byte is itself latched onto the port
        assert_eq!(t.read_register(0x08).unwrap(), 0x08);
    }

    #[test]
    fn test_read_block_honours_length_prefix() {
        let lcd = EmulatedLcd::new(0x27);
        lcd.set_read_data(&[3, 0xAA, 0xBB, 0xCC, 0xDD]);
        let mut t = transport(&lcd);
        assert_eq!(t.read_block(0x01).unwrap(), vec![0xAA, 0xBB, 0xCC]);
    }
}
