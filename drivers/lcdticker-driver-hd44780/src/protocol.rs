/*
 *  lcdticker HD44780 Driver - Protocol
 *
 *  4-bit initialization, nibble strobing, cursor addressing and backlight
 *  handling for an HD44780 behind a PCF8574 expander
 */

use log::{debug, info, trace, warn};

use crate::command::*;
use crate::error::{Hd44780Error, Result};
use crate::transport::Transport;

/// Enable pulse width, in microseconds.
pub const STROBE_HIGH_US: u32 = 500;
/// Hold time after the falling edge, in microseconds.
pub const STROBE_LOW_US: u32 = 100;
/// Controller settle time at the end of initialization.
pub const INIT_SETTLE_MS: u32 = 200;
/// Clear and return-home run far longer than other instructions.
pub const CLEAR_SETTLE_MS: u32 = 2;

/// Lifecycle of a driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Uninitialized,
    Initializing,
    Ready,
    /// Initialization failed; only `init` is accepted.
    Faulted,
}

/// Controller-visible settings, mirrored on the host.
///
/// The expander has no memory of its own beyond the last byte written, so the
/// backlight bit lives here and is ORed into every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    pub backlight: bool,
    pub entry_mode: u8,
    pub function_set: u8,
    pub display_control: u8,
}

impl DisplayState {
    fn new(backlight: bool) -> Self {
        Self {
            backlight,
            entry_mode: LCD_ENTRYLEFT | LCD_ENTRYSHIFTDECREMENT,
            function_set: LCD_4BITMODE | LCD_2LINE | LCD_5X8DOTS,
            display_control: LCD_DISPLAYON | LCD_CURSOROFF | LCD_BLINKOFF,
        }
    }

    #[inline]
    fn backlight_bits(&self) -> u8 {
        if self.backlight { LCD_BACKLIGHT } else { LCD_NOBACKLIGHT }
    }
}

/// Which RAM the controller's address counter last pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressTarget {
    Ddram,
    Cgram,
}

/// Data bytes for `text`, one per character.
///
/// Characters outside Latin-1 have no code in the controller ROM and are sent
/// as `?`.
pub fn encode_plain(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Data bytes for `text` with `{0xHH}` escapes replaced by the raw byte.
///
/// Only the exact six-character form is recognised (`x` may be upper case,
/// the digits any case). Anything else, malformed escapes included, is
/// written literally.
pub fn encode_extended(text: &str) -> Vec<u8> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some(raw) = escape_at(&chars[i..]) {
            out.push(raw);
            i += 6;
        } else {
            out.push(u8::try_from(u32::from(chars[i])).unwrap_or(b'?'));
            i += 1;
        }
    }
    out
}

fn escape_at(chars: &[char]) -> Option<u8> {
    match chars {
        ['{', '0', 'x' | 'X', hi, lo, '}', ..] => {
            let hi = hi.to_digit(16)?;
            let lo = lo.to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        }
        _ => None,
    }
}

/// HD44780 driver over a byte [`Transport`].
///
/// Not internally synchronised: share it behind one owner.
pub struct Hd44780<T: Transport> {
    transport: T,
    layout: LineLayout,
    state: ProtocolState,
    display: DisplayState,
    target: AddressTarget,
}

impl<T: Transport> Hd44780<T> {
    pub fn new(transport: T, layout: LineLayout, backlight: bool) -> Self {
        Self {
            transport,
            layout,
            state: ProtocolState::Uninitialized,
            display: DisplayState::new(backlight),
            target: AddressTarget::Ddram,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn display_state(&self) -> DisplayState {
        self.display
    }

    pub fn layout(&self) -> LineLayout {
        self.layout
    }

    pub fn backlight(&self) -> bool {
        self.display.backlight
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Tear down the driver and hand the transport back.
    pub fn release(self) -> T {
        self.transport
    }

    /// Run the power-on sequence. Also used to recover from `Faulted`.
    pub fn init(&mut self) -> Result<()> {
        debug!(
            "Initializing HD44780 at {} ({}x{})",
            self.transport.address(),
            self.layout.columns,
            self.layout.lines
        );
        self.state = ProtocolState::Initializing;
        self.display = DisplayState::new(self.display.backlight);

        match self.init_sequence() {
            Ok(()) => {
                self.state = ProtocolState::Ready;
                self.target = AddressTarget::Ddram;
                info!("HD44780 ready at {}", self.transport.address());
                Ok(())
            }
            Err(e) => {
                self.state = ProtocolState::Faulted;
                warn!("HD44780 initialization failed: {}", e);
                Err(Hd44780Error::ProtocolFault(e.to_string()))
            }
        }
    }

    fn init_sequence(&mut self) -> Result<()> {
        // back to a known 8-bit state from wherever the controller was left
        for _ in 0..3 {
            self.write_nibble(0x30, Mode::Command)?;
        }
        self.write_nibble(0x20, Mode::Command)?;

        self.write_byte(LCD_FUNCTIONSET | self.display.function_set, Mode::Command)?;
        self.write_byte(LCD_DISPLAYCONTROL | self.display.display_control, Mode::Command)?;
        self.write_byte(LCD_CLEARDISPLAY, Mode::Command)?;
        self.write_byte(LCD_ENTRYMODESET | self.display.entry_mode, Mode::Command)?;

        self.transport.delay_ms(INIT_SETTLE_MS);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            ProtocolState::Ready => Ok(()),
            ProtocolState::Faulted => Err(Hd44780Error::ProtocolFault(
                "re-initialization required".to_string(),
            )),
            _ => Err(Hd44780Error::NotReady),
        }
    }

    /// Present one nibble (already in D4-D7) and strobe it in.
    pub fn write_nibble(&mut self, nibble: u8, mode: Mode) -> Result<()> {
        let value = (nibble & 0xF0) | mode.bits() | self.display.backlight_bits();
        trace!("nibble {:02X}", value);

        self.transport.write_byte(value | EN)?;
        self.transport.delay_us(STROBE_HIGH_US);
        self.transport.write_byte(value & !EN)?;
        self.transport.delay_us(STROBE_LOW_US);
        Ok(())
    }

    /// High nibble then low nibble, same register select on both.
    ///
    /// A failure after the high nibble was latched leaves the controller
    /// holding half a byte; the driver is then `Faulted` until `init`
    /// resynchronises the interface.
    pub fn write_byte(&mut self, byte: u8, mode: Mode) -> Result<()> {
        let [high, low] = split_nibbles(byte);
        self.write_nibble(high, mode)?;
        if let Err(e) = self.write_nibble(low, mode) {
            if self.state == ProtocolState::Ready {
                warn!("Nibble sync lost writing {:02X}: {}", byte, e);
                self.state = ProtocolState::Faulted;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Send a command and its argument, if any.
    pub fn send(&mut self, command: Command) -> Result<()> {
        self.ensure_ready()?;
        for (byte, mode) in command.bytes() {
            self.write_byte(byte, mode)?;
            if mode == Mode::Command {
                self.track(byte);
            }
        }
        Ok(())
    }

    fn track(&mut self, instruction: u8) {
        if instruction & LCD_SETDDRAMADDR != 0 {
            self.target = AddressTarget::Ddram;
        } else if instruction & LCD_SETCGRAMADDR != 0 {
            self.target = AddressTarget::Cgram;
        } else if instruction & LCD_FUNCTIONSET != 0 {
            self.display.function_set = instruction & 0x1F;
        } else if instruction & LCD_CURSORSHIFT != 0 {
            // moves the counter within whichever RAM it already points at
        } else if instruction & LCD_DISPLAYCONTROL != 0 {
            self.display.display_control = instruction & 0x07;
        } else if instruction & LCD_ENTRYMODESET != 0 {
            self.display.entry_mode = instruction & 0x03;
        } else if instruction & (LCD_RETURNHOME | LCD_CLEARDISPLAY) != 0 {
            self.target = AddressTarget::Ddram;
        }
    }

    fn write_data(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.write_byte(b, Mode::Data)?;
        }
        Ok(())
    }

    fn address_line(&mut self, line: u8) -> Result<()> {
        let base = self.layout.base_address(line).ok_or(Hd44780Error::InvalidLine {
            line,
            lines: self.layout.lines,
        })?;
        self.send(Command::instruction(base))
    }

    fn visible_len(&self, len: usize) -> usize {
        let columns = self.layout.columns as usize;
        if len > columns {
            debug!("Truncating {} bytes to {} columns", len, columns);
        }
        len.min(columns)
    }

    /// Address a 1-based line and write `text` from its first column.
    ///
    /// Text longer than the panel is cut at the last column rather than
    /// spilling into the next line's DDRAM.
    pub fn write_line(&mut self, line: u8, text: &str) -> Result<()> {
        self.address_line(line)?;
        let bytes = encode_plain(text);
        let len = self.visible_len(bytes.len());
        self.write_data(&bytes[..len])
    }

    /// Like [`write_line`](Self::write_line) but honouring `{0xHH}` escapes.
    pub fn write_extended_line(&mut self, line: u8, text: &str) -> Result<()> {
        self.address_line(line)?;
        let bytes = encode_extended(text);
        let len = self.visible_len(bytes.len());
        self.write_data(&bytes[..len])
    }

    /// Write at the current cursor position.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.ensure_ready()?;
        if self.target == AddressTarget::Cgram {
            return Err(Hd44780Error::CursorUndefined);
        }
        self.write_data(&encode_plain(text))
    }

    /// Move the cursor to a 1-based line and 0-based column.
    pub fn set_cursor(&mut self, line: u8, column: u8) -> Result<()> {
        let offset = self.layout.offset(line).ok_or(Hd44780Error::InvalidLine {
            line,
            lines: self.layout.lines,
        })?;
        if column >= self.layout.columns {
            return Err(Hd44780Error::InvalidColumn { column, columns: self.layout.columns });
        }
        self.send(Command::set_ddram_address(offset + column))
    }

    /// Blank the panel and put the cursor back at line 1, column 0.
    pub fn clear(&mut self) -> Result<()> {
        self.send(Command::instruction(LCD_CLEARDISPLAY))?;
        self.transport.delay_ms(CLEAR_SETTLE_MS);
        self.return_home()
    }

    pub fn return_home(&mut self) -> Result<()> {
        self.send(Command::instruction(LCD_RETURNHOME))?;
        self.transport.delay_ms(CLEAR_SETTLE_MS);
        Ok(())
    }

    /// Store the backlight flag and push it to the expander in one write.
    ///
    /// Accepted in any state so a faulted panel can still be darkened.
    pub fn set_backlight(&mut self, on: bool) -> Result<()> {
        self.display.backlight = on;
        debug!("Backlight {}", if on { "on" } else { "off" });
        self.transport.write_byte(self.display.backlight_bits())?;
        Ok(())
    }

    pub fn display_control(&mut self, display: bool, cursor: bool, blink: bool) -> Result<()> {
        let mut flags = LCD_DISPLAYOFF | LCD_CURSOROFF | LCD_BLINKOFF;
        if display {
            flags |= LCD_DISPLAYON;
        }
        if cursor {
            flags |= LCD_CURSORON;
        }
        if blink {
            flags |= LCD_BLINKON;
        }
        self.send(Command::instruction(LCD_DISPLAYCONTROL | flags))
    }
}
