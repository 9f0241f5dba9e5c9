/*
 *  lcdticker HD44780 Driver - Emulated Panel
 *
 *  Software model of a PCF8574 backpack and HD44780 controller, for running
 *  without hardware and for inspecting exactly what the driver put on the bus
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::address::BusAddress;
use crate::command::{LineLayout, EN, LCD_BACKLIGHT, RS, RW};
use crate::error::Result;
use crate::transport::I2cTransport;

/// Oldest entries are dropped past this many log records.
const LOG_LIMIT: usize = 1 << 16;

/// Bus-level activity, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// One write transaction and the bytes it carried
    Write(Vec<u8>),
    /// One read transaction and its length
    Read(usize),
    /// A delay, in nanoseconds
    Delay(u32),
}

/// Which memory the address counter points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Ddram,
    Cgram,
}

/// HD44780 controller state.
///
/// DDRAM is modelled as a flat 128-byte space indexed by the 7-bit address, so
/// line 2 starts at 0x40 as on the real part.
#[derive(Debug, Clone)]
struct Controller {
    four_bit: bool,
    pending_high: Option<u8>,
    ddram: [u8; 128],
    cgram: [u8; 64],
    target: Target,
    address: u8,
    increment: bool,
    shift: bool,
    display_on: bool,
    cursor_on: bool,
    blink_on: bool,
    two_line: bool,
    tall_font: bool,
    instructions: VecDeque<u8>,
    data: VecDeque<u8>,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            four_bit: false,
            pending_high: None,
            ddram: [b' '; 128],
            cgram: [0; 64],
            target: Target::Ddram,
            address: 0,
            increment: true,
            shift: false,
            display_on: false,
            cursor_on: false,
            blink_on: false,
            two_line: false,
            tall_font: false,
            instructions: VecDeque::new(),
            data: VecDeque::new(),
        }
    }
}

fn push_capped<T>(log: &mut VecDeque<T>, item: T) {
    if log.len() == LOG_LIMIT {
        log.pop_front();
    }
    log.push_back(item);
}

impl Controller {
    /// Falling edge of EN: take D4-D7 from the port.
    fn latch(&mut self, port: u8) {
        let nibble = port & 0xF0;
        let rs = port & RS != 0;

        if !self.four_bit {
            // 8-bit interface; D0-D3 are not wired and read as zero
            self.pending_high = None;
            self.execute(nibble, rs);
            return;
        }

        match self.pending_high.take() {
            None => self.pending_high = Some(nibble),
            Some(high) => self.execute(high | (nibble >> 4), rs),
        }
    }

    fn execute(&mut self, value: u8, rs: bool) {
        if rs {
            self.write_data(value);
        } else {
            self.instruction(value);
        }
    }

    fn step(&mut self) {
        let mask = match self.target {
            Target::Ddram => 0x7F,
            Target::Cgram => 0x3F,
        };
        self.address = if self.increment {
            self.address.wrapping_add(1) & mask
        } else {
            self.address.wrapping_sub(1) & mask
        };
    }

    fn write_data(&mut self, value: u8) {
        push_capped(&mut self.data, value);
        match self.target {
            Target::Ddram => self.ddram[(self.address & 0x7F) as usize] = value,
            Target::Cgram => self.cgram[(self.address & 0x3F) as usize] = value,
        }
        self.step();
    }

    fn instruction(&mut self, value: u8) {
        push_capped(&mut self.instructions, value);

        if value & 0x80 != 0 {
            self.target = Target::Ddram;
            self.address = value & 0x7F;
        } else if value & 0x40 != 0 {
            self.target = Target::Cgram;
            self.address = value & 0x3F;
        } else if value & 0x20 != 0 {
            let four_bit = value & 0x10 == 0;
            if four_bit != self.four_bit {
                self.pending_high = None;
            }
            self.four_bit = four_bit;
            self.two_line = value & 0x08 != 0;
            self.tall_font = value & 0x04 != 0;
        } else if value & 0x10 != 0 {
            // cursor move only; display shift is not modelled
            if value & 0x08 == 0 {
                let saved = self.increment;
                self.increment = value & 0x04 != 0;
                self.step();
                self.increment = saved;
            }
        } else if value & 0x08 != 0 {
            self.display_on = value & 0x04 != 0;
            self.cursor_on = value & 0x02 != 0;
            self.blink_on = value & 0x01 != 0;
        } else if value & 0x04 != 0 {
            self.increment = value & 0x02 != 0;
            self.shift = value & 0x01 != 0;
        } else if value & 0x02 != 0 {
            self.target = Target::Ddram;
            self.address = 0;
        } else if value & 0x01 != 0 {
            self.ddram = [b' '; 128];
            self.target = Target::Ddram;
            self.address = 0;
            self.increment = true;
        }
    }
}

#[derive(Debug)]
struct State {
    address: u8,
    port: u8,
    controller: Controller,
    events: VecDeque<Event>,
    port_writes: VecDeque<u8>,
    read_data: VecDeque<u8>,
    writes_before_failure: Option<usize>,
}

impl State {
    fn port_write(&mut self, byte: u8) {
        let previous = self.port;
        self.port = byte;
        push_capped(&mut self.port_writes, byte);
        if previous & EN != 0 && byte & EN == 0 && byte & RW == 0 {
            self.controller.latch(byte);
        }
    }

    fn next_read(&mut self) -> u8 {
        self.read_data.pop_front().unwrap_or(self.port)
    }
}

/// Handle on an emulated display.
///
/// Clones share the same panel, so a test can keep one handle while the bus
/// half is moved into a transport.
#[derive(Debug, Clone)]
pub struct EmulatedLcd {
    state: Arc<Mutex<State>>,
}

impl EmulatedLcd {
    /// Panel answering at `address`; transfers to any other address are NAKed.
    pub fn new(address: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                address,
                port: 0,
                controller: Controller::default(),
                events: VecDeque::new(),
                port_writes: VecDeque::new(),
                read_data: VecDeque::new(),
                writes_before_failure: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn bus(&self) -> EmulatedBus {
        EmulatedBus { state: Arc::clone(&self.state) }
    }

    pub fn delay(&self) -> InstantDelay {
        InstantDelay { state: Arc::clone(&self.state) }
    }

    /// Transport wired to this panel at its own address.
    pub fn transport(&self) -> Result<I2cTransport<EmulatedBus, InstantDelay>> {
        let address = BusAddress::new(self.lock().address as u16)?;
        Ok(I2cTransport::new(self.bus(), self.delay(), address))
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.iter().cloned().collect()
    }

    /// Every byte latched onto the expander port, in order.
    pub fn port_writes(&self) -> Vec<u8> {
        self.lock().port_writes.iter().copied().collect()
    }

    /// Decoded instruction bytes, in order.
    pub fn instructions(&self) -> Vec<u8> {
        self.lock().controller.instructions.iter().copied().collect()
    }

    /// Decoded data bytes, in order.
    pub fn data(&self) -> Vec<u8> {
        self.lock().controller.data.iter().copied().collect()
    }

    pub fn clear_log(&self) {
        let mut s = self.lock();
        s.events.clear();
        s.port_writes.clear();
        s.controller.instructions.clear();
        s.controller.data.clear();
    }

    /// `len` DDRAM bytes starting at DDRAM address `start`.
    pub fn ddram(&self, start: u8, len: usize) -> Vec<u8> {
        let s = self.lock();
        (0..len)
            .map(|i| s.controller.ddram[(start as usize + i) & 0x7F])
            .collect()
    }

    /// The eight rows stored for a CGRAM slot.
    pub fn glyph(&self, slot: usize) -> [u8; 8] {
        let s = self.lock();
        let mut rows = [0u8; 8];
        rows.copy_from_slice(&s.controller.cgram[(slot & 7) * 8..(slot & 7) * 8 + 8]);
        rows
    }

    /// Visible text of a 1-based line; non-printable codes show as `?`.
    pub fn line_text(&self, layout: &LineLayout, line: u8) -> String {
        let Some(offset) = layout.offset(line) else {
            return String::new();
        };
        self.ddram(offset, layout.columns as usize)
            .into_iter()
            .map(|b| if b == b' ' || b.is_ascii_graphic() { b as char } else { '?' })
            .collect()
    }

    pub fn address_counter(&self) -> (Target, u8) {
        let s = self.lock();
        (s.controller.target, s.controller.address)
    }

    pub fn backlight(&self) -> bool {
        self.lock().port & LCD_BACKLIGHT != 0
    }

    pub fn is_four_bit(&self) -> bool {
        self.lock().controller.four_bit
    }

    pub fn is_two_line(&self) -> bool {
        self.lock().controller.two_line
    }

    pub fn is_tall_font(&self) -> bool {
        self.lock().controller.tall_font
    }

    /// (display, cursor, blink)
    pub fn display_control(&self) -> (bool, bool, bool) {
        let s = self.lock();
        let c = &s.controller;
        (c.display_on, c.cursor_on, c.blink_on)
    }

    /// (increment, shift)
    pub fn entry_mode(&self) -> (bool, bool) {
        let s = self.lock();
        let c = &s.controller;
        (c.increment, c.shift)
    }

    /// Bytes returned by the next reads, ahead of the port latch.
    pub fn set_read_data(&self, bytes: &[u8]) {
        self.lock().read_data.extend(bytes.iter().copied());
    }

    /// Let `n` more write transactions succeed, then fail every write.
    pub fn fail_after(&self, n: usize) {
        self.lock().writes_before_failure = Some(n);
    }

    pub fn heal(&self) {
        self.lock().writes_before_failure = None;
    }

    /// Total delay requested so far, in nanoseconds.
    pub fn total_delay_ns(&self) -> u64 {
        self.lock()
            .events
            .iter()
            .map(|e| match e {
                Event::Delay(ns) => *ns as u64,
                _ => 0,
            })
            .sum()
    }
}

/// I2C half of an emulated panel.
#[derive(Debug, Clone)]
pub struct EmulatedBus {
    state: Arc<Mutex<State>>,
}

impl ErrorType for EmulatedBus {
    type Error = ErrorKind;
}

impl I2c for EmulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        let mut s = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if address != s.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    match s.writes_before_failure {
                        Some(0) => return Err(ErrorKind::Other),
                        Some(n) => s.writes_before_failure = Some(n - 1),
                        None => {}
                    }
                    push_capped(&mut s.events, Event::Write(bytes.to_vec()));
                    for &b in bytes.iter() {
                        s.port_write(b);
                    }
                }
                Operation::Read(buf) => {
                    push_capped(&mut s.events, Event::Read(buf.len()));
                    for b in buf.iter_mut() {
                        *b = s.next_read();
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and records what was asked for.
#[derive(Debug, Clone)]
pub struct InstantDelay {
    state: Arc<Mutex<State>>,
}

impl InstantDelay {
    fn record(&mut self, ns: u32) {
        let mut s = self.state.lock().unwrap_or_else(|e| e.into_inner());
        push_capped(&mut s.events, Event::Delay(ns));
    }
}

impl DelayNs for InstantDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.record(us.saturating_mul(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(ms.saturating_mul(1_000_000));
    }
}
