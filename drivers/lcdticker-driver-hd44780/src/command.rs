/*
 *  lcdticker HD44780 Driver - Instruction Set
 *
 *  Controller opcodes, flag bits and the PCF8574 pin mapping
 */

// Instructions
pub const LCD_CLEARDISPLAY: u8 = 0x01;
pub const LCD_RETURNHOME: u8 = 0x02;
pub const LCD_ENTRYMODESET: u8 = 0x04;
pub const LCD_DISPLAYCONTROL: u8 = 0x08;
pub const LCD_CURSORSHIFT: u8 = 0x10;
pub const LCD_FUNCTIONSET: u8 = 0x20;
pub const LCD_SETCGRAMADDR: u8 = 0x40;
pub const LCD_SETDDRAMADDR: u8 = 0x80;

// Entry mode flags
pub const LCD_ENTRYRIGHT: u8 = 0x00;
pub const LCD_ENTRYLEFT: u8 = 0x02;
pub const LCD_ENTRYSHIFTINCREMENT: u8 = 0x01;
pub const LCD_ENTRYSHIFTDECREMENT: u8 = 0x00;

// Display on/off control flags
pub const LCD_DISPLAYON: u8 = 0x04;
pub const LCD_DISPLAYOFF: u8 = 0x00;
pub const LCD_CURSORON: u8 = 0x02;
pub const LCD_CURSOROFF: u8 = 0x00;
pub const LCD_BLINKON: u8 = 0x01;
pub const LCD_BLINKOFF: u8 = 0x00;

// Function set flags
pub const LCD_8BITMODE: u8 = 0x10;
pub const LCD_4BITMODE: u8 = 0x00;
pub const LCD_2LINE: u8 = 0x08;
pub const LCD_1LINE: u8 = 0x00;
pub const LCD_5X10DOTS: u8 = 0x04;
pub const LCD_5X8DOTS: u8 = 0x00;

// PCF8574 port bits: P0=RS, P1=RW, P2=EN, P3=backlight, P4-P7=D4-D7
pub const LCD_BACKLIGHT: u8 = 0x08;
pub const LCD_NOBACKLIGHT: u8 = 0x00;
pub const EN: u8 = 0b0000_0100;
pub const RW: u8 = 0b0000_0010;
pub const RS: u8 = 0b0000_0001;

/// Register select for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Instruction register
    Command,
    /// Data register (DDRAM or CGRAM, whichever was addressed last)
    Data,
}

impl Mode {
    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            Mode::Command => 0,
            Mode::Data => RS,
        }
    }
}

/// A single controller transfer: opcode or data byte plus its register select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub value: u8,
    pub mode: Mode,
    pub argument: Option<u8>,
}

impl Command {
    pub const fn instruction(value: u8) -> Self {
        Self { value, mode: Mode::Command, argument: None }
    }

    pub const fn data(value: u8) -> Self {
        Self { value, mode: Mode::Data, argument: None }
    }

    pub const fn with_argument(value: u8, argument: u8) -> Self {
        Self { value, mode: Mode::Command, argument: Some(argument) }
    }

    pub const fn set_ddram_address(address: u8) -> Self {
        Self::instruction(LCD_SETDDRAMADDR | (address & 0x7F))
    }

    pub const fn set_cgram_address(address: u8) -> Self {
        Self::instruction(LCD_SETCGRAMADDR | (address & 0x3F))
    }

    /// Bytes put on the wire for this command, in order.
    pub fn bytes(&self) -> impl Iterator<Item = (u8, Mode)> {
        let arg = self.argument.map(|a| (a, Mode::Data));
        core::iter::once((self.value, self.mode)).chain(arg)
    }
}

/// High nibble then low nibble, both aligned to D4-D7.
#[inline]
pub fn split_nibbles(byte: u8) -> [u8; 2] {
    [byte & 0xF0, (byte << 4) & 0xF0]
}

/// DDRAM geometry of the panel.
///
/// Rows three and four continue rows one and two at an offset equal to the
/// column count, so the base table depends on the panel width:
/// 20 columns gives 0x80/0xC0/0x94/0xD4, 16 columns 0x80/0xC0/0x90/0xD0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLayout {
    pub lines: u8,
    pub columns: u8,
}

impl LineLayout {
    pub const fn new(lines: u8, columns: u8) -> Self {
        Self { lines, columns }
    }

    /// DDRAM offset of the first cell of a 1-based line.
    pub fn offset(&self, line: u8) -> Option<u8> {
        if line == 0 || line > self.lines.min(4) {
            return None;
        }
        Some(match line {
            1 => 0x00,
            2 => 0x40,
            3 => self.columns,
            _ => 0x40 + self.columns,
        })
    }

    /// Whether every cell maps into the controller's two 40-byte DDRAM rows.
    ///
    /// Four-line panels fold rows three and four onto rows one and two, so
    /// they can be at most 20 columns wide.
    pub fn fits_ddram(&self) -> bool {
        let max_columns = if self.lines > 2 { 20 } else { 40 };
        (1..=4).contains(&self.lines) && (1..=max_columns).contains(&self.columns)
    }

    /// Full set-DDRAM-address opcode for a 1-based line.
    pub fn base_address(&self, line: u8) -> Option<u8> {
        self.offset(line).map(|o| LCD_SETDDRAMADDR | o)
    }
}

impl Default for LineLayout {
    fn default() -> Self {
        Self::new(2, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twenty_column_bases() {
        let layout = LineLayout::new(4, 20);
        let bases: Vec<u8> = (1..=4).filter_map(|l| layout.base_address(l)).collect();
        assert_eq!(bases, vec![0x80, 0xC0, 0x94, 0xD4]);
    }

    #[test]
    fn test_sixteen_column_bases() {
        let layout = LineLayout::new(4, 16);
        let bases: Vec<u8> = (1..=4).filter_map(|l| layout.base_address(l)).collect();
        assert_eq!(bases, vec![0x80, 0xC0, 0x90, 0xD0]);
    }

    #[test]
    fn test_ddram_fit() {
        assert!(LineLayout::new(2, 40).fits_ddram());
        assert!(LineLayout::new(4, 20).fits_ddram());
        assert!(!LineLayout::new(4, 24).fits_ddram());
        assert!(!LineLayout::new(3, 21).fits_ddram());
        assert!(!LineLayout::new(5, 16).fits_ddram());
        assert!(!LineLayout::new(2, 0).fits_ddram());
    }

    #[test]
    fn test_line_out_of_range() {
        let layout = LineLayout::new(2, 16);
        assert_eq!(layout.base_address(0), None);
        assert_eq!(layout.base_address(3), None);
    }

    #[test]
    fn test_split_nibbles() {
        assert_eq!(split_nibbles(0x41), [0x40, 0x10]);
        assert_eq!(split_nibbles(0x28), [0x20, 0x80]);
        assert_eq!(split_nibbles(0xFF), [0xF0, 0xF0]);
    }

    #[test]
    fn test_command_bytes_with_argument() {
        let cmd = Command::with_argument(0x40, 0x1F);
        let bytes: Vec<_> = cmd.bytes().collect();
        assert_eq!(bytes, vec![(0x40, Mode::Command), (0x1F, Mode::Data)]);
    }
}
