/*
 *  lcdticker HD44780 Driver - Custom Glyphs
 *
 *  5x8 CGRAM character definitions and the loader that programs them
 */

use log::{debug, warn};

use crate::command::Command;
use crate::error::{Hd44780Error, Result};
use crate::protocol::Hd44780;
use crate::transport::Transport;

/// Number of programmable characters.
pub const GLYPH_SLOTS: usize = 8;
/// Rows per 5x8 character.
pub const GLYPH_ROWS: usize = 8;
/// CGRAM words are five bits wide.
pub const ROW_MASK: u8 = 0x1F;

/// One 5x8 character. Row 0 is the top; bit 4 the leftmost pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    rows: [u8; GLYPH_ROWS],
}

impl Glyph {
    /// Bits above the fifth are dropped.
    pub const fn new(rows: [u8; GLYPH_ROWS]) -> Self {
        let mut masked = [0u8; GLYPH_ROWS];
        let mut i = 0;
        while i < GLYPH_ROWS {
            masked[i] = rows[i] & ROW_MASK;
            i += 1;
        }
        Self { rows: masked }
    }

    /// Outline of a full cell; loaded into every slot unless configured otherwise.
    pub const fn outline() -> Self {
        Self::new([
            0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111,
        ])
    }

    /// Parse eight rows of five `0`/`1` characters, e.g. `"10001"`.
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        if rows.len() != GLYPH_ROWS {
            return Err(Hd44780Error::InvalidGlyph(format!(
                "expected {} rows, got {}",
                GLYPH_ROWS,
                rows.len()
            )));
        }

        let mut out = [0u8; GLYPH_ROWS];
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != 5 {
                return Err(Hd44780Error::InvalidGlyph(format!(
                    "row {} '{}' is not 5 pixels wide",
                    i, row
                )));
            }
            for c in row.chars() {
                out[i] <<= 1;
                match c {
                    '1' => out[i] |= 1,
                    '0' => {}
                    other => {
                        return Err(Hd44780Error::InvalidGlyph(format!(
                            "row {} has '{}', expected 0 or 1",
                            i, other
                        )))
                    }
                }
            }
        }
        Ok(Self::new(out))
    }

    pub fn rows(&self) -> &[u8; GLYPH_ROWS] {
        &self.rows
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Self::outline()
    }
}

/// Contents for all eight slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSet {
    slots: [Glyph; GLYPH_SLOTS],
}

impl Default for GlyphSet {
    fn default() -> Self {
        Self { slots: [Glyph::outline(); GLYPH_SLOTS] }
    }
}

impl GlyphSet {
    /// Fill slots from 0 upward; unlisted slots keep the outline glyph.
    pub fn from_glyphs(glyphs: &[Glyph]) -> Result<Self> {
        if glyphs.len() > GLYPH_SLOTS {
            return Err(Hd44780Error::InvalidGlyph(format!(
                "{} glyphs given, only {} slots",
                glyphs.len(),
                GLYPH_SLOTS
            )));
        }
        let mut set = Self::default();
        set.slots[..glyphs.len()].copy_from_slice(glyphs);
        Ok(set)
    }

    pub fn set(&mut self, slot: usize, glyph: Glyph) -> Result<()> {
        let target = self.slots.get_mut(slot).ok_or_else(|| {
            Hd44780Error::InvalidGlyph(format!("slot {} out of range 0-{}", slot, GLYPH_SLOTS - 1))
        })?;
        *target = glyph;
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<&Glyph> {
        self.slots.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Glyph)> {
        self.slots.iter().enumerate()
    }
}

/// Programs a [`GlyphSet`] into CGRAM.
pub struct GlyphLoader;

impl GlyphLoader {
    /// CGRAM address of a slot's first row.
    #[inline]
    pub fn slot_address(slot: usize) -> u8 {
        ((slot & 0x07) * GLYPH_ROWS) as u8
    }

    /// Program every slot in order.
    ///
    /// Leaves the address counter in CGRAM: re-address a line before writing
    /// text. On error the slots already written are kept and the rest are
    /// undefined; run the whole load again before relying on them.
    pub fn load<T: Transport>(lcd: &mut Hd44780<T>, glyphs: &GlyphSet) -> Result<()> {
        for (slot, glyph) in glyphs.iter() {
            Self::load_slot(lcd, slot, glyph).inspect_err(|e| {
                warn!("Glyph load failed at slot {}: {}", slot, e);
            })?;
        }
        debug!("Loaded {} glyphs", GLYPH_SLOTS);
        Ok(())
    }

    pub fn load_slot<T: Transport>(lcd: &mut Hd44780<T>, slot: usize, glyph: &Glyph) -> Result<()> {
        if slot >= GLYPH_SLOTS {
            return Err(Hd44780Error::InvalidGlyph(format!("slot {} out of range", slot)));
        }
        lcd.send(Command::set_cgram_address(Self::slot_address(slot)))?;
        for &row in glyph.rows() {
            lcd.send(Command::data(row & ROW_MASK))?;
        }
        Ok(())
    }
}
