/*
 *  lcdticker HD44780 Driver - Errors
 *
 *  Error types shared by the transport, protocol and glyph layers
 */

use thiserror::Error;

/// Failure of a single bus transaction.
///
/// Carries the operation that failed and the device address so a log line is
/// enough to tell a missing backpack from a permissions problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("I2C {op} at 0x{address:02X} failed: {detail}")]
pub struct TransportError {
    pub op: &'static str,
    pub address: u8,
    pub detail: String,
}

impl TransportError {
    pub fn new(op: &'static str, address: u8, detail: impl Into<String>) -> Self {
        Self { op, address, detail: detail.into() }
    }
}

#[derive(Debug, Error)]
pub enum Hd44780Error {
    /// No explicit address, no probe result and no default.
    #[error("no I2C address could be determined for the display")]
    AddressResolution,

    /// Address outside the 7-bit range.
    #[error("0x{0:02X} is not a 7-bit I2C address")]
    InvalidAddress(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Initialization failed part way; the driver must be re-initialized.
    #[error("display protocol fault: {0}")]
    ProtocolFault(String),

    /// Operation attempted before initialization completed.
    #[error("display not initialized")]
    NotReady,

    /// The address counter points into CGRAM; re-address a line first.
    #[error("cursor position undefined after CGRAM access")]
    CursorUndefined,

    #[error("line {line} out of range (display has {lines})")]
    InvalidLine { line: u8, lines: u8 },

    #[error("column {column} out of range (display has {columns})")]
    InvalidColumn { column: u8, columns: u8 },

    #[error("invalid glyph: {0}")]
    InvalidGlyph(String),
}

pub type Result<T> = core::result::Result<T, Hd44780Error>;
