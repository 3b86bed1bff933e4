//! Host-fatal diagnostics.
//!
//! Architectural exceptions (bad alignment, illegal instructions, overflow...)
//! are ordinary guest-visible control flow and never show up here -- see
//! `cpu::exception::Exception`. `EmuError` is reserved for conditions that mean
//! the emulator itself hit something it doesn't model: an unmapped address, an
//! opcode with no handler, a DMA channel doing something the hardware never
//! does. There is no recovery; the caller logs it and stops.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmuError {
    #[error("unhandled {width}-bit access at {addr:08x} (pc={pc:08x})")]
    UnmappedAddress { pc: u32, addr: u32, width: u8 },

    #[error("unhandled opcode {word:08x} at pc={pc:08x}")]
    UnhandledOpcode { pc: u32, word: u32 },

    #[error("DMA protocol violation on port {port}: {detail}")]
    DmaProtocolViolation { port: &'static str, detail: String },

    #[error("unknown DMA sync mode {value}")]
    UnknownSyncMode { value: u32 },

    #[error("unhandled GTE (Cop2) operation at pc={pc:08x}")]
    Cop2Unhandled { pc: u32 },

    #[error("BIOS image is {actual} bytes, expected {expected}")]
    BiosSizeMismatch { expected: usize, actual: usize },
}
