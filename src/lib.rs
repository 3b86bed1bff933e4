//! A cycle-approximate interpreter for the PSX's MIPS R3000A core, its
//! address bus, and the DMA engine that moves bulk data between RAM and the
//! GPU. There is no renderer here -- `gpu::GpuPort` is the seam a real one
//! plugs into.

pub mod bios;
pub mod bus;
pub mod config;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod gpu;
pub mod map;
pub mod ram;

use bios::Bios;
use bus::Bus;
use cpu::Cpu;
use error::EmuError;

/// A CPU wired to its bus. The top-level driver most callers want: build
/// one from a BIOS image and call `step` in a loop.
pub struct Emulator {
    cpu: Cpu,
    bus: Bus,
}

impl Emulator {
    pub fn new(bios: Bios) -> Self {
        Emulator { cpu: Cpu::new(), bus: Bus::new(bios) }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Runs one fetch/decode/execute cycle. Only host-fatal conditions
    /// surface as `Err`; architectural exceptions are handled inside the
    /// CPU and never escape here.
    pub fn step(&mut self) -> Result<(), EmuError> {
        self.cpu.run_next_instruction(&mut self.bus)
    }
}
