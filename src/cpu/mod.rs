//! The MIPS R3000A interpreter: registers, the load-delay and branch-delay
//! bookkeeping, and the per-tick fetch/decode/execute/exception cycle.
//! Opcode handlers live in `exec`; they're `impl Cpu` methods split into a
//! second file purely to keep this one a reasonable length.

mod decode;
mod exec;
pub mod exception;

use log::trace;

use crate::bus::Bus;
use crate::error::EmuError;
use exception::Exception;

const RESET_PC: u32 = 0xbfc0_0000;

pub struct Cpu {
    pc: u32,
    next_pc: u32,
    current_pc: u32,
    regs: [u32; 32],
    out_regs: [u32; 32],
    pending_load: (usize, u32),
    hi: u32,
    lo: u32,
    sr: u32,
    cause: u32,
    epc: u32,
    branch: bool,
    delay_slot: bool,
    ip: u64,
}

impl Cpu {
    pub fn new() -> Self {
        let mut regs = [0xdead_c0de; 32];
        regs[0] = 0;
        Cpu {
            pc: RESET_PC,
            next_pc: RESET_PC.wrapping_add(4),
            current_pc: 0,
            regs,
            out_regs: regs,
            pending_load: (0, 0),
            hi: 0xdead_c0de,
            lo: 0xdead_c0de,
            sr: 0,
            cause: 0,
            epc: 0,
            branch: false,
            delay_slot: false,
            ip: 0,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn next_pc(&self) -> u32 {
        self.next_pc
    }

    pub fn sr(&self) -> u32 {
        self.sr
    }

    pub fn cause(&self) -> u32 {
        self.cause
    }

    pub fn epc(&self) -> u32 {
        self.epc
    }

    pub fn retired(&self) -> u64 {
        self.ip
    }

    pub fn reg(&self, index: usize) -> u32 {
        self.regs[index]
    }

    fn set_reg(&mut self, index: usize, val: u32) {
        self.out_regs[index] = val;
        self.out_regs[0] = 0;
    }

    fn cache_isolated(&self) -> bool {
        self.sr & 0x10000 != 0
    }

    /// Queues a value to land in `out_regs` at the *next* tick's commit
    /// step. Only LWL/LWR bypass this to read the not-yet-committed value.
    fn delayed_load(&mut self, index: usize, val: u32) {
        self.pending_load = (index, val);
    }

    fn branch_to(&mut self, target: u32) {
        self.next_pc = target;
        self.branch = true;
    }

    fn raise(&mut self, cause: Exception) {
        let handler = if self.sr & (1 << 22) != 0 { 0xbfc0_0180 } else { 0x8000_0080 };

        let mode = self.sr & 0x3f;
        self.sr &= 0xffff_ffc0;
        self.sr |= (mode << 2) & 0x3f;

        self.cause = cause.code() << 2;
        self.epc = self.current_pc;

        if self.delay_slot {
            self.epc = self.epc.wrapping_sub(4);
            self.cause |= 1 << 31;
        }

        self.pc = handler;
        self.next_pc = handler.wrapping_add(4);
    }

    /// Runs one fetch/decode/execute cycle. Architectural exceptions are
    /// handled internally and never surface here; only host-fatal
    /// conditions from the bus or an unhandled opcode return `Err`.
    pub fn run_next_instruction(&mut self, bus: &mut Bus) -> Result<(), EmuError> {
        self.current_pc = self.pc;

        if self.current_pc & 3 != 0 {
            self.raise(Exception::LoadAddressError);
            return Ok(());
        }

        let word = bus.load32(self.pc)?;

        self.pc = self.next_pc;
        self.next_pc = self.pc.wrapping_add(4);

        let (index, val) = self.pending_load;
        self.out_regs[index] = val;
        self.out_regs[0] = 0;
        self.pending_load = (0, 0);

        self.delay_slot = self.branch;
        self.branch = false;

        self.execute(bus, word)?;

        self.regs = self.out_regs;
        self.ip += 1;
        Ok(())
    }

    fn execute(&mut self, bus: &mut Bus, word: u32) -> Result<(), EmuError> {
        trace!("pc={:08x} word={:08x}", self.current_pc, word);
        exec::dispatch(self, bus, word)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
